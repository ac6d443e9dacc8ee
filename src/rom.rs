use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

const INES_HEADER_SIZE: usize = 16;
const INES_TRAINER_SIZE: usize = 512;
const INES_TITLE_SIZE: usize = 128;
pub const PRG_ROM_PAGE_SIZE: usize = 16 * 1024;
pub const CHR_ROM_PAGE_SIZE: usize = 8 * 1024;
const INES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

const FLAG6_VERTICAL: u8 = 0b0000_0001;
const FLAG6_BATTERY: u8 = 0b0000_0010;
const FLAG6_TRAINER: u8 = 0b0000_0100;
const FLAG6_FOUR_SCREEN: u8 = 0b0000_1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
    SingleScreen,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomError {
    #[error("missing iNES magic")]
    InvalidHeader,
    #[error("image truncated in {section}: need {expected} bytes, have {actual}")]
    Truncated {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("image declares no PRG ROM banks")]
    MissingPrg,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read ROM file")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Rom(#[from] RomError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub has_battery: bool,
    pub title: Option<String>,
}

impl Rom {
    pub fn from_bytes(raw: &[u8]) -> Result<Self, RomError> {
        if raw.len() < INES_HEADER_SIZE {
            return Err(RomError::Truncated {
                section: "header",
                expected: INES_HEADER_SIZE,
                actual: raw.len(),
            });
        }

        if raw[0..4] != INES_MAGIC {
            return Err(RomError::InvalidHeader);
        }

        let prg_rom_banks = raw[4] as usize;
        let chr_rom_banks = raw[5] as usize;
        let flags6 = raw[6];
        let flags7 = raw[7];
        let mapper = (flags6 >> 4) | (flags7 & 0xF0);

        if prg_rom_banks == 0 {
            return Err(RomError::MissingPrg);
        }

        let mirroring = if flags6 & FLAG6_FOUR_SCREEN != 0 {
            Mirroring::FourScreen
        } else if flags6 & FLAG6_VERTICAL != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mut cursor = INES_HEADER_SIZE;
        if flags6 & FLAG6_TRAINER != 0 {
            cursor += INES_TRAINER_SIZE;
        }

        let prg_size = prg_rom_banks * PRG_ROM_PAGE_SIZE;
        if raw.len() < cursor + prg_size {
            return Err(RomError::Truncated {
                section: "PRG ROM",
                expected: cursor + prg_size,
                actual: raw.len(),
            });
        }
        let prg_rom = raw[cursor..cursor + prg_size].to_vec();
        cursor += prg_size;

        let chr_size = chr_rom_banks * CHR_ROM_PAGE_SIZE;
        if raw.len() < cursor + chr_size {
            return Err(RomError::Truncated {
                section: "CHR ROM",
                expected: cursor + chr_size,
                actual: raw.len(),
            });
        }
        let chr_rom = raw[cursor..cursor + chr_size].to_vec();
        cursor += chr_size;

        Ok(Rom {
            prg_rom,
            chr_rom,
            mapper,
            mirroring,
            has_battery: flags6 & FLAG6_BATTERY != 0,
            title: parse_title(&raw[cursor..]),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let raw = fs::read(path)?;
        Ok(Rom::from_bytes(&raw)?)
    }

    pub fn prg_banks(&self) -> usize {
        self.prg_rom.len() / PRG_ROM_PAGE_SIZE
    }

    pub fn chr_banks(&self) -> usize {
        self.chr_rom.len() / CHR_ROM_PAGE_SIZE
    }

    /// Carts without CHR ROM carry writable pattern RAM instead.
    pub fn has_chr_ram(&self) -> bool {
        self.chr_rom.is_empty()
    }
}

fn parse_title(trailer: &[u8]) -> Option<String> {
    if trailer.len() < INES_TITLE_SIZE {
        return None;
    }
    let bytes = &trailer[..INES_TITLE_SIZE];
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let title = String::from_utf8_lossy(&bytes[..end]).trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn build_ines(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8, payload: Vec<u8>) -> Vec<u8> {
        let mut bytes = vec![0u8; INES_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&INES_MAGIC);
        bytes[4] = prg_banks;
        bytes[5] = chr_banks;
        bytes[6] = flags6;
        bytes[7] = flags7;
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn test_from_bytes_reads_prg_and_chr() {
        let prg = vec![0xAA; PRG_ROM_PAGE_SIZE];
        let chr = vec![0xBB; CHR_ROM_PAGE_SIZE];
        let raw = build_ines(1, 1, FLAG6_VERTICAL, 0, [prg.clone(), chr.clone()].concat());

        let rom = Rom::from_bytes(&raw).unwrap();
        assert_eq!(rom.mapper, 0);
        assert_eq!(rom.mirroring, Mirroring::Vertical);
        assert_eq!(rom.prg_rom, prg);
        assert_eq!(rom.chr_rom, chr);
        assert_eq!(rom.prg_banks(), 1);
        assert_eq!(rom.chr_banks(), 1);
        assert!(!rom.has_chr_ram());
        assert_eq!(rom.title, None);
    }

    #[test]
    fn test_from_bytes_skips_trainer() {
        let trainer = vec![0xCC; INES_TRAINER_SIZE];
        let prg = vec![0xAA; PRG_ROM_PAGE_SIZE];
        let raw = build_ines(1, 0, FLAG6_TRAINER, 0, [trainer, prg.clone()].concat());

        let rom = Rom::from_bytes(&raw).unwrap();
        assert_eq!(rom.prg_rom, prg);
        assert!(rom.has_chr_ram());
    }

    #[test]
    fn test_from_bytes_combines_mapper_nibbles() {
        let prg = vec![0; PRG_ROM_PAGE_SIZE];
        let raw = build_ines(1, 0, 0x40 | FLAG6_BATTERY, 0x00, prg.clone());
        let rom = Rom::from_bytes(&raw).unwrap();
        assert_eq!(rom.mapper, 4);
        assert!(rom.has_battery);

        let raw = build_ines(1, 0, 0x10, 0x40, prg);
        assert_eq!(Rom::from_bytes(&raw).unwrap().mapper, 0x41);
    }

    #[test]
    fn test_four_screen_overrides_vertical_flag() {
        let prg = vec![0; PRG_ROM_PAGE_SIZE];
        let raw = build_ines(1, 0, FLAG6_FOUR_SCREEN | FLAG6_VERTICAL, 0, prg);
        assert_eq!(Rom::from_bytes(&raw).unwrap().mirroring, Mirroring::FourScreen);
    }

    #[test]
    fn test_reads_trailing_title() {
        let prg = vec![0; PRG_ROM_PAGE_SIZE];
        let mut title = vec![0u8; INES_TITLE_SIZE];
        title[..9].copy_from_slice(b"TEST CART");
        let raw = build_ines(1, 0, 0, 0, [prg, title].concat());

        assert_eq!(Rom::from_bytes(&raw).unwrap().title.as_deref(), Some("TEST CART"));
    }

    #[test]
    fn test_from_bytes_rejects_invalid_header() {
        let mut raw = vec![0u8; INES_HEADER_SIZE];
        raw[0..4].copy_from_slice(b"BAD!");
        assert_eq!(Rom::from_bytes(&raw), Err(RomError::InvalidHeader));
    }

    #[test]
    fn test_from_bytes_rejects_truncated_prg() {
        let raw = build_ines(2, 0, 0, 0, vec![0; PRG_ROM_PAGE_SIZE]);
        assert_eq!(
            Rom::from_bytes(&raw),
            Err(RomError::Truncated {
                section: "PRG ROM",
                expected: INES_HEADER_SIZE + 2 * PRG_ROM_PAGE_SIZE,
                actual: INES_HEADER_SIZE + PRG_ROM_PAGE_SIZE,
            })
        );
    }

    #[test]
    fn test_from_bytes_rejects_missing_prg() {
        let raw = build_ines(0, 1, 0, 0, vec![0; CHR_ROM_PAGE_SIZE]);
        assert_eq!(Rom::from_bytes(&raw), Err(RomError::MissingPrg));
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = Rom::from_file("/nonexistent/path/to/cart.nes").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}

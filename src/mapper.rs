use crate::ppu::memory::PpuMemory;
use crate::rom::{Mirroring, CHR_ROM_PAGE_SIZE, PRG_ROM_PAGE_SIZE};

const PRG_WINDOW_START: usize = 0x8000;
const PRG_8K_BANK_SIZE: usize = 8 * 1024;
const CHR_4K_BANK_SIZE: usize = 4 * 1024;
const CHR_1K_BANK_SIZE: usize = 1024;

/// Cartridge hardware hook. A plugin sees every CPU write into the ROM
/// window and may remap banks in response.
pub trait Mapper {
    fn id(&self) -> u8;

    /// Returns true when the write was consumed and must not reach RAM.
    fn cpu_write(&mut self, addr: u16, data: u8, banks: &mut BankSwitch<'_>) -> bool;

    fn scanline_irq(&mut self) -> Option<&mut ScanlineIrq> {
        None
    }
}

/// Mutable view of everything a mapper is allowed to remap.
pub struct BankSwitch<'a> {
    prg_rom: &'a [u8],
    chr_rom: &'a [u8],
    cpu_memory: &'a mut [u8],
    ppu_memory: &'a mut PpuMemory,
}

impl<'a> BankSwitch<'a> {
    pub fn new(prg_rom: &'a [u8], chr_rom: &'a [u8], cpu_memory: &'a mut [u8], ppu_memory: &'a mut PpuMemory) -> Self {
        BankSwitch {
            prg_rom,
            chr_rom,
            cpu_memory,
            ppu_memory,
        }
    }

    pub fn prg_banks_16k(&self) -> usize {
        self.prg_rom.len() / PRG_ROM_PAGE_SIZE
    }

    pub fn prg_banks_8k(&self) -> usize {
        self.prg_rom.len() / PRG_8K_BANK_SIZE
    }

    pub fn chr_banks_1k(&self) -> usize {
        self.chr_rom.len() / CHR_1K_BANK_SIZE
    }

    /// Copies 16KB bank `bank` into CPU slot 0 (`$8000`) or 1 (`$C000`).
    pub fn map_prg_16k(&mut self, slot: usize, bank: usize) {
        self.copy_prg(PRG_WINDOW_START + (slot & 1) * PRG_ROM_PAGE_SIZE, bank, PRG_ROM_PAGE_SIZE);
    }

    /// Copies 8KB bank `bank` into CPU slot 0..=3 (`$8000`, `$A000`, `$C000`, `$E000`).
    pub fn map_prg_8k(&mut self, slot: usize, bank: usize) {
        self.copy_prg(PRG_WINDOW_START + (slot & 3) * PRG_8K_BANK_SIZE, bank, PRG_8K_BANK_SIZE);
    }

    pub fn map_chr_8k(&mut self, bank: usize) {
        self.copy_chr(0, bank, CHR_ROM_PAGE_SIZE);
    }

    /// Slot 0 is `$0000`, slot 1 is `$1000`.
    pub fn map_chr_4k(&mut self, slot: usize, bank: usize) {
        self.copy_chr((slot & 1) * CHR_4K_BANK_SIZE, bank, CHR_4K_BANK_SIZE);
    }

    pub fn map_chr_1k(&mut self, slot: usize, bank: usize) {
        self.copy_chr((slot & 7) * CHR_1K_BANK_SIZE, bank, CHR_1K_BANK_SIZE);
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.ppu_memory.set_mirroring(mirroring);
    }

    // Bank numbers wrap modulo the number of banks in the image.
    fn copy_prg(&mut self, dest: usize, bank: usize, size: usize) {
        let count = self.prg_rom.len() / size;
        if count == 0 {
            return;
        }
        let start = (bank % count) * size;
        self.cpu_memory[dest..dest + size].copy_from_slice(&self.prg_rom[start..start + size]);
    }

    fn copy_chr(&mut self, dest: usize, bank: usize, size: usize) {
        let count = self.chr_rom.len() / size;
        if count == 0 {
            return;
        }
        let start = (bank % count) * size;
        self.ppu_memory.load_pattern(dest as u16, &self.chr_rom[start..start + size]);
    }
}

/// Scanline counter that raises an IRQ when it reaches the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanlineIrq {
    pub enabled: bool,
    pub counter: u16,
}

impl ScanlineIrq {
    pub fn tick(&mut self, scanline: u16) -> bool {
        if self.enabled && self.counter == scanline {
            self.counter = self.counter.wrapping_sub(1);
            true
        } else {
            false
        }
    }
}

/// The fixed mapping every cart gets at load time; ROM writes are swallowed.
pub struct NromMapper {
    id: u8,
}

impl NromMapper {
    pub fn new(id: u8) -> Self {
        NromMapper { id }
    }
}

impl Default for NromMapper {
    fn default() -> Self {
        NromMapper::new(0)
    }
}

impl Mapper for NromMapper {
    fn id(&self) -> u8 {
        self.id
    }

    fn cpu_write(&mut self, addr: u16, _data: u8, _banks: &mut BankSwitch<'_>) -> bool {
        addr >= PRG_WINDOW_START as u16
    }
}

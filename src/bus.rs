use tracing::{info, warn};

use crate::config::Region;
use crate::cpu::Mem;
use crate::joypad::Joypad;
use crate::mapper::{BankSwitch, Mapper, NromMapper, ScanlineIrq};
use crate::ppu::Ppu;
use crate::rom::{Mirroring, Rom};

const CPU_ADDRESS_SPACE: usize = 0x10000;
const RAM_END: u16 = 0x1FFF;
const RAM_MIRROR_MASK: u16 = 0x07FF;
const RAM_MIRROR_STRIDE: u16 = 0x0800;
const PPU_REGISTERS_START: u16 = 0x2000;
const PPU_REGISTERS_END: u16 = 0x3FFF;
const OAM_DMA: u16 = 0x4014;
const JOYPAD_1: u16 = 0x4016;
const ROM_WINDOW_START: u16 = 0x8000;
const OAM_PAGE_SIZE: usize = 0x100;

/// The CPU-visible 64KB address space and the devices wired into it.
pub struct Bus {
    ram: Box<[u8]>,
    pub ppu: Ppu,
    pub joypad: Joypad,
    mapper: Box<dyn Mapper>,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
}

impl Bus {
    pub fn new(region: Region) -> Self {
        Bus {
            ram: vec![0; CPU_ADDRESS_SPACE].into_boxed_slice(),
            ppu: Ppu::new(region, Mirroring::Horizontal),
            joypad: Joypad::new(),
            mapper: Box::new(NromMapper::default()),
            prg_rom: Vec::new(),
            chr_rom: Vec::new(),
        }
    }

    /// Installs a cartridge. Without a plugin the fixed NROM-style mapping is used.
    pub fn load_rom(&mut self, rom: Rom, mapper: Option<Box<dyn Mapper>>) {
        let region = self.ppu.region();
        self.ppu = Ppu::new(region, rom.mirroring);
        self.ppu.memory.set_chr_ram(rom.has_chr_ram());

        info!(
            prg_banks = rom.prg_banks(),
            chr_banks = rom.chr_banks(),
            mapper = rom.mapper,
            mirroring = ?rom.mirroring,
            title = rom.title.as_deref().unwrap_or(""),
            "cartridge loaded"
        );

        self.mapper = match mapper {
            Some(mapper) => mapper,
            None => {
                if rom.mapper != 0 {
                    warn!(mapper = rom.mapper, "no plugin for mapper, using fixed mapping");
                }
                Box::new(NromMapper::new(rom.mapper))
            }
        };
        self.prg_rom = rom.prg_rom;
        self.chr_rom = rom.chr_rom;

        let mut banks = BankSwitch::new(&self.prg_rom, &self.chr_rom, &mut self.ram, &mut self.ppu.memory);
        let last_bank = banks.prg_banks_16k().saturating_sub(1);
        banks.map_prg_16k(0, 0);
        banks.map_prg_16k(1, last_bank);
        banks.map_chr_8k(0);
    }

    pub fn mapper_id(&self) -> u8 {
        self.mapper.id()
    }

    pub fn scanline_irq(&mut self) -> Option<&mut ScanlineIrq> {
        self.mapper.scanline_irq()
    }

    /// Advances the cartridge scanline counter, if any. True means raise an IRQ.
    pub fn tick_scanline_irq(&mut self, scanline: usize) -> bool {
        match self.scanline_irq() {
            Some(irq) => irq.tick(scanline as u16),
            None => false,
        }
    }

    /// Copies bytes straight into the address space, skipping every side effect.
    pub fn load_raw(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        let end = (start + data.len()).min(CPU_ADDRESS_SPACE);
        self.ram[start..end].copy_from_slice(&data[..end - start]);
    }

    /// Side-effect-free read for debuggers and tests.
    pub fn peek(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write_ram(&mut self, addr: u16, data: u8) {
        let base = addr & RAM_MIRROR_MASK;
        for mirror in 0..4 {
            self.ram[(base + mirror * RAM_MIRROR_STRIDE) as usize] = data;
        }
    }

    fn oam_dma(&mut self, page: u8) {
        let start = page as usize * OAM_PAGE_SIZE;
        self.ppu.write_oam_dma(&self.ram[start..start + OAM_PAGE_SIZE]);
    }

    fn write_rom_window(&mut self, addr: u16, data: u8) {
        let consumed = {
            let mut banks = BankSwitch::new(&self.prg_rom, &self.chr_rom, &mut self.ram, &mut self.ppu.memory);
            self.mapper.cpu_write(addr, data, &mut banks)
        };
        if !consumed {
            self.ram[addr as usize] = data;
        }
    }
}

impl Mem for Bus {
    fn mem_read(&mut self, addr: u16) -> u8 {
        match addr {
            PPU_REGISTERS_START..=PPU_REGISTERS_END => self.ppu.read_register(PPU_REGISTERS_START | (addr & 0x0007)),
            JOYPAD_1 => self.joypad.read(),
            _ => self.ram[addr as usize],
        }
    }

    fn mem_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=RAM_END => self.write_ram(addr, data),
            PPU_REGISTERS_START..=PPU_REGISTERS_END => {
                self.ppu.write_register(PPU_REGISTERS_START | (addr & 0x0007), data)
            }
            OAM_DMA => self.oam_dma(data),
            JOYPAD_1 => self.joypad.write(data),
            ROM_WINDOW_START..=0xFFFF => self.write_rom_window(addr, data),
            _ => self.ram[addr as usize] = data,
        }
    }
}

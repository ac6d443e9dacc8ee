use crate::rom::Mirroring;

pub const PPU_MEMORY_SIZE: usize = 0x4000;
const PATTERN_TABLES_END: u16 = 0x1FFF;
const NAMETABLES_START: u16 = 0x2000;
const PALETTE_START: u16 = 0x3F00;
const NAMETABLE_SIZE: u16 = 0x400;

/// The 16KB PPU address space: pattern tables, nametables and palette RAM.
#[derive(Debug, Clone)]
pub struct PpuMemory {
    data: Box<[u8]>,
    mirroring: Mirroring,
    chr_ram: bool,
}

impl PpuMemory {
    pub fn new(mirroring: Mirroring) -> Self {
        PpuMemory {
            data: vec![0; PPU_MEMORY_SIZE].into_boxed_slice(),
            mirroring,
            chr_ram: false,
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    /// Makes pattern tables writable through `$2007`.
    pub fn set_chr_ram(&mut self, chr_ram: bool) {
        self.chr_ram = chr_ram;
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.data[self.fold(addr)]
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        let addr = addr & 0x3FFF;
        if addr <= PATTERN_TABLES_END && !self.chr_ram {
            return;
        }
        let idx = self.fold(addr);
        self.data[idx] = data;
    }

    /// Copies a CHR bank into the pattern tables, bypassing write protection.
    pub fn load_pattern(&mut self, offset: u16, bank: &[u8]) {
        let start = (offset & PATTERN_TABLES_END) as usize;
        let end = (start + bank.len()).min(PATTERN_TABLES_END as usize + 1);
        self.data[start..end].copy_from_slice(&bank[..end - start]);
    }

    /// Reads palette RAM entry `index` (0..32).
    pub fn palette(&self, index: u8) -> u8 {
        self.read(PALETTE_START + (index & 0x1F) as u16)
    }

    fn fold(&self, addr: u16) -> usize {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=PATTERN_TABLES_END => addr as usize,
            NAMETABLES_START..=0x3EFF => self.mirror_nametable_addr(NAMETABLES_START | (addr & 0x0FFF)),
            _ => self.mirror_palette_addr(addr),
        }
    }

    fn mirror_nametable_addr(&self, addr: u16) -> usize {
        let vram_index = addr - NAMETABLES_START;
        let table = vram_index / NAMETABLE_SIZE;
        let offset = vram_index % NAMETABLE_SIZE;

        let mapped_table = match self.mirroring {
            Mirroring::Vertical => table & 1,
            Mirroring::Horizontal => table >> 1,
            Mirroring::FourScreen => table,
            Mirroring::SingleScreen => 0,
        };

        (NAMETABLES_START + mapped_table * NAMETABLE_SIZE + offset) as usize
    }

    fn mirror_palette_addr(&self, addr: u16) -> usize {
        let mut idx = (addr - PALETTE_START) % 0x20;
        if matches!(idx, 0x10 | 0x14 | 0x18 | 0x1C) {
            idx -= 0x10;
        }
        (PALETTE_START + idx) as usize
    }
}

pub mod frame;
pub mod memory;
pub mod palette;
mod render;
pub mod scroll;

use crate::config::{Region, SCREEN_WIDTH};
use crate::rom::Mirroring;
use frame::FrameBuffer;
use memory::PpuMemory;
use scroll::ScrollRegisters;

pub const PPU_CTRL: u16 = 0x2000;
pub const PPU_MASK: u16 = 0x2001;
pub const PPU_STATUS: u16 = 0x2002;
pub const PPU_OAM_ADDR: u16 = 0x2003;
pub const PPU_OAM_DATA: u16 = 0x2004;
pub const PPU_SCROLL: u16 = 0x2005;
pub const PPU_ADDR: u16 = 0x2006;
pub const PPU_DATA: u16 = 0x2007;

pub const OAM_SIZE: usize = 256;
const BACKDROP_ADDR: u16 = 0x3F00;

bitflags! {
  pub struct PpuCtrl: u8 {
    const NAMETABLE_LO     = 0b0000_0001;
    const NAMETABLE_HI     = 0b0000_0010;
    const INCREMENT_32     = 0b0000_0100;
    const SPRITE_TABLE_HI  = 0b0000_1000;
    const BG_TABLE_HI      = 0b0001_0000;
    const SPRITE_8X16      = 0b0010_0000;
    const MASTER_SLAVE     = 0b0100_0000;
    const NMI_ON_VBLANK    = 0b1000_0000;
  }
}

bitflags! {
  pub struct PpuMask: u8 {
    const GRAYSCALE        = 0b0000_0001;
    const SHOW_BG_LEFT     = 0b0000_0010;
    const SHOW_SPRITE_LEFT = 0b0000_0100;
    const SHOW_BG          = 0b0000_1000;
    const SHOW_SPRITES     = 0b0001_0000;
    const EMPHASIZE_RED    = 0b0010_0000;
    const EMPHASIZE_GREEN  = 0b0100_0000;
    const EMPHASIZE_BLUE   = 0b1000_0000;
  }
}

bitflags! {
  pub struct PpuStatus: u8 {
    const SPRITE_OVERFLOW  = 0b0010_0000;
    const SPRITE_ZERO_HIT  = 0b0100_0000;
    const VBLANK           = 0b1000_0000;
  }
}

impl PpuCtrl {
    pub fn vram_increment(&self) -> u16 {
        if self.contains(PpuCtrl::INCREMENT_32) {
            32
        } else {
            1
        }
    }

    pub fn background_table(&self) -> u16 {
        if self.contains(PpuCtrl::BG_TABLE_HI) {
            0x1000
        } else {
            0
        }
    }

    pub fn sprite_table(&self) -> u16 {
        if self.contains(PpuCtrl::SPRITE_TABLE_HI) {
            0x1000
        } else {
            0
        }
    }

    pub fn sprite_height(&self) -> usize {
        if self.contains(PpuCtrl::SPRITE_8X16) {
            16
        } else {
            8
        }
    }
}

/// Register file, memories and scanline caches of the picture unit.
pub struct Ppu {
    pub ctrl: PpuCtrl,
    pub mask: PpuMask,
    pub status: PpuStatus,
    pub oam_addr: u8,
    pub oam: [u8; OAM_SIZE],
    pub scroll: ScrollRegisters,
    pub memory: PpuMemory,
    read_buffer: u8,
    /// Last byte written to any register; its low 5 bits fill `$2002` reads.
    last_write: u8,
    region: Region,
    frame: FrameBuffer,
    bg_cache: FrameBuffer,
    sprite_cache: FrameBuffer,
    sprite_zero_rows: Vec<bool>,
}

impl Ppu {
    pub fn new(region: Region, mirroring: Mirroring) -> Self {
        let height = region.visible_lines();
        Ppu {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            oam: [0; OAM_SIZE],
            scroll: ScrollRegisters::new(),
            memory: PpuMemory::new(mirroring),
            read_buffer: 0,
            last_write: 0,
            region,
            frame: FrameBuffer::new(SCREEN_WIDTH, height),
            bg_cache: FrameBuffer::new(SCREEN_WIDTH, height),
            sprite_cache: FrameBuffer::new(SCREEN_WIDTH, height),
            sprite_zero_rows: vec![false; height],
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Clears registers and latches; memory contents are kept.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.oam_addr = 0;
        self.scroll = ScrollRegisters::new();
        self.read_buffer = 0;
        self.last_write = 0;
    }

    pub fn read_register(&mut self, reg: u16) -> u8 {
        match reg {
            PPU_STATUS => {
                let snapshot = self.status.bits();
                self.status
                    .remove(PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT);
                self.scroll.reset_toggle();
                (snapshot & 0xE0) | (self.last_write & 0x1F)
            }
            PPU_OAM_DATA => self.oam[self.oam_addr as usize],
            PPU_DATA => self.read_ppu_data(),
            // write-only registers
            _ => 0,
        }
    }

    pub fn write_register(&mut self, reg: u16, data: u8) {
        self.last_write = data;
        match reg {
            PPU_CTRL => {
                self.ctrl = PpuCtrl::from_bits_truncate(data);
                self.scroll.write_ctrl(data);
            }
            PPU_MASK => self.mask = PpuMask::from_bits_truncate(data),
            PPU_STATUS => {}
            PPU_OAM_ADDR => self.oam_addr = data,
            PPU_OAM_DATA => {
                self.oam[self.oam_addr as usize] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            PPU_SCROLL => self.scroll.write_scroll(data),
            PPU_ADDR => self.scroll.write_addr(data),
            PPU_DATA => self.write_ppu_data(data),
            _ => {}
        }
    }

    /// Bulk OAM fill from a 256-byte CPU page.
    pub fn write_oam_dma(&mut self, page: &[u8]) {
        for (slot, &byte) in self.oam.iter_mut().zip(page.iter()) {
            *slot = byte;
        }
    }

    fn read_ppu_data(&mut self) -> u8 {
        let addr = self.scroll.v.raw() & 0x3FFF;
        let buffered = self.read_buffer;
        self.read_buffer = self.memory.read(addr);
        self.scroll.increment_vram(self.ctrl.vram_increment());
        buffered
    }

    fn write_ppu_data(&mut self, data: u8) {
        let addr = self.scroll.v.raw() & 0x3FFF;
        self.memory.write(addr, data);
        self.scroll.increment_vram(self.ctrl.vram_increment());
    }

    pub fn in_vblank(&self) -> bool {
        self.status.contains(PpuStatus::VBLANK)
    }

    pub fn sprite_zero_hit(&self) -> bool {
        self.status.contains(PpuStatus::SPRITE_ZERO_HIT)
    }

    /// Raises the vblank flag and reports whether an NMI should follow.
    pub fn set_vblank(&mut self) -> bool {
        self.status.insert(PpuStatus::VBLANK);
        self.ctrl.contains(PpuCtrl::NMI_ON_VBLANK)
    }

    pub fn end_vblank(&mut self) {
        self.status
            .remove(PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT);
    }

    /// Reloads `v` from `t` and paints the whole frame with the backdrop color.
    pub fn begin_frame(&mut self) {
        self.scroll.latch_frame();
        let backdrop = self.memory.read(BACKDROP_ADDR) & 0x3F;
        self.frame.fill(backdrop);
    }

    /// Draws a complete frame from current state without running the CPU.
    pub fn render_frame(&mut self) -> &FrameBuffer {
        self.begin_frame();
        for scanline in 0..self.frame.height() {
            self.render_background(scanline);
        }
        self.render_sprites();
        &self.frame
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_ppu() -> Ppu {
        Ppu::new(Region::Ntsc, Mirroring::Horizontal)
    }

    fn set_ppu_addr(ppu: &mut Ppu, addr: u16) {
        ppu.write_register(PPU_ADDR, (addr >> 8) as u8);
        ppu.write_register(PPU_ADDR, (addr & 0xFF) as u8);
    }

    #[test]
    fn test_ppuaddr_and_ppudata_round_trip() {
        let mut ppu = new_ppu();

        set_ppu_addr(&mut ppu, 0x2000);
        ppu.write_register(PPU_DATA, 0x12);

        set_ppu_addr(&mut ppu, 0x2000);
        assert_eq!(ppu.read_register(PPU_DATA), 0x00);
        assert_eq!(ppu.read_register(PPU_DATA), 0x12);
    }

    #[test]
    fn test_ppuctrl_bit2_changes_ppudata_increment() {
        let mut ppu = new_ppu();

        ppu.write_register(PPU_CTRL, 0x04);
        set_ppu_addr(&mut ppu, 0x2000);
        ppu.write_register(PPU_DATA, 0xAA);
        ppu.write_register(PPU_DATA, 0xBB);

        assert_eq!(ppu.memory.read(0x2000), 0xAA);
        assert_eq!(ppu.memory.read(0x2020), 0xBB);
        assert_eq!(ppu.memory.read(0x2001), 0x00);
        assert_eq!(ppu.scroll.v.raw(), 0x2040);
    }

    #[test]
    fn test_status_read_clears_flags_and_toggle() {
        let mut ppu = new_ppu();
        ppu.status = PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT;
        ppu.write_register(PPU_SCROLL, 0x01);
        assert!(ppu.scroll.write_toggle);

        let first = ppu.read_register(PPU_STATUS);
        assert_eq!(first & 0xC0, 0xC0);
        assert!(!ppu.in_vblank());
        assert!(!ppu.sprite_zero_hit());
        assert!(!ppu.scroll.write_toggle);

        let second = ppu.read_register(PPU_STATUS);
        assert_eq!(second & 0x80, 0x00);
    }

    #[test]
    fn test_status_low_bits_come_from_last_register_write() {
        let mut ppu = new_ppu();
        ppu.write_register(PPU_MASK, 0xFE);
        assert_eq!(ppu.read_register(PPU_STATUS), 0x1E);
    }

    #[test]
    fn test_status_read_resets_addr_phase() {
        let mut ppu = new_ppu();
        ppu.write_register(PPU_ADDR, 0x21);
        ppu.read_register(PPU_STATUS);
        set_ppu_addr(&mut ppu, 0x2345);
        assert_eq!(ppu.scroll.v.raw(), 0x2345);
    }

    #[test]
    fn test_oam_data_write_advances_address() {
        let mut ppu = new_ppu();
        ppu.write_register(PPU_OAM_ADDR, 0xFF);
        ppu.write_register(PPU_OAM_DATA, 0x11);
        ppu.write_register(PPU_OAM_DATA, 0x22);
        assert_eq!(ppu.oam[0xFF], 0x11);
        assert_eq!(ppu.oam[0x00], 0x22);

        ppu.write_register(PPU_OAM_ADDR, 0xFF);
        assert_eq!(ppu.read_register(PPU_OAM_DATA), 0x11);
    }

    #[test]
    fn test_palette_write_through_ppudata() {
        let mut ppu = new_ppu();

        set_ppu_addr(&mut ppu, 0x3F10);
        ppu.write_register(PPU_DATA, 0x27);

        set_ppu_addr(&mut ppu, 0x3F00);
        ppu.read_register(PPU_DATA);
        assert_eq!(ppu.read_register(PPU_DATA), 0x27);
    }

    #[test]
    fn test_set_vblank_reports_nmi_enable() {
        let mut ppu = new_ppu();
        assert!(!ppu.set_vblank());
        ppu.write_register(PPU_CTRL, 0x80);
        assert!(ppu.set_vblank());
        ppu.end_vblank();
        assert!(!ppu.in_vblank());
    }

    #[test]
    fn test_oam_dma_copies_page() {
        let mut ppu = new_ppu();
        let page: Vec<u8> = (0..=255).collect();
        ppu.write_oam_dma(&page);
        assert_eq!(ppu.oam[0], 0);
        assert_eq!(ppu.oam[255], 255);
    }
}

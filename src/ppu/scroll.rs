// Layout of the 15-bit `v`/`t` registers:
//  14 13 12 11 10 9 8 7 6 5 4 3 2 1 0
//  [fine_y][nt][coarse_y   ][coarse_x   ]
bitflags! {
  pub struct VramAddrMask: u16 {
    const COARSE_X     = 0x001F;
    const COARSE_Y     = 0x03E0;
    const NAMETABLE_X  = 0x0400;
    const NAMETABLE_Y  = 0x0800;
    const NAMETABLE    = 0x0C00;
    const FINE_Y       = 0x7000;
    const ALL          = 0x7FFF;
  }
}

const COARSE_Y_SHIFT: u16 = 5;
const NAMETABLE_SHIFT: u16 = 10;
const FINE_Y_SHIFT: u16 = 12;

/// Row 29 is the last visible tile row; rows 30 and 31 hold attributes.
const LAST_TILE_ROW: u8 = 29;
const LAST_COARSE_Y: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VramAddr(u16);

impl VramAddr {
    pub fn new(raw: u16) -> Self {
        VramAddr(raw & VramAddrMask::ALL.bits())
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn coarse_x(self) -> u8 {
        (self.0 & VramAddrMask::COARSE_X.bits()) as u8
    }

    pub fn set_coarse_x(&mut self, cx: u8) {
        self.0 = (self.0 & !VramAddrMask::COARSE_X.bits()) | (cx as u16 & 0x1F);
    }

    pub fn coarse_y(self) -> u8 {
        ((self.0 & VramAddrMask::COARSE_Y.bits()) >> COARSE_Y_SHIFT) as u8
    }

    pub fn set_coarse_y(&mut self, cy: u8) {
        self.0 = (self.0 & !VramAddrMask::COARSE_Y.bits()) | ((cy as u16 & 0x1F) << COARSE_Y_SHIFT);
    }

    pub fn nametable(self) -> u8 {
        ((self.0 & VramAddrMask::NAMETABLE.bits()) >> NAMETABLE_SHIFT) as u8
    }

    pub fn set_nametable(&mut self, nt: u8) {
        self.0 = (self.0 & !VramAddrMask::NAMETABLE.bits()) | ((nt as u16 & 0x03) << NAMETABLE_SHIFT);
    }

    pub fn fine_y(self) -> u8 {
        ((self.0 & VramAddrMask::FINE_Y.bits()) >> FINE_Y_SHIFT) as u8
    }

    pub fn set_fine_y(&mut self, fy: u8) {
        self.0 = (self.0 & !VramAddrMask::FINE_Y.bits()) | ((fy as u16 & 0x07) << FINE_Y_SHIFT);
    }

    /// Nametable byte for the tile under this address.
    pub fn tile_addr(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    /// Attribute byte covering the tile under this address.
    pub fn attribute_addr(self) -> u16 {
        0x23C0
            | (self.0 & VramAddrMask::NAMETABLE.bits())
            | (((self.coarse_y() >> 2) as u16) << 3)
            | (self.coarse_x() >> 2) as u16
    }

    /// Shift that selects this tile's 2-bit palette group out of its attribute byte.
    pub fn attribute_shift(self) -> u8 {
        ((self.coarse_y() & 0x02) << 1) | (self.coarse_x() & 0x02)
    }

    /// Next tile to the right, switching horizontal nametable at column 31.
    pub fn increment_coarse_x(&mut self) {
        if self.coarse_x() == 0x1F {
            self.set_coarse_x(0);
            self.0 ^= VramAddrMask::NAMETABLE_X.bits();
        } else {
            self.0 += 1;
        }
    }

    /// Next pixel row. Coarse Y toggles the vertical nametable when it
    /// leaves row 29, and wraps silently when it leaves row 31.
    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.set_fine_y(self.fine_y() + 1);
            return;
        }
        self.set_fine_y(0);
        match self.coarse_y() {
            LAST_TILE_ROW => {
                self.set_coarse_y(0);
                self.0 ^= VramAddrMask::NAMETABLE_Y.bits();
            }
            LAST_COARSE_Y => self.set_coarse_y(0),
            cy => self.set_coarse_y(cy + 1),
        }
    }
}

/// The loopy `t`/`v`/`x` registers plus the write toggle shared by `$2005` and `$2006`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollRegisters {
    pub v: VramAddr,
    pub t: VramAddr,
    pub fine_x: u8,
    pub write_toggle: bool,
}

impl ScrollRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_ctrl(&mut self, data: u8) {
        self.t.set_nametable(data & 0x03);
    }

    pub fn write_scroll(&mut self, data: u8) {
        if !self.write_toggle {
            self.t.set_coarse_x(data >> 3);
            self.fine_x = data & 0x07;
        } else {
            self.t.set_coarse_y(data >> 3);
            self.t.set_fine_y(data & 0x07);
        }
        self.write_toggle = !self.write_toggle;
    }

    pub fn write_addr(&mut self, data: u8) {
        if !self.write_toggle {
            self.t = VramAddr::new((self.t.raw() & 0x00FF) | (((data & 0x3F) as u16) << 8));
        } else {
            self.t = VramAddr::new((self.t.raw() & 0xFF00) | data as u16);
            self.v = self.t;
        }
        self.write_toggle = !self.write_toggle;
    }

    pub fn reset_toggle(&mut self) {
        self.write_toggle = false;
    }

    /// Scanline start: `v` takes coarse X and the horizontal nametable bit from `t`.
    pub fn latch_horizontal(&mut self) {
        let mask = VramAddrMask::COARSE_X.bits() | VramAddrMask::NAMETABLE_X.bits();
        self.v = VramAddr::new((self.v.raw() & !mask) | (self.t.raw() & mask));
    }

    /// Frame start: `v` takes all of `t`.
    pub fn latch_frame(&mut self) {
        self.v = self.t;
    }

    pub fn increment_vertical(&mut self) {
        self.v.increment_y();
    }

    /// Advance after a `$2007` access.
    pub fn increment_vram(&mut self, step: u16) {
        self.v = VramAddr::new(self.v.raw().wrapping_add(step));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scroll_writes_pack_into_t() {
        let mut scroll = ScrollRegisters::new();
        scroll.write_scroll(0b1010_1101);
        assert!(scroll.write_toggle);
        scroll.write_scroll(0b0110_0011);
        assert!(!scroll.write_toggle);

        assert_eq!(scroll.t.coarse_x(), 0b10101);
        assert_eq!(scroll.fine_x, 0b101);
        assert_eq!(scroll.t.coarse_y(), 0b01100);
        assert_eq!(scroll.t.fine_y(), 0b011);
        assert_eq!(scroll.t.raw(), (0b011 << 12) | (0b01100 << 5) | 0b10101);
        assert_eq!(scroll.v.raw(), 0);
    }

    #[test]
    fn test_ctrl_write_sets_nametable_bits_only() {
        let mut scroll = ScrollRegisters::new();
        scroll.t = VramAddr::new(0x7FFF);
        scroll.write_ctrl(0b1111_1100);
        assert_eq!(scroll.t.nametable(), 0);
        assert_eq!(scroll.t.raw(), 0x73FF);
    }

    #[test]
    fn test_addr_second_write_copies_t_to_v() {
        let mut scroll = ScrollRegisters::new();
        scroll.write_addr(0xFF);
        assert_eq!(scroll.t.raw(), 0x3F00);
        assert_eq!(scroll.v.raw(), 0);
        scroll.write_addr(0x10);
        assert_eq!(scroll.v.raw(), 0x3F10);
    }

    #[test]
    fn test_scroll_and_addr_share_toggle() {
        let mut scroll = ScrollRegisters::new();
        scroll.write_scroll(0x08);
        scroll.write_addr(0x21);
        assert!(!scroll.write_toggle);
        // second phase of $2006, so v was loaded
        assert_eq!(scroll.v, scroll.t);
    }

    #[test]
    fn test_latch_horizontal_copies_coarse_x_and_nametable_x() {
        let mut scroll = ScrollRegisters::new();
        scroll.t = VramAddr::new(0x0C1F);
        scroll.v = VramAddr::new(0x73E0);
        scroll.latch_horizontal();
        assert_eq!(scroll.v.raw(), 0x77FF);
    }

    #[test]
    fn test_vertical_increment_row_29_toggles_nametable() {
        let mut addr = VramAddr::new(0);
        addr.set_fine_y(7);
        addr.set_coarse_y(29);
        addr.increment_y();
        assert_eq!(addr.fine_y(), 0);
        assert_eq!(addr.coarse_y(), 0);
        assert_eq!(addr.nametable(), 0b10);
    }

    #[test]
    fn test_vertical_increment_row_31_wraps_without_toggle() {
        let mut addr = VramAddr::new(0);
        addr.set_fine_y(7);
        addr.set_coarse_y(31);
        addr.increment_y();
        assert_eq!(addr.coarse_y(), 0);
        assert_eq!(addr.nametable(), 0);
    }

    #[test]
    fn test_vertical_increment_carries_fine_y() {
        let mut addr = VramAddr::new(0);
        addr.set_fine_y(7);
        addr.set_coarse_y(4);
        addr.increment_y();
        assert_eq!(addr.coarse_y(), 5);
        assert_eq!(addr.fine_y(), 0);

        addr.increment_y();
        assert_eq!(addr.fine_y(), 1);
        assert_eq!(addr.coarse_y(), 5);
    }

    #[test]
    fn test_coarse_x_wrap_switches_nametable() {
        let mut addr = VramAddr::new(0);
        addr.set_coarse_x(31);
        addr.increment_coarse_x();
        assert_eq!(addr.coarse_x(), 0);
        assert_eq!(addr.nametable(), 0b01);
    }

    #[test]
    fn test_attribute_addressing() {
        let mut addr = VramAddr::new(0);
        addr.set_nametable(1);
        addr.set_coarse_x(6);
        addr.set_coarse_y(10);
        assert_eq!(addr.tile_addr(), 0x2400 + 10 * 32 + 6);
        assert_eq!(addr.attribute_addr(), 0x27C0 + 2 * 8 + 1);
        assert_eq!(addr.attribute_shift(), 6);
    }
}

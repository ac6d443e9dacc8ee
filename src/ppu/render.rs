use super::{Ppu, PpuMask, PpuStatus};

/// 32 visible tiles plus one for the partially scrolled column.
const TILES_PER_SCANLINE: usize = 33;
const SPRITE_COUNT: usize = 64;
const SPRITE_PALETTE_BASE: u8 = 0x10;

const ATTR_PALETTE_MASK: u8 = 0x03;
const ATTR_BEHIND_BACKGROUND: u8 = 0x20;
const ATTR_FLIP_HORIZONTAL: u8 = 0x40;
const ATTR_FLIP_VERTICAL: u8 = 0x80;

struct Sprite {
    y: usize,
    tile: u8,
    attributes: u8,
    x: usize,
}

impl Sprite {
    fn from_oam(oam: &[u8]) -> Self {
        Sprite {
            y: oam[0] as usize,
            tile: oam[1],
            attributes: oam[2],
            x: oam[3] as usize,
        }
    }

    fn palette_group(&self) -> u8 {
        self.attributes & ATTR_PALETTE_MASK
    }

    fn behind_background(&self) -> bool {
        self.attributes & ATTR_BEHIND_BACKGROUND != 0
    }

    fn flip_horizontal(&self) -> bool {
        self.attributes & ATTR_FLIP_HORIZONTAL != 0
    }

    fn flip_vertical(&self) -> bool {
        self.attributes & ATTR_FLIP_VERTICAL != 0
    }
}

fn pixel_at(lo: u8, hi: u8, bit: u8) -> u8 {
    ((lo >> bit) & 1) | (((hi >> bit) & 1) << 1)
}

impl Ppu {
    /// Draws one row of background tiles and advances `v` to the next row.
    pub fn render_background(&mut self, scanline: usize) {
        if scanline >= self.frame.height() {
            return;
        }
        if !self.mask.contains(PpuMask::SHOW_BG) || scanline < self.region.first_rendered_line() {
            self.bg_cache.clear_row(scanline);
            return;
        }

        self.scroll.latch_horizontal();

        let mut addr = self.scroll.v;
        let pattern_base = self.ctrl.background_table() + addr.fine_y() as u16;
        let fine_x = self.scroll.fine_x as usize;
        let width = self.frame.width();

        for tile in 0..TILES_PER_SCANLINE {
            let tile_index = self.memory.read(addr.tile_addr()) as u16;
            let pattern_addr = pattern_base + tile_index * 16;
            let lo = self.memory.read(pattern_addr);
            let hi = self.memory.read(pattern_addr + 8);
            let group = (self.memory.read(addr.attribute_addr()) >> addr.attribute_shift()) & 0x03;

            for column in 0..8 {
                let x = match (tile * 8 + column).checked_sub(fine_x) {
                    Some(x) if x < width => x,
                    _ => continue,
                };
                let pixel = pixel_at(lo, hi, 7 - column as u8);
                let value = if pixel == 0 { 0 } else { (group << 2) | pixel };
                let color = self.memory.palette(value) & 0x3F;
                self.frame.set(x, scanline, color);
                self.bg_cache.set(x, scanline, value);
            }

            addr.increment_coarse_x();
        }

        self.scroll.increment_vertical();
    }

    /// Draws all 64 sprites over the finished background, sprite 0 last.
    pub fn render_sprites(&mut self) {
        self.sprite_cache.fill(0);
        self.sprite_zero_rows.iter_mut().for_each(|row| *row = false);

        if !self.mask.contains(PpuMask::SHOW_SPRITES) {
            return;
        }

        for index in (0..SPRITE_COUNT).rev() {
            let sprite = Sprite::from_oam(&self.oam[index * 4..index * 4 + 4]);
            self.render_sprite(&sprite, index == 0);
        }
    }

    fn sprite_row_addr(&self, sprite: &Sprite, row: usize) -> u16 {
        if self.ctrl.sprite_height() == 16 {
            let table = (sprite.tile as u16 & 0x01) * 0x1000;
            let tile = (sprite.tile & 0xFE) as u16 + (row / 8) as u16;
            table + tile * 16 + (row % 8) as u16
        } else {
            self.ctrl.sprite_table() + sprite.tile as u16 * 16 + row as u16
        }
    }

    fn render_sprite(&mut self, sprite: &Sprite, sprite_zero: bool) {
        let height = self.ctrl.sprite_height();

        for row in 0..height {
            let y = sprite.y + row;
            if y >= self.frame.height() {
                break;
            }

            let fetch_row = if sprite.flip_vertical() { height - 1 - row } else { row };
            let addr = self.sprite_row_addr(sprite, fetch_row);
            let lo = self.memory.read(addr);
            let hi = self.memory.read(addr + 8);

            for column in 0..8u8 {
                let x = sprite.x + column as usize;
                if x >= self.frame.width() {
                    break;
                }

                let bit = if sprite.flip_horizontal() { column } else { 7 - column };
                let pixel = pixel_at(lo, hi, bit);
                if pixel == 0 {
                    continue;
                }
                let value = (sprite.palette_group() << 2) | pixel;

                if sprite_zero {
                    self.sprite_cache.set(x, y, value);
                    self.sprite_zero_rows[y] = true;
                }

                if sprite.behind_background() && self.bg_cache.get(x, y) != Some(0) {
                    continue;
                }

                let color = self.memory.palette(SPRITE_PALETTE_BASE | value) & 0x3F;
                self.frame.set(x, y, color);
            }
        }
    }

    /// Sets the hit flag if sprite 0 overlapped opaque background on the
    /// row before `scanline`.
    pub fn check_sprite_hit(&mut self, scanline: usize) {
        if scanline == 0 || scanline > self.frame.height() {
            return;
        }
        let row = scanline - 1;
        if !self.sprite_zero_rows[row] {
            return;
        }

        if let (Some(background), Some(sprite)) = (self.bg_cache.row(row), self.sprite_cache.row(row)) {
            let hit = background.iter().zip(sprite).any(|(&bg, &spr)| bg != 0 && spr != 0);
            if hit {
                self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
            }
        }
    }
}

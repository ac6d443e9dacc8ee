bitflags! {
  /// Button bits in the order the `$4016` sequencer reports them.
  #[derive(Default)]
  pub struct Buttons: u8 {
    const A      = 0b0000_0001;
    const B      = 0b0000_0010;
    const SELECT = 0b0000_0100;
    const START  = 0b0000_1000;
    const UP     = 0b0001_0000;
    const DOWN   = 0b0010_0000;
    const LEFT   = 0b0100_0000;
    const RIGHT  = 0b1000_0000;
  }
}

const READ_STEPS: u8 = 8;

/// Upper bits of `$4016` float high on the real console, so a pressed
/// button reads `0x41` and a released one `0x40`. Only bit 0 carries state.
const OPEN_BUS_BITS: u8 = 0x40;

/// Controller port 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joypad {
    buttons: Buttons,
    step: u8,
}

impl Joypad {
    pub fn new() -> Self {
        Joypad {
            buttons: Buttons::empty(),
            step: 0,
        }
    }

    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.buttons = buttons;
    }

    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    /// Index of the button the next read will report.
    pub fn step(&self) -> u8 {
        self.step
    }

    /// Any write to `$4016` rewinds the sequencer.
    pub fn write(&mut self, _data: u8) {
        self.step = 0;
    }

    pub fn read(&mut self) -> u8 {
        let pressed = (self.buttons.bits() >> self.step) & 0x01;
        self.step = (self.step + 1) % READ_STEPS;
        OPEN_BUS_BITS | pressed
    }

    pub fn reset(&mut self) {
        self.buttons = Buttons::empty();
        self.step = 0;
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate bitflags;

pub mod bus;
pub mod config;
pub mod cpu;
pub mod joypad;
pub mod mapper;
pub mod nes;
pub mod opcodes;
pub mod ppu;
pub mod rom;

pub use nes::{FramePresenter, HostInput, InputPoller, Nes};

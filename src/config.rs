//! Video standard selection and the per-frame CPU cycle budgets derived from it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const SCREEN_WIDTH: usize = 256;

const NTSC_CPU_CLOCK: i32 = 1_789_725;
const PAL_CPU_CLOCK: i32 = 1_773_447;

const NTSC_STARTUP_CYCLES: i32 = 325;
const PAL_STARTUP_CYCLES: i32 = 341;

/// Cycles run right after vblank starts, before the long vblank budget.
const POST_VBLANK_CYCLES: i32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    #[default]
    Ntsc,
    Pal,
}

impl Region {
    pub fn cpu_clock(self) -> i32 {
        match self {
            Region::Ntsc => NTSC_CPU_CLOCK,
            Region::Pal => PAL_CPU_CLOCK,
        }
    }

    pub fn frame_rate(self) -> i32 {
        match self {
            Region::Ntsc => 60,
            Region::Pal => 50,
        }
    }

    /// Scanlines per frame, vblank included.
    pub fn total_lines(self) -> i32 {
        match self {
            Region::Ntsc => 261,
            Region::Pal => 313,
        }
    }

    /// Height of the frame buffer handed to the presenter.
    pub fn visible_lines(self) -> usize {
        match self {
            Region::Ntsc => 224,
            Region::Pal => 240,
        }
    }

    /// NTSC never shows the top eight rows of the picture, so the
    /// background renderer leaves them untouched.
    pub fn first_rendered_line(self) -> usize {
        match self {
            Region::Ntsc => 8,
            Region::Pal => 0,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Region::Ntsc => "ntsc",
            Region::Pal => "pal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown region `{0}`, expected `ntsc` or `pal`")]
pub struct ParseRegionError(String);

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ntsc" => Ok(Region::Ntsc),
            "pal" => Ok(Region::Pal),
            _ => Err(ParseRegionError(s.to_string())),
        }
    }
}

/// CPU cycle budgets for each phase of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub startup_cycles: i32,
    pub post_vblank_cycles: i32,
    pub vblank_cycles: i32,
    pub scanline_cycles: i32,
    pub frame_cycles: i32,
}

impl Timing {
    pub fn for_region(region: Region) -> Self {
        let frame_cycles = region.cpu_clock() / region.frame_rate();
        let total_lines = region.total_lines();
        let hidden_lines = total_lines - region.visible_lines() as i32;

        let startup_cycles = match region {
            Region::Ntsc => NTSC_STARTUP_CYCLES,
            Region::Pal => PAL_STARTUP_CYCLES,
        };

        Timing {
            startup_cycles,
            post_vblank_cycles: POST_VBLANK_CYCLES,
            vblank_cycles: hidden_lines * frame_cycles / total_lines,
            scanline_cycles: frame_cycles / total_lines,
            frame_cycles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub region: Region,
    pub timing: Timing,
}

impl Config {
    pub fn new(region: Region) -> Self {
        Config {
            region,
            timing: Timing::for_region(region),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(Region::default())
    }
}

use tracing::{debug, info};

use crate::bus::Bus;
use crate::config::Config;
use crate::cpu::CPU;
use crate::joypad::Buttons;
use crate::mapper::Mapper;
use crate::ppu::frame::FrameBuffer;
use crate::ppu::Ppu;
use crate::rom::Rom;

/// Controller and window state sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostInput {
    pub buttons: Buttons,
    pub pause: bool,
    pub quit: bool,
}

pub trait FramePresenter {
    fn present(&mut self, frame: &FrameBuffer);
}

pub trait InputPoller {
    fn poll(&mut self) -> HostInput;
}

/// A whole console: CPU with its bus, plus the frame loop around it.
pub struct Nes {
    pub cpu: CPU,
    config: Config,
    running: bool,
    paused: bool,
    frame_count: u64,
}

impl Nes {
    pub fn new(config: Config) -> Self {
        Nes {
            cpu: CPU::new(Bus::new(config.region)),
            config,
            running: true,
            paused: false,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Inserts a cartridge using the fixed mapping, then resets.
    pub fn load_rom(&mut self, rom: Rom) {
        self.load_rom_with_mapper(rom, None);
    }

    pub fn load_rom_with_mapper(&mut self, rom: Rom, mapper: Option<Box<dyn Mapper>>) {
        self.cpu.bus.load_rom(rom, mapper);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.cpu.bus.ppu.reset();
        self.cpu.bus.joypad.reset();
        self.cpu.reset();
        self.frame_count = 0;
        info!(pc = format_args!("{:04X}", self.cpu.program_counter), "reset");
    }

    pub fn ppu(&self) -> &Ppu {
        &self.cpu.bus.ppu
    }

    pub fn frame(&self) -> &FrameBuffer {
        self.cpu.bus.ppu.frame()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.cpu.bus.joypad.set_buttons(buttons);
    }

    /// Emulates one frame: vblank and NMI, then every visible scanline
    /// interleaved with CPU time, then sprites on top.
    pub fn step_frame(&mut self) {
        let timing = self.config.timing;

        self.cpu.execute(timing.startup_cycles);

        if self.cpu.bus.ppu.set_vblank() {
            self.cpu.trigger_nmi();
        }

        self.cpu.execute(timing.post_vblank_cycles);
        self.cpu.execute(timing.vblank_cycles);

        self.cpu.bus.ppu.end_vblank();
        self.cpu.bus.ppu.begin_frame();

        let height = self.cpu.bus.ppu.frame().height();
        for scanline in 0..height {
            if !self.cpu.bus.ppu.sprite_zero_hit() {
                self.cpu.bus.ppu.check_sprite_hit(scanline);
            }
            self.cpu.bus.ppu.render_background(scanline);

            self.cpu.execute(timing.scanline_cycles);

            if self.cpu.bus.tick_scanline_irq(scanline) && self.cpu.trigger_irq() {
                debug!(scanline, "mapper irq");
            }
        }

        self.cpu.bus.ppu.render_sprites();
        self.frame_count += 1;
    }

    /// One frame of emulation followed by presenting it and sampling input.
    pub fn run_frame<P, I>(&mut self, presenter: &mut P, input: &mut I)
    where
        P: FramePresenter + ?Sized,
        I: InputPoller + ?Sized,
    {
        self.step_frame();
        presenter.present(self.cpu.bus.ppu.frame());
        let host = input.poll();
        self.apply_input(host);
    }

    /// Runs until `stop` is called or the poller asks to quit. While paused
    /// the last frame is presented again instead of emulating a new one.
    pub fn run<P, I>(&mut self, presenter: &mut P, input: &mut I)
    where
        P: FramePresenter + ?Sized,
        I: InputPoller + ?Sized,
    {
        self.running = true;
        while self.running {
            if self.paused {
                // keep the window alive and let the presenter pace the loop
                presenter.present(self.cpu.bus.ppu.frame());
                let host = input.poll();
                self.apply_input(host);
            } else {
                self.run_frame(presenter, input);
            }
        }
        info!(frames = self.frame_count, "stopped");
    }

    fn apply_input(&mut self, host: HostInput) {
        self.cpu.bus.joypad.set_buttons(host.buttons);
        if host.pause {
            self.paused = !self.paused;
            info!(paused = self.paused, "pause toggled");
        }
        if host.quit {
            self.running = false;
        }
    }
}

impl Default for Nes {
    fn default() -> Self {
        Nes::new(Config::default())
    }
}

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use clap::Parser;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture};
use sdl2::video::Window;
use sdl2::EventPump;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use scanes::config::{Config, Region, SCREEN_WIDTH};
use scanes::joypad::Buttons;
use scanes::ppu::frame::FrameBuffer;
use scanes::rom::Rom;
use scanes::{FramePresenter, HostInput, InputPoller, Nes};

/// NES emulator with an SDL2 window
#[derive(Parser, Debug)]
#[command(name = "scanes-sdl")]
struct Args {
    /// iNES ROM image
    rom: PathBuf,

    /// Video standard (ntsc, pal)
    #[arg(long, default_value = "ntsc")]
    region: Region,

    /// Integer window scale
    #[arg(short, long, default_value_t = 2)]
    scale: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

struct SdlPresenter<'a> {
    canvas: Canvas<Window>,
    texture: Texture<'a>,
    frame_time: Duration,
    last_frame: Instant,
}

impl FramePresenter for SdlPresenter<'_> {
    fn present(&mut self, frame: &FrameBuffer) {
        let pixels = frame.to_rgb15();
        let width = frame.width();
        let upload = self.texture.with_lock(None, |buffer, pitch| {
            for (y, row) in pixels.chunks(width).enumerate() {
                let dst = &mut buffer[y * pitch..y * pitch + width * 2];
                for (x, color) in row.iter().enumerate() {
                    dst[x * 2..x * 2 + 2].copy_from_slice(&color.to_le_bytes());
                }
            }
        });
        if let Err(e) = upload {
            error!("uploading frame to texture: {e}");
            return;
        }

        self.canvas.clear();
        if let Err(e) = self.canvas.copy(&self.texture, None, None) {
            error!("copying texture to canvas: {e}");
            return;
        }
        self.canvas.present();

        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_time {
            thread::sleep(self.frame_time - elapsed);
        }
        self.last_frame = Instant::now();
    }
}

struct SdlInput {
    event_pump: EventPump,
    buttons: Buttons,
}

impl InputPoller for SdlInput {
    fn poll(&mut self) -> HostInput {
        let mut input = HostInput::default();
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => input.quit = true,
                Event::KeyDown {
                    keycode: Some(Keycode::P),
                    repeat: false,
                    ..
                } => input.pause = !input.pause,
                Event::KeyDown {
                    keycode: Some(key), ..
                } => {
                    if let Some(button) = map_key_to_button(key) {
                        self.buttons.insert(button);
                    }
                }
                Event::KeyUp {
                    keycode: Some(key), ..
                } => {
                    if let Some(button) = map_key_to_button(key) {
                        self.buttons.remove(button);
                    }
                }
                _ => {}
            }
        }
        input.buttons = self.buttons;
        input
    }
}

fn map_key_to_button(key: Keycode) -> Option<Buttons> {
    match key {
        Keycode::Z => Some(Buttons::A),
        Keycode::X => Some(Buttons::B),
        Keycode::Return => Some(Buttons::START),
        Keycode::RShift => Some(Buttons::SELECT),
        Keycode::Up => Some(Buttons::UP),
        Keycode::Down => Some(Buttons::DOWN),
        Keycode::Left => Some(Buttons::LEFT),
        Keycode::Right => Some(Buttons::RIGHT),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let rom = Rom::from_file(&args.rom).with_context(|| format!("loading {}", args.rom.display()))?;
    let config = Config::new(args.region);
    let mut nes = Nes::new(config);
    nes.load_rom(rom);

    let width = SCREEN_WIDTH as u32;
    let height = args.region.visible_lines() as u32;

    let sdl = sdl2::init().map_err(|e| anyhow!("initializing SDL2: {e}"))?;
    let video = sdl
        .video()
        .map_err(|e| anyhow!("initializing video subsystem: {e}"))?;
    let window = video
        .window("scanes", width * args.scale, height * args.scale)
        .position_centered()
        .build()
        .context("creating SDL2 window")?;

    let canvas = window
        .into_canvas()
        .build()
        .context("creating renderer")?;
    let texture_creator = canvas.texture_creator();
    let texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::RGB555, width, height)
        .context("allocating texture")?;
    let event_pump = sdl
        .event_pump()
        .map_err(|e| anyhow!("creating event pump: {e}"))?;

    let mut presenter = SdlPresenter {
        canvas,
        texture,
        frame_time: Duration::from_secs(1) / args.region.frame_rate() as u32,
        last_frame: Instant::now(),
    };
    let mut input = SdlInput {
        event_pump,
        buttons: Buttons::empty(),
    };

    info!(region = %args.region, "starting");
    nes.run(&mut presenter, &mut input);

    Ok(())
}

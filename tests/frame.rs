use scanes::config::{Config, Region};
use scanes::joypad::Buttons;
use scanes::mapper::{BankSwitch, Mapper, ScanlineIrq};
use scanes::ppu::{PpuMask, PpuStatus};
use scanes::rom::{Rom, CHR_ROM_PAGE_SIZE, PRG_ROM_PAGE_SIZE};
use scanes::Nes;

const NMI_HANDLER: u16 = 0x8010;
const IRQ_HANDLER: u16 = 0x8020;
const SOLID_TILE: usize = 1;

/// Builds a one-bank iNES image with `code` placed at the given CPU addresses.
fn ines_image(code: &[(u16, &[u8])]) -> Vec<u8> {
    let mut prg = vec![0xEA; PRG_ROM_PAGE_SIZE];
    for (addr, bytes) in code {
        let offset = (*addr as usize - 0x8000) % PRG_ROM_PAGE_SIZE;
        prg[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
    // NMI, reset, IRQ/BRK
    prg[0x3FFA..].copy_from_slice(&[0x10, 0x80, 0x00, 0x80, 0x20, 0x80]);

    let mut chr = vec![0u8; CHR_ROM_PAGE_SIZE];
    chr[SOLID_TILE * 16..SOLID_TILE * 16 + 16].copy_from_slice(&[0xFF; 16]);

    let mut image = vec![b'N', b'E', b'S', 0x1A, 1, 1, 0, 0];
    image.resize(16, 0);
    image.extend(prg);
    image.extend(chr);
    image
}

fn nmi_counter_rom() -> Rom {
    let main: &[u8] = &[
        0xA9, 0x80, // LDA #$80
        0x8D, 0x00, 0x20, // STA $2000
        0x4C, 0x05, 0x80, // JMP $8005
    ];
    let handler: &[u8] = &[
        0xE6, 0x10, // INC $10
        0x40, // RTI
    ];
    Rom::from_bytes(&ines_image(&[(0x8000, main), (NMI_HANDLER, handler)])).unwrap()
}

fn nes_with(rom: Rom) -> Nes {
    let mut nes = Nes::new(Config::new(Region::Ntsc));
    nes.load_rom(rom);
    nes
}

#[test]
fn test_nmi_fires_once_per_frame() {
    let mut nes = nes_with(nmi_counter_rom());

    for _ in 0..5 {
        nes.step_frame();
    }

    assert_eq!(nes.cpu.bus.peek(0x10), 5);
    assert_eq!(nes.frame_count(), 5);
}

#[test]
fn test_no_nmi_without_ctrl_bit() {
    let main: &[u8] = &[0x4C, 0x00, 0x80];
    let handler: &[u8] = &[0xE6, 0x10, 0x40];
    let rom = Rom::from_bytes(&ines_image(&[(0x8000, main), (NMI_HANDLER, handler)])).unwrap();
    let mut nes = nes_with(rom);

    nes.step_frame();
    nes.step_frame();

    assert_eq!(nes.cpu.bus.peek(0x10), 0);
}

#[test]
fn test_pal_frames_are_taller() {
    let mut nes = Nes::new(Config::new(Region::Pal));
    nes.load_rom(nmi_counter_rom());
    nes.step_frame();

    assert_eq!(nes.frame().height(), 240);
    assert_eq!(nes.cpu.bus.peek(0x10), 1);
}

fn prepare_sprite_zero_scene(nes: &mut Nes) {
    let ppu = &mut nes.cpu.bus.ppu;
    for offset in 0..0x3C0u16 {
        ppu.memory.write(0x2000 + offset, SOLID_TILE as u8);
    }
    ppu.memory.write(0x3F00, 0x0F);
    ppu.memory.write(0x3F03, 0x21);
    ppu.memory.write(0x3F13, 0x16);
    ppu.oam[0..4].copy_from_slice(&[100, SOLID_TILE as u8, 0x00, 50]);
    ppu.mask = PpuMask::SHOW_BG | PpuMask::SHOW_SPRITES;
}

#[test]
fn test_sprite_zero_hit_needs_previous_sprite_pass() {
    let mut nes = nes_with(nmi_counter_rom());
    prepare_sprite_zero_scene(&mut nes);

    // sprites are composited after the last scanline, so the first frame cannot hit
    nes.step_frame();
    assert!(!nes.ppu().status.contains(PpuStatus::SPRITE_ZERO_HIT));

    nes.step_frame();
    assert!(nes.ppu().status.contains(PpuStatus::SPRITE_ZERO_HIT));

    // sprite pixels land on top of the background
    assert_eq!(nes.frame().get(50, 100), Some(0x16));
    assert_eq!(nes.frame().get(49, 100), Some(0x21));
}

#[test]
fn test_hidden_background_prevents_sprite_zero_hit() {
    let mut nes = nes_with(nmi_counter_rom());
    prepare_sprite_zero_scene(&mut nes);
    nes.cpu.bus.ppu.mask = PpuMask::SHOW_SPRITES;

    nes.step_frame();
    nes.step_frame();

    assert!(!nes.ppu().status.contains(PpuStatus::SPRITE_ZERO_HIT));
    assert_eq!(nes.frame().get(49, 100), Some(0x0F));
}

#[test]
fn test_render_frame_is_idempotent() {
    let mut nes = nes_with(nmi_counter_rom());
    prepare_sprite_zero_scene(&mut nes);
    nes.step_frame();

    let first = nes.cpu.bus.ppu.render_frame().clone();
    let second = nes.cpu.bus.ppu.render_frame().clone();

    assert_eq!(first, second);
    assert_eq!(first.to_rgb15(), second.to_rgb15());
}

#[test]
fn test_program_reads_joypad_sequence() {
    let main: &[u8] = &[
        0xA9, 0x01, // LDA #$01
        0x8D, 0x16, 0x40, // STA $4016
        0xA9, 0x00, // LDA #$00
        0x8D, 0x16, 0x40, // STA $4016
        0xA2, 0x00, // LDX #$00
        0xAD, 0x16, 0x40, // loop: LDA $4016
        0x29, 0x01, // AND #$01
        0x95, 0x20, // STA $20,X
        0xE8, // INX
        0xE0, 0x08, // CPX #$08
        0xD0, 0xF4, // BNE loop
        0x4C, 0x18, 0x80, // JMP $8018
    ];
    let rom = Rom::from_bytes(&ines_image(&[(0x8000, main)])).unwrap();
    let mut nes = nes_with(rom);
    nes.set_buttons(Buttons::A | Buttons::START);

    nes.step_frame();

    let bits: Vec<u8> = (0x20..0x28).map(|addr| nes.cpu.bus.peek(addr)).collect();
    assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 0]);
}

struct ScanlineCounterMapper {
    irq: ScanlineIrq,
}

impl Mapper for ScanlineCounterMapper {
    fn id(&self) -> u8 {
        4
    }

    fn cpu_write(&mut self, addr: u16, _data: u8, _banks: &mut BankSwitch<'_>) -> bool {
        addr >= 0x8000
    }

    fn scanline_irq(&mut self) -> Option<&mut ScanlineIrq> {
        Some(&mut self.irq)
    }
}

fn nes_with_irq_counter(main: &[u8]) -> Nes {
    let handler: &[u8] = &[
        0xE6, 0x11, // INC $11
        0x40, // RTI
    ];
    let rom = Rom::from_bytes(&ines_image(&[(0x8000, main), (IRQ_HANDLER, handler)])).unwrap();
    let mapper = ScanlineCounterMapper {
        irq: ScanlineIrq {
            enabled: true,
            counter: 40,
        },
    };
    let mut nes = Nes::new(Config::new(Region::Ntsc));
    nes.load_rom_with_mapper(rom, Some(Box::new(mapper)));
    nes
}

fn irq_counter(nes: &mut Nes) -> u16 {
    nes.cpu.bus.scanline_irq().map(|irq| irq.counter).unwrap()
}

#[test]
fn test_mapper_irq_fires_once_per_frame() {
    let main: &[u8] = &[
        0x58, // CLI
        0x4C, 0x01, 0x80, // JMP $8001
    ];
    let mut nes = nes_with_irq_counter(main);
    assert_eq!(nes.cpu.bus.mapper_id(), 4);

    nes.step_frame();
    assert_eq!(nes.cpu.bus.peek(0x11), 1);
    assert_eq!(irq_counter(&mut nes), 39);

    nes.step_frame();
    nes.step_frame();
    assert_eq!(nes.cpu.bus.peek(0x11), 3);
    assert_eq!(irq_counter(&mut nes), 37);
}

#[test]
fn test_mapper_irq_is_masked_by_interrupt_disable() {
    let main: &[u8] = &[
        0x78, // SEI
        0x4C, 0x01, 0x80, // JMP $8001
    ];
    let mut nes = nes_with_irq_counter(main);

    nes.step_frame();
    nes.step_frame();

    assert_eq!(nes.cpu.bus.peek(0x11), 0);
    // the counter still runs while the CPU ignores it
    assert_eq!(irq_counter(&mut nes), 38);
}

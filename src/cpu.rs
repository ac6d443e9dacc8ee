use tracing::{debug, trace, Level};

use crate::bus::Bus;
use crate::opcodes::{self, Instruction, OpCode};

bitflags! {
  pub struct CpuFlags: u8 {
    const CARRY             = 0b00000001;
    const ZERO              = 0b00000010;
    const INTERRUPT_DISABLE = 0b00000100;
    const DECIMAL_MODE      = 0b00001000;
    const BREAK             = 0b00010000;
    const BREAK2            = 0b00100000;
    const OVERFLOW          = 0b01000000;
    const NEGATIV           = 0b10000000;
  }
}

const STACK: u16 = 0x0100;
const STACK_RESET: u8 = 0xff;
const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_BRK_VECTOR: u16 = 0xFFFE;

const INTERRUPT_CYCLES: u8 = 7;
/// An unofficial opcode burns only its fetch.
const UNKNOWN_OPCODE_CYCLES: u8 = 1;

pub struct CPU {
    pub register_a: u8,
    pub register_x: u8,
    pub register_y: u8,
    pub status: CpuFlags,
    pub program_counter: u16,
    pub stack_pointer: u8,
    cycles: u64,
    pub bus: Bus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceState {
    pub pc: u16,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub register_a: u8,
    pub register_x: u8,
    pub register_y: u8,
    pub status: u8,
    pub stack_pointer: u8,
}

impl TraceState {
    pub fn to_log_line(&self) -> String {
        format!(
            "PC:{:04X} OPC:{:02X} {:<3} A:{:02X} X:{:02X} Y:{:02X} P:{:08b} SP:{:02X}",
            self.pc,
            self.opcode,
            self.mnemonic,
            self.register_a,
            self.register_x,
            self.register_y,
            self.status,
            self.stack_pointer
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum AddressingMode {
    Immediate,
    ZeroPage,
    ZeroPage_X,
    ZeroPage_Y,
    Absolute,
    Absolute_X,
    Absolute_Y,
    Indirect_X,
    Indirect_Y,
    NoneAddressing,
}

/// Byte-addressed memory. Reads take `&mut self` because device
/// registers change state when read.
pub trait Mem {
    fn mem_read(&mut self, addr: u16) -> u8;

    fn mem_write(&mut self, addr: u16, data: u8);

    fn mem_read_u16(&mut self, pos: u16) -> u16 {
        let lo = self.mem_read(pos) as u16;
        let hi = self.mem_read(pos.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn mem_write_u16(&mut self, pos: u16, data: u16) {
        let hi = (data >> 8) as u8;
        let lo = (data & 0xff) as u8;
        self.mem_write(pos, lo);
        self.mem_write(pos.wrapping_add(1), hi);
    }
}

impl Mem for CPU {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.bus.mem_read(addr)
    }

    fn mem_write(&mut self, addr: u16, data: u8) {
        self.bus.mem_write(addr, data)
    }
}

impl CPU {
    pub fn new(bus: Bus) -> Self {
        CPU {
            register_a: 0,
            register_x: 0,
            register_y: 0,
            status: CpuFlags::BREAK2 | CpuFlags::ZERO,
            program_counter: 0,
            stack_pointer: STACK_RESET,
            cycles: 0,
            bus,
        }
    }

    fn get_operand_address(&mut self, mode: &AddressingMode) -> u16 {
        match mode {
            AddressingMode::Immediate => self.program_counter,
            AddressingMode::ZeroPage => self.mem_read(self.program_counter) as u16,
            AddressingMode::Absolute => self.mem_read_u16(self.program_counter),
            AddressingMode::ZeroPage_X => {
                let pos = self.mem_read(self.program_counter);

                pos.wrapping_add(self.register_x) as u16
            }
            AddressingMode::ZeroPage_Y => {
                let pos = self.mem_read(self.program_counter);

                pos.wrapping_add(self.register_y) as u16
            }
            AddressingMode::Absolute_X => {
                let base = self.mem_read_u16(self.program_counter);

                base.wrapping_add(self.register_x as u16)
            }
            AddressingMode::Absolute_Y => {
                let base = self.mem_read_u16(self.program_counter);

                base.wrapping_add(self.register_y as u16)
            }
            AddressingMode::Indirect_X => {
                let base = self.mem_read(self.program_counter);

                let ptr: u8 = base.wrapping_add(self.register_x);
                let lo = self.mem_read(ptr as u16);
                let hi = self.mem_read(ptr.wrapping_add(1) as u16);
                (hi as u16) << 8 | (lo as u16)
            }
            AddressingMode::Indirect_Y => {
                let base = self.mem_read(self.program_counter);

                let lo = self.mem_read(base as u16);
                let hi = self.mem_read(base.wrapping_add(1) as u16);
                let deref_base = (hi as u16) << 8 | (lo as u16);

                deref_base.wrapping_add(self.register_y as u16)
            }
            // implied operands never reach memory
            AddressingMode::NoneAddressing => self.program_counter,
        }
    }

    fn read_operand(&mut self, mode: &AddressingMode) -> u8 {
        let addr = self.get_operand_address(mode);
        self.mem_read(addr)
    }

    fn lda(&mut self, mode: &AddressingMode) {
        let value = self.read_operand(mode);
        self.set_register_a(value);
    }

    fn ldx(&mut self, mode: &AddressingMode) {
        let data = self.read_operand(mode);
        self.register_x = data;
        self.update_zero_and_negative_flags(self.register_x);
    }

    fn ldy(&mut self, mode: &AddressingMode) {
        let data = self.read_operand(mode);
        self.register_y = data;
        self.update_zero_and_negative_flags(self.register_y);
    }

    fn store(&mut self, mode: &AddressingMode, data: u8) {
        let addr = self.get_operand_address(mode);
        self.mem_write(addr, data);
    }

    fn and(&mut self, mode: &AddressingMode) {
        let data = self.read_operand(mode);
        self.set_register_a(data & self.register_a);
    }

    fn eor(&mut self, mode: &AddressingMode) {
        let data = self.read_operand(mode);
        self.set_register_a(data ^ self.register_a);
    }

    fn ora(&mut self, mode: &AddressingMode) {
        let data = self.read_operand(mode);
        self.set_register_a(data | self.register_a);
    }

    fn sbc(&mut self, mode: &AddressingMode) {
        let data = self.read_operand(mode);
        self.add_to_register_a(!data);
    }

    fn adc(&mut self, mode: &AddressingMode) {
        let value = self.read_operand(mode);
        self.add_to_register_a(value);
    }

    fn asl_accumulator(&mut self) {
        let data = self.register_a;
        self.status.set(CpuFlags::CARRY, data >> 7 == 1);
        self.set_register_a(data << 1);
    }

    fn asl(&mut self, mode: &AddressingMode) -> u8 {
        let addr = self.get_operand_address(mode);
        let mut data = self.mem_read(addr);
        self.status.set(CpuFlags::CARRY, data >> 7 == 1);
        data <<= 1;
        self.mem_write(addr, data);
        self.update_zero_and_negative_flags(data);
        data
    }

    fn lsr_accumulator(&mut self) {
        let data = self.register_a;
        self.status.set(CpuFlags::CARRY, data & 1 == 1);
        self.set_register_a(data >> 1);
    }

    fn lsr(&mut self, mode: &AddressingMode) -> u8 {
        let addr = self.get_operand_address(mode);
        let mut data = self.mem_read(addr);
        self.status.set(CpuFlags::CARRY, data & 1 == 1);
        data >>= 1;
        self.mem_write(addr, data);
        self.update_zero_and_negative_flags(data);
        data
    }

    fn rotate_left(&mut self, data: u8) -> u8 {
        let old_carry = self.status.contains(CpuFlags::CARRY);
        self.status.set(CpuFlags::CARRY, data >> 7 == 1);
        (data << 1) | old_carry as u8
    }

    fn rotate_right(&mut self, data: u8) -> u8 {
        let old_carry = self.status.contains(CpuFlags::CARRY);
        self.status.set(CpuFlags::CARRY, data & 1 == 1);
        (data >> 1) | ((old_carry as u8) << 7)
    }

    fn rol(&mut self, mode: &AddressingMode) -> u8 {
        let addr = self.get_operand_address(mode);
        let data = self.mem_read(addr);
        let data = self.rotate_left(data);
        self.mem_write(addr, data);
        self.update_zero_and_negative_flags(data);
        data
    }

    fn rol_accumulator(&mut self) {
        let data = self.rotate_left(self.register_a);
        self.set_register_a(data);
    }

    fn ror(&mut self, mode: &AddressingMode) -> u8 {
        let addr = self.get_operand_address(mode);
        let data = self.mem_read(addr);
        let data = self.rotate_right(data);
        self.mem_write(addr, data);
        self.update_zero_and_negative_flags(data);
        data
    }

    fn ror_accumulator(&mut self) {
        let data = self.rotate_right(self.register_a);
        self.set_register_a(data);
    }

    fn inc(&mut self, mode: &AddressingMode) -> u8 {
        let addr = self.get_operand_address(mode);
        let data = self.mem_read(addr).wrapping_add(1);
        self.mem_write(addr, data);
        self.update_zero_and_negative_flags(data);
        data
    }

    fn dec(&mut self, mode: &AddressingMode) -> u8 {
        let addr = self.get_operand_address(mode);
        let data = self.mem_read(addr).wrapping_sub(1);
        self.mem_write(addr, data);
        self.update_zero_and_negative_flags(data);
        data
    }

    fn branch(&mut self, condition: bool) {
        let jump = self.mem_read(self.program_counter) as i8;
        self.program_counter = self.program_counter.wrapping_add(1);
        if condition {
            self.program_counter = self.program_counter.wrapping_add(jump as u16);
        }
    }

    fn set_register_a(&mut self, value: u8) {
        self.register_a = value;
        self.update_zero_and_negative_flags(self.register_a);
    }

    fn add_to_register_a(&mut self, data: u8) {
        let sum = self.register_a as u16 + data as u16 + self.status.contains(CpuFlags::CARRY) as u16;

        self.status.set(CpuFlags::CARRY, sum > 0xff);

        let result = sum as u8;
        self.status.set(
            CpuFlags::OVERFLOW,
            (data ^ result) & (result ^ self.register_a) & 0x80 != 0,
        );

        self.set_register_a(result);
    }

    fn update_zero_and_negative_flags(&mut self, result: u8) {
        self.status.set(CpuFlags::ZERO, result == 0);
        self.status.set(CpuFlags::NEGATIV, result & 0b1000_0000 != 0);
    }

    fn stack_push(&mut self, data: u8) {
        self.mem_write(STACK + self.stack_pointer as u16, data);
        self.stack_pointer = self.stack_pointer.wrapping_sub(1);
    }

    fn stack_pop(&mut self) -> u8 {
        self.stack_pointer = self.stack_pointer.wrapping_add(1);
        self.mem_read(STACK + self.stack_pointer as u16)
    }

    fn stack_push_u16(&mut self, data: u16) {
        let hi = (data >> 8) as u8;
        let lo = (data & 0xff) as u8;
        self.stack_push(hi);
        self.stack_push(lo);
    }

    fn stack_pop_u16(&mut self) -> u16 {
        let lo = self.stack_pop() as u16;
        let hi = self.stack_pop() as u16;

        hi << 8 | lo
    }

    fn bit(&mut self, mode: &AddressingMode) {
        let data = self.read_operand(mode);
        self.status.set(CpuFlags::ZERO, self.register_a & data == 0);
        self.status.set(CpuFlags::NEGATIV, data & 0b1000_0000 != 0);
        self.status.set(CpuFlags::OVERFLOW, data & 0b0100_0000 != 0);
    }

    fn pull_status(&mut self) {
        self.status = CpuFlags::from_bits_truncate(self.stack_pop());
        self.status.remove(CpuFlags::BREAK);
        self.status.insert(CpuFlags::BREAK2);
    }

    fn php(&mut self) {
        let flags = self.status | CpuFlags::BREAK | CpuFlags::BREAK2;
        self.stack_push(flags.bits());
    }

    fn compare(&mut self, mode: &AddressingMode, compare_with: u8) {
        let data = self.read_operand(mode);
        self.status.set(CpuFlags::CARRY, data <= compare_with);
        self.update_zero_and_negative_flags(compare_with.wrapping_sub(data));
    }

    fn jmp_indirect(&mut self) {
        let mem_address = self.mem_read_u16(self.program_counter);

        // the pointer's high byte never crosses a page
        let indirect_ref = if mem_address & 0x00FF == 0x00FF {
            let lo = self.mem_read(mem_address);
            let hi = self.mem_read(mem_address & 0xFF00);
            (hi as u16) << 8 | (lo as u16)
        } else {
            self.mem_read_u16(mem_address)
        };

        self.program_counter = indirect_ref;
    }

    /// Power-on/reset state: only Z and the unused bit set, SP at the top of the page.
    pub fn reset(&mut self) {
        self.register_a = 0;
        self.register_x = 0;
        self.register_y = 0;
        self.stack_pointer = STACK_RESET;
        self.status = CpuFlags::BREAK2 | CpuFlags::ZERO;
        self.cycles = 0;

        self.program_counter = self.mem_read_u16(RESET_VECTOR);
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }

    fn push_interrupt_state(&mut self, break_flag: bool) {
        self.stack_push_u16(self.program_counter);

        let mut status = self.status;
        status.set(CpuFlags::BREAK, break_flag);
        status.insert(CpuFlags::BREAK2);
        self.stack_push(status.bits());
    }

    fn enter_interrupt(&mut self, vector: u16, break_flag: bool) -> u8 {
        self.push_interrupt_state(break_flag);
        self.status.remove(CpuFlags::BREAK);
        self.status.insert(CpuFlags::INTERRUPT_DISABLE);
        self.program_counter = self.mem_read_u16(vector);
        self.cycles += INTERRUPT_CYCLES as u64;
        INTERRUPT_CYCLES
    }

    /// Returns the cycles spent entering the handler.
    pub fn trigger_nmi(&mut self) -> u8 {
        self.enter_interrupt(NMI_VECTOR, false)
    }

    /// Masked by the interrupt-disable flag; returns whether the handler was entered.
    pub fn trigger_irq(&mut self) -> bool {
        if self.status.contains(CpuFlags::INTERRUPT_DISABLE) {
            return false;
        }
        self.enter_interrupt(IRQ_BRK_VECTOR, false);
        true
    }

    fn trigger_brk(&mut self) {
        // skip the padding byte after BRK
        self.program_counter = self.program_counter.wrapping_add(1);
        self.push_interrupt_state(true);
        self.status.insert(CpuFlags::INTERRUPT_DISABLE);
        self.program_counter = self.mem_read_u16(IRQ_BRK_VECTOR);
    }

    /// Runs whole instructions until at least `cycles` have elapsed. At least
    /// one instruction always runs. Returns the cycles actually consumed.
    pub fn execute(&mut self, cycles: i32) -> i32 {
        let mut remaining = cycles;
        loop {
            remaining -= self.step() as i32;
            if remaining <= 0 {
                break;
            }
        }
        cycles - remaining
    }

    fn trace_state(&self, pc: u16, opcode: &OpCode) -> TraceState {
        TraceState {
            pc,
            opcode: opcode.code,
            mnemonic: opcode.mnemonic(),
            register_a: self.register_a,
            register_x: self.register_x,
            register_y: self.register_y,
            status: self.status.bits(),
            stack_pointer: self.stack_pointer,
        }
    }

    /// Executes one instruction and returns its cycle cost.
    pub fn step(&mut self) -> u8 {
        let opcode_pc = self.program_counter;
        let code = self.mem_read(opcode_pc);
        self.program_counter = self.program_counter.wrapping_add(1);

        let opcode = match opcodes::OPCODE_TABLE[code as usize] {
            Some(opcode) => opcode,
            None => {
                if cfg!(debug_assertions) {
                    debug!("skipping unofficial opcode {:02X} at {:04X}", code, opcode_pc);
                }
                self.cycles += UNKNOWN_OPCODE_CYCLES as u64;
                return UNKNOWN_OPCODE_CYCLES;
            }
        };

        if tracing::enabled!(Level::TRACE) {
            trace!("{}", self.trace_state(opcode_pc, opcode).to_log_line());
        }

        let mode = &opcode.mode;
        match opcode.instruction {
            Instruction::LDA => self.lda(mode),
            Instruction::LDX => self.ldx(mode),
            Instruction::LDY => self.ldy(mode),
            Instruction::STA => self.store(mode, self.register_a),
            Instruction::STX => self.store(mode, self.register_x),
            Instruction::STY => self.store(mode, self.register_y),

            Instruction::ADC => self.adc(mode),
            Instruction::SBC => self.sbc(mode),
            Instruction::AND => self.and(mode),
            Instruction::EOR => self.eor(mode),
            Instruction::ORA => self.ora(mode),
            Instruction::BIT => self.bit(mode),
            Instruction::CMP => self.compare(mode, self.register_a),
            Instruction::CPX => self.compare(mode, self.register_x),
            Instruction::CPY => self.compare(mode, self.register_y),

            Instruction::ASL if *mode == AddressingMode::NoneAddressing => self.asl_accumulator(),
            Instruction::ASL => {
                self.asl(mode);
            }
            Instruction::LSR if *mode == AddressingMode::NoneAddressing => self.lsr_accumulator(),
            Instruction::LSR => {
                self.lsr(mode);
            }
            Instruction::ROL if *mode == AddressingMode::NoneAddressing => self.rol_accumulator(),
            Instruction::ROL => {
                self.rol(mode);
            }
            Instruction::ROR if *mode == AddressingMode::NoneAddressing => self.ror_accumulator(),
            Instruction::ROR => {
                self.ror(mode);
            }
            Instruction::INC => {
                self.inc(mode);
            }
            Instruction::DEC => {
                self.dec(mode);
            }

            Instruction::INX => {
                self.register_x = self.register_x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.register_x);
            }
            Instruction::INY => {
                self.register_y = self.register_y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.register_y);
            }
            Instruction::DEX => {
                self.register_x = self.register_x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.register_x);
            }
            Instruction::DEY => {
                self.register_y = self.register_y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.register_y);
            }

            Instruction::TAX => {
                self.register_x = self.register_a;
                self.update_zero_and_negative_flags(self.register_x);
            }
            Instruction::TAY => {
                self.register_y = self.register_a;
                self.update_zero_and_negative_flags(self.register_y);
            }
            Instruction::TSX => {
                self.register_x = self.stack_pointer;
                self.update_zero_and_negative_flags(self.register_x);
            }
            Instruction::TXA => self.set_register_a(self.register_x),
            Instruction::TYA => self.set_register_a(self.register_y),
            Instruction::TXS => self.stack_pointer = self.register_x,

            Instruction::PHA => self.stack_push(self.register_a),
            Instruction::PLA => {
                let data = self.stack_pop();
                self.set_register_a(data);
            }
            Instruction::PHP => self.php(),
            Instruction::PLP => self.pull_status(),

            Instruction::CLC => self.status.remove(CpuFlags::CARRY),
            Instruction::SEC => self.status.insert(CpuFlags::CARRY),
            Instruction::CLD => self.status.remove(CpuFlags::DECIMAL_MODE),
            Instruction::SED => self.status.insert(CpuFlags::DECIMAL_MODE),
            Instruction::CLI => self.status.remove(CpuFlags::INTERRUPT_DISABLE),
            Instruction::SEI => self.status.insert(CpuFlags::INTERRUPT_DISABLE),
            Instruction::CLV => self.status.remove(CpuFlags::OVERFLOW),

            Instruction::BNE => self.branch(!self.status.contains(CpuFlags::ZERO)),
            Instruction::BEQ => self.branch(self.status.contains(CpuFlags::ZERO)),
            Instruction::BVC => self.branch(!self.status.contains(CpuFlags::OVERFLOW)),
            Instruction::BVS => self.branch(self.status.contains(CpuFlags::OVERFLOW)),
            Instruction::BPL => self.branch(!self.status.contains(CpuFlags::NEGATIV)),
            Instruction::BMI => self.branch(self.status.contains(CpuFlags::NEGATIV)),
            Instruction::BCC => self.branch(!self.status.contains(CpuFlags::CARRY)),
            Instruction::BCS => self.branch(self.status.contains(CpuFlags::CARRY)),

            Instruction::JMP if *mode == AddressingMode::Absolute => {
                self.program_counter = self.mem_read_u16(self.program_counter);
            }
            Instruction::JMP => self.jmp_indirect(),
            Instruction::JSR => {
                self.stack_push_u16(self.program_counter.wrapping_add(1));
                self.program_counter = self.mem_read_u16(self.program_counter);
            }
            Instruction::RTS => {
                self.program_counter = self.stack_pop_u16().wrapping_add(1);
            }
            Instruction::RTI => {
                self.pull_status();
                self.program_counter = self.stack_pop_u16();
            }
            Instruction::BRK => self.trigger_brk(),
            Instruction::NOP => {}
        }

        if !opcode.instruction.sets_program_counter() {
            self.program_counter = self.program_counter.wrapping_add((opcode.len - 1) as u16);
        }

        self.cycles += opcode.cycles as u64;
        opcode.cycles
    }
}

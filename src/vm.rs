//! Fetch/decode/execute loop.
//!
//! A [`Vm`] owns its memory, register bank, stack and program counter; nothing
//! is shared between instances. Execution is strictly sequential and the only
//! point that touches the outside world mid-instruction is the `in`/`out`
//! console pair.

use crate::console::{CharInput, CharOutput};
use crate::constants::{MAX_OPERANDS, MODULUS, VALUE_MASK};
use crate::fault::{Fault, FaultKind, Outcome};
use crate::memory::Memory;
use crate::opcode::{Opcode, OperandKind};
use crate::operand::{as_register_index, resolve};
use crate::registers::{Register, Registers};
use crate::stack::Stack;
use crate::trace::{StepObserver, StepRecord};
use crate::debug_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
    Faulted,
}

#[derive(Debug, Clone)]
pub struct Vm {
    pub(crate) memory: Memory,
    pub(crate) registers: Registers,
    pub(crate) stack: Stack,
    pub(crate) pc: u16,
    pub(crate) state: RunState,
    pub(crate) last_fault: Option<Fault>,
    pub(crate) instruction_count: u64,
}

/// The instruction being executed, kept for fault reports.
struct Frame {
    pc: u16,
    opcode: Option<u16>,
    operands: [u16; MAX_OPERANDS],
    count: usize,
}

impl Frame {
    fn fault(&self, kind: FaultKind) -> Fault {
        Fault {
            kind,
            pc: self.pc,
            opcode: self.opcode,
            operands: self.operands[..self.count].to_vec(),
        }
    }

    fn raw_operands(&self) -> &[u16] {
        &self.operands[..self.count]
    }
}

enum Flow {
    Continue,
    Halt,
}

impl Vm {
    pub fn new(image: Vec<u16>) -> Self {
        Self::with_memory(Memory::new(image))
    }

    pub fn with_memory(memory: Memory) -> Self {
        Self {
            memory,
            registers: Registers::new(),
            stack: Stack::new(),
            pc: 0,
            state: RunState::Running,
            last_fault: None,
            instruction_count: 0,
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn register(&self, reg: Register) -> u16 {
        self.registers.get(reg)
    }

    /// Poke a register from outside the program (debugging, puzzle setup).
    pub fn set_register(&mut self, reg: Register, value: u16) {
        self.registers.set(reg, value);
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    /// Effective value of a raw operand cell against the current registers.
    pub fn resolve(&self, raw: u16) -> Result<u16, FaultKind> {
        resolve(raw, &self.registers)
    }

    /// Register index named by a raw destination cell.
    pub fn as_register_index(&self, raw: u16) -> Result<u16, FaultKind> {
        as_register_index(raw)
    }

    /// Execute a single instruction. Returns `Paused` while the machine can
    /// keep running; a terminal machine just repeats its terminal outcome.
    pub fn step(&mut self, input: &mut dyn CharInput, output: &mut dyn CharOutput) -> Outcome {
        self.drive(Some(1), input, output, None)
    }

    /// Run until `halt` or a fault.
    pub fn run(&mut self, input: &mut dyn CharInput, output: &mut dyn CharOutput) -> Outcome {
        self.drive(None, input, output, None)
    }

    /// Run at most `max_steps` instructions.
    pub fn run_for(
        &mut self,
        max_steps: u64,
        input: &mut dyn CharInput,
        output: &mut dyn CharOutput,
    ) -> Outcome {
        self.drive(Some(max_steps), input, output, None)
    }

    /// Like [`Vm::run_for`] (or [`Vm::run`] when `max_steps` is `None`), reporting
    /// each completed instruction to `observer` along with the state it started
    /// from. A faulting instruction is not reported.
    pub fn run_observed(
        &mut self,
        max_steps: Option<u64>,
        input: &mut dyn CharInput,
        output: &mut dyn CharOutput,
        observer: &mut dyn StepObserver,
    ) -> Outcome {
        self.drive(max_steps, input, output, Some(observer))
    }

    fn drive(
        &mut self,
        max_steps: Option<u64>,
        input: &mut dyn CharInput,
        output: &mut dyn CharOutput,
        mut observer: Option<&mut dyn StepObserver>,
    ) -> Outcome {
        let mut executed = 0u64;
        loop {
            if let Some(outcome) = self.terminal_outcome() {
                return outcome;
            }
            if max_steps.is_some_and(|limit| executed >= limit) {
                return Outcome::Paused;
            }
            let observer = observer
                .as_mut()
                .map(|o| &mut **o as &mut dyn StepObserver);
            let result = self.execute(input, output, observer);
            executed += 1;
            match result {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => {
                    self.state = RunState::Halted;
                    debug_log!(
                        "halted at pc {} after {} instructions",
                        self.pc,
                        self.instruction_count
                    );
                }
                Err(fault) => {
                    debug_log!("{fault}");
                    self.pc = fault.pc;
                    self.state = RunState::Faulted;
                    self.last_fault = Some(fault);
                }
            }
        }
    }

    fn terminal_outcome(&self) -> Option<Outcome> {
        match self.state {
            RunState::Running => None,
            RunState::Halted => Some(Outcome::Halted),
            RunState::Faulted => self.last_fault.clone().map(Outcome::Faulted),
        }
    }

    fn fetch(&self, address: u32) -> Result<u16, FaultKind> {
        u16::try_from(address)
            .ok()
            .and_then(|addr| self.memory.load(addr))
            .ok_or(FaultKind::OutOfBoundsMemoryAccess {
                address,
                len: self.memory.len(),
            })
    }

    fn decode(&self, frame: &mut Frame) -> Result<Opcode, FaultKind> {
        let raw = self.fetch(frame.pc as u32)?;
        frame.opcode = Some(raw);
        let opcode = Opcode::decode(raw).ok_or(FaultKind::UnknownOpcode { opcode: raw })?;
        for slot in 0..opcode.operand_kinds().len() {
            frame.operands[slot] = self.fetch(frame.pc as u32 + 1 + slot as u32)?;
            frame.count = slot + 1;
        }
        Ok(opcode)
    }

    /// Resolve every operand: destinations to register indices, sources to values.
    fn operand_values(&self, opcode: Opcode, frame: &Frame) -> Result<[u16; MAX_OPERANDS], FaultKind> {
        let mut values = [0u16; MAX_OPERANDS];
        for (slot, kind) in opcode.operand_kinds().iter().enumerate() {
            let raw = frame.operands[slot];
            values[slot] = match kind {
                OperandKind::Dest => as_register_index(raw)?,
                OperandKind::Src => resolve(raw, &self.registers)?,
            };
        }
        Ok(values)
    }

    fn execute(
        &mut self,
        input: &mut dyn CharInput,
        output: &mut dyn CharOutput,
        observer: Option<&mut dyn StepObserver>,
    ) -> Result<Flow, Fault> {
        let mut frame = Frame {
            pc: self.pc,
            opcode: None,
            operands: [0; MAX_OPERANDS],
            count: 0,
        };
        let opcode = self.decode(&mut frame).map_err(|kind| frame.fault(kind))?;
        let args = self
            .operand_values(opcode, &frame)
            .map_err(|kind| frame.fault(kind))?;

        let registers = self.registers.values();
        let stack_depth = self.stack.len();

        self.pc = frame.pc.wrapping_add(opcode.length());
        let flow = self
            .apply(opcode, args, input, output)
            .map_err(|kind| frame.fault(kind))?;

        // Only completed instructions are reported, with their pre-execution state.
        if let Some(observer) = observer {
            observer.on_step(&StepRecord {
                step: self.instruction_count,
                pc: frame.pc,
                opcode,
                mnemonic: opcode.mnemonic(),
                operands: frame.raw_operands(),
                registers,
                stack_depth,
            });
        }
        self.instruction_count += 1;
        Ok(flow)
    }

    fn apply(
        &mut self,
        opcode: Opcode,
        args: [u16; MAX_OPERANDS],
        input: &mut dyn CharInput,
        output: &mut dyn CharOutput,
    ) -> Result<Flow, FaultKind> {
        let [a, b, c] = args;
        match opcode {
            Opcode::Halt => return Ok(Flow::Halt),
            Opcode::Set => self.write_reg(a, b),
            Opcode::Push => self.stack.push(a),
            Opcode::Pop => {
                let value = self.stack.pop().ok_or(FaultKind::StackUnderflow)?;
                self.write_reg(a, value);
            }
            Opcode::Eq => self.write_reg(a, (b == c) as u16),
            Opcode::Gt => self.write_reg(a, (b > c) as u16),
            Opcode::Jmp => self.pc = a,
            Opcode::Jt => {
                if a != 0 {
                    self.pc = b;
                }
            }
            Opcode::Jf => {
                if a == 0 {
                    self.pc = b;
                }
            }
            Opcode::Add => {
                let sum = (b as u32 + c as u32) % MODULUS as u32;
                self.write_reg(a, sum as u16);
            }
            Opcode::Mult => {
                let product = (b as u32 * c as u32) % MODULUS as u32;
                self.write_reg(a, product as u16);
            }
            Opcode::Mod => {
                if c == 0 {
                    return Err(FaultKind::DivideByZero);
                }
                self.write_reg(a, b % c);
            }
            Opcode::And => self.write_reg(a, b & c),
            Opcode::Or => self.write_reg(a, b | c),
            Opcode::Not => self.write_reg(a, !b & VALUE_MASK),
            Opcode::Rmem => {
                let value = self.fetch(b as u32)?;
                self.write_reg(a, value);
            }
            Opcode::Wmem => {
                let len = self.memory.len();
                self.memory
                    .store(a, b)
                    .ok_or(FaultKind::OutOfBoundsMemoryAccess {
                        address: a as u32,
                        len,
                    })?;
            }
            Opcode::Call => {
                self.stack.push(self.pc);
                self.pc = a;
            }
            Opcode::Ret => {
                self.pc = self.stack.pop().ok_or(FaultKind::StackUnderflow)?;
            }
            Opcode::Out => output.write_char(a),
            Opcode::In => {
                if let Some(byte) = input.read_char() {
                    self.write_reg(a, byte as u16);
                }
            }
            Opcode::Noop => {}
        }
        Ok(Flow::Continue)
    }

    /// `index` comes from a decoded destination slot, so it is already < 8.
    fn write_reg(&mut self, index: u16, value: u16) {
        self.registers
            .set(Register::from_checked_index(index as u8), value);
    }
}

use synacor_core::{
    BufferOutput, FaultKind, NoInput, Outcome, QueuedInput, Register, RunState, Vm,
};

const R0: u16 = 32768;
const R1: u16 = 32769;
const R2: u16 = 32770;

fn reg(index: usize) -> Register {
    Register::new(index).expect("register")
}

fn run_image(image: Vec<u16>) -> (Vm, Outcome, BufferOutput) {
    let mut vm = Vm::new(image);
    let mut out = BufferOutput::new();
    let outcome = vm.run_for(100_000, &mut NoInput, &mut out);
    (vm, outcome, out)
}

#[test]
fn add_then_out_scenario() {
    // add r0 r1 4; out r0; halt
    let (vm, outcome, out) = run_image(vec![9, 32768, 32769, 4, 19, 32768, 0]);
    assert_eq!(outcome, Outcome::Halted);
    assert_eq!(vm.register(reg(0)), 4);
    assert_eq!(vm.register(reg(1)), 0);
    assert_eq!(out.codes(), &[4]);
}

#[test]
fn register_to_register_set_then_out() {
    // set r0 r1; out r0; halt
    let (vm, outcome, out) = run_image(vec![1, R0, R1, 19, R0, 0]);
    assert_eq!(outcome, Outcome::Halted);
    assert_eq!(vm.register(reg(0)), 0);
    assert_eq!(out.codes(), &[0]);
}

#[test]
fn hundred_element_push_pop_round_trip() {
    // for r0 in 0..100 { push r0 }; then pop into r1 and out it 100 times.
    let image = vec![
        // 0: push r0
        2, R0,
        // 2: add r0 r0 1
        9, R0, R0, 1,
        // 6: eq r2 r0 100
        4, R2, R0, 100,
        // 10: jf r2 0
        8, R2, 0,
        // 13: pop r1
        3, R1,
        // 15: out r1
        19, R1,
        // 17: add r0 r0 32767 (r0 - 1)
        9, R0, R0, 32767,
        // 21: jt r0 13
        7, R0, 13,
        // 24: halt
        0,
    ];
    let (vm, outcome, out) = run_image(image);
    assert_eq!(outcome, Outcome::Halted);
    let expected: Vec<u16> = (0..100).rev().collect();
    assert_eq!(out.codes(), expected.as_slice());
    assert!(vm.stack().is_empty());
}

#[test]
fn push_then_pop_is_lifo() {
    let image = vec![2, 1, 2, 2, 2, 3, 3, R0, 19, R0, 3, R0, 19, R0, 3, R0, 19, R0, 0];
    let (_, outcome, out) = run_image(image);
    assert_eq!(outcome, Outcome::Halted);
    assert_eq!(out.codes(), &[3, 2, 1]);
}

#[test]
fn call_returns_to_following_instruction() {
    // 0: call 6; 2: out 'A'; 4: halt; 5: noop; 6: push 9; 8: pop r0; 10: ret
    let image = vec![17, 6, 19, 65, 0, 21, 2, 9, 3, R0, 18];
    let mut vm = Vm::new(image);
    let mut out = BufferOutput::new();
    assert_eq!(vm.step(&mut NoInput, &mut out), Outcome::Paused);
    assert_eq!(vm.pc(), 6);
    assert_eq!(vm.stack().as_slice(), &[2]);
    assert_eq!(vm.run_for(3, &mut NoInput, &mut out), Outcome::Paused);
    assert_eq!(vm.pc(), 2);
    assert!(vm.stack().is_empty());
    assert_eq!(vm.run(&mut NoInput, &mut out), Outcome::Halted);
    assert_eq!(out.text(), "A");
}

#[test]
fn call_through_register_target() {
    // set r1 7; call r1; halt; ... 7: out 'B'; ret
    let image = vec![1, R1, 7, 17, R1, 0, 21, 19, 66, 18];
    let (_, outcome, out) = run_image(image);
    assert_eq!(outcome, Outcome::Halted);
    assert_eq!(out.text(), "B");
}

#[test]
fn ret_with_empty_stack_terminates_with_underflow() {
    let (vm, outcome, _) = run_image(vec![21, 18]);
    let fault = outcome.fault().expect("underflow");
    assert_eq!(fault.kind, FaultKind::StackUnderflow);
    assert_eq!(fault.pc, 1);
    assert_eq!(vm.state(), RunState::Faulted);
}

#[test]
fn opcode_22_and_above_are_unknown() {
    for opcode in [22u16, 100, 32768, u16::MAX] {
        let (vm, outcome, _) = run_image(vec![opcode, 0]);
        let fault = outcome.fault().expect("unknown opcode");
        assert_eq!(fault.kind, FaultKind::UnknownOpcode { opcode });
        assert_eq!(fault.pc, 0);
        assert_eq!(vm.pc(), 0);
        assert_eq!(vm.instruction_count(), 0);
    }
}

#[test]
fn mod_never_substitutes_zero() {
    let (vm, outcome, _) = run_image(vec![1, R0, 5, 11, R0, 17, R1, 0]);
    assert_eq!(
        outcome.fault().map(|f| f.kind),
        Some(FaultKind::DivideByZero)
    );
    assert_eq!(vm.register(reg(0)), 5);

    let (vm, outcome, _) = run_image(vec![11, R0, 17, 5, 0]);
    assert_eq!(outcome, Outcome::Halted);
    assert_eq!(vm.register(reg(0)), 2);
}

#[test]
fn input_echo_program() {
    // loop: in r0; eq r1 r0 10; out r0; jf r1 0; halt
    let image = vec![20, R0, 4, R1, R0, 10, 19, R0, 8, R1, 0, 0];
    let mut vm = Vm::new(image);
    let mut input = QueuedInput::from("look\n");
    let mut out = BufferOutput::new();
    assert_eq!(vm.run(&mut input, &mut out), Outcome::Halted);
    assert_eq!(out.text(), "look\n");
}

#[test]
fn self_modifying_code_sees_wmem_writes() {
    // wmem 5 19 turns the noop at 5 into `out 33`.
    let image = vec![16, 5, 19, 21, 21, 21, 33, 0];
    let (_, outcome, out) = run_image(image);
    assert_eq!(outcome, Outcome::Halted);
    assert_eq!(out.text(), "!");
}

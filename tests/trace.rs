use serde_json::Value;
use synacor_core::{BufferOutput, FaultKind, NoInput, Outcome, TraceWriter, Vm};

const R0: u16 = 32768;
const R1: u16 = 32769;

fn trace_lines(bytes: Vec<u8>) -> Vec<Value> {
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn run_observed_writes_one_line_per_executed_instruction() {
    // set r0 7; add r1 r0 1; push r1; halt
    let mut vm = Vm::new(vec![1, R0, 7, 9, R1, R0, 1, 2, R1, 0]);
    let mut trace = TraceWriter::new(Vec::new());
    let mut out = BufferOutput::new();
    let outcome = vm.run_observed(None, &mut NoInput, &mut out, &mut trace);
    assert_eq!(outcome, Outcome::Halted);
    assert_eq!(trace.records(), 4);

    let lines = trace_lines(trace.finish().unwrap());
    assert_eq!(lines.len(), 4);
    let pcs: Vec<u64> = lines.iter().map(|l| l["pc"].as_u64().unwrap()).collect();
    assert_eq!(pcs, vec![0, 3, 7, 9]);

    let add = &lines[1];
    assert_eq!(add["step"], 1);
    assert_eq!(add["opcode"], "add");
    assert_eq!(add["operands"], serde_json::json!([R1, R0, 1]));
    // State before the add: r0 already set, r1 not yet written.
    assert_eq!(add["registers"][0], 7);
    assert_eq!(add["registers"][1], 0);

    let halt = &lines[3];
    assert_eq!(halt["opcode"], "halt");
    assert_eq!(halt["registers"][1], 8);
    assert_eq!(halt["stack_depth"], 1);
}

#[test]
fn faulting_instruction_leaves_no_trace_record() {
    // set r0 7; mod r1 r0 0
    let mut vm = Vm::new(vec![1, R0, 7, 11, R1, R0, 0, 0]);
    let mut trace = TraceWriter::new(Vec::new());
    let mut out = BufferOutput::new();
    let outcome = vm.run_observed(None, &mut NoInput, &mut out, &mut trace);
    assert_eq!(
        outcome.fault().map(|f| f.kind),
        Some(FaultKind::DivideByZero)
    );

    let lines = trace_lines(trace.finish().unwrap());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["opcode"], "set");
    assert_eq!(vm.instruction_count(), 1);
}

#[test]
fn run_observed_respects_the_step_budget() {
    // jmp 0
    let mut vm = Vm::new(vec![6, 0]);
    let mut trace = TraceWriter::new(Vec::new());
    let mut out = BufferOutput::new();
    assert_eq!(
        vm.run_observed(Some(3), &mut NoInput, &mut out, &mut trace),
        Outcome::Paused
    );
    let lines = trace_lines(trace.finish().unwrap());
    let steps: Vec<u64> = lines.iter().map(|l| l["step"].as_u64().unwrap()).collect();
    assert_eq!(steps, vec![0, 1, 2]);
}

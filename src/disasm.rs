//! A textual disassembler for a compiled `ObjFunction`, used by the
//! `--disassemble` CLI flag. Walks a `Chunk`'s instructions in order,
//! printing the operand meaningfully where one applies and recursing
//! into any nested function constants (one entry per `lambda`).
//!
//! `CLOSURE`'s trailing upvalue descriptors are not real instructions
//! -- they're raw data the VM consumes directly -- so this walks past
//! them explicitly rather than disassembling them as ordinary opcodes.

use std::fmt::Write as _;

use crate::common::function::ObjFunction;
use crate::common::opcode::Opcode;
use crate::common::value::Value;

pub fn disassemble(function: &ObjFunction) -> String {
    let mut out = String::new();
    disassemble_into(&mut out, function, function.name.as_deref().unwrap_or("<script>"));
    out
}

fn disassemble_into(out: &mut String, function: &ObjFunction, name: &str) {
    let _ = writeln!(out, "== {} ==", name);
    let chunk = &function.chunk;
    let mut ip = 0;
    while ip < chunk.instructions.len() {
        let instr = chunk.instructions[ip];
        let _ = write!(out, "{:04} {:?}", ip, instr.opcode);
        if instr.opcode.has_operand() {
            let _ = write!(out, " {:>5}", instr.operand);
        }
        if instr.opcode == Opcode::Constant || instr.opcode == Opcode::Closure {
            if let Some(value) = chunk.constants.get(instr.operand as usize) {
                let _ = write!(out, "    ; {}", describe_constant(value));
            }
        }
        let _ = writeln!(out);
        ip += 1;

        if instr.opcode == Opcode::Closure {
            if let Some(Value::Function(inner)) = chunk.constants.get(instr.operand as usize) {
                for _ in 0..inner.upvalue_count {
                    let desc = chunk.instructions[ip];
                    let kind = if desc.opcode == Opcode::GetLocal { "local" } else { "upvalue" };
                    let _ = writeln!(out, "{:04}      | {} {}", ip, kind, desc.operand);
                    ip += 1;
                }
            }
        }
    }

    for constant in &chunk.constants {
        if let Value::Function(inner) = constant {
            disassemble_into(out, inner, inner.name.as_deref().unwrap_or("<lambda>"));
        }
    }
}

fn describe_constant(value: &Value) -> String {
    match value {
        Value::Function(f) => format!("<function {}>", f.name.as_deref().unwrap_or("anonymous")),
        other => other.to_string(),
    }
}

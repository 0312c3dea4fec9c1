//! Evaluates a DWARF expression: the stack-machine bytecode found in
//! `DW_FORM_exprloc` attributes (and the `.debug_loc` location lists this
//! crate doesn't otherwise parse).
//!
//! Grounded on `original_source/src/expression.cpp`'s `ExpressionParser`,
//! which supplies the arithmetic/logic/comparison opcode semantics more or
//! less verbatim. Two things are finished here that the source left
//! incomplete:
//!
//! - `DW_OP_regX` (register-by-ULEB-operand, opcode 0x90) was never
//!   matched in the source -- its `runNext` duplicates the `DW_OP_bregx`
//!   arm under the `RegX` name by mistake. This implementation gives it
//!   its own arm: push the register's value with no offset.
//! - `DW_OP_call2`/`DW_OP_call4`/`DW_OP_callref` were stubbed to a single
//!   commented-out line. Here they push a new bytecode frame (fetched via
//!   [`ExpressionContext::procedure`]) onto an explicit call stack bounded
//!   by [`MAX_CALL_DEPTH`], and execution resumes in the caller's frame
//!   once the callee's bytecode is exhausted -- the usual "subroutine"
//!   reading of a DWARF procedure call.

use crate::error::{Error, ErrorKind, Result};
use crate::leb;

/// Callbacks an expression evaluation needs to resolve values that live
/// outside the bytecode itself: register contents, the current frame
/// base, memory contents, and (for `DW_OP_call*`) another location
/// expression's bytecode.
///
/// Every method defaults to `NotImplemented` so a caller only needs to
/// wire up the handful of callbacks their expressions actually use.
pub trait ExpressionContext {
    fn read_register(&self, _register: u64) -> Result<i64> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
    fn frame_base(&self) -> Result<i64> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
    fn read_memory(&self, _address: u64) -> Result<i64> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
    fn read_memory_segmented(&self, _segment: u64, _address: u64) -> Result<i64> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
    fn object_address(&self) -> Result<i64> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
    fn tls_address(&self, _offset: u64) -> Result<i64> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
    fn call_frame_cfa(&self) -> Result<i64> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
    /// Fetches the bytecode of the location expression at `offset` within
    /// `.debug_info`, for `DW_OP_call2`/`DW_OP_call4`/`DW_OP_call_ref`.
    fn procedure(&self, _offset: u64) -> Result<Vec<u8>> {
        Err(Error::new(ErrorKind::NotImplemented, 0))
    }
}

/// How many nested `DW_OP_call*` frames are tolerated before evaluation
/// fails rather than recursing forever on a cyclic reference.
pub const MAX_CALL_DEPTH: usize = 16;

mod op {
    pub const ADDRESS: u8 = 0x03;
    pub const DEREF: u8 = 0x06;
    pub const CONST1U: u8 = 0x08;
    pub const CONST1S: u8 = 0x09;
    pub const CONST2U: u8 = 0x0A;
    pub const CONST2S: u8 = 0x0B;
    pub const CONST4U: u8 = 0x0C;
    pub const CONST4S: u8 = 0x0D;
    pub const CONST8U: u8 = 0x0E;
    pub const CONST8S: u8 = 0x0F;
    pub const CONSTU: u8 = 0x10;
    pub const CONSTS: u8 = 0x11;
    pub const DUP: u8 = 0x12;
    pub const DROP: u8 = 0x13;
    pub const OVER: u8 = 0x14;
    pub const PICK: u8 = 0x15;
    pub const SWAP: u8 = 0x16;
    pub const ROT: u8 = 0x17;
    pub const XDEREF: u8 = 0x18;
    pub const ABS: u8 = 0x19;
    pub const AND: u8 = 0x1A;
    pub const DIV: u8 = 0x1B;
    pub const MINUS: u8 = 0x1C;
    pub const MOD: u8 = 0x1D;
    pub const MUL: u8 = 0x1E;
    pub const NEG: u8 = 0x1F;
    pub const NOT: u8 = 0x20;
    pub const OR: u8 = 0x21;
    pub const PLUS: u8 = 0x22;
    pub const PLUS_UCONST: u8 = 0x23;
    pub const SHL: u8 = 0x24;
    pub const SHR: u8 = 0x25;
    pub const SHRA: u8 = 0x26;
    pub const XOR: u8 = 0x27;
    pub const BRA: u8 = 0x28;
    pub const EQ: u8 = 0x29;
    pub const GE: u8 = 0x2A;
    pub const GT: u8 = 0x2B;
    pub const LE: u8 = 0x2C;
    pub const LT: u8 = 0x2D;
    pub const NE: u8 = 0x2E;
    pub const SKIP: u8 = 0x2F;
    pub const LIT0: u8 = 0x30;
    pub const LIT31: u8 = 0x4F;
    pub const BREG0: u8 = 0x70;
    pub const BREG31: u8 = 0x8F;
    pub const REGX: u8 = 0x90;
    pub const FBREG: u8 = 0x91;
    pub const BREGX: u8 = 0x92;
    pub const PIECE: u8 = 0x93;
    pub const DEREF_SIZE: u8 = 0x94;
    pub const XDEREF_SIZE: u8 = 0x95;
    pub const NOP: u8 = 0x96;
    pub const PUSH_OBJECT_ADDRESS: u8 = 0x97;
    pub const CALL2: u8 = 0x98;
    pub const CALL4: u8 = 0x99;
    pub const CALL_REF: u8 = 0x9A;
    pub const FORM_TLS_ADDRESS: u8 = 0x9B;
    pub const CALL_FRAME_CFA: u8 = 0x9C;
    pub const BIT_PIECE: u8 = 0x9D;
    pub const IMPLICIT_VALUE: u8 = 0x9E;
    pub const STACK_VALUE: u8 = 0x9F;
}

struct Frame {
    bytecode: Vec<u8>,
    pc: usize,
}

fn pop(stack: &mut Vec<i64>) -> Result<i64> {
    stack.pop().ok_or(Error::new(ErrorKind::StackUnderflow, 0))
}

fn top(stack: &[i64]) -> Result<i64> {
    stack.last().copied().ok_or(Error::new(ErrorKind::StackUnderflow, 0))
}

/// Returns a reference to the item `index` slots from the top (0 = top).
fn at(stack: &[i64], index: usize) -> Result<i64> {
    let len = stack.len();
    if index >= len {
        return Err(Error::new(ErrorKind::StackUnderflow, 0));
    }
    Ok(stack[len - 1 - index])
}

fn fixed_width_unsigned(bytes: &[u8], width: usize, offset: usize) -> Result<i64> {
    let slice = bytes.get(..width).ok_or(Error::new(ErrorKind::Truncated, offset))?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(slice);
    Ok(u64::from_le_bytes(buf) as i64)
}

fn fixed_width_signed(bytes: &[u8], width: usize, offset: usize) -> Result<i64> {
    let slice = bytes.get(..width).ok_or(Error::new(ErrorKind::Truncated, offset))?;
    let mut value: i64 = 0;
    for (i, &b) in slice.iter().enumerate() {
        value |= (b as i64) << (8 * i);
    }
    let sign_bit = 1i64 << (width * 8 - 1);
    if value & sign_bit != 0 {
        value |= -1i64 << (width * 8);
    }
    Ok(value)
}

/// Evaluates `bytecode` to completion, returning the single value left on
/// top of the stack. `address_size` is the target's address width in
/// bytes, needed by `DW_OP_addr`; `dwarf_width` is the unit's DWARF offset
/// width (4 or 8), needed by `DW_OP_call_ref`'s operand, which is sized by
/// the DWARF format rather than by the target's address width.
pub fn evaluate(bytecode: &[u8], address_size: u8, dwarf_width: u8, ctx: &dyn ExpressionContext) -> Result<i64> {
    let mut stack: Vec<i64> = Vec::new();
    let mut frames: Vec<Frame> = vec![Frame { bytecode: bytecode.to_vec(), pc: 0 }];

    loop {
        let Some(frame) = frames.last_mut() else { break };
        if frame.pc >= frame.bytecode.len() {
            frames.pop();
            if frames.is_empty() {
                break;
            }
            continue;
        }

        let opcode_offset = frame.pc;
        let code = frame.bytecode[frame.pc];
        let operands = &frame.bytecode[frame.pc + 1..];
        let operand_offset = frame.pc + 1;

        match code {
            op::LIT0..=op::LIT31 => {
                stack.push((code - op::LIT0) as i64);
                frame.pc += 1;
            }
            op::BREG0..=op::BREG31 => {
                let reg = (code - op::BREG0) as u64;
                let (offset, n) = leb::ileb128_decode(operands)?;
                let v = ctx.read_register(reg)?.wrapping_add(offset);
                stack.push(v);
                frame.pc = operand_offset + n;
            }
            op::ADDRESS => {
                let size = address_size as usize;
                let v = fixed_width_unsigned(operands, size, operand_offset)?;
                stack.push(v);
                frame.pc = operand_offset + size;
            }
            op::CONST1U | op::CONST2U | op::CONST4U | op::CONST8U => {
                let size = 1usize << ((code - op::CONST1U) / 2);
                let v = fixed_width_unsigned(operands, size, operand_offset)?;
                stack.push(v);
                frame.pc = operand_offset + size;
            }
            op::CONST1S | op::CONST2S | op::CONST4S | op::CONST8S => {
                let size = 1usize << ((code - op::CONST1S) / 2);
                let v = fixed_width_signed(operands, size, operand_offset)?;
                stack.push(v);
                frame.pc = operand_offset + size;
            }
            op::CONSTU => {
                let (v, n) = leb::uleb128_decode(operands)?;
                stack.push(v as i64);
                frame.pc = operand_offset + n;
            }
            op::CONSTS => {
                let (v, n) = leb::ileb128_decode(operands)?;
                stack.push(v);
                frame.pc = operand_offset + n;
            }
            op::FBREG => {
                let (v, n) = leb::ileb128_decode(operands)?;
                stack.push(ctx.frame_base()?.wrapping_add(v));
                frame.pc = operand_offset + n;
            }
            op::REGX => {
                let (reg, n) = leb::uleb128_decode(operands)?;
                let v = ctx.read_register(reg)?;
                stack.push(v);
                frame.pc = operand_offset + n;
            }
            op::BREGX => {
                let (reg, n1) = leb::uleb128_decode(operands)?;
                let (offset, n2) = leb::ileb128_decode(&operands[n1..])?;
                let v = ctx.read_register(reg)?.wrapping_add(offset);
                stack.push(v);
                frame.pc = operand_offset + n1 + n2;
            }
            op::DUP => {
                stack.push(top(&stack)?);
                frame.pc += 1;
            }
            op::DROP => {
                pop(&mut stack)?;
                frame.pc += 1;
            }
            op::PICK => {
                let index = *operands.get(0).ok_or(Error::new(ErrorKind::Truncated, operand_offset))? as usize;
                stack.push(at(&stack, index)?);
                frame.pc = operand_offset + 1;
            }
            op::OVER => {
                stack.push(at(&stack, 1)?);
                frame.pc += 1;
            }
            op::SWAP => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(a);
                stack.push(b);
                frame.pc += 1;
            }
            op::ROT => {
                let top3 = pop(&mut stack)?;
                let len = stack.len();
                if len < 2 {
                    return Err(Error::new(ErrorKind::StackUnderflow, opcode_offset));
                }
                stack.insert(len - 2, top3);
                frame.pc += 1;
            }
            op::DEREF => {
                let addr = pop(&mut stack)? as u64;
                stack.push(ctx.read_memory(addr)?);
                frame.pc += 1;
            }
            op::DEREF_SIZE => {
                let size = *operands.get(0).ok_or(Error::new(ErrorKind::Truncated, operand_offset))?;
                let addr = pop(&mut stack)? as u64;
                let value = ctx.read_memory(addr)? as u64;
                let mask = if size >= 8 { u64::MAX } else { (1u64 << (size as u32 * 8)) - 1 };
                stack.push((value & mask) as i64);
                frame.pc = operand_offset + 1;
            }
            op::XDEREF => {
                let segment = pop(&mut stack)? as u64;
                let addr = pop(&mut stack)? as u64;
                stack.push(ctx.read_memory_segmented(segment, addr)?);
                frame.pc += 1;
            }
            op::XDEREF_SIZE => {
                let size = *operands.get(0).ok_or(Error::new(ErrorKind::Truncated, operand_offset))?;
                let segment = pop(&mut stack)? as u64;
                let addr = pop(&mut stack)? as u64;
                let value = ctx.read_memory_segmented(segment, addr)? as u64;
                let mask = if size >= 8 { u64::MAX } else { (1u64 << (size as u32 * 8)) - 1 };
                stack.push((value & mask) as i64);
                frame.pc = operand_offset + 1;
            }
            op::PUSH_OBJECT_ADDRESS => {
                stack.push(ctx.object_address()?);
                frame.pc += 1;
            }
            op::FORM_TLS_ADDRESS => {
                let offset = pop(&mut stack)? as u64;
                stack.push(ctx.tls_address(offset)?);
                frame.pc += 1;
            }
            op::CALL_FRAME_CFA => {
                stack.push(ctx.call_frame_cfa()?);
                frame.pc += 1;
            }
            op::ABS => {
                let v = top(&stack)?;
                *stack.last_mut().unwrap() = v.wrapping_abs();
                frame.pc += 1;
            }
            op::NEG => {
                let v = top(&stack)?;
                *stack.last_mut().unwrap() = v.wrapping_neg();
                frame.pc += 1;
            }
            op::NOT => {
                let v = top(&stack)?;
                *stack.last_mut().unwrap() = !v;
                frame.pc += 1;
            }
            op::AND => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push(b & a); frame.pc += 1; }
            op::OR => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push(b | a); frame.pc += 1; }
            op::XOR => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push(b ^ a); frame.pc += 1; }
            op::PLUS => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push(b.wrapping_add(a)); frame.pc += 1; }
            op::MINUS => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push(b.wrapping_sub(a)); frame.pc += 1; }
            op::MUL => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push(b.wrapping_mul(a)); frame.pc += 1; }
            op::DIV => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                if a == 0 { return Err(Error::new(ErrorKind::DivideByZero, opcode_offset)); }
                stack.push(b.wrapping_div(a));
                frame.pc += 1;
            }
            op::MOD => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                if a == 0 { return Err(Error::new(ErrorKind::DivideByZero, opcode_offset)); }
                stack.push(b.wrapping_rem(a));
                frame.pc += 1;
            }
            op::SHL => { let a = pop(&mut stack)? as u32; let b = pop(&mut stack)?; stack.push(b.wrapping_shl(a)); frame.pc += 1; }
            op::SHR => { let a = pop(&mut stack)? as u32; let b = pop(&mut stack)? as u64; stack.push((b >> (a % 64)) as i64); frame.pc += 1; }
            op::SHRA => { let a = pop(&mut stack)? as u32; let b = pop(&mut stack)?; stack.push(b.wrapping_shr(a)); frame.pc += 1; }
            op::PLUS_UCONST => {
                let (v, n) = leb::uleb128_decode(operands)?;
                let base = pop(&mut stack)?;
                stack.push(base.wrapping_add(v as i64));
                frame.pc = operand_offset + n;
            }
            op::LE => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push((b <= a) as i64); frame.pc += 1; }
            op::GE => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push((b >= a) as i64); frame.pc += 1; }
            op::EQ => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push((b == a) as i64); frame.pc += 1; }
            op::LT => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push((b < a) as i64); frame.pc += 1; }
            op::GT => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push((b > a) as i64); frame.pc += 1; }
            op::NE => { let a = pop(&mut stack)?; let b = pop(&mut stack)?; stack.push((b != a) as i64); frame.pc += 1; }
            op::SKIP => {
                let offset = fixed_width_signed(operands, 2, operand_offset)?;
                let new_pc = operand_offset as i64 + 2 + offset;
                frame.pc = branch_target(new_pc, frame.bytecode.len(), opcode_offset)?;
            }
            op::BRA => {
                let cond = pop(&mut stack)?;
                let offset = if cond != 0 { fixed_width_signed(operands, 2, operand_offset)? } else { 0 };
                let new_pc = operand_offset as i64 + 2 + offset;
                frame.pc = branch_target(new_pc, frame.bytecode.len(), opcode_offset)?;
            }
            op::PIECE => {
                let (_, n) = leb::uleb128_decode(operands)?;
                frame.pc = operand_offset + n;
            }
            op::BIT_PIECE => {
                let (_, n1) = leb::uleb128_decode(operands)?;
                let (_, n2) = leb::uleb128_decode(&operands[n1..])?;
                frame.pc = operand_offset + n1 + n2;
            }
            op::IMPLICIT_VALUE => {
                let (len, n) = leb::uleb128_decode(operands)?;
                let len = len as usize;
                if len > 8 {
                    return Err(Error::new(ErrorKind::Overflow, operand_offset + n));
                }
                let v = fixed_width_unsigned(&operands[n..], len, operand_offset + n)?;
                stack.push(v);
                frame.pc = operand_offset + n + len;
            }
            op::STACK_VALUE | op::NOP => {
                frame.pc += 1;
            }
            op::CALL2 | op::CALL4 | op::CALL_REF => {
                let (target_offset, size) = match code {
                    op::CALL2 => (fixed_width_unsigned(operands, 2, operand_offset)? as u64, 2),
                    op::CALL4 => (fixed_width_unsigned(operands, 4, operand_offset)? as u64, 4),
                    _ => (fixed_width_unsigned(operands, dwarf_width as usize, operand_offset)? as u64, dwarf_width as usize),
                };
                frame.pc = operand_offset + size;
                if frames.len() >= MAX_CALL_DEPTH {
                    return Err(Error::new(ErrorKind::Overflow, opcode_offset));
                }
                let callee = ctx.procedure(target_offset)?;
                frames.push(Frame { bytecode: callee, pc: 0 });
            }
            _ => return Err(Error::new(ErrorKind::UnknownOpcode, opcode_offset)),
        }
    }

    stack.pop().ok_or(Error::new(ErrorKind::NoResult, 0))
}

fn branch_target(candidate: i64, len: usize, opcode_offset: usize) -> Result<usize> {
    if candidate < 0 || candidate as usize > len {
        return Err(Error::new(ErrorKind::OutOfBoundsBranch, opcode_offset));
    }
    Ok(candidate as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullContext;
    impl ExpressionContext for NullContext {}

    #[test]
    fn literal_arithmetic_scenario() {
        // DW_OP_lit3, DW_OP_lit4, DW_OP_plus, DW_OP_lit2, DW_OP_mul => (3+4)*2 == 14
        let bytecode = [op::LIT0 + 3, op::LIT0 + 4, op::PLUS, op::LIT0 + 2, op::MUL];
        let result = evaluate(&bytecode, 8, 4, &NullContext).unwrap();
        assert_eq!(result, 14);
    }

    #[test]
    fn pick_beyond_stack_depth_underflows() {
        let bytecode = [op::LIT0 + 1, op::PICK, 5];
        let err = evaluate(&bytecode, 8, 4, &NullContext).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackUnderflow);
    }

    #[test]
    fn divide_by_zero_is_rejected() {
        let bytecode = [op::LIT0, op::LIT0, op::DIV];
        let err = evaluate(&bytecode, 8, 4, &NullContext).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);
    }

    #[test]
    fn conditional_branch_skips_when_taken() {
        // push 1 (true), bra +1 over a lit99, then lit7 remains on top.
        let mut bytecode = vec![op::LIT0 + 1, op::BRA];
        bytecode.extend_from_slice(&1i16.to_le_bytes());
        bytecode.push(op::LIT0 + 99);
        bytecode.push(op::LIT0 + 7);
        let result = evaluate(&bytecode, 8, 4, &NullContext).unwrap();
        assert_eq!(result, 7);
    }

    #[test]
    fn conditional_branch_falls_through_when_not_taken() {
        let mut bytecode = vec![op::LIT0, op::BRA];
        bytecode.extend_from_slice(&2i16.to_le_bytes());
        bytecode.push(op::LIT0 + 5);
        let result = evaluate(&bytecode, 8, 4, &NullContext).unwrap();
        assert_eq!(result, 5);
    }

    #[test]
    fn out_of_bounds_skip_is_rejected() {
        let mut bytecode = vec![op::SKIP];
        bytecode.extend_from_slice(&100i16.to_le_bytes());
        let err = evaluate(&bytecode, 8, 4, &NullContext).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfBoundsBranch);
    }

    #[test]
    fn empty_bytecode_has_no_result() {
        let err = evaluate(&[], 8, 4, &NullContext).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoResult);
    }

    struct CallingContext;
    impl ExpressionContext for CallingContext {
        fn procedure(&self, offset: u64) -> Result<Vec<u8>> {
            assert_eq!(offset, 0x10);
            Ok(vec![op::LIT0 + 9])
        }
    }

    #[test]
    fn call_pushes_a_callee_frame_and_resumes_after_it() {
        let mut bytecode = vec![op::CALL4];
        bytecode.extend_from_slice(&0x10u32.to_le_bytes());
        bytecode.push(op::LIT0 + 1);
        bytecode.push(op::PLUS);
        let result = evaluate(&bytecode, 8, 4, &CallingContext).unwrap();
        assert_eq!(result, 10);
    }

    struct RecursiveContext;
    impl ExpressionContext for RecursiveContext {
        fn procedure(&self, _offset: u64) -> Result<Vec<u8>> {
            let mut bytecode = vec![op::CALL4];
            bytecode.extend_from_slice(&0u32.to_le_bytes());
            Ok(bytecode)
        }
    }

    #[test]
    fn call_depth_is_bounded() {
        let mut bytecode = vec![op::CALL4];
        bytecode.extend_from_slice(&0u32.to_le_bytes());
        let err = evaluate(&bytecode, 8, 4, &RecursiveContext).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
    }
}

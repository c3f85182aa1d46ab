//! Lexical scope tracking for the single-pass compiler: one `Frame`
//! per function body being compiled, each owning its own locals and
//! the upvalue descriptors it captured from enclosing frames.
//!
//! Frames live in a flat `Vec` rather than as a linked chain of
//! `Box<Compiler>`s with a `parent` pointer -- the parent-chasing
//! recursion in `resolve_upvalue` walks the vector by index instead of
//! by reference, which keeps every borrow short-lived and sidesteps
//! the aliasing a recursive owned structure would otherwise require.

use crate::common::error::CompileError;
use crate::common::function::ObjFunction;
use crate::common::upvalue::UpvalueDesc;

pub struct LocalVar {
    pub name: String,
    pub captured: bool,
}

pub struct Frame {
    pub function: ObjFunction,
    pub locals: Vec<LocalVar>,
    pub upvalues: Vec<UpvalueDesc>,
}

impl Frame {
    pub fn new(function: ObjFunction) -> Frame {
        Frame { function, locals: Vec::new(), upvalues: Vec::new() }
    }
}

/// Looks for `name` among the locals currently visible in `frame`,
/// most-recently-declared first. A `define`'s initializer is always
/// compiled before its own local is pushed here, so there is never a
/// local mid-initialization to skip.
pub fn resolve_local(frame: &Frame, name: &str) -> Option<u16> {
    frame
        .locals
        .iter()
        .enumerate()
        .rev()
        .find(|(_, local)| local.name == name)
        .map(|(i, _)| i as u16)
}

/// Resolves `name` as an upvalue of `frames[frame_idx]` by walking
/// outward through enclosing frames. Marks the originating local as
/// captured so the compiler knows to emit `OP_CLOSE_UPVALUE` for it
/// when its scope ends.
pub fn resolve_upvalue(
    frames: &mut [Frame],
    frame_idx: usize,
    name: &str,
) -> Result<Option<u16>, CompileError> {
    if frame_idx == 0 {
        return Ok(None);
    }
    let parent_idx = frame_idx - 1;

    if let Some(local_index) = resolve_local(&frames[parent_idx], name) {
        frames[parent_idx].locals[local_index as usize].captured = true;
        return add_upvalue(frames, frame_idx, local_index, true).map(Some);
    }

    if let Some(upvalue_index) = resolve_upvalue(frames, parent_idx, name)? {
        return add_upvalue(frames, frame_idx, upvalue_index, false).map(Some);
    }

    Ok(None)
}

fn add_upvalue(
    frames: &mut [Frame],
    frame_idx: usize,
    index: u16,
    is_local: bool,
) -> Result<u16, CompileError> {
    let frame = &mut frames[frame_idx];
    if let Some((i, _)) = frame
        .upvalues
        .iter()
        .enumerate()
        .find(|(_, uv)| uv.index == index && uv.is_local == is_local)
    {
        return Ok(i as u16);
    }
    if frame.upvalues.len() >= u16::MAX as usize {
        return Err(CompileError::TooManyUpvalues);
    }
    frame.upvalues.push(UpvalueDesc { index, is_local });
    Ok((frame.upvalues.len() - 1) as u16)
}

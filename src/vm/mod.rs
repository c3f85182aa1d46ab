//! The runtime: call frames and the bytecode interpreter itself.

pub mod frame;
pub mod vm;

//! A `CallFrame` tracks one in-progress call: the closure being run,
//! where to resume the caller when it returns, and where this call's
//! locals begin on the shared value stack.

use std::rc::Rc;

use crate::common::closure::ObjClosure;

pub struct CallFrame {
    pub closure: Rc<ObjClosure>,
    pub ip: usize,
    /// Index into the VM's value stack of this call's slot 0 (the
    /// callee itself; parameters and locals follow it).
    pub base_slot: usize,
}

impl CallFrame {
    pub fn new(closure: Rc<ObjClosure>, base_slot: usize) -> CallFrame {
        CallFrame { closure, ip: 0, base_slot }
    }
}

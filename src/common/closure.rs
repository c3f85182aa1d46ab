//! `ObjClosure` pairs an `ObjFunction` with the upvalues it captured at
//! creation time. It is the only callable value at runtime -- bare
//! `ObjFunction`s are wrapped in a closure by `OP_CLOSURE` before they
//! can be called. Several closures may share the same `ObjFunction`
//! (e.g. each invocation of an outer lambda produces a fresh closure
//! over the same inner-lambda function).

use std::rc::Rc;

use crate::common::function::ObjFunction;
use crate::common::upvalue::ObjUpvalue;

#[derive(Debug, Clone)]
pub struct ObjClosure {
    pub function: Rc<ObjFunction>,
    pub upvalues: Vec<Rc<ObjUpvalue>>,
}

impl ObjClosure {
    pub fn new(function: Rc<ObjFunction>, upvalues: Vec<Rc<ObjUpvalue>>) -> ObjClosure {
        debug_assert_eq!(upvalues.len(), function.upvalue_count as usize);
        ObjClosure { function, upvalues }
    }
}

//! Transient lvalue handles into shared mutable containers.
//!
//! A [`Reference`] points at either an array slot or a struct member and
//! supports read, write, and removal through the shared container. It is
//! created during lvalue resolution and never outlives the statement that
//! produced it; assignment, increment/decrement, and `unset` all write
//! through it instead of re-resolving the target.

use std::cell::RefCell;
use std::rc::Rc;

use super::error::RuntimeError;
use super::value::{StructInstance, Value};

/// Handle to one slot of a shared array.
#[derive(Debug, Clone)]
pub struct SlotRef {
    array: Rc<RefCell<Vec<Value>>>,
    index: usize,
}

impl SlotRef {
    /// Bind a slot handle, rejecting indices outside the current length.
    pub fn new(array: Rc<RefCell<Vec<Value>>>, index: i64) -> Result<SlotRef, RuntimeError> {
        let len = array.borrow().len();
        if index < 0 || index as usize >= len {
            return Err(RuntimeError::IndexOutOfBounds { index, len });
        }
        Ok(SlotRef {
            array,
            index: index as usize,
        })
    }

    /// Append a placeholder slot and bind a handle to it (`arr[] = expr`).
    pub fn append(array: Rc<RefCell<Vec<Value>>>) -> SlotRef {
        let index = {
            let mut items = array.borrow_mut();
            items.push(Value::Empty);
            items.len() - 1
        };
        SlotRef { array, index }
    }

    fn get(&self) -> Result<Value, RuntimeError> {
        let items = self.array.borrow();
        items
            .get(self.index)
            .cloned()
            .ok_or(RuntimeError::IndexOutOfBounds {
                index: self.index as i64,
                len: items.len(),
            })
    }

    fn set(&self, value: Value) {
        let mut items = self.array.borrow_mut();
        if self.index < items.len() {
            items[self.index] = value;
        }
    }

    fn remove(&self) {
        let mut items = self.array.borrow_mut();
        if self.index < items.len() {
            items.remove(self.index);
        }
    }
}

/// Handle to one member of a struct instance.
#[derive(Debug, Clone)]
pub struct MemberRef {
    instance: Rc<StructInstance>,
    member: String,
}

impl MemberRef {
    pub fn new(instance: Rc<StructInstance>, member: &str) -> MemberRef {
        MemberRef {
            instance,
            member: member.to_string(),
        }
    }
}

/// A polymorphic lvalue handle: array slot or struct member.
#[derive(Debug, Clone)]
pub enum Reference {
    Slot(SlotRef),
    Member(MemberRef),
}

impl Reference {
    /// Current value behind the handle.
    pub fn get(&self) -> Result<Value, RuntimeError> {
        match self {
            Reference::Slot(slot) => slot.get(),
            Reference::Member(m) => Ok(m.instance.member_value(&m.member)),
        }
    }

    /// Replace the value in place.
    pub fn set(&self, value: Value) {
        match self {
            Reference::Slot(slot) => slot.set(value),
            Reference::Member(m) => m.instance.set_member(&m.member, value),
        }
    }

    /// Delete an array slot, shifting subsequent elements left. Struct shape
    /// is fixed after instantiation, so member removal is a no-op.
    pub fn remove(&self) {
        match self {
            Reference::Slot(slot) => slot.remove(),
            Reference::Member(_) => {}
        }
    }
}

//! Lexically-scoped symbol table with function-call frames.
//!
//! A stack of frames mapping names to values. Block frames nest: lookup
//! walks outward from the innermost frame. Call frames are isolation
//! barriers -- lookup stops there, so a function body cannot see caller
//! locals.

use std::collections::HashMap;

use super::error::RuntimeError;
use super::value::Value;

#[derive(Debug, Default)]
struct Frame {
    symbols: HashMap<String, Value>,
    /// Lookup does not continue past a barrier frame.
    barrier: bool,
}

/// The chain of nested name-to-value frames.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> ScopeStack {
        ScopeStack { frames: Vec::new() }
    }

    /// Enter a nested block scope.
    pub fn begin_block(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Leave the innermost block scope.
    pub fn end_block(&mut self) {
        self.frames.pop();
    }

    /// Push an isolated function-call frame. Names bound in it shadow
    /// nothing and see nothing outside it.
    pub fn push_frame(&mut self) {
        self.frames.push(Frame {
            symbols: HashMap::new(),
            barrier: true,
        });
    }

    /// Pop a function-call frame.
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Bind a new name in the innermost frame. Fails only when the name
    /// already exists in that frame; shadowing an outer binding is fine.
    pub fn declare(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        match self.frames.last_mut() {
            Some(frame) => {
                if frame.symbols.contains_key(name) {
                    return Err(RuntimeError::AlreadyDeclared(name.to_string()));
                }
                frame.symbols.insert(name.to_string(), value);
                Ok(())
            }
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    /// Whether the name is visible from the innermost frame.
    pub fn has(&self, name: &str) -> bool {
        self.visible_frames().any(|f| f.symbols.contains_key(name))
    }

    /// Whether the name exists in the innermost frame itself.
    pub fn has_local(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|f| f.symbols.contains_key(name))
    }

    /// Look the name up, innermost frame outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.visible_frames()
            .find_map(|f| f.symbols.get(name).cloned())
    }

    /// Rebind an existing name wherever it is visible. Returns false when
    /// the name is not bound anywhere in the visible chain.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if frame.symbols.contains_key(name) {
                frame.symbols.insert(name.to_string(), value);
                return true;
            }
            if frame.barrier {
                break;
            }
        }
        false
    }

    /// Remove a visible binding. Removing an absent name is a no-op.
    pub fn remove(&mut self, name: &str) {
        for frame in self.frames.iter_mut().rev() {
            if frame.symbols.remove(name).is_some() {
                return;
            }
            if frame.barrier {
                break;
            }
        }
    }

    /// Frames visible from the innermost one, stopping at (and including)
    /// the nearest barrier.
    fn visible_frames(&self) -> impl Iterator<Item = &Frame> {
        let mut stopped = false;
        self.frames.iter().rev().take_while(move |frame| {
            if stopped {
                return false;
            }
            if frame.barrier {
                stopped = true;
            }
            true
        })
    }
}

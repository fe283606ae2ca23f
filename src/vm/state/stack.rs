//! This module contains the implementation of the stacks used by the virtual
//! machine.
//!
//! The same container backs both halves of the dual execution: the concrete
//! stack holds words, and the symbolic stack holds the symbols that track where
//! each of those words came from.

use crate::{
    constant::MAXIMUM_STACK_DEPTH,
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
};

/// The representation of the virtual machine's stack.
///
/// # Indexing
///
/// Indexing into this stack is zero-based, where frame 0 is the top stack
/// frame.
///
/// # Depth
///
/// As in a true EVM, it holds at most [`MAXIMUM_STACK_DEPTH`] items.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stack<T> {
    data: Vec<T>,
}

impl<T: Clone> Stack<T> {
    /// Creates a new stack without any items on it.
    #[must_use]
    pub fn new() -> Self {
        let data = Vec::with_capacity(MAXIMUM_STACK_DEPTH);
        Self { data }
    }

    /// Pushes the provided value onto the top of the stack.
    ///
    /// # Errors
    ///
    /// If the stack cannot grow to accommodate the requested `value`.
    pub fn push(&mut self, value: T) -> std::result::Result<(), Error> {
        if self.data.len() + 1 > MAXIMUM_STACK_DEPTH {
            return Err(Error::StackDepthExceeded {
                requested: self.data.len() + 1,
            });
        }
        self.data.push(value);
        Ok(())
    }

    /// Pops the top value from the stack.
    ///
    /// # Errors
    ///
    /// If the stack has no item to pop.
    pub fn pop(&mut self) -> std::result::Result<T, Error> {
        self.data.pop().ok_or(Error::NoSuchStackFrame { depth: 0 })
    }

    /// Reads from the stack frame at the provided `depth`.
    ///
    /// # Errors
    ///
    /// If `depth` does not exist in the stack.
    pub fn read(&self, depth: u32) -> std::result::Result<&T, Error> {
        let index = self.index_of(depth)?;
        Ok(&self.data[index])
    }

    /// Duplicates the stack item at `frame` onto the top of the stack.
    ///
    /// This is a more general case of the `DUP` opcodes as it can duplicate any
    /// available stack frame.
    ///
    /// # Errors
    ///
    /// If `frame` doesn't exist or the stack is full.
    pub fn dup(&mut self, frame: u32) -> std::result::Result<(), Error> {
        let value = self.read(frame)?.clone();
        self.push(value)
    }

    /// Swaps the top stack item with the item in `frame`.
    ///
    /// It swaps with the indicated frame directly, rather than the `n+1`th
    /// frame as for the `SWAP` opcodes.
    ///
    /// # Errors
    ///
    /// If either the top or the target stack frame do not exist.
    pub fn swap(&mut self, frame: u32) -> std::result::Result<(), Error> {
        let top_index = self.index_of(0)?;
        let frame_index = self.index_of(frame)?;
        self.data.swap(top_index, frame_index);

        Ok(())
    }

    /// Gets copies of the top `count` items, starting from the top of the
    /// stack, without removing them.
    ///
    /// # Errors
    ///
    /// If the stack holds fewer than `count` items.
    pub fn peek_many(&self, count: usize) -> std::result::Result<Vec<T>, Error> {
        if count > self.data.len() {
            return Err(Error::NoSuchStackFrame {
                depth: i64::try_from(count).unwrap_or(i64::MAX) - 1,
            });
        }
        Ok(self.data.iter().rev().take(count).cloned().collect())
    }

    /// Gets the items on the stack, starting from the top.
    pub fn iter_from_top(&self) -> impl Iterator<Item = &T> {
        self.data.iter().rev()
    }

    /// Gets the current depth of the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.data.len()
    }

    /// Checks if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Creates a handle that attaches `instruction_pointer` to any errors that
    /// occur while operating on the stack.
    pub fn new_located(&mut self, instruction_pointer: u32) -> LocatedStackHandle<'_, T> {
        LocatedStackHandle {
            instruction_pointer,
            stack: self,
        }
    }

    /// Gets the index in the underlying storage of the frame at `depth`.
    fn index_of(&self, depth: u32) -> std::result::Result<usize, Error> {
        let depth_usize = depth as usize;
        if depth_usize >= self.data.len() {
            return Err(Error::NoSuchStackFrame {
                depth: i64::from(depth),
            });
        }
        Ok(self.data.len() - 1 - depth_usize)
    }
}

impl<T: Clone> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A view of a [`Stack`] that locates every error at the instruction that is
/// being executed.
#[derive(Debug)]
pub struct LocatedStackHandle<'a, T> {
    instruction_pointer: u32,
    stack:               &'a mut Stack<T>,
}

impl<'a, T: Clone> LocatedStackHandle<'a, T> {
    /// Pushes `value` onto the stack.
    ///
    /// # Errors
    ///
    /// If the stack is full.
    pub fn push(&mut self, value: T) -> Result<()> {
        self.stack.push(value).locate(self.instruction_pointer)
    }

    /// Pops the top value from the stack.
    ///
    /// # Errors
    ///
    /// If the stack is empty.
    pub fn pop(&mut self) -> Result<T> {
        self.stack.pop().locate(self.instruction_pointer)
    }

    /// Pops the top `count` values from the stack, returning them top-first.
    ///
    /// # Errors
    ///
    /// If the stack holds fewer than `count` values.
    pub fn pop_many(&mut self, count: usize) -> Result<Vec<T>> {
        (0..count).map(|_| self.pop()).collect()
    }

    /// Reads the frame at `depth`.
    ///
    /// # Errors
    ///
    /// If no such frame exists.
    pub fn read(&self, depth: u32) -> Result<&T> {
        self.stack.read(depth).locate(self.instruction_pointer)
    }

    /// Duplicates the frame at `frame` onto the top of the stack.
    ///
    /// # Errors
    ///
    /// If no such frame exists or the stack is full.
    pub fn dup(&mut self, frame: u32) -> Result<()> {
        self.stack.dup(frame).locate(self.instruction_pointer)
    }

    /// Swaps the top frame with the frame at `frame`.
    ///
    /// # Errors
    ///
    /// If no such frame exists.
    pub fn swap(&mut self, frame: u32) -> Result<()> {
        self.stack.swap(frame).locate(self.instruction_pointer)
    }

    /// Gets the current depth of the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }
}

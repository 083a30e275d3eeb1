//! Stack of child process ids started by a session.
//!
//! The most recently registered pid sits on top. Removing an entry only
//! forgets the pid; it never signals the OS process behind it.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `pop` was called with nothing tracked. Callers must check `is_empty` first.
    #[error("pop on an empty process registry")]
    Empty,
    /// Growing the stack failed; the pid was not tracked.
    #[error("out of memory while tracking process {pid}")]
    Exhausted { pid: u32 },
}

/// Tracked child pids, in registration order (top = last element).
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    pids: Vec<u32>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `pid` as the newest entry.
    pub fn push(&mut self, pid: u32) -> Result<(), RegistryError> {
        self.pids
            .try_reserve(1)
            .map_err(|_| RegistryError::Exhausted { pid })?;
        self.pids.push(pid);
        Ok(())
    }

    /// Remove and return the newest pid.
    pub fn pop(&mut self) -> Result<u32, RegistryError> {
        self.pids.pop().ok_or(RegistryError::Empty)
    }

    /// Stop tracking `pid` wherever it sits. Returns whether it was tracked.
    pub fn remove(&mut self, pid: u32) -> bool {
        match self.pids.iter().rposition(|&tracked| tracked == pid) {
            Some(index) => {
                self.pids.remove(index);
                true
            }
            None => false,
        }
    }

    /// Newest pid without removing it.
    pub fn head(&self) -> Option<u32> {
        self.pids.last().copied()
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Tracked pids, most recently registered first.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.pids.iter().rev().copied()
    }

    /// Forget every tracked pid without signaling anything. Returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        self.drain_each(|_| {})
    }

    /// Pop every pid newest-first, handing each one to `visit`.
    pub fn drain_each<F: FnMut(u32)>(&mut self, mut visit: F) -> usize {
        let mut count = 0;
        while let Ok(pid) = self.pop() {
            visit(pid);
            count += 1;
        }
        count
    }
}

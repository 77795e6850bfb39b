// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered queue of deferred calls
//!
//! Calls are plain values (usually an enum of the target's operations)
//! that know how to apply themselves to the target once it exists.

use std::collections::VecDeque;

/// A deferred call that can be applied to a target of type `T`
pub trait Replay<T: ?Sized> {
    fn replay(self, target: &T);
}

/// Ordered queue of calls awaiting a target
#[derive(Debug)]
pub struct CallBuffer<C> {
    calls: VecDeque<C>,
}

impl<C> CallBuffer<C> {
    pub fn new() -> Self {
        Self {
            calls: VecDeque::new(),
        }
    }

    /// Append a call to the tail
    pub fn push(&mut self, call: C) {
        self.calls.push_back(call);
    }

    /// Insert a call at the head, ahead of everything already queued
    pub fn unshift(&mut self, call: C) {
        self.calls.push_front(call);
    }

    /// True when nothing is queued
    pub fn is_flushed(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.calls.iter()
    }

    /// Replay every queued call against `target` in queue order, leaving
    /// the buffer empty. Returns how many calls were replayed.
    ///
    /// Each call reports its own outcome; one failing never stops the rest.
    pub fn flush<T: ?Sized>(&mut self, target: &T) -> usize
    where
        C: Replay<T>,
    {
        let calls = std::mem::take(&mut self.calls);
        let count = calls.len();
        for call in calls {
            call.replay(target);
        }
        count
    }

    /// Remove and return every queued call without replaying
    pub fn drain(&mut self) -> Vec<C> {
        self.calls.drain(..).collect()
    }
}

impl<C> Default for CallBuffer<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "call_buffer_tests.rs"]
mod tests;

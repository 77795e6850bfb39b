// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle notifications of logs, sessions and records
//!
//! Each resource keeps its own [`Listeners`] inside the state it guards,
//! so checking a condition and subscribing to its notification happen
//! under the same lock.

use crate::completion::{pair, Completion};
use crate::error::LogError;
use tokio::sync::oneshot;

/// The fixed set of lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// A real backing resource now exists
    Materialized,
    /// No pending writes or open children remain
    Idle,
    /// The resource finished closing
    Closed,
}

impl Lifecycle {
    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Materialized => "materialized",
            Lifecycle::Idle => "idle",
            Lifecycle::Closed => "closed",
        }
    }
}

/// One-shot continuations waiting for lifecycle notifications
#[derive(Debug, Default)]
pub struct Listeners {
    pending: Vec<(Lifecycle, oneshot::Sender<()>)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for the next `event`; the receiver fires once
    pub fn listen(&mut self, event: Lifecycle) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.push((event, tx));
        rx
    }

    /// Wake every listener registered for `event`. Returns how many woke.
    pub fn notify(&mut self, event: Lifecycle) -> usize {
        let mut woken = 0;
        let (fire, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(registered, _)| *registered == event);
        self.pending = keep;
        for (_, tx) in fire {
            if tx.send(()).is_ok() {
                woken += 1;
            }
        }
        woken
    }

    /// Listeners still waiting for `event`
    pub fn waiting(&self, event: Lifecycle) -> usize {
        self.pending
            .iter()
            .filter(|(registered, tx)| *registered == event && !tx.is_closed())
            .count()
    }
}

/// Completion resolving once `signal` fires
///
/// A listener dropped without firing resolves to [`LogError::Abandoned`].
pub fn when_fired(signal: oneshot::Receiver<()>) -> Completion {
    let (done, completion) = pair();
    tokio::spawn(async move {
        done.complete(signal.await.map_err(|_| LogError::Abandoned));
    });
    completion
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

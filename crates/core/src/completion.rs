// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion handles for operations that finish later
//!
//! Every operation is submitted when its method is called; the returned
//! [`Completion`] only reports the outcome. Dropping it is the
//! fire-and-forget form of the call.

use crate::error::LogError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Create a connected completer/completion pair
pub fn pair<T>() -> (Completer<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Completion { rx })
}

/// Producer side: resolves the matching [`Completion`] exactly once
#[derive(Debug)]
pub struct Completer<T = ()> {
    tx: oneshot::Sender<Result<T, LogError>>,
}

impl<T> Completer<T> {
    pub fn complete(self, result: Result<T, LogError>) {
        // Nobody listening is fine
        let _ = self.tx.send(result);
    }

    /// True once the caller dropped its completion
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T: Send + 'static> Completer<T> {
    /// Resolve with whatever `completion` resolves to
    pub fn follow(self, completion: Completion<T>) {
        tokio::spawn(async move {
            self.complete(completion.await);
        });
    }
}

/// Consumer side: a future resolving to the operation's outcome
#[derive(Debug)]
#[must_use = "completions report errors; drop explicitly to ignore the outcome"]
pub struct Completion<T = ()> {
    rx: oneshot::Receiver<Result<T, LogError>>,
}

impl<T> Completion<T> {
    /// An already-resolved completion
    pub fn ready(result: Result<T, LogError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    pub fn ok(value: T) -> Self {
        Self::ready(Ok(value))
    }

    pub fn err(error: LogError) -> Self {
        Self::ready(Err(error))
    }

    /// Outcome if already available, without waiting
    pub fn try_take(&mut self) -> Option<Result<T, LogError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(LogError::Abandoned)),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, LogError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(LogError::Abandoned)))
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flush arbiters decide when buffered records may materialize

use crate::labels::Props;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Predicate consulted each time a buffered record considers materializing
#[derive(Clone)]
pub struct FlushArbiter {
    decide: Arc<dyn Fn(&Props) -> bool + Send + Sync>,
}

impl FlushArbiter {
    pub fn new(decide: impl Fn(&Props) -> bool + Send + Sync + 'static) -> Self {
        Self {
            decide: Arc::new(decide),
        }
    }

    /// Materialize on the first write
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Never materialize; logging becomes a silent no-op
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Materialize only once `trigger` has fired
    pub fn on_trigger(trigger: FlushTrigger) -> Self {
        Self::new(move |_| trigger.is_fired())
    }

    pub fn should_flush(&self, props: &Props) -> bool {
        (self.decide)(props)
    }
}

impl Default for FlushArbiter {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for FlushArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushArbiter").finish_non_exhaustive()
    }
}

/// Shared switch behind [`FlushArbiter::on_trigger`], e.g. "an error happened"
#[derive(Clone, Debug, Default)]
pub struct FlushTrigger {
    fired: Arc<AtomicBool>,
}

impl FlushTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.fired.store(false, Ordering::SeqCst);
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Configurable arbiter policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    #[default]
    Always,
    Never,
    OnTrigger,
}

impl FlushPolicy {
    /// Build the arbiter; `trigger` is only consulted by `OnTrigger`
    pub fn arbiter(self, trigger: &FlushTrigger) -> FlushArbiter {
        match self {
            FlushPolicy::Always => FlushArbiter::always(),
            FlushPolicy::Never => FlushArbiter::never(),
            FlushPolicy::OnTrigger => FlushArbiter::on_trigger(trigger.clone()),
        }
    }
}

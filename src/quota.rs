//! Quota Budget Tracking
//!
//! Counts search calls against a soft ceiling derived from the daily unit
//! budget. A call is counted when it is attempted, not when it succeeds, so
//! retries and failed requests are charged too.

use crate::config::QuotaConfig;
use crate::error::ApiError;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug)]
pub struct QuotaTracker {
    budget: u32,
    consumed: AtomicU32,
    /// Set when the upstream reports exhaustion before our own ceiling.
    exhausted: AtomicBool,
}

impl QuotaTracker {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            consumed: AtomicU32::new(0),
            exhausted: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.call_budget())
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn consumed(&self) -> u32 {
        self.consumed.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> u32 {
        if self.exhausted.load(Ordering::SeqCst) {
            return 0;
        }
        self.budget.saturating_sub(self.consumed())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Charge one call. Must be called before the request is sent.
    pub fn try_acquire(&self) -> Result<(), ApiError> {
        if self.exhausted.load(Ordering::SeqCst) {
            return Err(ApiError::QuotaExhausted);
        }
        let budget = self.budget;
        self.consumed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < budget).then_some(used + 1)
            })
            .map(|_| ())
            .map_err(|_| ApiError::QuotaExhausted)
    }

    pub fn mark_exhausted(&self) {
        self.exhausted.store(true, Ordering::SeqCst);
    }
}

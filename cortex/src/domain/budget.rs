// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Token budget value object
//!
//! Invariant: `used <= limit`. A reservation that would overshoot is refused
//! outright rather than applied and rolled back.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBudget {
    used: u64,
    limit: u64,
}

impl MemoryBudget {
    pub fn new(limit: u64) -> Self {
        Self { used: 0, limit }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn free(&self) -> u64 {
        self.limit - self.used
    }

    pub fn can_fit(&self, size: u64) -> bool {
        self.used
            .checked_add(size)
            .is_some_and(|total| total <= self.limit)
    }

    /// Reserve `size` tokens; returns false and leaves the budget untouched
    /// if that would exceed the limit.
    pub fn try_reserve(&mut self, size: u64) -> bool {
        if !self.can_fit(size) {
            return false;
        }
        self.used += size;
        true
    }

    pub fn release(&mut self, size: u64) {
        debug_assert!(size <= self.used, "releasing more than reserved");
        self.used = self.used.saturating_sub(size);
    }

    pub fn usage_percentage(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        (self.used as f64 / self.limit as f64) * 100.0
    }
}

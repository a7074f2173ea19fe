// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cooperative shutdown signal
//!
//! A shared cancellation flag polled by both worker loops, settable from
//! the OS signal handler or by either worker when it detects the other
//! has stopped. Cancellation is cooperative only; no thread is ever
//! terminated forcibly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of the interruptible sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep up to `duration`, returning early once shutdown is
    /// requested. Cancellation latency is bounded by the slice size, not
    /// by the full sleep.
    pub fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.is_requested() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

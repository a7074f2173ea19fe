// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded sample queue
//!
//! Fixed-capacity single-producer/single-consumer channel between the
//! sampler and the batch writer. The push side blocks for a short bounded
//! timeout and then drops the record: queue-full is explicit backpressure
//! by drop, never unbounded growth.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::sample::SampleRecord;

/// Push failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// Queue stayed full for the whole timeout; the record was dropped.
    Full,
    /// Consumer side is gone.
    Disconnected,
}

/// Pop failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopError {
    /// Nothing arrived within the timeout.
    Timeout,
    /// Producer side is gone and the queue is drained.
    Disconnected,
}

/// Producer half, owned by the sampler thread.
pub struct QueueProducer(Sender<SampleRecord>);

/// Consumer half, owned by the batch writer thread.
pub struct QueueConsumer(Receiver<SampleRecord>);

/// Create a bounded queue with the given capacity.
pub fn bounded(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = channel::bounded(capacity);
    (QueueProducer(tx), QueueConsumer(rx))
}

impl QueueProducer {
    /// Push a record, blocking up to `timeout` when the queue is full.
    pub fn push(&self, record: SampleRecord, timeout: Duration) -> Result<(), PushError> {
        match self.0.send_timeout(record, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(PushError::Full),
            Err(SendTimeoutError::Disconnected(_)) => Err(PushError::Disconnected),
        }
    }
}

impl QueueConsumer {
    /// Pop a record, blocking up to `timeout` when the queue is empty.
    ///
    /// The bounded wait lets the consumer re-check elapsed time and the
    /// shutdown flag even with no data pending.
    pub fn pop(&self, timeout: Duration) -> Result<SampleRecord, PopError> {
        match self.0.recv_timeout(timeout) {
            Ok(record) => Ok(record),
            Err(RecvTimeoutError::Timeout) => Err(PopError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(PopError::Disconnected),
        }
    }

    /// True when no records are queued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of queued records.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(volts: f64) -> SampleRecord {
        SampleRecord {
            taken_at: Utc::now(),
            readings: vec![(1, volts)],
        }
    }

    #[test]
    fn test_push_pop_fifo() {
        let (tx, rx) = bounded(4);
        tx.push(record(1.0), Duration::from_millis(10)).unwrap();
        tx.push(record(2.0), Duration::from_millis(10)).unwrap();
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.pop(Duration::from_millis(10)).unwrap().readings[0].1, 1.0);
        assert_eq!(rx.pop(Duration::from_millis(10)).unwrap().readings[0].1, 2.0);
    }

    #[test]
    fn test_push_beyond_capacity_drops_newest() {
        let (tx, rx) = bounded(2);
        tx.push(record(1.0), Duration::from_millis(5)).unwrap();
        tx.push(record(2.0), Duration::from_millis(5)).unwrap();
        // Consumer stalled: the third push times out and the record drops.
        assert_eq!(
            tx.push(record(3.0), Duration::from_millis(5)),
            Err(PushError::Full)
        );
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.pop(Duration::from_millis(5)).unwrap().readings[0].1, 1.0);
    }

    #[test]
    fn test_pop_timeout_on_empty() {
        let (_tx, rx) = bounded(2);
        assert!(matches!(
            rx.pop(Duration::from_millis(5)),
            Err(PopError::Timeout)
        ));
    }

    #[test]
    fn test_disconnect_is_distinct() {
        let (tx, rx) = bounded(2);
        drop(rx);
        assert_eq!(
            tx.push(record(1.0), Duration::from_millis(5)),
            Err(PushError::Disconnected)
        );
        let (tx, rx) = bounded(2);
        drop(tx);
        assert!(matches!(
            rx.pop(Duration::from_millis(5)),
            Err(PopError::Disconnected)
        ));
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! Cross-process condition variable over a shared futex word.
//!
//! # Design
//!
//! ```text
//! ConditionVariableData (64 bytes, one cache line)
//! +--------------------------------------------+
//! | tokens           (AtomicU32, futex word)   |
//! | notification_set (AtomicU32, bitmap)       |
//! | padding                                    |
//! +--------------------------------------------+
//! ```
//!
//! `tokens` counts unconsumed notifications, semaphore-style: each
//! `notify()` adds one, each successful wait consumes one. A notify that
//! arrives before the wait is therefore never lost - the next wait finds
//! a token and returns without sleeping. `notification_set` records which
//! signaler index fired so a waiter serving many producers can tell them
//! apart without polling all of them.
//!
//! # Memory Ordering Strategy
//!
//! - **Release** on `notify()`: everything the signaling side wrote before
//!   notifying is visible to a waiter that consumes the token.
//! - **Acquire** on token consumption and probes: pairs with the Release
//!   above to form the happens-before edge the no-missed-wakeup guarantee
//!   rests on.
//!
//! The futex sleep itself needs no ordering: a waiter only sleeps while
//! `tokens == 0`, and the kernel re-checks the word under its own lock, so
//! a token published between our check and the syscall makes the syscall
//! return immediately (`EAGAIN`).

use super::futex::{futex_wait, futex_wake, futex_wake_all};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Capacity of the notification-set bitmap (one bit per signaler index).
pub const MAX_NOTIFIERS: usize = 32;

/// Shared wake state, placeable in a shared-memory segment.
///
/// Contains only fixed-size atomic words - no pointers, nothing that is
/// meaningful in one address space only - so the layout is bit-identical
/// in every process mapping the segment. Lifetime is owned by whoever
/// created the segment and must outlive every waiter, signaler and
/// trigger referencing it.
#[repr(C, align(64))]
pub struct ConditionVariableData {
    /// Unconsumed notification count; doubles as the futex word.
    tokens: AtomicU32,
    /// Which signaler indices fired since the last `take_notifications`.
    notification_set: AtomicU32,
    /// Padding to fill the cache line
    _pad: [u8; 56],
}

impl ConditionVariableData {
    /// Create new wake state with no pending notification.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tokens: AtomicU32::new(0),
            notification_set: AtomicU32::new(0),
            _pad: [0u8; 56],
        }
    }
}

impl Default for ConditionVariableData {
    fn default() -> Self {
        Self::new()
    }
}

/// How many blocked waiters a single `notify()` releases from the futex.
///
/// The contract either way is "each notify is observed by at least one
/// waiter, never lost"; the policy only controls fan-out when several
/// waiters block on the same data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WakePolicy {
    /// Release a single waiter per notify.
    One,
    /// Release every currently blocked waiter.
    #[default]
    All,
}

/// The wake half of the condition variable.
///
/// Cheap to construct on the fly; safe to use concurrently from any
/// number of threads and processes, including while a wait is in
/// progress on the same data.
pub struct ConditionVariableSignaler<'a> {
    data: &'a ConditionVariableData,
    index: u32,
    policy: WakePolicy,
}

impl<'a> ConditionVariableSignaler<'a> {
    /// Signaler with notifier index 0 and the default wake policy.
    #[must_use]
    pub fn new(data: &'a ConditionVariableData) -> Self {
        Self::with_index(data, 0)
    }

    /// Signaler for a specific notifier index (< [`MAX_NOTIFIERS`]).
    ///
    /// The index selects which bit of the notification set a `notify()`
    /// raises, letting the waiting side attribute wake-ups to a source.
    #[must_use]
    pub fn with_index(data: &'a ConditionVariableData, index: u32) -> Self {
        debug_assert!((index as usize) < MAX_NOTIFIERS);
        Self {
            data,
            index: index % MAX_NOTIFIERS as u32,
            policy: WakePolicy::default(),
        }
    }

    /// Override the wake fan-out policy.
    #[must_use]
    pub fn wake_policy(mut self, policy: WakePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Publish one notification and wake waiter(s) per the policy.
    #[inline]
    pub fn notify(&self) {
        self.data
            .notification_set
            .fetch_or(1 << self.index, Ordering::Release);
        self.data.tokens.fetch_add(1, Ordering::Release);
        match self.policy {
            WakePolicy::One => futex_wake(&self.data.tokens, 1),
            WakePolicy::All => futex_wake_all(&self.data.tokens),
        };
    }
}

/// The blocking half of the condition variable.
pub struct ConditionVariableWaiter<'a> {
    data: &'a ConditionVariableData,
}

impl<'a> ConditionVariableWaiter<'a> {
    #[must_use]
    pub fn new(data: &'a ConditionVariableData) -> Self {
        Self { data }
    }

    /// Block until notified or `timeout` elapses.
    ///
    /// Returns `true` iff a notification was observed (and consumed)
    /// before the deadline. The timeout path consumes nothing: a notify
    /// racing with the deadline is left pending for the next wait.
    /// Timeout is an expected outcome, not an error - callers re-check
    /// their own shutdown flag and wait again.
    pub fn timed_wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_consume() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // Sleeps only while tokens == 0; a token published in between
            // makes the syscall return immediately with EAGAIN.
            futex_wait(&self.data.tokens, 0, Some(deadline - now));
        }
    }

    /// Block until notified, with no timeout.
    pub fn wait(&self) {
        loop {
            if self.try_consume() {
                return;
            }
            futex_wait(&self.data.tokens, 0, None);
        }
    }

    /// Non-blocking probe: is at least one notification pending?
    #[inline]
    #[must_use]
    pub fn was_notified(&self) -> bool {
        self.data.tokens.load(Ordering::Acquire) > 0
    }

    /// Snapshot and clear the notification-set bitmap.
    ///
    /// Bit `i` set means a signaler with index `i` fired since the last
    /// call. Independent of token consumption.
    #[inline]
    pub fn take_notifications(&self) -> u32 {
        self.data.notification_set.swap(0, Ordering::AcqRel)
    }

    /// Drain all pending notifications and clear the bitmap.
    ///
    /// After this, a wait blocks until the *next* notify. Used by a
    /// WaitSet-style owner when it re-arms after processing a batch.
    pub fn reset(&self) {
        self.data.tokens.swap(0, Ordering::AcqRel);
        self.data.notification_set.swap(0, Ordering::AcqRel);
    }

    /// Consume one token if any is pending.
    fn try_consume(&self) -> bool {
        let mut current = self.data.tokens.load(Ordering::Acquire);
        while current > 0 {
            match self.data.tokens.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }
}

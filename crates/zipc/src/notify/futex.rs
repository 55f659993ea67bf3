// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! Linux futex wrapper for inter-process wake-ups.
//!
//! # SHARED vs PRIVATE
//!
//! This module uses `FUTEX_WAIT` and `FUTEX_WAKE` (NOT the `_PRIVATE`
//! variants). The `_PRIVATE` variants only match waiters within a single
//! process and will silently fail to wake a waiter that mapped the same
//! physical page at a different virtual address. Every waiter this crate
//! cares about lives in another process, so:
//!
//! - `FUTEX_WAIT` (value 0) - NOT `FUTEX_WAIT_PRIVATE` (value 128)
//! - `FUTEX_WAKE` (value 1) - NOT `FUTEX_WAKE_PRIVATE` (value 129)

use std::ptr;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Futex operation codes (SHARED, not PRIVATE!)
const FUTEX_WAIT: i32 = 0; // NOT 128 (FUTEX_WAIT_PRIVATE)
const FUTEX_WAKE: i32 = 1; // NOT 129 (FUTEX_WAKE_PRIVATE)

/// Wait on a futex word until it changes from `expected` or the timeout expires.
///
/// # Arguments
///
/// * `addr` - Atomic u32 to wait on (must be in shared memory for inter-process use)
/// * `expected` - Only sleep if the current value equals `expected`
/// * `timeout` - Optional relative timeout
///
/// # Returns
///
/// * `0` on wake or spurious wakeup
/// * `-1` with `EAGAIN` if the value already differs from `expected`
/// * `-1` with `ETIMEDOUT` on timeout
/// * `-1` with another errno on error
///
/// # Safety
///
/// Not `unsafe` to call: the reference keeps the address valid for the
/// duration of the wait. For inter-process use the word must live in a
/// `MAP_SHARED` mapping.
#[cfg(target_os = "linux")]
pub fn futex_wait(addr: &AtomicU32, expected: u32, timeout: Option<Duration>) -> i32 {
    let ts = timeout.map(|d| libc::timespec {
        tv_sec: d.as_secs() as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });

    let ts_ptr = ts
        .as_ref()
        .map_or(ptr::null(), |t| t as *const libc::timespec);

    // SAFETY: valid syscall parameters; addr is alive because we hold a
    // reference to it. Using FUTEX_WAIT (0), NOT FUTEX_WAIT_PRIVATE (128).
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            addr as *const AtomicU32 as *const u32,
            FUTEX_WAIT,
            expected,
            ts_ptr,
            ptr::null::<u32>(), // uaddr2 (unused)
            0i32,               // val3 (unused)
        ) as i32
    }
}

/// Wake threads waiting on a futex word.
///
/// `count` is the maximum number of waiters to wake (`i32::MAX` for all).
/// Returns the number of waiters woken, or -1 on error.
#[cfg(target_os = "linux")]
pub fn futex_wake(addr: &AtomicU32, count: i32) -> i32 {
    // SAFETY: valid syscall parameters.
    // Using FUTEX_WAKE (1), NOT FUTEX_WAKE_PRIVATE (129).
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            addr as *const AtomicU32 as *const u32,
            FUTEX_WAKE,
            count,
            ptr::null::<libc::timespec>(), // timeout (unused for wake)
            ptr::null::<u32>(),            // uaddr2 (unused)
            0i32,                          // val3 (unused)
        ) as i32
    }
}

/// Wake a single waiter
#[cfg(target_os = "linux")]
#[inline]
pub fn futex_wake_one(addr: &AtomicU32) -> i32 {
    futex_wake(addr, 1)
}

/// Wake all waiters
#[cfg(target_os = "linux")]
#[inline]
pub fn futex_wake_all(addr: &AtomicU32) -> i32 {
    futex_wake(addr, i32::MAX)
}

// Non-Linux fallback (bounded sleep, for running the unit tests only)
#[cfg(not(target_os = "linux"))]
pub fn futex_wait(_addr: &AtomicU32, _expected: u32, timeout: Option<Duration>) -> i32 {
    let sleep_time = timeout.unwrap_or(Duration::from_millis(1));
    std::thread::sleep(sleep_time.min(Duration::from_millis(10)));
    0
}

#[cfg(not(target_os = "linux"))]
pub fn futex_wake(_addr: &AtomicU32, _count: i32) -> i32 {
    0 // No-op on non-Linux
}

#[cfg(not(target_os = "linux"))]
#[inline]
pub fn futex_wake_one(_addr: &AtomicU32) -> i32 {
    0
}

#[cfg(not(target_os = "linux"))]
#[inline]
pub fn futex_wake_all(_addr: &AtomicU32) -> i32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wake_without_waiters_is_harmless() {
        let val = AtomicU32::new(0);
        let woken = futex_wake(&val, 1);
        assert!(woken >= 0);
    }

    #[test]
    fn wait_with_stale_expected_returns_immediately() {
        let val = AtomicU32::new(42);
        let result = futex_wait(&val, 0, Some(Duration::from_millis(100)));
        // On Linux, returns -1 with EAGAIN; the fallback returns 0
        #[cfg(target_os = "linux")]
        assert_eq!(result, -1);
        #[cfg(not(target_os = "linux"))]
        let _ = result;
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn wait_honors_timeout() {
        let val = AtomicU32::new(7);
        let start = std::time::Instant::now();
        let _ = futex_wait(&val, 7, Some(Duration::from_millis(50)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(200));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn wake_unblocks_waiter() {
        let val = Arc::new(AtomicU32::new(0));
        let val_clone = Arc::clone(&val);

        let handle = thread::spawn(move || {
            while val_clone.load(Ordering::Acquire) == 0 {
                futex_wait(&val_clone, 0, Some(Duration::from_secs(1)));
            }
            val_clone.load(Ordering::Acquire)
        });

        // Give the thread time to start waiting
        thread::sleep(Duration::from_millis(10));

        val.store(99, Ordering::Release);
        futex_wake(&val, 1);

        let result = handle.join().expect("waiter thread panicked");
        assert_eq!(result, 99);
    }
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Lock word layout shared by the fast paths and the contended slow paths.
//
// The word is one signed machine word:
// - The low bits (ACTIVE_MASK) count active holders.
// - WAITING_BIAS is folded in while the wait list is non-empty.
// - A writer adds ACTIVE_WRITE_BIAS = WAITING_BIAS + ACTIVE_BIAS, which drives
//   the word negative.

/// Value of an unlocked, uncontended semaphore.
pub const UNLOCKED_VALUE: isize = 0;

/// One unit of the active-holder field.
pub const ACTIVE_BIAS: isize = 1;

/// Mask selecting the active-holder field.
#[cfg(target_pointer_width = "64")]
pub const ACTIVE_MASK: isize = 0xffff_ffff;

/// Mask selecting the active-holder field.
#[cfg(not(target_pointer_width = "64"))]
pub const ACTIVE_MASK: isize = 0x0000_ffff;

/// Folded into the word while at least one context is queued.
pub const WAITING_BIAS: isize = -ACTIVE_MASK - 1;

/// Contribution of one active reader.
pub const ACTIVE_READ_BIAS: isize = ACTIVE_BIAS;

/// Contribution of the active writer.
pub const ACTIVE_WRITE_BIAS: isize = WAITING_BIAS + ACTIVE_BIAS;

/// Active-holder field of `count`.
///
/// Transient fast-path increments that are about to be undone by a slow path
/// are included.
#[inline]
pub const fn active_count(count: isize) -> isize {
    count & ACTIVE_MASK
}

/// Whether no context is counted as active in `count`.
#[inline]
pub const fn is_idle(count: isize) -> bool {
    active_count(count) == 0
}

/// Number of `WAITING_BIAS` multiples folded into `count`.
///
/// `0` means readers only (or unlocked), `1` means either a writer holds the
/// lock or contexts are queued, `2` means a writer holds it with others queued.
#[inline]
pub const fn waiting_units(count: isize) -> isize {
    (count - active_count(count)) / WAITING_BIAS
}

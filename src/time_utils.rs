// SPDX-License-Identifier: MIT

//! Shared helpers for timestamps.
//!
//! All persisted timestamps are Unix milliseconds, matching the wire format
//! the frontend already consumes.

use chrono::Utc;

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

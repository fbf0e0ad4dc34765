//! Application-wide constants
//!
//! Defaults for [`crate::config::CoreConfig`] and a few fixed values shared
//! between the stores and the fetch layer.

/// Messages requested per history fetch, split evenly around the anchor.
pub const MESSAGES_PER_REQUEST: u32 = 100;

/// Hard cap on one logical fetch, retries included.
pub const REQUEST_LONG_TIMEOUT_MS: u64 = 60_000;

// Retry backoff
pub const BACKOFF_FIRST_MS: u64 = 100;
pub const BACKOFF_CEILING_MS: u64 = 10_000;
pub const BACKOFF_BASE: u32 = 2;

/// Presence reports older than this count as offline.
pub const PRESENCE_OFFLINE_THRESHOLD_SECS: u64 = 140;

/// Typing notifications not refreshed within this window are swept.
pub const TYPING_EXPIRY_MS: u64 = 15_000;

/// Display name used when a moved message lands in a stream we can't see.
pub const UNKNOWN_STREAM_NAME: &str = "unknown";

/// Env var naming a file that receives a debug-level copy of all logs.
pub const LOG_FILE_ENV: &str = "CHATSYNC_LOG_FILE";

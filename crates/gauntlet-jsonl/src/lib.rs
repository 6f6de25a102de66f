//! An append-only JSONL (JSON Lines) event log for Rust.
//!
//! This library provides async writing of JSONL records together with a
//! size-bounded, tail-preserving rotation policy: when the log grows past its
//! byte budget, the oldest complete lines are discarded so the newest records
//! survive intact.
//!
//! # Overview
//!
//! JSONL is a text format where each line is a valid JSON value. It is well
//! suited to event logs that are appended to far more often than they are
//! read. The two core types reflect that split:
//!
//! - [`JsonlWriter`] - buffered async writer that serializes one record per line
//! - [`RotatingLog`] - append-only log file with atomic size-based rotation
//!
//! # Examples
//!
//! ```no_run
//! use gauntlet_jsonl::RotatingLog;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Event {
//!     index: u32,
//!     message: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let log = RotatingLog::new("events.jsonl");
//! log.append(&Event { index: 0, message: "started".to_string() }).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod rotate;
pub mod writer;

pub use error::{Error, Result};
pub use rotate::{RotatingLog, DEFAULT_MAX_BYTES};
pub use writer::JsonlWriter;

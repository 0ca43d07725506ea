//! # newsdigest-gmail
//!
//! Gmail REST API v1 client for the digest pipeline.
//!
//! Fetching is deliberately batched: all monitored senders go into a single
//! OR query, so one day's fetch costs O(1) list calls plus one detail fetch
//! per matched message. Individual message failures are logged and skipped;
//! partial results are still useful.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod message;
mod query;
mod retry;

pub use client::{GmailClient, NewsletterSender};
pub use error::{FetchError, Result};
pub use message::RawMessage;
pub use query::build_query;

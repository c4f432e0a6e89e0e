//! Internal utilities for reactlog.
//!
//! Implementation details that are not part of the public API. `RetryPolicy`
//! is re-exported through `lib.rs` for configuring the LLM client.

pub mod retry;

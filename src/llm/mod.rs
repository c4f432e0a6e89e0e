//! LLM conversation plumbing: the transport contract (`LlmClient`) and the
//! robust JSON Decision Parser (§4.7, §4.8 step 2).

mod client;
pub mod decision_parser;

pub use client::{HttpLlmClient, LlmClient};

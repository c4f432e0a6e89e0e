//! reactlog: a ReAct-style tool-use orchestration engine that answers
//! natural-language questions over structured log data by driving an LLM
//! through an iterative tool-calling loop.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reactlog::{EngineConfig, EntityCatalog, CsvLogStore, HttpLlmClient, Orchestrator};
//!
//! # async fn run() -> reactlog::EngineResult<()> {
//! let config = EngineConfig::from_file("engine.toml")?;
//! let catalog = Arc::new(EntityCatalog::from_file(&config.entity_catalog_path)?);
//! let store = Arc::new(CsvLogStore::open(&config.csv_path)?);
//! let llm = Arc::new(HttpLlmClient::new("https://api.anthropic.com", std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()));
//!
//! let orchestrator = Orchestrator::new(store, catalog, llm, config);
//! let result = orchestrator.analyze("count all logs").await;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entities;
pub mod error;
pub(crate) mod internals;
pub mod llm;
pub mod logging;
pub mod normalize;
pub mod orchestrator;
pub mod registry;
pub mod store;
pub mod tools;
pub mod types;

pub use config::EngineConfig;
pub use entities::EntityCatalog;
pub use error::{EngineError, EngineResult, ErrorCategory, ErrorSeverity};
pub use internals::retry::RetryPolicy;
pub use llm::{HttpLlmClient, LlmClient};
pub use logging::{log_debug, log_error, log_info, log_trace, log_warn};
pub use orchestrator::{Orchestrator, QueryResult};
pub use registry::ToolRegistry;
pub use store::{CsvLogStore, LogStore, Row, RowSet, Severity};
pub use types::Decision;

/// Convenience prelude mirroring the teacher's — the small set of types
/// most callers need to wire up an `Orchestrator`.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::entities::EntityCatalog;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::llm::{HttpLlmClient, LlmClient};
    pub use crate::orchestrator::{Orchestrator, QueryResult};
    pub use crate::store::{CsvLogStore, LogStore};
}

//! Error types for the orchestration engine.
//!
//! This module provides structured error handling for the ReAct loop,
//! including categorization, severity levels, and recoverability guidance
//! (§7 of the design: which errors let the loop continue and which end it).
//!
//! # Error Handling Example
//!
//! ```rust
//! use reactlog::{EngineError, EngineResult};
//!
//! fn handle_error(err: EngineError) {
//!     if err.is_terminal() {
//!         println!("Query ends: {}", err.user_message());
//!     } else {
//!         println!("Recoverable, continuing the loop: {}", err);
//!     }
//! }
//! ```
//!
//! # Result Type
//!
//! Use [`EngineResult<T>`] as a convenient alias for `Result<T, EngineError>`.

use crate::logging::{log_error, log_warn};
use thiserror::Error;

// ============================================================================
// Error categorization types
// ============================================================================

/// High-level categorization of errors for routing and handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Expected outcomes of an unreliable reasoner (unknown tool, bad params).
    BusinessLogic,
    /// External service failures (the LLM endpoint, network issues).
    External,
    /// Internal invariant violations — should not occur in practice.
    Internal,
    /// Caller/config mistakes (malformed entity catalog, bad file paths).
    Client,
    /// Temporary failures that should be retried with backoff.
    Transient,
}

/// Severity level for logging and alerting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Fatal at startup or irrecoverable mid-query.
    Critical,
    /// Action failed but the orchestrator is stable.
    Error,
    /// Unexpected but recoverable — the loop continues.
    Warning,
    /// Expected failure, normal ReAct self-correction material.
    Info,
}

/// Result type alias used throughout the engine.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while loading configuration or running a query.
///
/// Each variant maps to one of the nine error kinds in the design's error
/// taxonomy (§7). Use [`category()`](Self::category), [`severity()`](Self::severity),
/// and [`is_terminal()`](Self::is_terminal) to decide how the orchestrator
/// should react.
///
/// | Variant | Kind | Terminal? |
/// |---|---|---|
/// | `ConfigInvalid` | `config_invalid` | fatal at startup |
/// | `LlmUnreachable` | `llm_unreachable` | recoverable, fatal if it recurs |
/// | `LlmParseFailed` | `llm_parse_failed` | recoverable up to 3 consecutive |
/// | `UnknownTool` | `unknown_tool` | recoverable |
/// | `MissingParameter` | `missing_parameter` | recoverable |
/// | `InvalidParameter` | `invalid_parameter` | recoverable |
/// | `ToolExecutionFailed` | `tool_execution_failed` | recoverable |
/// | `LoopDetected` | `loop_detected` | recoverable (synthesized) |
/// | `DeadlineExceeded` | `deadline_exceeded` | terminal |
/// | `IterationExhausted` | `iteration_exhausted` | terminal |
#[derive(Error, Debug)]
pub enum EngineError {
    /// Entity configuration or engine configuration is malformed.
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what failed to load or validate.
        message: String,
    },

    /// The LLM endpoint could not be reached after the retry budget was spent.
    #[error("LLM unreachable: {message}")]
    LlmUnreachable {
        /// Description of the transport failure.
        message: String,
    },

    /// The LLM's reply could not be coerced into a [`crate::orchestrator::Decision`].
    #[error("could not parse reasoner output: {message}")]
    LlmParseFailed {
        /// Description of why every parse tier failed.
        message: String,
        /// First 200 characters of the offending reply, for diagnostics.
        raw_preview: String,
    },

    /// The LLM named a tool that is not in the [`crate::registry::ToolRegistry`].
    #[error("unknown tool: {tool_name}")]
    UnknownTool {
        /// The tool name the LLM requested.
        tool_name: String,
    },

    /// A required parameter was absent from the Decision.
    #[error("tool {tool_name} missing required parameter: {parameter}")]
    MissingParameter {
        /// The tool being invoked.
        tool_name: String,
        /// The parameter name that was required but absent.
        parameter: String,
    },

    /// A parameter was present but failed type/shape validation.
    #[error("tool {tool_name} parameter {parameter} invalid: {message}")]
    InvalidParameter {
        /// The tool being invoked.
        tool_name: String,
        /// The parameter name that failed validation.
        parameter: String,
        /// Description of the validation failure.
        message: String,
    },

    /// A tool ran but could not produce a useful result.
    #[error("tool {tool_name} execution failed: {message}")]
    ToolExecutionFailed {
        /// The tool that failed.
        tool_name: String,
        /// Description of the failure.
        message: String,
    },

    /// The same `(tool, parameters)` pair has already failed twice.
    #[error("loop detected: {tool_name} has failed twice with these parameters")]
    LoopDetected {
        /// The tool whose repeated failure triggered the break.
        tool_name: String,
    },

    /// The overall query deadline elapsed.
    #[error("query deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded {
        /// Milliseconds elapsed when the deadline fired.
        elapsed_ms: u64,
    },

    /// `max_iterations` was reached without the LLM marking `done`.
    #[error("iteration budget ({max_iterations}) exhausted without a final answer")]
    IterationExhausted {
        /// The configured iteration budget.
        max_iterations: u32,
    },
}

impl EngineError {
    /// Get the error category for routing and handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigInvalid { .. } => ErrorCategory::Client,
            Self::LlmUnreachable { .. } => ErrorCategory::Transient,
            Self::LlmParseFailed { .. } => ErrorCategory::External,
            Self::UnknownTool { .. }
            | Self::MissingParameter { .. }
            | Self::InvalidParameter { .. }
            | Self::ToolExecutionFailed { .. }
            | Self::LoopDetected { .. } => ErrorCategory::BusinessLogic,
            Self::DeadlineExceeded { .. } | Self::IterationExhausted { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// Get the error severity for logging and alerting.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ConfigInvalid { .. } => ErrorSeverity::Critical,
            Self::LlmUnreachable { .. } => ErrorSeverity::Warning,
            Self::LlmParseFailed { .. } => ErrorSeverity::Warning,
            Self::UnknownTool { .. }
            | Self::MissingParameter { .. }
            | Self::InvalidParameter { .. } => ErrorSeverity::Info,
            Self::ToolExecutionFailed { .. } => ErrorSeverity::Warning,
            Self::LoopDetected { .. } => ErrorSeverity::Info,
            Self::DeadlineExceeded { .. } | Self::IterationExhausted { .. } => ErrorSeverity::Error,
        }
    }

    /// Whether this error should retry the underlying operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LlmUnreachable { .. })
    }

    /// Whether this error ends the query instead of letting the loop continue.
    ///
    /// `ConfigInvalid` is only ever raised at catalog/config load time (never
    /// mid-query), so it is terminal by construction rather than by the
    /// orchestrator's step-9 classification.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid { .. }
                | Self::DeadlineExceeded { .. }
                | Self::IterationExhausted { .. }
        )
    }

    /// Convert to a message suitable for the `error` field of the Result envelope.
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigInvalid { message } => format!("configuration is invalid: {message}"),
            Self::LlmUnreachable { .. } => {
                "could not reach the reasoning model, please try again".to_string()
            }
            Self::LlmParseFailed { .. } => "could not parse reasoner output".to_string(),
            Self::UnknownTool { tool_name } => format!("unknown tool requested: {tool_name}"),
            Self::MissingParameter {
                tool_name,
                parameter,
            } => format!("{tool_name} is missing required parameter {parameter}"),
            Self::InvalidParameter {
                tool_name,
                parameter,
                ..
            } => format!("{tool_name} received an invalid value for {parameter}"),
            Self::ToolExecutionFailed { tool_name, message } => {
                format!("{tool_name} failed: {message}")
            }
            Self::LoopDetected { tool_name } => {
                format!("{tool_name} kept failing with the same parameters and was skipped")
            }
            Self::DeadlineExceeded { .. } => {
                "the query deadline elapsed before a final answer was produced".to_string()
            }
            Self::IterationExhausted { .. } => {
                "the iteration budget was exhausted before a final answer was produced".to_string()
            }
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================

    pub fn config_invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(error_type = "config_invalid", message = %message, "configuration failed validation");
        Self::ConfigInvalid { message }
    }

    pub fn llm_unreachable(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(error_type = "llm_unreachable", message = %message, "LLM transport failed");
        Self::LlmUnreachable { message }
    }

    pub fn llm_parse_failed(message: impl Into<String>, raw: &str) -> Self {
        let message = message.into();
        let raw_preview: String = raw.chars().take(200).collect();
        log_warn!(
            error_type = "llm_parse_failed",
            message = %message,
            raw_preview = %raw_preview,
            "could not coerce reasoner output into a Decision"
        );
        Self::LlmParseFailed {
            message,
            raw_preview,
        }
    }

    pub fn unknown_tool(tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        log_warn!(error_type = "unknown_tool", tool_name = %tool_name, "reasoner named an unregistered tool");
        Self::UnknownTool { tool_name }
    }

    pub fn missing_parameter(tool_name: impl Into<String>, parameter: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        let parameter = parameter.into();
        log_warn!(error_type = "missing_parameter", tool_name = %tool_name, parameter = %parameter, "required parameter absent");
        Self::MissingParameter {
            tool_name,
            parameter,
        }
    }

    pub fn invalid_parameter(
        tool_name: impl Into<String>,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let tool_name = tool_name.into();
        let parameter = parameter.into();
        let message = message.into();
        log_warn!(error_type = "invalid_parameter", tool_name = %tool_name, parameter = %parameter, message = %message, "parameter failed validation");
        Self::InvalidParameter {
            tool_name,
            parameter,
            message,
        }
    }

    pub fn tool_execution_failed(
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let tool_name = tool_name.into();
        let message = message.into();
        log_warn!(error_type = "tool_execution_failed", tool_name = %tool_name, message = %message, "tool ran but produced no usable result");
        Self::ToolExecutionFailed { tool_name, message }
    }

    pub fn loop_detected(tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        log_warn!(error_type = "loop_detected", tool_name = %tool_name, "same tool call failed twice, skipping");
        Self::LoopDetected { tool_name }
    }

    pub fn deadline_exceeded(elapsed_ms: u64) -> Self {
        log_error!(error_type = "deadline_exceeded", elapsed_ms = elapsed_ms, "query deadline elapsed");
        Self::DeadlineExceeded { elapsed_ms }
    }

    pub fn iteration_exhausted(max_iterations: u32) -> Self {
        log_error!(error_type = "iteration_exhausted", max_iterations = max_iterations, "iteration budget exhausted");
        Self::IterationExhausted { max_iterations }
    }
}

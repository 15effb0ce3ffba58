//! Error taxonomy for the oracle core
//!
//! Every failure a request can hit falls into one of four kinds. None of them
//! is fatal to the process: each request surfaces its own error to the caller
//! as a JSON-RPC error envelope.

use thiserror::Error;

/// JSON-RPC: the request body is not valid JSON
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC: the request body is not a valid request object
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC: unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC: invalid method parameters
pub const INVALID_PARAMS: i64 = -32602;
/// Structured data did not match the contract's tuple layout
pub const MALFORMED_ENCODING: i64 = -32001;
/// Chain read failed
pub const QUERY_UNAVAILABLE: i64 = -32002;
/// Chain write failed
pub const SUBMISSION_FAILED: i64 = -32003;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Codec input does not match the expected structured-data layout
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// A chain read could not be completed. Never means "not completed".
    #[error("chain query unavailable: {0}")]
    QueryUnavailable(String),

    /// A chain write could not be completed. Not retried here.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// Missing or mistyped request parameters, rejected before any chain access
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl OracleError {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i64 {
        match self {
            OracleError::MalformedEncoding(_) => MALFORMED_ENCODING,
            OracleError::QueryUnavailable(_) => QUERY_UNAVAILABLE,
            OracleError::SubmissionFailed(_) => SUBMISSION_FAILED,
            OracleError::InvalidInput(_) => INVALID_PARAMS,
        }
    }

    /// Message safe to hand back to a client.
    ///
    /// Transport detail of chain failures stays in the logs; input errors
    /// describe the caller's own request and are returned as-is.
    pub fn public_message(&self) -> String {
        match self {
            OracleError::MalformedEncoding(detail) => format!("malformed encoding: {}", detail),
            OracleError::InvalidInput(detail) => format!("invalid params: {}", detail),
            OracleError::QueryUnavailable(_) => "chain query unavailable".to_string(),
            OracleError::SubmissionFailed(_) => "transaction submission failed".to_string(),
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::MalformedEncoding(_) => "malformed_encoding",
            OracleError::QueryUnavailable(_) => "query_unavailable",
            OracleError::SubmissionFailed(_) => "submission_failed",
            OracleError::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;

//! Error types for cw-core
//!
//! Decoding a window never fails: silence, degenerate timing and unknown
//! symbols all degrade to empty or placeholder output. Errors only arise when
//! building the decoder (parameters, symbol table, worker threads) or when the
//! synthesiser is handed unusable input.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Parameter validation failed
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Parameter JSON could not be parsed
    #[error("Invalid parameter JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Symbol table resource line could not be parsed
    #[error("Symbol table line {line}: {reason}")]
    SymbolTable { line: usize, reason: String },

    /// Worker pool could not be created
    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Tracker thread could not be spawned
    #[error("Thread spawn error: {0}")]
    Spawn(#[from] std::io::Error),

    /// Synthetic signal generation rejected its input
    #[error("Synthesis error: {0}")]
    Synthesis(String),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for Tessera operations.
//!
//! This module provides the main error type [`TesseraError`] which wraps
//! the error conditions of configuration loading and schema analysis.

use std::io;

use thiserror::Error;

use tessera_analyzer::Diagnostic;

/// The main error type for Tessera operations.
///
/// # Diagnostic Variants
///
/// The `Analysis` variant carries a structured [`Diagnostic`] with source
/// locations, suitable for rich reporting through [`crate::report`].
#[derive(Debug, Error)]
pub enum TesseraError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Analysis(#[from] Diagnostic),
}

impl TesseraError {
    /// The analysis diagnostic, if this error came from the analyzer.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            TesseraError::Analysis(diag) => Some(diag),
            _ => None,
        }
    }
}

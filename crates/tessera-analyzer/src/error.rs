//! Error and diagnostic system for the Tessera analyzer.
//!
//! Every failure in the validate and transform pipelines is reported as a
//! [`Diagnostic`]: a typed [`ErrorKind`] carrying the contextual fields of the
//! failure, an [`ErrorCode`] derived from the kind, labeled source locations
//! and optional help text. The first diagnostic aborts the run.
//!
//! # Example
//!
//! ```
//! # use tessera_analyzer::error::{Diagnostic, ErrorCode, ErrorKind};
//! # use tessera_core::location::SourceLocation;
//!
//! let diag = Diagnostic::new(ErrorKind::DuplicateName { name: "id".into() })
//!     .with_label(SourceLocation::new("schema.tsr", 10, 5), "duplicate declaration")
//!     .with_secondary_label(SourceLocation::new("schema.tsr", 4, 5), "first declared here")
//!     .with_help("rename one of the declarations");
//!
//! assert_eq!(diag.code(), ErrorCode::E201);
//! ```

mod diagnostic;
mod error_code;
mod kind;
mod label;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use kind::ErrorKind;
pub use label::Label;

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;

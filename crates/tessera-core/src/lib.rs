//! Tessera Core Types
//!
//! This crate provides the foundational types shared by the Tessera schema
//! analyzer and the code generators that consume its output. It includes:
//!
//! - **Values**: Metadata values and ordered metadata maps ([`value::Value`])
//! - **Arity**: Occurrence constraints ([`arity::Arity`])
//! - **Locations**: Source positions for diagnostics ([`location::SourceLocation`])
//! - **Type info**: Validation and conversion for built-in types ([`typeinfo`] module)
//! - **Elements**: The immutable lowered schema tree ([`element`] module)

pub mod arity;
pub mod element;
pub mod location;
pub mod typeinfo;
pub mod value;

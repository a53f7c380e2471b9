//! Error Handling Module
//!
//! Errors produced while decoding traced request/response bodies.
//!
//! None of these errors ever reach the traced HTTP caller: the dispatcher logs
//! them through its `DiagnosticLogger` and lets the call proceed.

mod conversions;
pub mod types;

pub use types::*;

//! Request execution hooks
//!
//! Everything that sits on the HTTP path between the caller and the provider.

pub mod http;

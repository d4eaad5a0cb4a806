//! Concrete implementations of the collaborator traits.
//!
//! - [`ReqwestHttpClient`] - production HTTP transport
//! - [`mock`] - scripted collaborators for tests

pub mod mock;
mod reqwest_http;

pub use reqwest_http::ReqwestHttpClient;

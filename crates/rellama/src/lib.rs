//! Rellama - Local front end and reverse proxy for a remote Ollama server
//!
//! This crate provides a streaming reverse proxy that makes a remote
//! Ollama-compatible server look local, a typed API client over the same
//! protocol, and an interactive chat session, all sharing one redirect-aware
//! configuration store.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod proxy;
pub mod stream;

pub use error::RellamaError;

//! Retrying HTTP client wrapper used by the LLM resolver client.

mod client;

pub use client::{HttpClient, HttpClientBuilder};

//! HTTP-backed implementation of `regiodedupe_core::llm::LlmResolverPort`.

mod client;

pub use client::LlmHttpClient;

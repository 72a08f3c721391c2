// src/api/mod.rs
// REST API access

mod client;

pub use client::ApiClient;

// src/lib.rs
// Ares Club client library: session, REST, realtime chat, login and page state

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod login;
pub mod page;
pub mod realtime;
pub mod session;
pub mod types;

pub use error::{AresError, ErrorClass, Result};

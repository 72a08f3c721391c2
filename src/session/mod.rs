// src/session/mod.rs
// Persisted identity: storage backends and the session store

mod storage;
mod store;

pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{SessionStore, TOKEN_KEY, USER_KEY};

// SPDX-License-Identifier: MIT

//! Persistence layer (file-backed JSON).

pub mod json;

pub use json::{ExchangeSettings, NewUser, StoreError, UserStore};

/// File names inside the data directory.
pub mod files {
    pub const USERS: &str = "users.json";
    pub const SETTINGS: &str = "config.json";
}

// SPDX-License-Identifier: MIT

//! Santa-Exchange: backend for a secret santa gift exchange.
//!
//! This crate provides the JSON API for managing participants, collecting
//! gift preferences, and generating giver/receiver assignments.

pub mod config;
pub mod error;
pub mod matching;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use config::Config;
use services::MailService;
use store::UserStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: UserStore,
    pub mail: MailService,
}

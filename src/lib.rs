// SPDX-License-Identifier: MIT

//! NXO Mining API: backend for the NXO mining simulation.
//!
//! Users accrue NXO over time based on the cards they own, collect the
//! accrued amount into their balance, and get an email when a mining
//! session ends.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use cache::ReadCache;
use config::Config;
use db::StoreDb;
use services::{IdentityService, MailerService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: StoreDb,
    pub cache: ReadCache,
    pub identity: IdentityService,
    pub mailer: MailerService,
}

// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod card;
pub mod mining;
pub mod profile;

pub use card::{Card, CardCollection};
pub use mining::{MiningSession, MiningState};
pub use profile::Profile;

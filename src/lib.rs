//! PR Dispenser - review assignment service for team pull requests.
//!
//! Teams register their members; opening a pull request assigns up to two
//! active teammates of the author as reviewers, who stay busy until the pull
//! request is merged. The engine lives in [`services`], storage behind the
//! [`store::DirectoryStore`] trait, and [`api`] exposes it over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod store;

pub use config::{Config, DispenserConfig, ReassignActivityPolicy};
pub use error::AppError;
pub use services::{Dispenser, ReviewerShuffle};

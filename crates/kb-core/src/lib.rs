//! Core domain + application logic for the key holder bot.
//!
//! This crate is framework-agnostic. Telegram lives behind the `MessagingPort`
//! trait, implemented in the adapter crate.

pub mod audit;
pub mod config;
pub mod display;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod formatting;
pub mod intent;
pub mod logging;
pub mod messaging;
pub mod roster;
pub mod service;
pub mod state;

pub use errors::{Error, Result};

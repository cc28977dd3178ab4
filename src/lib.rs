//! points-ledger - gamified progression ledger
//!
//! Tracks points, experience, levels, daily sign-in streaks and like rewards
//! per user, and serves them to internal services over HTTP/JSON.
//!
//! ## Layers
//!
//! 1. [`progression`]: pure rules (level table, streaks, sign-in bonus, calendar)
//! 2. [`ledger`]: SQLite store and the user, points and statistics repositories
//! 3. [`service`]: the business operations, taking an explicit caller identity
//! 4. [`server`]: HTTP adapter run by a worker pool

pub mod clock;
pub mod config;
pub mod ledger;
pub mod progression;
pub mod server;
pub mod service;

//! # Stocksync Library
//!
//! Core functionality for the stock synchronization service: the push queue
//! worker, the pull reconcilers, and the marketplace client they share.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod projection;
pub mod reconcile;
pub mod repositories;
pub mod smartstore;
pub mod worker;
pub use migration;

//! Lotbook Portfolio Back-Office Library
//!
//! Core components for the Lotbook portfolio-management back office:
//! clients, stock investments, buy/sell transactions, and the position
//! reconciliation that keeps investment quantities consistent.

pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod persistence;
pub mod rate_limit;

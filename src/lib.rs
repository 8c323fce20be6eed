//! Wishlist snapshot scraping.
//!
//! Pages are acquired ([`scrapers`]), turned into [`models::ItemRecord`]s
//! ([`extract`]), aggregated per run ([`pipeline`]) and appended to a
//! PostgreSQL table ([`repository`]). [`report`] renders a run as a text table.

pub mod cli;
pub mod config;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod repository;
pub mod scrapers;
pub mod secrets;

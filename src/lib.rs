//! Nonprofit Back-Office Library
//!
//! Donor wealth indicators, capacity scoring, and the list-query and cache
//! contract shared by every back-office module.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `data`: Data access layer.
//! - `cache`: Module-namespaced TTL cache with scoped invalidation.
//! - `cache_validator`: Checksummed cache entries.
//! - `capacity`: Donor capacity estimation and scoring.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema setup.
//! - `db_storage`: Indicator store port and its Postgres adapter.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `list_query`: Pagination, sorting and filter normalization.
//! - `models`: Core data models.
//! - `permissions`: Permission gate for prospect management.
//! - `services`: Wealth-indicator module operations.

pub mod api;
pub mod core;
pub mod data;

pub mod cache;
pub mod cache_validator;
pub mod capacity;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod list_query;
pub mod models;
pub mod permissions;
pub mod services;

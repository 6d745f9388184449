//! Person records service backed by PostgreSQL.
//!
//! A repository-pattern data-access layer over a pooled sqlx connection,
//! plus the configuration and lifecycle pieces around it.
//!
//! # Modules
//!
//! - `config`: Configuration loading (JSON file, environment fallback).
//! - `db`: Connection pool management.
//! - `errors`: Error handling types.
//! - `models`: Person entity and attribute bag.
//! - `repository`: Generic statement-execution helpers.
//! - `person_storage`: Person SQL and row mapping.
//! - `service`: Database service façade.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod person_storage;
pub mod repository;
pub mod service;

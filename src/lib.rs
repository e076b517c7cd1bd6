//! Catalog API Library
//!
//! This crate provides the core functionality for the product catalog API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod services;
pub mod tracing;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Builds the versioned API router.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/health", handlers::health::health_routes())
        .nest("/products", handlers::products::products_routes())
}

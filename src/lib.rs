/*
 * Responsibility
 * - crate の module tree を公開する
 * - main.rs と tests/ の両方から同じ構成を使う
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;

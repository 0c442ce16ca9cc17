//! Brandmark Database Library
//!
//! This crate provides persistence for organization branding settings: the
//! `SettingsRepository` trait with Postgres and in-memory implementations.

pub mod db;

pub use db::*;

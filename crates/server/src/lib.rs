//! duenotes server library.
//!
//! Task notes with due-date push reminders, served as server-rendered pages.
//! The binary in `main.rs` wires configuration, the database pool, the
//! reminder scheduler and the router built here; the CLI reuses the
//! reminder scan.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

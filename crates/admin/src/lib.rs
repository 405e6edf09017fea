//! CareLink admin library.
//!
//! The coordinator dashboard as a library, so the binary, the CLI, and the
//! integration tests share one router and one set of repositories.
//!
//! # Security
//!
//! Signed-in admins can read volunteer contact details and message threads.
//! Every page except `/login` and the health checks requires an `admin`
//! session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod sync;

//! Inkmatch - ink recipe matching service
//!
//! HTTP and CLI front end for the `ink-recipe` engine.
//! This library exposes modules for integration testing.

pub mod api;
pub mod assets;
pub mod error;
pub mod models;
pub mod server;
pub mod services;

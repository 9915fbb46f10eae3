//! Examiner API Library Crate
//!
//! This library contains all the logic for the Examiner web service: the
//! application state, the Postgres session store, API handlers, and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;

//! Profile form backend
//!
//! Server-side controller for the "general profile" account form: hydration
//! from the current user, validation, region/town cascade, country picker,
//! avatar staging and submission to the user API.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod form;
pub mod i18n;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;

//! qrfast - dynamic QR codes backed by editable short links.
//!
//! Public scans hit `GET /go/{code}` and are redirected to the link's current
//! target; owners with a Pro subscription manage links through the JSON API.

pub mod admin;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod registry;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;
pub mod store;
pub mod users;

pub mod api;
pub mod auth;
pub mod client_ip;
pub mod config;
pub mod cors;
pub mod error;
pub mod factory;
pub mod ratelimit;
pub mod security;
pub mod telemetry;

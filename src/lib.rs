// ABOUTME: Library root for wabridge — re-exports all modules for integration testing.
// ABOUTME: The binary entry point is in main.rs, which uses this crate as a library.

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod qr;
pub mod session;
pub mod transport;

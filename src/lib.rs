//! Library crate for jeoparty-back: the live round engine and the service around it,
//! exposed for the binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod engine;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

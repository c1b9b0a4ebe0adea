//! Integration tests with mock HTTP server

pub mod catalog;
pub mod generation;
pub mod history;
pub mod mock_server;

//! Command implementations for the CLI
//!
//! - serve: Start the dashboard HTTP server
//! - watch: Terminal dashboard polling a running server
//! - incidents: Print grouped error incidents from the database
//! - check: Test the database connection
//! - config: Configuration display and validation

pub mod check;
pub mod config;
pub mod incidents;
pub mod serve;
pub mod watch;

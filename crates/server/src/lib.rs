//! HTTP surface for the buying assistant: the turn API, the approval
//! endpoint, and a readiness check.

pub mod bootstrap;
pub mod health;
pub mod routes;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};

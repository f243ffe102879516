//! Robot companion library
//!
//! Person tracking, focus-follow and navigation event coordination for a
//! service robot. Exposes modules for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;

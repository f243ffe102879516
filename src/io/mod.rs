//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT client for receiving remote-control commands
//! - `mqtt_status` - MQTT publisher for robot status
//! - `sim_gateway` - Simulated robot gateway

pub mod mqtt;
pub mod mqtt_status;
pub mod sim_gateway;

// Re-export commonly used types
pub use mqtt_status::{StatusPublisher, StatusSources};
pub use sim_gateway::SimGateway;

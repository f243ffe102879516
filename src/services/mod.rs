//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `coordinator` - Composition root and gateway callback handling
//! - `gateway` - Boundary trait to the vendor robot SDK
//! - `tracking` - Person tracking loop and target selection
//! - `follow` - Focus-follow state machine
//! - `detection` - Person-change listener registration
//! - `dispatcher` - Navigation event fan-out to listeners
//! - `places` - Places catalog
//! - `interaction` - Listening/speech coordination
//! - `remote` - Remote command parsing and worker

pub mod coordinator;
pub mod detection;
pub mod dispatcher;
pub mod follow;
pub mod gateway;
pub mod interaction;
pub mod places;
pub mod remote;
pub mod tracking;

// Re-export commonly used types
pub use coordinator::Coordinator;
pub use dispatcher::NavigationListener;
pub use gateway::RobotGateway;
pub use remote::{create_remote_worker, RemoteCommand, RemoteCommandWorker};

//! sandbox-vm: lifecycle and orchestration of the Vagrant VM that sandboxes a
//! coding agent.
//!
//! [`vm::Manager`] drives one project's VM; [`session::SandboxSession`] is one
//! agent run sharing it.

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod session;
pub mod vm;

pub use config::VmSettings;
pub use error::{PreflightError, VmError, VmResult};

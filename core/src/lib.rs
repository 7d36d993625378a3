//! # Patrol Core
//!
//! The inspection pipeline:
//!
//! * **[`executor`]**: SSH implementation of the remote shell port.
//! * **[`plan`]**: the action list of a run, with every parse schema compiled once.
//! * **[`runner`]**: inspects one device, action by action.
//! * **[`orchestrator`]**: fans the runner out over the fleet and persists the results.
//! * **[`repository`]**: in-memory registries and file-backed record stores.

pub mod executor;
pub mod orchestrator;
pub mod plan;
pub mod repository;
pub mod runner;

pub use orchestrator::InspectionService;

//! Concrete adapters for the [`RemoteExecutor`](patrol_common::executor::RemoteExecutor) port.
//!
//! The inspection pipeline never names an adapter directly; the CLI picks one and hands it to
//! [`InspectionService`](crate::InspectionService) behind the trait.

mod ssh;

pub use ssh::SshExecutor;

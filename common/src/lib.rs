//! # Patrol Common
//!
//! Shared vocabulary of the inspection engine: the domain records ([`device`], [`action`],
//! [`inspection`]), the run [`config`], the [`error`] taxonomy and the port traits that the
//! engine depends on ([`registry`], [`executor`]).
//!
//! Concrete implementations of the ports live in `patrol-core`.

pub mod action;
pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod inspection;
pub mod registry;

#[doc(hidden)]
pub use tracing;

/// Logs a completion message at `INFO` level under the `patrol::success` target.
///
/// The CLI formatter renders these with a distinct success marker.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "patrol::success", $($arg)*)
    };
}

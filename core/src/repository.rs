//! Implementations of the registry and store contracts in
//! [`patrol_common::registry`].
//!
//! * [`memory`]: process-local registries, seeded from inventory files by the CLI.
//! * [`jsonl`]: append-only JSON-lines inspection store.

mod jsonl;
mod memory;

pub use jsonl::JsonLinesStore;
pub use memory::{MemoryActionRegistry, MemoryDeviceRegistry, MemoryInspectionStore};

//! User-script registration: the runtime seams, the coordinator that owns
//! the registration table, and the pure helpers around it.

pub mod capability;
pub mod classify;
pub mod coordinator;
pub mod inventory;
pub mod locks;
pub mod memory;
pub mod pattern;
pub mod store;

pub use classify::{classify, CodeKind};
pub use coordinator::{Coordinator, Unregistered};
pub use inventory::{display_state, get_display_state, ScriptMetadata};
pub use memory::{MemoryStyleTarget, MemoryUserScripts};
pub use pattern::derive_pattern;
pub use store::{
    is_not_found_fault, FaultKind, RegistrationStore, RunAt, ScriptRegistration, StoreFault,
    StyleTarget,
};

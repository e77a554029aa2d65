//! Pure domain logic for the cortex cognitive architecture.
//!
//! No I/O happens here. Infrastructure concerns (storage, concrete backend
//! implementations) are abstracted behind the traits defined in this crate
//! and implemented in `cortex-infra` / `cortex-engine`.

pub mod consciousness;
pub mod knowledge;
pub mod learning;
pub mod memory;
pub mod reasoning;

pub use consciousness::*;
pub use knowledge::*;
pub use learning::*;
pub use memory::*;
pub use reasoning::*;

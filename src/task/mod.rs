pub mod errors;
pub mod models;
pub mod registry;

pub use errors::RegistryError;
pub use models::{Artifact, Task, TaskId, TaskSnapshot, TaskState, TaskStatus, TaskSummary, TaskUpdate};
pub use registry::TaskRegistry;

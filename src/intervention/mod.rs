pub mod script;
pub mod spec;

pub use script::{resolve, StepScript};
pub use spec::{InterventionKind, InterventionSpec, DEFAULT_DURATION_MS};

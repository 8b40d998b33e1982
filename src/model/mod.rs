pub mod element;
pub mod project;
pub mod registry;

pub use element::ElementRef;
pub use project::ProjectFile;
pub use registry::{AddOutcome, ProjectRegistry};

pub mod ifc;
pub mod schema;
pub mod step;

pub use crate::error::ParseError;
pub use ifc::{format_step_value, Entity, IfcModel, PropertySets, SetIndex, SetKind};
pub use step::{StepEntity, StepFile, StepValue};

use crate::parser::Entity;
use serde::{Serialize, Serializer};
use std::fmt;

/// A detached reference to one entity of one open file.
///
/// Validation results keep these instead of borrowing from the parsed
/// model, so reports outlive the borrow of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub filename: String,
    pub id: u64,
    pub class: String,
    pub global_id: Option<String>,
    pub name: Option<String>,
}

impl ElementRef {
    #[must_use]
    pub fn from_entity(filename: &str, entity: &Entity<'_>) -> Self {
        Self {
            filename: filename.to_string(),
            id: entity.id(),
            class: entity.class(),
            global_id: entity.global_id().map(str::to_string),
            name: entity.name().map(str::to_string),
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}={}", self.id, self.class)?;
        if let Some(name) = &self.name {
            write!(f, " '{name}'")?;
        }
        Ok(())
    }
}

/// Exported as its string form; the entity itself is not serializable.
impl Serialize for ElementRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

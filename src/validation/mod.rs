//! Rule based and cross-file validation of the open project.

pub mod aggregator;
pub mod ids;
pub mod integrity;
pub mod reporter;

pub use aggregator::{
    ElementValidation, ReportFormat, RequirementSummary, SpecificationSummary, Tally,
    ValidationAggregator, ValidationRecord, ValidationStatus, Validator, ValidatorReports,
};
pub use ids::{Cardinality, Facet, IdsValidator, Requirement, Specification, ValueConstraint};
pub use integrity::{IntegrityValidator, INTEGRITY_ID};
pub use reporter::{EntityResult, Reporter, RequirementResult, SpecificationResult};

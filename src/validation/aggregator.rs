use crate::error::{ExportError, RuleError};
use crate::export;
use crate::model::ProjectRegistry;
use crate::tree::Tree;
use crate::validation::ids::{Cardinality, IdsValidator};
use crate::validation::integrity::{IntegrityValidator, INTEGRITY_ID};
use crate::validation::reporter::Reporter;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum Validator {
    Ids(IdsValidator),
    Integrity(IntegrityValidator),
}

impl Validator {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Validator::Ids(ids) => ids.id(),
            Validator::Integrity(integrity) => integrity.id(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Validator::Ids(ids) => ids.title(),
            Validator::Integrity(integrity) => integrity.title(),
        }
    }
}

/// Results of one validator: per file for rule documents, one shared
/// report for the integrity check.
#[derive(Debug, Clone)]
pub enum ValidatorReports {
    PerFile(BTreeMap<String, Reporter>),
    Shared(Reporter),
}

impl ValidatorReports {
    fn iter(&self) -> Box<dyn Iterator<Item = &Reporter> + '_> {
        match self {
            ValidatorReports::PerFile(reports) => Box::new(reports.values()),
            ValidatorReports::Shared(report) => Box::new(std::iter::once(report)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Idle,
    Validated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Bcf,
    Json,
}

/// Per element counters over every report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
}

/// One check an element went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRecord {
    pub validator: String,
    pub specification: String,
    pub specification_description: String,
    pub requirement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The validated file; `None` for the integrity check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementValidation {
    pub failed: Vec<ValidationRecord>,
    pub passed: Vec<ValidationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementSummary {
    pub description: String,
    pub failed: usize,
    pub passed: usize,
}

/// Outcome of one specification over all files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationSummary {
    pub name: String,
    pub failed: usize,
    pub passed: usize,
    pub requirements: Vec<RequirementSummary>,
}

impl SpecificationSummary {
    #[must_use]
    pub fn text(&self) -> String {
        format!("{} failed, {} passed", self.failed, self.passed)
    }
}

/// The active validators of a session and their latest results.
#[derive(Debug, Clone)]
pub struct ValidationAggregator {
    validators: Vec<Validator>,
    reports: HashMap<String, ValidatorReports>,
    results_by_guid: HashMap<String, Tally>,
}

impl Default for ValidationAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationAggregator {
    /// Starts with the integrity check registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: vec![Validator::Integrity(IntegrityValidator::new())],
            reports: HashMap::new(),
            results_by_guid: HashMap::new(),
        }
    }

    /// Loads an IDS document and activates it. A document with the same
    /// file name replaces the previous one. All results are cleared.
    /// Returns the validator id.
    ///
    /// # Errors
    ///
    /// The document is not added if it is missing or malformed.
    pub fn add_ids_file<P: AsRef<Path>>(&mut self, path: P) -> Result<String, RuleError> {
        let validator = IdsValidator::open(path)?;
        info!(validator = validator.id(), title = validator.title(), "rule file added");
        Ok(self.add_ids_validator(validator))
    }

    pub fn add_ids_validator(&mut self, validator: IdsValidator) -> String {
        self.clear_results();
        let id = validator.id().to_string();
        match self.validators.iter().position(|v| v.id() == id) {
            Some(index) => self.validators[index] = Validator::Ids(validator),
            None => self.validators.push(Validator::Ids(validator)),
        }
        id
    }

    /// Removes a rule document. The integrity check cannot be removed.
    pub fn remove_validator(&mut self, id: &str) -> bool {
        if id == INTEGRITY_ID {
            return false;
        }
        let before = self.validators.len();
        self.validators.retain(|v| v.id() != id);
        let removed = self.validators.len() != before;
        if removed {
            self.clear_results();
        }
        removed
    }

    /// Changes one requirement of a rule document; its results are dropped.
    pub fn set_cardinality(
        &mut self,
        id: &str,
        specification: usize,
        requirement: usize,
        cardinality: Cardinality,
    ) -> bool {
        let changed = self.validators.iter_mut().any(|v| match v {
            Validator::Ids(ids) if ids.id() == id => {
                ids.set_cardinality(specification, requirement, cardinality)
            }
            _ => false,
        });
        if changed && self.reports.remove(id).is_some() {
            self.recount();
        }
        changed
    }

    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    #[must_use]
    pub fn validator(&self, id: &str) -> Option<&Validator> {
        self.validators.iter().find(|v| v.id() == id)
    }

    /// Runs one validator, or all of them when `id` is `None`.
    ///
    /// Rule documents run once per open file, the integrity check once over
    /// `location` (the location view of the same files). Previous results of
    /// the validators run are discarded first. Returns how many validators ran.
    pub fn validate(&mut self, id: Option<&str>, registry: &ProjectRegistry, location: &Tree) -> usize {
        let targets: Vec<usize> = self
            .validators
            .iter()
            .enumerate()
            .filter(|(_, v)| id.is_none_or(|id| v.id() == id))
            .map(|(i, _)| i)
            .collect();
        if targets.is_empty() {
            warn!(validator = id, "no such validator");
            return 0;
        }

        for &index in &targets {
            let validator = &self.validators[index];
            self.reports.remove(validator.id());
            let reports = match validator {
                Validator::Integrity(integrity) => {
                    ValidatorReports::Shared(integrity.validate(registry, location))
                }
                Validator::Ids(ids) => ValidatorReports::PerFile(
                    registry
                        .iter()
                        .map(|file| (file.filename().to_string(), ids.validate_file(file)))
                        .collect(),
                ),
            };
            self.reports.insert(validator.id().to_string(), reports);
        }
        self.recount();

        info!(
            validators = targets.len(),
            files = registry.count(),
            elements = self.results_by_guid.len(),
            "validation finished"
        );
        targets.len()
    }

    fn recount(&mut self) {
        self.results_by_guid.clear();
        for reports in self.reports.values() {
            for reporter in reports.iter() {
                for (_, _, entity, failed) in reporter.entity_results() {
                    // Entities without a global id are not counted
                    let Some(guid) = &entity.element.global_id else {
                        continue;
                    };
                    let tally = self.results_by_guid.entry(guid.clone()).or_default();
                    if failed {
                        tally.failed += 1;
                    } else {
                        tally.passed += 1;
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn status(&self, id: &str) -> ValidationStatus {
        if self.reports.contains_key(id) {
            ValidationStatus::Validated
        } else {
            ValidationStatus::Idle
        }
    }

    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.reports.is_empty()
    }

    /// The report of a validator for one file; the file is ignored for the
    /// integrity check.
    #[must_use]
    pub fn reporter(&self, id: &str, filename: Option<&str>) -> Option<&Reporter> {
        match self.reports.get(id)? {
            ValidatorReports::Shared(report) => Some(report),
            ValidatorReports::PerFile(reports) => reports.get(filename?),
        }
    }

    #[must_use]
    pub fn tally(&self, guid: &str) -> Option<Tally> {
        self.results_by_guid.get(guid).copied()
    }

    /// Validation column text, `None` if the element was never checked.
    #[must_use]
    pub fn tally_text(&self, guid: &str) -> Option<String> {
        self.tally(guid)
            .map(|t| format!("{} failed, {} passed", t.failed, t.passed))
    }

    /// Every check involving the element, restricted to the given files.
    #[must_use]
    pub fn results_for_element(&self, guid: &str, filenames: &[&str]) -> ElementValidation {
        let mut result = ElementValidation::default();

        for validator in &self.validators {
            let Some(reports) = self.reports.get(validator.id()) else {
                continue;
            };
            let selected: Vec<(&Reporter, Option<&str>)> = match reports {
                ValidatorReports::Shared(report) => vec![(report, None)],
                ValidatorReports::PerFile(reports) => filenames
                    .iter()
                    .filter_map(|f| reports.get(*f).map(|r| (r, Some(*f))))
                    .collect(),
            };

            for (reporter, filename) in selected {
                for (spec, req, entity, failed) in reporter.entity_results() {
                    if entity.element.global_id.as_deref() != Some(guid) {
                        continue;
                    }
                    let record = ValidationRecord {
                        validator: validator.id().to_string(),
                        specification: spec.name.clone(),
                        specification_description: spec.description.clone(),
                        requirement: req.description.clone(),
                        reason: entity.reason.clone(),
                        filename: filename.map(str::to_string),
                    };
                    if failed {
                        result.failed.push(record);
                    } else {
                        result.passed.push(record);
                    }
                }
            }
        }
        result
    }

    /// Failed and passed checks per specification and requirement, summed
    /// over all files.
    #[must_use]
    pub fn summary(&self, id: &str) -> Vec<SpecificationSummary> {
        let mut summaries: Vec<SpecificationSummary> = Vec::new();
        let Some(reports) = self.reports.get(id) else {
            return summaries;
        };

        for reporter in reports.iter() {
            for (index, spec) in reporter.specifications.iter().enumerate() {
                if summaries.len() <= index {
                    summaries.push(SpecificationSummary {
                        name: spec.name.clone(),
                        failed: 0,
                        passed: 0,
                        requirements: spec
                            .requirements
                            .iter()
                            .map(|r| RequirementSummary {
                                description: r.description.clone(),
                                failed: 0,
                                passed: 0,
                            })
                            .collect(),
                    });
                }
                let summary = &mut summaries[index];
                summary.failed += spec.total_checks_fail;
                summary.passed += spec.total_checks_pass;
                for (req_summary, req) in summary.requirements.iter_mut().zip(&spec.requirements) {
                    req_summary.failed += req.failed_entities.len();
                    req_summary.passed += req.passed_entities.len();
                }
            }
        }
        summaries
    }

    /// Writes one report as a BCF bundle or as JSON.
    ///
    /// # Errors
    ///
    /// [`ExportError::UnknownReporter`] if the validator has no result for
    /// the file, or any write error.
    pub fn save_results(
        &self,
        id: &str,
        filename: Option<&str>,
        output: &Path,
        format: ReportFormat,
    ) -> Result<(), ExportError> {
        let reporter = self
            .reporter(id, filename)
            .ok_or_else(|| ExportError::UnknownReporter {
                validator: id.to_string(),
                filename: filename.unwrap_or_default().to_string(),
            })?;
        match format {
            ReportFormat::Json => export::json::export_report(reporter, output),
            ReportFormat::Bcf => export::bcf::export_report(reporter, output),
        }
    }

    /// Drops all results, keeping the validators.
    pub fn clear_results(&mut self) {
        self.reports.clear();
        self.results_by_guid.clear();
    }

    /// Drops all results and rule documents; only the integrity check stays.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

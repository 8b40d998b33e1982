//! Structured results of one validator run.

use crate::model::ElementRef;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResult {
    pub element: ElementRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EntityResult {
    #[must_use]
    pub fn passed(element: ElementRef) -> Self {
        Self {
            element,
            reason: None,
        }
    }

    #[must_use]
    pub fn failed(element: ElementRef, reason: String) -> Self {
        Self {
            element,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementResult {
    pub description: String,
    /// True when no entity failed.
    pub status: bool,
    pub passed_entities: Vec<EntityResult>,
    pub failed_entities: Vec<EntityResult>,
}

impl RequirementResult {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: true,
            passed_entities: Vec::new(),
            failed_entities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecificationResult {
    pub name: String,
    pub description: String,
    pub applicability: Vec<String>,
    pub status: bool,
    pub requirements: Vec<RequirementResult>,
    pub total_applicable: usize,
    pub total_checks_pass: usize,
    pub total_checks_fail: usize,
}

impl SpecificationResult {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            applicability: Vec::new(),
            status: true,
            requirements: Vec::new(),
            total_applicable: 0,
            total_checks_pass: 0,
            total_checks_fail: 0,
        }
    }

    pub fn record_pass(&mut self, requirement: usize, element: ElementRef) {
        if let Some(req) = self.requirements.get_mut(requirement) {
            req.passed_entities.push(EntityResult::passed(element));
            self.total_checks_pass += 1;
        }
    }

    pub fn record_fail(&mut self, requirement: usize, element: ElementRef, reason: String) {
        if let Some(req) = self.requirements.get_mut(requirement) {
            req.failed_entities.push(EntityResult::failed(element, reason));
            req.status = false;
            self.status = false;
            self.total_checks_fail += 1;
        }
    }
}

/// Result of one validator against one file, or against all files for the
/// integrity check (`filename` is then `None`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reporter {
    pub title: String,
    pub filename: Option<String>,
    pub specifications: Vec<SpecificationResult>,
}

impl Reporter {
    /// Every entity result, with a flag telling whether it failed.
    pub fn entity_results(&self) -> impl Iterator<Item = (&SpecificationResult, &RequirementResult, &EntityResult, bool)> {
        self.specifications.iter().flat_map(|spec| {
            spec.requirements.iter().flat_map(move |req| {
                req.failed_entities
                    .iter()
                    .map(move |e| (spec, req, e, true))
                    .chain(req.passed_entities.iter().map(move |e| (spec, req, e, false)))
            })
        })
    }

    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.specifications.iter().map(|s| s.total_checks_fail).sum()
    }

    #[must_use]
    pub fn total_passed(&self) -> usize {
        self.specifications.iter().map(|s| s.total_checks_pass).sum()
    }
}

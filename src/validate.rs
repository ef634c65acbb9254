//! Validation pipeline
//!
//! Schema conformance checks run during load and save. Every event is
//! reported exactly once, in discovery order, to a caller-supplied policy
//! that decides per event whether the operation continues or aborts. The
//! pipeline never buffers or deduplicates events.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SaveError;
use crate::model::{AttributeKind, Domain, ModelDocument, ObjectType, PackageTree};
use crate::version::{FamilyId, MimVersion, ModelingVariant};

/// Severity of a validation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single schema validation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEvent {
    pub severity: Severity,
    pub message: String,
    /// Element context the event was discovered in
    pub location: String,
}

impl ValidationEvent {
    pub fn new(severity: Severity, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: location.into(),
        }
    }
}

impl fmt::Display for ValidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (at {})", self.severity, self.message, self.location)
    }
}

/// Decision returned by a validation policy for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Continue,
    Abort,
}

/// Policy that aborts on any error-severity event and continues past
/// warnings
pub fn abort_on_error(event: &ValidationEvent) -> PolicyDecision {
    match event.severity {
        Severity::Warning => PolicyDecision::Continue,
        Severity::Error => PolicyDecision::Abort,
    }
}

/// Policy that continues past every event
pub fn continue_always(_event: &ValidationEvent) -> PolicyDecision {
    PolicyDecision::Continue
}

/// Feeds events to the caller's policy, one at a time
///
/// `report` returns the triggering event as `Err` when the policy aborts;
/// the enclosing load/save call fails with it.
pub(crate) struct Validator<'p> {
    policy: &'p mut dyn FnMut(&ValidationEvent) -> PolicyDecision,
}

impl<'p> Validator<'p> {
    pub(crate) fn new(policy: &'p mut dyn FnMut(&ValidationEvent) -> PolicyDecision) -> Self {
        Self { policy }
    }

    pub(crate) fn report(
        &mut self,
        severity: Severity,
        location: &str,
        message: impl Into<String>,
    ) -> Result<(), ValidationEvent> {
        let event = ValidationEvent::new(severity, location, message);
        match (self.policy)(&event) {
            PolicyDecision::Continue => Ok(()),
            PolicyDecision::Abort => Err(event),
        }
    }
}

/// Check the header fields that bind a document to its family
///
/// Fields that are absent are not reported here; absence is a save-time
/// completeness concern. A present field that contradicts the family is an
/// error-severity event.
pub(crate) fn check_header(
    doc: &ModelDocument,
    family: FamilyId,
    validator: &mut Validator<'_>,
) -> Result<(), ValidationEvent> {
    let header = &doc.informatiemodel;
    if let Some(version) = &header.mim_version {
        if MimVersion::parse(version) != Some(family.version) {
            validator.report(
                Severity::Error,
                "Informatiemodel/MIMversie",
                format!("MIMversie '{}' does not match the {} family", version, family),
            )?;
        }
    }
    if let Some(variant) = &header.modeling_variant {
        if ModelingVariant::parse(variant) != Some(family.variant) {
            validator.report(
                Severity::Error,
                "Informatiemodel/relatiemodelleringstype",
                format!(
                    "relatiemodelleringstype '{}' does not match the {} family",
                    variant, family
                ),
            )?;
        }
    }
    Ok(())
}

/// Check that every structurally required field is set before serialization
///
/// This runs ahead of the policy-gated schema checks; an unset required
/// field is a hard failure, never a silent omission on the wire.
pub(crate) fn check_required_fields(doc: &ModelDocument) -> Result<(), SaveError> {
    let header = &doc.informatiemodel;
    require(header.name.is_some(), "Informatiemodel", "naam")?;
    require(header.provenance.is_some(), "Informatiemodel", "herkomst")?;
    require(header.definition.is_some(), "Informatiemodel", "definitie")?;
    require(
        header.definition_provenance.is_some(),
        "Informatiemodel",
        "herkomstDefinitie",
    )?;
    require(header.adoption_date.is_some(), "Informatiemodel", "datumOpname")?;
    require(header.model_kind.is_some(), "Informatiemodel", "informatiemodeltype")?;
    require(
        header.information_domain.is_some(),
        "Informatiemodel",
        "informatiedomein",
    )?;
    require(
        header.modeling_variant.is_some(),
        "Informatiemodel",
        "relatiemodelleringstype",
    )?;
    require(header.mim_version.is_some(), "Informatiemodel", "MIMversie")?;
    require(header.language.is_some(), "Informatiemodel", "MIMtaal")?;
    check_tree(&doc.packages)
}

fn check_tree(tree: &PackageTree) -> Result<(), SaveError> {
    for domain in &tree.domains {
        check_domain(domain)?;
    }
    Ok(())
}

fn check_domain(domain: &Domain) -> Result<(), SaveError> {
    let label = format!(
        "Domein '{}'",
        domain
            .name
            .as_deref()
            .or(domain.id.as_deref())
            .unwrap_or("(unnamed)")
    );
    require(domain.id.is_some(), &label, "id")?;
    require(domain.name.is_some(), &label, "naam")?;
    require(domain.provenance.is_some(), &label, "herkomst")?;
    require(domain.definition.is_some(), &label, "definitie")?;
    require(domain.definition_provenance.is_some(), &label, "herkomstDefinitie")?;
    require(domain.adoption_date.is_some(), &label, "datumOpname")?;
    for object_type in &domain.object_types {
        check_object_type(object_type)?;
    }
    check_tree(&domain.packages)
}

fn check_object_type(object_type: &ObjectType) -> Result<(), SaveError> {
    let label = format!(
        "Objecttype '{}'",
        object_type.name.as_deref().unwrap_or("(unnamed)")
    );
    require(object_type.name.is_some(), &label, "naam")?;
    for kind in &object_type.attribute_kinds {
        check_attribute_kind(kind, &label)?;
    }
    Ok(())
}

fn check_attribute_kind(kind: &AttributeKind, owner: &str) -> Result<(), SaveError> {
    let label = format!(
        "Attribuutsoort '{}' of {}",
        kind.name.as_deref().unwrap_or("(unnamed)"),
        owner
    );
    require(kind.name.is_some(), &label, "naam")?;
    require(kind.type_ascription.is_some(), &label, "type ascription")?;
    Ok(())
}

fn require(present: bool, element: &str, field: &'static str) -> Result<(), SaveError> {
    if present {
        Ok(())
    } else {
        Err(SaveError::MissingField {
            element: element.to_string(),
            field,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Informatiemodel;

    #[test]
    fn test_event_display() {
        let event = ValidationEvent::new(Severity::Error, "Informatiemodel/MIMversie", "mismatch");
        assert_eq!(
            event.to_string(),
            "error: mismatch (at Informatiemodel/MIMversie)"
        );
    }

    #[test]
    fn test_validator_abort_returns_triggering_event() {
        let mut policy = abort_on_error;
        let mut validator = Validator::new(&mut policy);
        assert!(validator
            .report(Severity::Warning, "Informatiemodel", "odd but fine")
            .is_ok());
        let event = validator
            .report(Severity::Error, "Informatiemodel", "fatal")
            .unwrap_err();
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.message, "fatal");
    }

    #[test]
    fn test_events_reported_in_order() {
        let mut seen = Vec::new();
        let mut policy = |event: &ValidationEvent| {
            seen.push(event.message.clone());
            PolicyDecision::Continue
        };
        let mut validator = Validator::new(&mut policy);
        validator.report(Severity::Warning, "a", "first").unwrap();
        validator.report(Severity::Error, "b", "second").unwrap();
        drop(validator);
        assert_eq!(seen, vec!["first", "second"]);
    }

    #[test]
    fn test_required_fields_reports_first_missing() {
        let mut doc = ModelDocument::new();
        doc.informatiemodel = Informatiemodel {
            name: Some("Mijn model".into()),
            ..Informatiemodel::default()
        };
        let err = check_required_fields(&doc).unwrap_err();
        match err {
            SaveError::MissingField { element, field } => {
                assert_eq!(element, "Informatiemodel");
                assert_eq!(field, "herkomst");
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }
}

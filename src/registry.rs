//! Model family registry and facade
//!
//! The registry is process-wide, read-only configuration: a static mapping
//! from (version, variant) to the family's wire namespace. The facade
//! exposes the uniform create/load/save operations across families.
//!
//! Loading performs parse → validate → resolve; a returned model has every
//! reachable reference resolved. Saving performs required-field
//! completeness → pre-serialize validation → serialize → post-serialize
//! schema conformance.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use tracing::debug;

use crate::error::{LoadError, SaveError};
use crate::model::ModelDocument;
use crate::resolve;
use crate::validate::{self, PolicyDecision, ValidationEvent, Validator};
use crate::version::{FamilyId, MimVersion, ModelingVariant};
use crate::wire;

/// Registry entry for one model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySpec {
    pub id: FamilyId,
    /// Namespace bound to the `MIM` prefix on the root element
    pub namespace: &'static str,
}

const FAMILIES: [FamilySpec; 4] = [
    FamilySpec {
        id: FamilyId {
            version: MimVersion::V1_1,
            variant: ModelingVariant::RelatiesoortLeidend,
        },
        namespace: "http://www.geostandaarden.nl/mim/relatiesoort/1.1",
    },
    FamilySpec {
        id: FamilyId {
            version: MimVersion::V1_1,
            variant: ModelingVariant::RelatierolLeidend,
        },
        namespace: "http://www.geostandaarden.nl/mim/relatierol/1.1",
    },
    FamilySpec {
        id: FamilyId {
            version: MimVersion::V1_2,
            variant: ModelingVariant::RelatiesoortLeidend,
        },
        namespace: "http://www.geostandaarden.nl/mim/relatiesoort/1.2",
    },
    FamilySpec {
        id: FamilyId {
            version: MimVersion::V1_2,
            variant: ModelingVariant::RelatierolLeidend,
        },
        namespace: "http://www.geostandaarden.nl/mim/relatierol/1.2",
    },
];

static BY_NAMESPACE: Lazy<HashMap<&'static str, FamilyId>> =
    Lazy::new(|| FAMILIES.iter().map(|spec| (spec.namespace, spec.id)).collect());

/// All registered families
pub fn families() -> &'static [FamilySpec] {
    &FAMILIES
}

/// The registry entry for a (version, variant) pair
///
/// Every pair of the closed version and variant enums is registered.
pub fn family_spec(id: FamilyId) -> &'static FamilySpec {
    FAMILIES
        .iter()
        .find(|spec| spec.id == id)
        .expect("every (version, variant) pair is registered")
}

/// Look up the family declared by a document namespace
pub fn family_for_namespace(namespace: &str) -> Option<FamilyId> {
    BY_NAMESPACE.get(namespace).copied()
}

/// A model document bound to its family
///
/// The binding is permanent: the family selected at creation or sniffed at
/// load determines the namespace and conformance checks used by `save`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFamily {
    family: FamilyId,
    document: ModelDocument,
}

impl ModelFamily {
    pub fn family(&self) -> FamilyId {
        self.family
    }

    pub fn spec(&self) -> &'static FamilySpec {
        family_spec(self.family)
    }

    pub fn document(&self) -> &ModelDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut ModelDocument {
        &mut self.document
    }

    pub fn into_document(self) -> ModelDocument {
        self.document
    }

    /// Validate and serialize the model
    ///
    /// Required-but-unset fields fail before serialization; schema events
    /// discovered before and after serialization go through the policy.
    pub fn save<W: Write>(
        &self,
        mut out: W,
        mut policy: impl FnMut(&ValidationEvent) -> PolicyDecision,
    ) -> Result<(), SaveError> {
        validate::check_required_fields(&self.document)?;
        {
            let mut validator = Validator::new(&mut policy);
            validate::check_header(&self.document, self.family, &mut validator)
                .map_err(|event| SaveError::Rejected { event })?;
        }

        let mut bytes = Vec::new();
        wire::write_document(&mut bytes, self.spec(), &self.document)?;

        // post-serialize schema conformance over the produced bytes
        {
            let mut validator = Validator::new(&mut policy);
            wire::read_document(bytes.as_slice(), &mut validator).map_err(|err| match err {
                LoadError::Rejected { event } => SaveError::Rejected { event },
                LoadError::Xml(e) => SaveError::Xml(e),
                LoadError::Io(e) => SaveError::Io(e),
                other => SaveError::Conformance {
                    reason: other.to_string(),
                },
            })?;
        }

        out.write_all(&bytes)?;
        debug!(family = %self.family, bytes = bytes.len(), "saved model");
        Ok(())
    }
}

/// Create a minimally-populated model of the selected family
///
/// Required-but-unset fields are left unset; the caller must populate them
/// before `save` succeeds.
pub fn new_model(version: MimVersion, variant: ModelingVariant) -> ModelFamily {
    ModelFamily {
        family: FamilyId::new(version, variant),
        document: ModelDocument::new(),
    }
}

/// Load a serialization, validating it against the caller's policy
///
/// Performs parse → validate → resolve. The family is selected by the
/// namespace declared on the root element; an unregistered namespace is
/// [`LoadError::UnknownFamily`].
pub fn load_model<R: BufRead>(
    input: R,
    mut policy: impl FnMut(&ValidationEvent) -> PolicyDecision,
) -> Result<ModelFamily, LoadError> {
    let mut validator = Validator::new(&mut policy);
    let (family, mut document) = wire::read_document(input, &mut validator)?;
    validate::check_header(&document, family, &mut validator)
        .map_err(|event| LoadError::Rejected { event })?;
    resolve::resolve_references(&mut document)?;
    debug!(family = %family, "loaded model");
    Ok(ModelFamily { family, document })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::abort_on_error;

    #[test]
    fn test_every_family_is_registered() {
        assert_eq!(families().len(), 4);
        for spec in families() {
            assert_eq!(family_spec(spec.id), spec);
            assert_eq!(family_for_namespace(spec.namespace), Some(spec.id));
        }
    }

    #[test]
    fn test_unknown_namespace_is_none() {
        assert_eq!(
            family_for_namespace("http://www.geostandaarden.nl/mim/relatiesoort/9.9"),
            None
        );
    }

    #[test]
    fn test_new_model_is_bound_to_family() {
        let model = new_model(MimVersion::V1_2, ModelingVariant::RelatiesoortLeidend);
        assert_eq!(model.family().version, MimVersion::V1_2);
        assert_eq!(
            model.spec().namespace,
            "http://www.geostandaarden.nl/mim/relatiesoort/1.2"
        );
    }

    #[test]
    fn test_save_fails_on_unset_required_field() {
        let model = new_model(MimVersion::V1_2, ModelingVariant::RelatiesoortLeidend);
        let mut out = Vec::new();
        let err = model.save(&mut out, abort_on_error).unwrap_err();
        assert!(matches!(err, SaveError::MissingField { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_load_rejects_unknown_namespace() {
        let doc = r#"<MIM:Informatiemodel xmlns:MIM="http://example.org/anders"/>"#;
        let err = load_model(doc.as_bytes(), abort_on_error).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnknownFamily { namespace } if namespace == "http://example.org/anders"
        ));
    }

    #[test]
    fn test_load_rejects_foreign_root() {
        let doc = r#"<Anders xmlns:MIM="http://www.geostandaarden.nl/mim/relatiesoort/1.2"/>"#;
        let err = load_model(doc.as_bytes(), abort_on_error).unwrap_err();
        assert!(matches!(err, LoadError::UnexpectedRoot { .. }));
    }
}

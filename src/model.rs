//! Schema-derived base model
//!
//! A plain data tree mirroring the MIM wire document 1:1. The document
//! exclusively owns its whole subtree; the only cross-links are
//! [`Reference`] values, which hold non-owning [`ElementHandle`] index
//! paths into the tree once resolved. Structural accessors only; derived
//! queries live in the `ext` module.

use serde::{Deserialize, Serialize};

use crate::xhtml::XhtmlText;

/// Root of a parsed or constructed model document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub informatiemodel: Informatiemodel,
    pub packages: PackageTree,
}

/// Provenance header of the model (wire element `Informatiemodel`)
///
/// Every field is optional in memory; the required-field table is enforced
/// at save time, not at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Informatiemodel {
    /// `naam`
    pub name: Option<String>,
    /// `herkomst`
    pub provenance: Option<String>,
    /// `definitie`
    pub definition: Option<XhtmlText>,
    /// `herkomstDefinitie`
    pub definition_provenance: Option<String>,
    /// `datumOpname`
    pub adoption_date: Option<String>,
    /// `informatiemodeltype`
    pub model_kind: Option<String>,
    /// `informatiedomein`
    pub information_domain: Option<String>,
    /// `relatiemodelleringstype`
    pub modeling_variant: Option<String>,
    /// `MIMversie`
    pub mim_version: Option<String>,
    /// `MIMtaal`
    pub language: Option<String>,
}

/// Ordered domain packages (wire element `packages`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageTree {
    pub domains: Vec<Domain>,
}

/// A domain package (wire element `Domein`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: Option<String>,
    pub name: Option<String>,
    pub provenance: Option<String>,
    pub definition: Option<XhtmlText>,
    pub definition_provenance: Option<String>,
    pub adoption_date: Option<String>,
    pub object_types: Vec<ObjectType>,
    /// Nested domain packages; document order defines the tree
    pub packages: PackageTree,
}

/// An object type (wire element `Objecttype`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectType {
    pub id: Option<String>,
    pub name: Option<String>,
    pub definition: Option<XhtmlText>,
    pub attribute_kinds: Vec<AttributeKind>,
    /// Generalization edges to supertypes, in document order
    pub supertypes: Vec<Generalization>,
}

/// An attribute kind (wire element `Attribuutsoort`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeKind {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Exactly one ascription is required on the wire; `None` only occurs
    /// on freshly constructed values that are not yet populated
    pub type_ascription: Option<AttributeTypeAscription>,
}

/// The closed eight-way type ascription of an attribute kind
///
/// This is a tagged union, not an open hierarchy: code inspecting the
/// ascription dispatches exhaustively over exactly these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeTypeAscription {
    /// `Datatype`, carrying a literal type value
    PlainDatatype { value: String },
    /// `PrimitiefDatatype`
    PrimitiveDatatype { name: String },
    /// `GestructureerdDatatype`
    StructuredDatatype { name: String },
    /// `Codelijst`
    CodeList { name: String },
    /// `Referentielijst`
    ReferenceList { name: String },
    /// `Enumeratie`
    Enumeration { name: String },
    /// `Keuze`
    Choice { name: String },
    /// `Constructie`, carrying an identifier rather than a name
    Construct { id: String },
}

impl AttributeTypeAscription {
    /// The wire element name of this ascription
    pub fn wire_name(&self) -> &'static str {
        match self {
            AttributeTypeAscription::PlainDatatype { .. } => "Datatype",
            AttributeTypeAscription::PrimitiveDatatype { .. } => "PrimitiefDatatype",
            AttributeTypeAscription::StructuredDatatype { .. } => "GestructureerdDatatype",
            AttributeTypeAscription::CodeList { .. } => "Codelijst",
            AttributeTypeAscription::ReferenceList { .. } => "Referentielijst",
            AttributeTypeAscription::Enumeration { .. } => "Enumeratie",
            AttributeTypeAscription::Choice { .. } => "Keuze",
            AttributeTypeAscription::Construct { .. } => "Constructie",
        }
    }
}

/// A generalization edge (wire element `GeneralisatieObjecttype`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generalization {
    pub id: Option<String>,
    /// Reference to the supertype object type
    pub supertype: Reference,
}

impl Generalization {
    /// A new edge referencing the given target identifier
    pub fn to(target_id: impl Into<String>) -> Self {
        Self {
            id: None,
            supertype: Reference::Unresolved(target_id.into()),
        }
    }
}

/// A document-local reference, textual until resolved
///
/// The two states stay distinguishable: `Unresolved` is "not yet linked",
/// while a failed lookup is a resolution error, never a silent null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reference {
    /// Target identifier string as parsed from the wire
    Unresolved(String),
    /// Non-owning handle to the target node, set by the resolution pass
    Resolved(ElementHandle),
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    /// The textual identifier of a not-yet-resolved reference
    pub fn pending_identifier(&self) -> Option<&str> {
        match self {
            Reference::Unresolved(id) => Some(id),
            Reference::Resolved(_) => None,
        }
    }

    /// The referenced element, valid only once resolved
    pub fn target<'a>(&self, doc: &'a ModelDocument) -> Option<ModelElement<'a>> {
        match self {
            Reference::Unresolved(_) => None,
            Reference::Resolved(handle) => doc.element(handle),
        }
    }
}

/// Non-owning index path addressing one element within its document
///
/// `path` holds child indices from the root package tree down to the
/// owning domain; the remaining indices address within that domain.
/// Handles are positional: structural mutation of the tree invalidates
/// handles into the mutated region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementHandle {
    Domain {
        path: Vec<usize>,
    },
    ObjectType {
        domain: Vec<usize>,
        index: usize,
    },
    AttributeKind {
        domain: Vec<usize>,
        object_type: usize,
        index: usize,
    },
    Generalization {
        domain: Vec<usize>,
        object_type: usize,
        index: usize,
    },
}

/// Borrowed view of one model element
#[derive(Debug, Clone, Copy)]
pub enum ModelElement<'a> {
    Domain(&'a Domain),
    ObjectType(&'a ObjectType),
    AttributeKind(&'a AttributeKind),
    Generalization(&'a Generalization),
}

impl<'a> ModelElement<'a> {
    /// The element's name, if the element kind carries one
    pub fn name(&self) -> Option<&'a str> {
        match self {
            ModelElement::Domain(domain) => domain.name.as_deref(),
            ModelElement::ObjectType(object_type) => object_type.name.as_deref(),
            ModelElement::AttributeKind(kind) => kind.name.as_deref(),
            ModelElement::Generalization(_) => None,
        }
    }

    /// The element's stable identifier, if set
    pub fn id(&self) -> Option<&'a str> {
        match self {
            ModelElement::Domain(domain) => domain.id.as_deref(),
            ModelElement::ObjectType(object_type) => object_type.id.as_deref(),
            ModelElement::AttributeKind(kind) => kind.id.as_deref(),
            ModelElement::Generalization(generalization) => generalization.id.as_deref(),
        }
    }

    /// The object type behind this view, if it is one
    pub fn as_object_type(&self) -> Option<&'a ObjectType> {
        match self {
            ModelElement::ObjectType(object_type) => Some(object_type),
            _ => None,
        }
    }
}

impl ModelDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the element addressed by a handle
    ///
    /// `None` when the handle no longer points into the tree (the tree was
    /// structurally mutated since the handle was created).
    pub fn element(&self, handle: &ElementHandle) -> Option<ModelElement<'_>> {
        match handle {
            ElementHandle::Domain { path } => self.domain_at(path).map(ModelElement::Domain),
            ElementHandle::ObjectType { domain, index } => self
                .domain_at(domain)?
                .object_types
                .get(*index)
                .map(ModelElement::ObjectType),
            ElementHandle::AttributeKind {
                domain,
                object_type,
                index,
            } => self
                .domain_at(domain)?
                .object_types
                .get(*object_type)?
                .attribute_kinds
                .get(*index)
                .map(ModelElement::AttributeKind),
            ElementHandle::Generalization {
                domain,
                object_type,
                index,
            } => self
                .domain_at(domain)?
                .object_types
                .get(*object_type)?
                .supertypes
                .get(*index)
                .map(ModelElement::Generalization),
        }
    }

    fn domain_at(&self, path: &[usize]) -> Option<&Domain> {
        let (first, rest) = path.split_first()?;
        let mut domain = self.packages.domains.get(*first)?;
        for index in rest {
            domain = domain.packages.domains.get(*index)?;
        }
        Some(domain)
    }

    /// Visit every element in pre-order document order
    ///
    /// Order per domain: the domain itself, its object types (each followed
    /// by its attribute kinds and generalizations), then nested packages.
    pub fn visit_elements<'a>(
        &'a self,
        visit: &mut dyn FnMut(ElementHandle, ModelElement<'a>),
    ) {
        let mut path = Vec::new();
        visit_tree(&self.packages, &mut path, visit);
    }
}

fn visit_tree<'a>(
    tree: &'a PackageTree,
    path: &mut Vec<usize>,
    visit: &mut dyn FnMut(ElementHandle, ModelElement<'a>),
) {
    for (domain_index, domain) in tree.domains.iter().enumerate() {
        path.push(domain_index);
        visit(
            ElementHandle::Domain { path: path.clone() },
            ModelElement::Domain(domain),
        );
        for (type_index, object_type) in domain.object_types.iter().enumerate() {
            visit(
                ElementHandle::ObjectType {
                    domain: path.clone(),
                    index: type_index,
                },
                ModelElement::ObjectType(object_type),
            );
            for (kind_index, kind) in object_type.attribute_kinds.iter().enumerate() {
                visit(
                    ElementHandle::AttributeKind {
                        domain: path.clone(),
                        object_type: type_index,
                        index: kind_index,
                    },
                    ModelElement::AttributeKind(kind),
                );
            }
            for (edge_index, generalization) in object_type.supertypes.iter().enumerate() {
                visit(
                    ElementHandle::Generalization {
                        domain: path.clone(),
                        object_type: type_index,
                        index: edge_index,
                    },
                    ModelElement::Generalization(generalization),
                );
            }
        }
        visit_tree(&domain.packages, path, visit);
        path.pop();
    }
}

impl ObjectType {
    /// A new object type with the given stable identifier and name
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl AttributeKind {
    pub fn new(name: impl Into<String>, type_ascription: AttributeTypeAscription) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            type_ascription: Some(type_ascription),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> ModelDocument {
        let mut doc = ModelDocument::new();
        let mut outer = Domain {
            id: Some("d1".into()),
            name: Some("Winkel".into()),
            ..Domain::default()
        };
        let mut supplier = ObjectType::named("ot-leverancier", "Leverancier");
        supplier.attribute_kinds.push(AttributeKind::new(
            "kvk nummer",
            AttributeTypeAscription::PrimitiveDatatype {
                name: "Tekst".into(),
            },
        ));
        supplier.supertypes.push(Generalization::to("ot-partij"));
        outer.object_types.push(supplier);
        outer.object_types.push(ObjectType::named("ot-partij", "Partij"));

        let nested = Domain {
            id: Some("d2".into()),
            name: Some("Administratie".into()),
            object_types: vec![ObjectType::named("ot-rekening", "Bankrekening")],
            ..Domain::default()
        };
        outer.packages.domains.push(nested);
        doc.packages.domains.push(outer);
        doc
    }

    #[test]
    fn test_handle_lookup() {
        let doc = sample_document();
        let handle = ElementHandle::ObjectType {
            domain: vec![0, 0],
            index: 0,
        };
        let element = doc.element(&handle).unwrap();
        assert_eq!(element.name(), Some("Bankrekening"));
        assert_eq!(element.id(), Some("ot-rekening"));
    }

    #[test]
    fn test_stale_handle_is_none() {
        let doc = sample_document();
        let handle = ElementHandle::ObjectType {
            domain: vec![3],
            index: 0,
        };
        assert!(doc.element(&handle).is_none());
    }

    #[test]
    fn test_visit_order_is_document_order() {
        let doc = sample_document();
        let mut names = Vec::new();
        doc.visit_elements(&mut |_, element| {
            if let Some(name) = element.name() {
                names.push(name.to_string());
            }
        });
        assert_eq!(
            names,
            vec![
                "Winkel",
                "Leverancier",
                "kvk nummer",
                "Partij",
                "Administratie",
                "Bankrekening"
            ]
        );
    }

    #[test]
    fn test_reference_states() {
        let doc = sample_document();
        let unresolved = Reference::Unresolved("ot-partij".into());
        assert!(!unresolved.is_resolved());
        assert_eq!(unresolved.pending_identifier(), Some("ot-partij"));
        assert!(unresolved.target(&doc).is_none());

        let resolved = Reference::Resolved(ElementHandle::ObjectType {
            domain: vec![0],
            index: 1,
        });
        assert!(resolved.is_resolved());
        assert_eq!(resolved.target(&doc).unwrap().name(), Some("Partij"));
    }
}

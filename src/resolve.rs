//! Reference resolution engine
//!
//! Second pass over a fully parsed document: references may point forward
//! or backward in document order, so resolution cannot be interleaved with
//! parsing. One scan builds an identifier index, one walk replaces every
//! `Unresolved` reference with a handle. Re-running the pass over an
//! already-resolved document is a no-op.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::error::ResolveError;
use crate::model::{ElementHandle, ModelDocument, PackageTree, Reference};

/// Resolve every reference in the document
///
/// Fails with [`ResolveError::DanglingReference`] when a target identifier
/// does not exist in the document and with
/// [`ResolveError::DuplicateIdentifier`] when one identifier is declared
/// twice. The engine does not check what kind of element a reference
/// targets; that is a schema concern.
pub fn resolve_references(doc: &mut ModelDocument) -> Result<(), ResolveError> {
    let index = build_identifier_index(doc)?;
    let resolved = resolve_tree_refs(&mut doc.packages, &index)?;
    debug!(identifiers = index.len(), resolved, "resolved document references");
    Ok(())
}

fn build_identifier_index(
    doc: &ModelDocument,
) -> Result<HashMap<String, ElementHandle>, ResolveError> {
    let mut index = HashMap::new();
    let mut duplicate = None;
    doc.visit_elements(&mut |handle, element| {
        if let Some(id) = element.id() {
            if index.insert(id.to_string(), handle).is_some() && duplicate.is_none() {
                duplicate = Some(id.to_string());
            }
        }
    });
    match duplicate {
        Some(id) => Err(ResolveError::DuplicateIdentifier { id }),
        None => Ok(index),
    }
}

fn resolve_tree_refs(
    tree: &mut PackageTree,
    index: &HashMap<String, ElementHandle>,
) -> Result<usize, ResolveError> {
    let mut resolved = 0;
    for domain in &mut tree.domains {
        for object_type in &mut domain.object_types {
            for generalization in &mut object_type.supertypes {
                resolved += resolve_reference(&mut generalization.supertype, index)?;
            }
        }
        resolved += resolve_tree_refs(&mut domain.packages, index)?;
    }
    Ok(resolved)
}

fn resolve_reference(
    reference: &mut Reference,
    index: &HashMap<String, ElementHandle>,
) -> Result<usize, ResolveError> {
    // already-resolved references are left untouched, never re-looked-up
    let Reference::Unresolved(id) = reference else {
        return Ok(0);
    };
    match index.get(id.as_str()) {
        Some(handle) => {
            trace!(id = id.as_str(), "linked reference");
            *reference = Reference::Resolved(handle.clone());
            Ok(1)
        }
        None => Err(ResolveError::DanglingReference { id: id.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, Generalization, ObjectType};

    fn document_with_edge(target: &str) -> ModelDocument {
        let mut doc = ModelDocument::new();
        let mut domain = Domain {
            id: Some("d1".into()),
            name: Some("Winkel".into()),
            ..Domain::default()
        };
        let mut subtype = ObjectType::named("ot-leverancier", "Leverancier");
        subtype.supertypes.push(Generalization::to(target));
        domain.object_types.push(subtype);
        domain
            .object_types
            .push(ObjectType::named("ot-partij", "Partij"));
        doc.packages.domains.push(domain);
        doc
    }

    #[test]
    fn test_resolves_forward_reference() {
        let mut doc = document_with_edge("ot-partij");
        resolve_references(&mut doc).unwrap();
        let reference = &doc.packages.domains[0].object_types[0].supertypes[0].supertype;
        assert!(reference.is_resolved());
        assert_eq!(reference.target(&doc).unwrap().name(), Some("Partij"));
    }

    #[test]
    fn test_dangling_reference_fails() {
        let mut doc = document_with_edge("ot-bestaat-niet");
        let err = resolve_references(&mut doc).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DanglingReference { id } if id == "ot-bestaat-niet"
        ));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut doc = document_with_edge("ot-partij");
        resolve_references(&mut doc).unwrap();
        let first = doc.packages.domains[0].object_types[0].supertypes[0]
            .supertype
            .clone();
        resolve_references(&mut doc).unwrap();
        let second = &doc.packages.domains[0].object_types[0].supertypes[0].supertype;
        assert_eq!(&first, second);
    }

    #[test]
    fn test_duplicate_identifier_fails() {
        let mut doc = document_with_edge("ot-partij");
        doc.packages.domains[0]
            .object_types
            .push(ObjectType::named("ot-partij", "PartijKopie"));
        let err = resolve_references(&mut doc).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DuplicateIdentifier { id } if id == "ot-partij"
        ));
    }
}

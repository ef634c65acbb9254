//! Name index over the element hierarchy
//!
//! Amortizes repeated name lookups: one full traversal maps each name to
//! the elements carrying it, in document order. The index is a snapshot;
//! it is **not** kept in sync with the tree. Callers that structurally
//! mutate the document and then query by name must call
//! [`NameIndex::rebuild`] first, or results are stale.

use indexmap::IndexMap;
use tracing::debug;

use crate::model::{ElementHandle, ModelDocument, ModelElement};

/// Map from element name to the elements carrying it
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_name: IndexMap<String, Vec<ElementHandle>>,
}

impl NameIndex {
    /// Build the index with one full tree traversal
    pub fn build(doc: &ModelDocument) -> Self {
        let mut index = NameIndex::default();
        index.rebuild(doc);
        index
    }

    /// Discard the current snapshot and re-traverse the document
    pub fn rebuild(&mut self, doc: &ModelDocument) {
        self.by_name.clear();
        doc.visit_elements(&mut |handle, element| {
            if let Some(name) = element.name() {
                self.by_name
                    .entry(name.to_string())
                    .or_default()
                    .push(handle);
            }
        });
        debug!(names = self.by_name.len(), "rebuilt name index");
    }

    /// Handles of every element with the given name, in document order
    ///
    /// A miss is an empty slice, not an error.
    pub fn get(&self, name: &str) -> &[ElementHandle] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Borrowed views of every element with the given name
    ///
    /// Handles that no longer point into the tree (mutation since the last
    /// rebuild) are skipped.
    pub fn elements<'a>(&self, doc: &'a ModelDocument, name: &str) -> Vec<ModelElement<'a>> {
        self.get(name)
            .iter()
            .filter_map(|handle| doc.element(handle))
            .collect()
    }

    /// Number of distinct names in the index
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, ObjectType};

    fn sample_document() -> ModelDocument {
        let mut doc = ModelDocument::new();
        let mut first = Domain {
            id: Some("d1".into()),
            name: Some("Winkel".into()),
            object_types: vec![ObjectType::named("ot-1", "Artikel")],
            ..Domain::default()
        };
        first.packages.domains.push(Domain {
            id: Some("d2".into()),
            name: Some("Magazijn".into()),
            object_types: vec![ObjectType::named("ot-2", "Artikel")],
            ..Domain::default()
        });
        doc.packages.domains.push(first);
        doc
    }

    #[test]
    fn test_shared_names_in_document_order() {
        let doc = sample_document();
        let index = NameIndex::build(&doc);
        let elements = index.elements(&doc, "Artikel");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].id(), Some("ot-1"));
        assert_eq!(elements[1].id(), Some("ot-2"));
    }

    #[test]
    fn test_miss_is_empty_not_error() {
        let doc = sample_document();
        let index = NameIndex::build(&doc);
        assert!(index.get("Onbekend").is_empty());
        assert!(index.elements(&doc, "Onbekend").is_empty());
    }

    #[test]
    fn test_stale_until_rebuilt() {
        let doc = sample_document();
        let mut index = NameIndex::build(&doc);

        let mut mutated = doc.clone();
        mutated.packages.domains[0]
            .object_types
            .push(ObjectType::named("ot-3", "Artikel"));

        // snapshot semantics: the new element is invisible until rebuild
        assert_eq!(index.elements(&mutated, "Artikel").len(), 2);
        index.rebuild(&mutated);
        assert_eq!(index.elements(&mutated, "Artikel").len(), 3);
    }
}

//! Extension decoration layer
//!
//! Derived, read-mostly query operations over the base tree, kept out of
//! the schema-derived types so that layer stays regenerable. Everything
//! here operates purely in memory over the already-materialized tree; no
//! re-parsing or re-validation. Cost is proportional to tree size per
//! query; use [`crate::index::NameIndex`] to amortize repeated lookups.

use crate::error::ContentFormatError;
use crate::model::{AttributeKind, ModelDocument, ModelElement, ObjectType};
use crate::xhtml::XhtmlText;

/// Derived queries on [`ObjectType`]
pub trait ObjectTypeExt {
    /// First direct attribute kind with exactly the given name
    ///
    /// Case-sensitive; absence is an empty result, not an error.
    fn attribute_kind(&self, name: &str) -> Option<&AttributeKind>;
}

impl ObjectTypeExt for ObjectType {
    fn attribute_kind(&self, name: &str) -> Option<&AttributeKind> {
        self.attribute_kinds
            .iter()
            .find(|kind| kind.name.as_deref() == Some(name))
    }
}

/// Canonical string accessors on rich-text values
pub trait RichTextExt {
    /// The content in its canonical string form
    fn content_as_string(&self) -> String;

    /// Replace the content from a markup string
    ///
    /// Malformed markup fails with [`ContentFormatError`] and leaves the
    /// value unchanged; the rest of the document is unaffected.
    fn set_content_as_string(&mut self, content: &str) -> Result<(), ContentFormatError>;
}

impl RichTextExt for XhtmlText {
    fn content_as_string(&self) -> String {
        self.to_canonical_string()
    }

    fn set_content_as_string(&mut self, content: &str) -> Result<(), ContentFormatError> {
        *self = XhtmlText::from_string(content)?;
        Ok(())
    }
}

/// Derived queries over the whole document
pub trait DocumentExt {
    /// Every element with exactly the given name, across every nested
    /// domain, in pre-order document traversal order
    fn model_elements_by_name(&self, name: &str) -> Vec<ModelElement<'_>>;

    /// First object type with exactly the given name
    ///
    /// Multiple elements may share a name across domains; taking the first
    /// match in document order is an explicit tie-break, not a uniqueness
    /// guarantee. Use [`DocumentExt::model_elements_by_name`] to see every
    /// candidate.
    fn object_type_by_name(&self, name: &str) -> Option<&ObjectType>;
}

impl DocumentExt for ModelDocument {
    fn model_elements_by_name(&self, name: &str) -> Vec<ModelElement<'_>> {
        let mut matches = Vec::new();
        self.visit_elements(&mut |_, element| {
            if element.name() == Some(name) {
                matches.push(element);
            }
        });
        matches
    }

    fn object_type_by_name(&self, name: &str) -> Option<&ObjectType> {
        self.model_elements_by_name(name)
            .into_iter()
            .find_map(|element| element.as_object_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeTypeAscription, Domain, ObjectType};

    fn sample_document() -> ModelDocument {
        let mut doc = ModelDocument::new();
        let mut domain = Domain {
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
        domain.object_types.push(supplier);
        domain.packages.domains.push(Domain {
            id: Some("d2".into()),
            name: Some("Leverancier".into()),
            ..Domain::default()
        });
        doc.packages.domains.push(domain);
        doc
    }

    #[test]
    fn test_attribute_kind_exact_match() {
        let doc = sample_document();
        let supplier = doc.object_type_by_name("Leverancier").unwrap();
        assert!(supplier.attribute_kind("kvk nummer").is_some());
        assert!(supplier.attribute_kind("KVK nummer").is_none());
        assert!(supplier.attribute_kind("btw nummer").is_none());
    }

    #[test]
    fn test_elements_by_name_spans_nested_domains() {
        let doc = sample_document();
        // the object type comes first in document order, the nested domain second
        let elements = doc.model_elements_by_name("Leverancier");
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements[0], ModelElement::ObjectType(_)));
        assert!(matches!(elements[1], ModelElement::Domain(_)));
    }

    #[test]
    fn test_elements_by_name_miss_is_empty() {
        let doc = sample_document();
        assert!(doc.model_elements_by_name("Bestaat niet").is_empty());
    }

    #[test]
    fn test_object_type_by_name_skips_domains() {
        let mut doc = sample_document();
        doc.packages.domains[0].name = Some("Leverancier".into());
        // domain precedes the object type in traversal order, yet the
        // object-type lookup must return the object type
        let found = doc.object_type_by_name("Leverancier").unwrap();
        assert_eq!(found.id.as_deref(), Some("ot-leverancier"));
    }

    #[test]
    fn test_rich_text_setter_rejects_malformed() {
        let mut text = XhtmlText::new();
        text.set_content_as_string("<xhtml:p>goed</xhtml:p>").unwrap();
        let before = text.clone();
        assert!(text.set_content_as_string("<xhtml:p>fout").is_err());
        assert_eq!(text, before);
    }
}

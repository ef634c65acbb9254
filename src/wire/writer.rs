//! Event writer serializing the base tree back to the wire format
//!
//! Only set fields are written; required-field completeness is checked by
//! the validation pipeline before the writer runs. Resolved references are
//! written back as the target's stable identifier.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use tracing::debug;

use crate::error::SaveError;
use crate::model::{
    AttributeKind, AttributeTypeAscription, Domain, Generalization, ModelDocument, ObjectType,
    PackageTree, Reference,
};
use crate::registry::FamilySpec;
use crate::xhtml::XhtmlText;

const ROOT: &str = "MIM:Informatiemodel";

/// Serialize a document for the given family
pub(crate) fn write_document<W: Write>(
    out: W,
    spec: &FamilySpec,
    doc: &ModelDocument,
) -> Result<(), SaveError> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    let mut root = BytesStart::new(ROOT);
    root.push_attribute(("xmlns:MIM", spec.namespace));
    root.push_attribute(("xmlns:xhtml", super::XHTML_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    let header = &doc.informatiemodel;
    opt_simple(&mut writer, "naam", &header.name)?;
    opt_simple(&mut writer, "herkomst", &header.provenance)?;
    opt_rich_text(&mut writer, "definitie", &header.definition)?;
    opt_simple(&mut writer, "herkomstDefinitie", &header.definition_provenance)?;
    opt_simple(&mut writer, "datumOpname", &header.adoption_date)?;
    opt_simple(&mut writer, "informatiemodeltype", &header.model_kind)?;
    opt_simple(&mut writer, "informatiedomein", &header.information_domain)?;
    opt_simple(&mut writer, "relatiemodelleringstype", &header.modeling_variant)?;
    opt_simple(&mut writer, "MIMversie", &header.mim_version)?;
    opt_simple(&mut writer, "MIMtaal", &header.language)?;

    write_package_tree(&mut writer, doc, &doc.packages)?;

    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    debug!(family = %spec.id, "serialized document");
    Ok(())
}

fn write_package_tree<W: Write>(
    writer: &mut Writer<W>,
    doc: &ModelDocument,
    tree: &PackageTree,
) -> Result<(), SaveError> {
    if tree.domains.is_empty() {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new("packages")))?;
    for domain in &tree.domains {
        write_domain(writer, doc, domain)?;
    }
    writer.write_event(Event::End(BytesEnd::new("packages")))?;
    Ok(())
}

fn write_domain<W: Write>(
    writer: &mut Writer<W>,
    doc: &ModelDocument,
    domain: &Domain,
) -> Result<(), SaveError> {
    let mut start = BytesStart::new("Domein");
    if let Some(id) = &domain.id {
        start.push_attribute(("id", id.as_str()));
    }
    writer.write_event(Event::Start(start))?;
    opt_simple(writer, "naam", &domain.name)?;
    opt_simple(writer, "herkomst", &domain.provenance)?;
    opt_rich_text(writer, "definitie", &domain.definition)?;
    opt_simple(writer, "herkomstDefinitie", &domain.definition_provenance)?;
    opt_simple(writer, "datumOpname", &domain.adoption_date)?;
    if !domain.object_types.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("objecttypen")))?;
        for object_type in &domain.object_types {
            write_object_type(writer, doc, object_type)?;
        }
        writer.write_event(Event::End(BytesEnd::new("objecttypen")))?;
    }
    write_package_tree(writer, doc, &domain.packages)?;
    writer.write_event(Event::End(BytesEnd::new("Domein")))?;
    Ok(())
}

fn write_object_type<W: Write>(
    writer: &mut Writer<W>,
    doc: &ModelDocument,
    object_type: &ObjectType,
) -> Result<(), SaveError> {
    let mut start = BytesStart::new("Objecttype");
    if let Some(id) = &object_type.id {
        start.push_attribute(("id", id.as_str()));
    }
    writer.write_event(Event::Start(start))?;
    opt_simple(writer, "naam", &object_type.name)?;
    opt_rich_text(writer, "definitie", &object_type.definition)?;
    if !object_type.attribute_kinds.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("attribuutsoorten")))?;
        for kind in &object_type.attribute_kinds {
            write_attribute_kind(writer, kind)?;
        }
        writer.write_event(Event::End(BytesEnd::new("attribuutsoorten")))?;
    }
    if !object_type.supertypes.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("supertypen")))?;
        for generalization in &object_type.supertypes {
            write_generalization(writer, doc, generalization)?;
        }
        writer.write_event(Event::End(BytesEnd::new("supertypen")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Objecttype")))?;
    Ok(())
}

fn write_attribute_kind<W: Write>(
    writer: &mut Writer<W>,
    kind: &AttributeKind,
) -> Result<(), SaveError> {
    let mut start = BytesStart::new("Attribuutsoort");
    if let Some(id) = &kind.id {
        start.push_attribute(("id", id.as_str()));
    }
    writer.write_event(Event::Start(start))?;
    opt_simple(writer, "naam", &kind.name)?;
    if let Some(ascription) = &kind.type_ascription {
        match ascription {
            AttributeTypeAscription::PlainDatatype { value } => {
                simple(writer, "Datatype", value)?;
            }
            AttributeTypeAscription::PrimitiveDatatype { name } => {
                empty_with_attr(writer, "PrimitiefDatatype", "naam", name)?;
            }
            AttributeTypeAscription::StructuredDatatype { name } => {
                empty_with_attr(writer, "GestructureerdDatatype", "naam", name)?;
            }
            AttributeTypeAscription::CodeList { name } => {
                empty_with_attr(writer, "Codelijst", "naam", name)?;
            }
            AttributeTypeAscription::ReferenceList { name } => {
                empty_with_attr(writer, "Referentielijst", "naam", name)?;
            }
            AttributeTypeAscription::Enumeration { name } => {
                empty_with_attr(writer, "Enumeratie", "naam", name)?;
            }
            AttributeTypeAscription::Choice { name } => {
                empty_with_attr(writer, "Keuze", "naam", name)?;
            }
            AttributeTypeAscription::Construct { id } => {
                empty_with_attr(writer, "Constructie", "id", id)?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new("Attribuutsoort")))?;
    Ok(())
}

fn write_generalization<W: Write>(
    writer: &mut Writer<W>,
    doc: &ModelDocument,
    generalization: &Generalization,
) -> Result<(), SaveError> {
    let target_id = match &generalization.supertype {
        Reference::Unresolved(id) => id.clone(),
        Reference::Resolved(handle) => doc
            .element(handle)
            .and_then(|element| element.id().map(str::to_string))
            .ok_or_else(|| SaveError::Conformance {
                reason: "resolved reference target no longer exists or has no identifier"
                    .to_string(),
            })?,
    };
    let mut start = BytesStart::new("GeneralisatieObjecttype");
    if let Some(id) = &generalization.id {
        start.push_attribute(("id", id.as_str()));
    }
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Start(BytesStart::new("supertype")))?;
    simple(writer, "ObjecttypeRef", &target_id)?;
    writer.write_event(Event::End(BytesEnd::new("supertype")))?;
    writer.write_event(Event::End(BytesEnd::new("GeneralisatieObjecttype")))?;
    Ok(())
}

fn simple<W: Write>(writer: &mut Writer<W>, tag: &str, value: &str) -> Result<(), SaveError> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn empty_with_attr<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    attr: &str,
    value: &str,
) -> Result<(), SaveError> {
    let mut start = BytesStart::new(tag);
    start.push_attribute((attr, value));
    writer.write_event(Event::Empty(start))?;
    Ok(())
}

fn opt_simple<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &Option<String>,
) -> Result<(), SaveError> {
    if let Some(value) = value {
        simple(writer, tag, value)?;
    }
    Ok(())
}

fn opt_rich_text<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &Option<XhtmlText>,
) -> Result<(), SaveError> {
    if let Some(text) = value {
        writer.write_event(Event::Start(BytesStart::new(tag)))?;
        // the canonical fragment is already escaped markup
        writer.write_event(Event::Text(BytesText::from_escaped(
            text.to_canonical_string(),
        )))?;
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }
    Ok(())
}

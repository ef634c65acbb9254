//! Event reader building the base tree from a serialization
//!
//! Matching is on local element names; the family is sniffed from the
//! namespace declared on the root element. Unknown elements are reported
//! as warning events and skipped; structural schema violations are
//! error events. Both go through the caller's validation policy.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::io::BufRead;
use tracing::debug;

use crate::error::LoadError;
use crate::model::{
    AttributeKind, AttributeTypeAscription, Domain, Generalization, ModelDocument, ObjectType,
    PackageTree, Reference,
};
use crate::registry;
use crate::validate::{Severity, Validator};
use crate::version::FamilyId;
use crate::xhtml::{self, XhtmlText};

/// Parse a serialization into its family id and base tree
pub(crate) fn read_document<R: BufRead>(
    input: R,
    validator: &mut Validator<'_>,
) -> Result<(FamilyId, ModelDocument), LoadError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();

    // locate the root element and sniff its family namespace
    let family = loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if local(e.name()) != b"Informatiemodel" {
                    return Err(LoadError::UnexpectedRoot {
                        found: qname_string(e.name()),
                    });
                }
                break sniff_family(&e)?;
            }
            Event::Empty(e) => {
                // a bare self-closing root is an empty but valid document
                if local(e.name()) != b"Informatiemodel" {
                    return Err(LoadError::UnexpectedRoot {
                        found: qname_string(e.name()),
                    });
                }
                let family = sniff_family(&e)?;
                return Ok((family, ModelDocument::new()));
            }
            Event::Eof => return Err(LoadError::MissingRoot),
            Event::Text(_)
            | Event::CData(_)
            | Event::Decl(_)
            | Event::Comment(_)
            | Event::PI(_)
            | Event::DocType(_)
            | Event::End(_) => {}
        }
        buf.clear();
    };
    buf.clear();

    let mut document = ModelDocument::new();
    read_informatiemodel(&mut reader, &mut document, validator)?;
    debug!(family = %family, domains = document.packages.domains.len(), "parsed document");
    Ok((family, document))
}

fn sniff_family(e: &BytesStart<'_>) -> Result<FamilyId, LoadError> {
    let mut candidate = None;
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = attr.key.into_inner();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            let value = attr.unescape_value()?.into_owned();
            if let Some(family) = registry::family_for_namespace(&value) {
                return Ok(family);
            }
            if value != super::XHTML_NAMESPACE && candidate.is_none() {
                candidate = Some(value);
            }
        }
    }
    Err(LoadError::UnknownFamily {
        namespace: candidate.unwrap_or_default(),
    })
}

fn read_informatiemodel<R: BufRead>(
    reader: &mut Reader<R>,
    document: &mut ModelDocument,
    validator: &mut Validator<'_>,
) -> Result<(), LoadError> {
    const CONTEXT: &str = "Informatiemodel";
    let header = &mut document.informatiemodel;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                match name.as_slice() {
                    b"naam" => header.name = Some(read_text(reader, validator, CONTEXT)?),
                    b"herkomst" => header.provenance = Some(read_text(reader, validator, CONTEXT)?),
                    b"definitie" => header.definition = Some(read_rich_text(reader, b"definitie")?),
                    b"herkomstDefinitie" => {
                        header.definition_provenance = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"datumOpname" => {
                        header.adoption_date = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"informatiemodeltype" => {
                        header.model_kind = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"informatiedomein" => {
                        header.information_domain = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"relatiemodelleringstype" => {
                        header.modeling_variant = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"MIMversie" => {
                        header.mim_version = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"MIMtaal" => header.language = Some(read_text(reader, validator, CONTEXT)?),
                    b"packages" => document.packages = read_package_tree(reader, validator)?,
                    other => {
                        warn_unknown(validator, CONTEXT, other)?;
                        skip_element(reader)?;
                    }
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                match name.as_slice() {
                    b"naam" => header.name = Some(String::new()),
                    b"herkomst" => header.provenance = Some(String::new()),
                    b"definitie" => header.definition = Some(XhtmlText::new()),
                    b"herkomstDefinitie" => header.definition_provenance = Some(String::new()),
                    b"datumOpname" => header.adoption_date = Some(String::new()),
                    b"informatiemodeltype" => header.model_kind = Some(String::new()),
                    b"informatiedomein" => header.information_domain = Some(String::new()),
                    b"relatiemodelleringstype" => header.modeling_variant = Some(String::new()),
                    b"MIMversie" => header.mim_version = Some(String::new()),
                    b"MIMtaal" => header.language = Some(String::new()),
                    b"packages" => document.packages = PackageTree::default(),
                    other => warn_unknown(validator, CONTEXT, other)?,
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if !text.trim().is_empty() {
                    validator
                        .report(Severity::Warning, CONTEXT, "unexpected text content")
                        .map_err(|event| LoadError::Rejected { event })?;
                }
            }
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::CData(_) | Event::Decl(_) | Event::Comment(_) | Event::PI(_)
            | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_package_tree<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
) -> Result<PackageTree, LoadError> {
    const CONTEXT: &str = "packages";
    let mut tree = PackageTree::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                if name == b"Domein" {
                    let id = attr_value(&e, b"id")?;
                    tree.domains.push(read_domain(reader, validator, id)?);
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                if name == b"Domein" {
                    let id = attr_value(&e, b"id")?;
                    tree.domains.push(Domain {
                        id,
                        ..Domain::default()
                    });
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                }
            }
            Event::End(_) => return Ok(tree),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_domain<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
    id: Option<String>,
) -> Result<Domain, LoadError> {
    const CONTEXT: &str = "Domein";
    let mut domain = Domain {
        id,
        ..Domain::default()
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                match name.as_slice() {
                    b"naam" => domain.name = Some(read_text(reader, validator, CONTEXT)?),
                    b"herkomst" => domain.provenance = Some(read_text(reader, validator, CONTEXT)?),
                    b"definitie" => domain.definition = Some(read_rich_text(reader, b"definitie")?),
                    b"herkomstDefinitie" => {
                        domain.definition_provenance = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"datumOpname" => {
                        domain.adoption_date = Some(read_text(reader, validator, CONTEXT)?)
                    }
                    b"objecttypen" => {
                        domain.object_types = read_object_types(reader, validator)?;
                    }
                    b"packages" => domain.packages = read_package_tree(reader, validator)?,
                    other => {
                        warn_unknown(validator, CONTEXT, other)?;
                        skip_element(reader)?;
                    }
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, CONTEXT, &name)?;
            }
            Event::End(_) => return Ok(domain),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_object_types<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
) -> Result<Vec<ObjectType>, LoadError> {
    const CONTEXT: &str = "objecttypen";
    let mut object_types = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                if name == b"Objecttype" {
                    let id = attr_value(&e, b"id")?;
                    object_types.push(read_object_type(reader, validator, id)?);
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                if name == b"Objecttype" {
                    let id = attr_value(&e, b"id")?;
                    object_types.push(ObjectType {
                        id,
                        ..ObjectType::default()
                    });
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                }
            }
            Event::End(_) => return Ok(object_types),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_object_type<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
    id: Option<String>,
) -> Result<ObjectType, LoadError> {
    const CONTEXT: &str = "Objecttype";
    let mut object_type = ObjectType {
        id,
        ..ObjectType::default()
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                match name.as_slice() {
                    b"naam" => object_type.name = Some(read_text(reader, validator, CONTEXT)?),
                    b"definitie" => {
                        object_type.definition = Some(read_rich_text(reader, b"definitie")?)
                    }
                    b"attribuutsoorten" => {
                        object_type.attribute_kinds = read_attribute_kinds(reader, validator)?;
                    }
                    b"supertypen" => {
                        object_type.supertypes = read_generalizations(reader, validator)?;
                    }
                    other => {
                        warn_unknown(validator, CONTEXT, other)?;
                        skip_element(reader)?;
                    }
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, CONTEXT, &name)?;
            }
            Event::End(_) => return Ok(object_type),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_attribute_kinds<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
) -> Result<Vec<AttributeKind>, LoadError> {
    const CONTEXT: &str = "attribuutsoorten";
    let mut kinds = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                if name == b"Attribuutsoort" {
                    let id = attr_value(&e, b"id")?;
                    kinds.push(read_attribute_kind(reader, validator, id)?);
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, CONTEXT, &name)?;
            }
            Event::End(_) => return Ok(kinds),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_attribute_kind<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
    id: Option<String>,
) -> Result<AttributeKind, LoadError> {
    const CONTEXT: &str = "Attribuutsoort";
    let mut kind = AttributeKind {
        id,
        ..AttributeKind::default()
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                if name == b"naam" {
                    kind.name = Some(read_text(reader, validator, CONTEXT)?);
                } else if name == b"Datatype" {
                    let value = read_text(reader, validator, CONTEXT)?;
                    set_ascription(
                        &mut kind,
                        AttributeTypeAscription::PlainDatatype { value },
                        validator,
                    )?;
                } else if let Some(ascription) = named_ascription(&name, &e)? {
                    skip_element(reader)?;
                    set_ascription(&mut kind, ascription, validator)?;
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                if name == b"naam" {
                    kind.name = Some(String::new());
                } else if name == b"Datatype" {
                    set_ascription(
                        &mut kind,
                        AttributeTypeAscription::PlainDatatype {
                            value: String::new(),
                        },
                        validator,
                    )?;
                } else if let Some(ascription) = named_ascription(&name, &e)? {
                    set_ascription(&mut kind, ascription, validator)?;
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                }
            }
            Event::End(_) => {
                if kind.type_ascription.is_none() {
                    validator
                        .report(Severity::Error, CONTEXT, "missing type ascription")
                        .map_err(|event| LoadError::Rejected { event })?;
                }
                return Ok(kind);
            }
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

/// Map a named-ascription element to its variant, `None` for foreign tags
fn named_ascription(
    tag: &[u8],
    e: &BytesStart<'_>,
) -> Result<Option<AttributeTypeAscription>, LoadError> {
    let ascription = match tag {
        b"PrimitiefDatatype" => AttributeTypeAscription::PrimitiveDatatype {
            name: attr_value(e, b"naam")?.unwrap_or_default(),
        },
        b"GestructureerdDatatype" => AttributeTypeAscription::StructuredDatatype {
            name: attr_value(e, b"naam")?.unwrap_or_default(),
        },
        b"Codelijst" => AttributeTypeAscription::CodeList {
            name: attr_value(e, b"naam")?.unwrap_or_default(),
        },
        b"Referentielijst" => AttributeTypeAscription::ReferenceList {
            name: attr_value(e, b"naam")?.unwrap_or_default(),
        },
        b"Enumeratie" => AttributeTypeAscription::Enumeration {
            name: attr_value(e, b"naam")?.unwrap_or_default(),
        },
        b"Keuze" => AttributeTypeAscription::Choice {
            name: attr_value(e, b"naam")?.unwrap_or_default(),
        },
        b"Constructie" => AttributeTypeAscription::Construct {
            id: attr_value(e, b"id")?.unwrap_or_default(),
        },
        _ => return Ok(None),
    };
    Ok(Some(ascription))
}

fn set_ascription(
    kind: &mut AttributeKind,
    ascription: AttributeTypeAscription,
    validator: &mut Validator<'_>,
) -> Result<(), LoadError> {
    if kind.type_ascription.is_some() {
        // keep the first ascription; the schema allows exactly one
        validator
            .report(
                Severity::Error,
                "Attribuutsoort",
                format!("second type ascription '{}'", ascription.wire_name()),
            )
            .map_err(|event| LoadError::Rejected { event })?;
        return Ok(());
    }
    kind.type_ascription = Some(ascription);
    Ok(())
}

fn read_generalizations<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
) -> Result<Vec<Generalization>, LoadError> {
    const CONTEXT: &str = "supertypen";
    let mut edges = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                if name == b"GeneralisatieObjecttype" {
                    let id = attr_value(&e, b"id")?;
                    if let Some(edge) = read_generalization(reader, validator, id)? {
                        edges.push(edge);
                    }
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, CONTEXT, &name)?;
            }
            Event::End(_) => return Ok(edges),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_generalization<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
    id: Option<String>,
) -> Result<Option<Generalization>, LoadError> {
    const CONTEXT: &str = "GeneralisatieObjecttype";
    let mut target = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                if name == b"supertype" {
                    target = read_supertype_ref(reader, validator)?;
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, CONTEXT, &name)?;
            }
            Event::End(_) => {
                return match target {
                    Some(target_id) => Ok(Some(Generalization {
                        id,
                        supertype: Reference::Unresolved(target_id),
                    })),
                    None => {
                        validator
                            .report(Severity::Error, CONTEXT, "missing supertype reference")
                            .map_err(|event| LoadError::Rejected { event })?;
                        Ok(None)
                    }
                };
            }
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn read_supertype_ref<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
) -> Result<Option<String>, LoadError> {
    const CONTEXT: &str = "supertype";
    let mut target = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                if name == b"ObjecttypeRef" {
                    target = Some(read_text(reader, validator, CONTEXT)?);
                } else {
                    warn_unknown(validator, CONTEXT, &name)?;
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, CONTEXT, &name)?;
            }
            Event::End(_) => return Ok(target),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Text(_) | Event::CData(_) | Event::Decl(_) | Event::Comment(_)
            | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

/// Concatenated, trimmed text content of a simple element
fn read_text<R: BufRead>(
    reader: &mut Reader<R>,
    validator: &mut Validator<'_>,
    context: &str,
) -> Result<String, LoadError> {
    let mut out = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(t) => out.push_str(&t.unescape()?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Start(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, context, &name)?;
                skip_element(reader)?;
            }
            Event::Empty(e) => {
                let name = local(e.name()).to_vec();
                warn_unknown(validator, context, &name)?;
            }
            Event::End(_) => return Ok(out.trim().to_string()),
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

/// Mixed-content subtree of a rich-text element
fn read_rich_text<R: BufRead>(
    reader: &mut Reader<R>,
    end: &'static [u8],
) -> Result<XhtmlText, LoadError> {
    let nodes = xhtml::read_nodes(reader, Some(end))?;
    Ok(XhtmlText::from_nodes(nodes))
}

/// Consume the balance of the element whose start tag was just read
fn skip_element<R: BufRead>(reader: &mut Reader<R>) -> Result<(), LoadError> {
    let mut depth = 1usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(LoadError::UnexpectedEof),
            Event::Empty(_)
            | Event::Text(_)
            | Event::CData(_)
            | Event::Decl(_)
            | Event::Comment(_)
            | Event::PI(_)
            | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn warn_unknown(
    validator: &mut Validator<'_>,
    context: &str,
    name: &[u8],
) -> Result<(), LoadError> {
    validator
        .report(
            Severity::Warning,
            context,
            format!("unknown element '{}'", String::from_utf8_lossy(name)),
        )
        .map_err(|event| LoadError::Rejected { event })
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, LoadError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if local(attr.key) == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Local part of a qualified name
fn local(name: QName<'_>) -> &[u8] {
    let bytes = name.into_inner();
    match bytes.iter().rposition(|b| *b == b':') {
        Some(colon) => &bytes[colon + 1..],
        None => bytes,
    }
}

fn qname_string(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.into_inner()).into_owned()
}

//! Error types for the binding and resolution layer
//!
//! Lookup misses (name- or identifier-based) are deliberately not errors;
//! they surface as `Option`/empty collections. Everything here aborts the
//! enclosing operation and is surfaced to the caller untouched.

use thiserror::Error;

use crate::validate::ValidationEvent;

/// Errors raised while loading a serialization
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no registered model family for namespace '{namespace}'")]
    UnknownFamily { namespace: String },

    #[error("expected root element 'Informatiemodel', found '{found}'")]
    UnexpectedRoot { found: String },

    #[error("document contains no root element")]
    MissingRoot,

    #[error("document ended before the open element was closed")]
    UnexpectedEof,

    #[error("validation aborted by policy: {event}")]
    Rejected { event: ValidationEvent },

    #[error("malformed rich-text content: {0}")]
    Content(#[from] ContentFormatError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Errors raised by the reference resolution pass
///
/// A document with a dangling reference is not considered successfully
/// loaded; resolution never leaves an `Unresolved` value behind silently.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("reference target '{id}' does not exist in the document")]
    DanglingReference { id: String },

    #[error("stable identifier '{id}' is declared more than once")]
    DuplicateIdentifier { id: String },
}

/// Errors raised when parsing a rich-text content string
///
/// Local to the call that supplied the malformed markup; the rest of the
/// document is unaffected.
#[derive(Debug, Error)]
pub enum ContentFormatError {
    #[error("malformed markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("markup fragment ends inside element '{element}'")]
    UnclosedElement { element: String },

    #[error("unexpected content in markup fragment: {reason}")]
    Unexpected { reason: String },
}

/// Errors raised while saving a model
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("required field '{field}' of {element} is not set")]
    MissingField { element: String, field: &'static str },

    #[error("validation aborted by policy: {event}")]
    Rejected { event: ValidationEvent },

    #[error("serialized document failed schema conformance: {reason}")]
    Conformance { reason: String },

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

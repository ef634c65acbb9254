//! Per-family XML wire codec
//!
//! Event-level reader and writer for the MIM serialization format. The
//! reader builds the base tree and reports schema events through the
//! validation pipeline as it discovers them; the writer serializes a tree
//! back to a document that re-validates against the same family.

mod reader;
mod writer;

pub(crate) use reader::read_document;
pub(crate) use writer::write_document;

/// Namespace bound to the `xhtml` prefix on the root element
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

//! MIM Model Binding & Resolution
//!
//! A binding and resolution layer for MIM ("Metamodel Informatie
//! Modellering") information-model XML serializations, covering multiple
//! metamodel versions and both relationship-modeling variants.
//!
//! ## Features
//!
//! - **Schema-Derived Base Model**: a plain data tree mirroring the wire
//!   document 1:1, round-trippable per family
//! - **Extension Decoration**: name-based child lookup and typed content
//!   accessors layered over the base tree without changing its shape
//! - **Reference Resolution**: a second pass linking textual identifier
//!   references to their target nodes; dangling references fail the load
//! - **Name Index**: amortized name → element lookup over the full
//!   domain hierarchy, with an explicit rebuild contract
//! - **Family Registry**: one entry point selecting the concrete family
//!   by (version, variant), uniform create/load/save across families
//! - **Validation Pipeline**: schema conformance events gated per event
//!   by a caller-supplied continue/abort policy
//!
//! ## Example
//!
//! ```no_run
//! use mim_model::{load_model, validate, DocumentExt, ObjectTypeExt};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("Fietsenwinkel-relatiesoort-leidend.xml")?;
//! let model = load_model(bytes.as_slice(), validate::abort_on_error)?;
//!
//! let supplier = model
//!     .document()
//!     .object_type_by_name("Leverancier")
//!     .expect("sample model defines a supplier");
//! let number = supplier.attribute_kind("kvk nummer");
//! println!("kvk nummer ascription: {:?}", number);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ext;
pub mod index;
pub mod model;
pub mod registry;
pub mod resolve;
pub mod validate;
pub mod version;
pub mod xhtml;

mod wire;

pub use error::{ContentFormatError, LoadError, ResolveError, SaveError};
pub use ext::{DocumentExt, ObjectTypeExt, RichTextExt};
pub use index::NameIndex;
pub use model::{
    AttributeKind, AttributeTypeAscription, Domain, ElementHandle, Generalization,
    Informatiemodel, ModelDocument, ModelElement, ObjectType, PackageTree, Reference,
};
pub use registry::{load_model, new_model, FamilySpec, ModelFamily};
pub use resolve::resolve_references;
pub use validate::{PolicyDecision, Severity, ValidationEvent};
pub use version::{FamilyId, MimVersion, ModelingVariant};
pub use xhtml::{XhtmlNode, XhtmlText};

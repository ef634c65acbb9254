//! MIM version and relationship-modeling variant identifiers
//!
//! A serialization is bound to exactly one (version, variant) pair; the
//! pair selects the concrete family of wire types in the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported MIM metamodel versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimVersion {
    V1_1,
    V1_2,
}

impl MimVersion {
    /// The version string as it appears in the `MIMversie` header field
    pub fn as_str(&self) -> &'static str {
        match self {
            MimVersion::V1_1 => "1.1",
            MimVersion::V1_2 => "1.2",
        }
    }

    /// Parse a `MIMversie` wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1.1" => Some(MimVersion::V1_1),
            "1.2" => Some(MimVersion::V1_2),
            _ => None,
        }
    }
}

impl fmt::Display for MimVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relationship-modeling variant of a serialization
///
/// MIM models declare whether relationship kinds or relationship roles are
/// leading; the two variants are distinct wire families and are not
/// interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelingVariant {
    /// "Relatiesoort leidend": relationship kinds are leading
    RelatiesoortLeidend,
    /// "Relatierol leidend": relationship roles are leading
    RelatierolLeidend,
}

impl ModelingVariant {
    /// The variant string as it appears in the `relatiemodelleringstype`
    /// header field
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelingVariant::RelatiesoortLeidend => "Relatiesoort leidend",
            ModelingVariant::RelatierolLeidend => "Relatierol leidend",
        }
    }

    /// Parse a `relatiemodelleringstype` wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Relatiesoort leidend" => Some(ModelingVariant::RelatiesoortLeidend),
            "Relatierol leidend" => Some(ModelingVariant::RelatierolLeidend),
            _ => None,
        }
    }
}

impl fmt::Display for ModelingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The (version, variant) pair identifying one model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId {
    pub version: MimVersion,
    pub variant: ModelingVariant,
}

impl FamilyId {
    pub fn new(version: MimVersion, variant: ModelingVariant) -> Self {
        Self { version, variant }
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MIM {} ({})", self.version, self.variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_wire_strings() {
        assert_eq!(MimVersion::V1_2.as_str(), "1.2");
        assert_eq!(MimVersion::parse("1.1"), Some(MimVersion::V1_1));
        assert_eq!(MimVersion::parse("2.0"), None);
    }

    #[test]
    fn test_variant_wire_strings() {
        assert_eq!(
            ModelingVariant::parse("Relatiesoort leidend"),
            Some(ModelingVariant::RelatiesoortLeidend)
        );
        assert_eq!(ModelingVariant::parse("relatiesoort"), None);
    }

    #[test]
    fn test_family_display() {
        let id = FamilyId::new(MimVersion::V1_2, ModelingVariant::RelatiesoortLeidend);
        assert_eq!(id.to_string(), "MIM 1.2 (Relatiesoort leidend)");
    }
}

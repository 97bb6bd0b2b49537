//! Canonical data shapes for normalized real-estate units.

pub mod parse;
pub mod record;

pub use record::EstateRecord;

use serde::{Deserialize, Serialize, Serializer};

/// The six canonical unit categories a listing can normalize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Flat,
    Apartment,
    Parking,
    Commercial,
    Storeroom,
    Townhouse,
}

impl ObjectType {
    pub const ALL: [ObjectType; 6] = [
        ObjectType::Flat,
        ObjectType::Apartment,
        ObjectType::Parking,
        ObjectType::Commercial,
        ObjectType::Storeroom,
        ObjectType::Townhouse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Flat => "flat",
            ObjectType::Apartment => "apartment",
            ObjectType::Parking => "parking",
            ObjectType::Commercial => "commercial",
            ObjectType::Storeroom => "storeroom",
            ObjectType::Townhouse => "townhouse",
        }
    }

    /// Look up a canonical name. Sources sometimes hand the canonical value
    /// straight through instead of a Russian phrase.
    pub fn from_name(name: &str) -> Option<ObjectType> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified object type, or the raw source text when no keyword matched.
///
/// Raw values survive incremental mutation and are rejected at finalization,
/// never silently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectKind {
    Known(ObjectType),
    Raw(String),
}

/// Room count, with the studio sentinel the sources use interchangeably with
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rooms {
    Studio,
    Count(u32),
}

impl Serialize for Rooms {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Rooms::Studio => serializer.serialize_str("studio"),
            Rooms::Count(n) => serializer.serialize_u32(*n),
        }
    }
}

/// Three-way flag for the finished/furniture state: no, yes, or the sources'
/// literal "optional" marker.
///
/// "optional" is carried as-is; nothing downstream is known to treat it
/// differently from absence beyond being distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriFlag {
    #[default]
    No,
    Yes,
    Optional,
}

impl Serialize for TriFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TriFlag::No => serializer.serialize_u8(0),
            TriFlag::Yes => serializer.serialize_u8(1),
            TriFlag::Optional => serializer.serialize_str("optional"),
        }
    }
}

pub(crate) fn ser_tri_bool<S: Serializer>(
    value: &Option<bool>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(true) => serializer.serialize_u8(1),
        Some(false) => serializer.serialize_u8(0),
        None => serializer.serialize_none(),
    }
}

pub(crate) fn ser_bool_as_int<S: Serializer>(
    value: &bool,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_round_trip() {
        assert_eq!(ObjectType::from_name("flat"), Some(ObjectType::Flat));
        assert_eq!(ObjectType::from_name("сьюты"), None);
        assert_eq!(ObjectType::Storeroom.to_string(), "storeroom");
    }

    #[test]
    fn test_rooms_serialization() {
        assert_eq!(serde_json::to_value(Rooms::Studio).unwrap(), serde_json::json!("studio"));
        assert_eq!(serde_json::to_value(Rooms::Count(2)).unwrap(), serde_json::json!(2));
    }

    #[test]
    fn test_tri_flag_serialization() {
        assert_eq!(serde_json::to_value(TriFlag::No).unwrap(), serde_json::json!(0));
        assert_eq!(serde_json::to_value(TriFlag::Yes).unwrap(), serde_json::json!(1));
        assert_eq!(
            serde_json::to_value(TriFlag::Optional).unwrap(),
            serde_json::json!("optional")
        );
    }
}

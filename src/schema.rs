//! Field record schema shared by the extractor and the HTTP layer.

use serde::{Deserialize, Serialize};

/// Sentinel value for a field no pattern matched.
///
/// Downstream consumers compare against this exact string to drive their
/// missing-field warning, so it must never vary in case or spacing.
pub const NOT_FOUND: &str = "Not found";

/// Supported identity document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    DrivingLicense,
    Passport,
}

impl DocumentType {
    /// Parse the upload form's selector string into a document type.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "driving_license" => Some(Self::DrivingLicense),
            "passport" => Some(Self::Passport),
            _ => None,
        }
    }
}

/// The four extracted fields, serialized exactly as existing consumers expect.
///
/// A value object: created fresh per extraction, never mutated after being
/// returned. Every field is either a normalized non-empty string or the
/// [`NOT_FOUND`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub name: String,
    pub document_number: String,
    pub expiration_date: String,
    pub date_of_birth: String,
}

impl FieldRecord {
    /// A fresh record with every field at the "Not found" default.
    pub fn not_found() -> Self {
        Self {
            name: NOT_FOUND.to_string(),
            document_number: NOT_FOUND.to_string(),
            expiration_date: NOT_FOUND.to_string(),
            date_of_birth: NOT_FOUND.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_str() {
        assert_eq!(
            DocumentType::from_str("driving_license"),
            Some(DocumentType::DrivingLicense)
        );
        assert_eq!(DocumentType::from_str("passport"), Some(DocumentType::Passport));
        assert_eq!(DocumentType::from_str("visa"), None);
        assert_eq!(DocumentType::from_str(""), None);
    }

    #[test]
    fn test_serialized_field_names() {
        let record = FieldRecord::not_found();
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 4);
        for key in ["name", "documentNumber", "expirationDate", "dateOfBirth"] {
            assert_eq!(obj.get(key).unwrap(), NOT_FOUND);
        }
    }

    #[test]
    fn test_not_found_default_record() {
        let record = FieldRecord::not_found();
        assert_eq!(record.document_number, NOT_FOUND);
        assert_eq!(record.expiration_date, NOT_FOUND);
        assert_eq!(record.date_of_birth, NOT_FOUND);
        assert_eq!(record, FieldRecord::not_found());
    }
}

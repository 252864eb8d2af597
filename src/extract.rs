//! Document-type-specific field extraction from OCR text.
//!
//! Pure functions, no async — easily testable. Takes raw (possibly
//! JSON-wrapped) OCR output plus a document type and produces a complete
//! [`FieldRecord`]. Pattern misses become "Not found" values, never errors.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::schema::{DocumentType, FieldRecord, NOT_FOUND};

/// Output slot a driving-license rule populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    DocumentNumber,
    ExpirationDate,
    DateOfBirth,
}

/// A single label-anchored extraction rule.
///
/// The pattern carries the field label, the capture shape, and the terminator
/// set; group 1 is the captured value. OCR often misreads a colon or dash as
/// a `©`-like glyph, so every label tolerates one.
struct FieldRule {
    field: Field,
    pattern: Regex,
    /// Strip all whitespace from the captured value after matching.
    strip_whitespace: bool,
}

lazy_static! {
    /// Driving-license rules, evaluated uniformly over the normalized text.
    static ref DL_RULES: Vec<FieldRule> = vec![
        FieldRule {
            field: Field::Name,
            pattern: Regex::new(
                r"(?i)Name\s*[:.\-]*©?\s*([A-Z\s]+?)(?:\s*(?:S/|D/|W/|DOB|Date of Birth|BG|,)|\s*$)"
            ).unwrap(),
            strip_whitespace: false,
        },
        FieldRule {
            field: Field::DocumentNumber,
            pattern: Regex::new(
                r"(?i)(?:DL\s*No\.?|License\s+No\.?)\s*©?\s*([A-Z0-9\s]+?)(?:\s+(?:DOI|DOB|Date|Valid|Expiry)|\s*$)"
            ).unwrap(),
            strip_whitespace: false,
        },
        FieldRule {
            field: Field::ExpirationDate,
            pattern: Regex::new(
                r"(?i)(?:Valid Till|Valid upto|Validity|Expiry)\s*[:.\-]*\s*©?\s*(\d{2}[-/]\d{2}[-/]\d{4})"
            ).unwrap(),
            strip_whitespace: true,
        },
        FieldRule {
            field: Field::DateOfBirth,
            pattern: Regex::new(
                r"(?i)(?:DOB|Date of Birth)\s*[:.\-]*\s*©?\s*(\d{2}[-/]\d{2}[-/]\d{4})"
            ).unwrap(),
            strip_whitespace: false,
        },
    ];

    /// Passport number: one letter followed by 7-8 digits.
    static ref PASSPORT_NUMBER: Regex = Regex::new(r"(?i)[A-Z][0-9]{7,8}").unwrap();

    /// MRZ name line: `P<` + country code + surname block + `<<` + given
    /// names block. Blocks are uppercase letters with `<` fillers standing
    /// in for spaces.
    static ref MRZ_NAME: Regex =
        Regex::new(r"P<[A-Z]{3}([A-Z][A-Z<]*?)<<([A-Z][A-Z<]*)").unwrap();

    /// Dates in DD/MM/YYYY form, collected in order of appearance.
    static ref DATE_SLASH: Regex = Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap();
}

/// Label words that disqualify the preceding position of a fallback name run.
const NAME_LABELS_BEFORE: [&str; 7] = [
    "Valid",
    "Signature",
    "Authority",
    "Place",
    "Date",
    "Passport",
    "No",
];

/// Words that disqualify the position right after a fallback name run.
const NAME_DENY_AFTER: [&str; 3] = ["INDIA", "PASSPORT", "REPUBLIC"];

/// The OCR stage sometimes hands over its intermediate storage format
/// instead of plain text.
#[derive(Deserialize)]
struct OcrEnvelope {
    #[serde(rename = "extractedText")]
    extracted_text: String,
}

/// Extract identity fields from raw OCR text.
///
/// Never fails: an unrecognized document type, empty input, or garbage text
/// all yield a record whose fields fall back to the "Not found" sentinel.
pub fn extract_fields(raw_text: &str, doc_type: Option<DocumentType>) -> FieldRecord {
    let text = unwrap_envelope(raw_text).unwrap_or_else(|| raw_text.to_string());
    let text = squash_whitespace(&text);

    let record = match doc_type {
        Some(DocumentType::DrivingLicense) => extract_driving_license(&text),
        Some(DocumentType::Passport) => extract_passport(&text),
        None => FieldRecord::not_found(),
    };

    finalize(record)
}

/// Unwrap a `{"extractedText": "..."}` envelope if the input looks like one.
///
/// Returns `None` when the input is plain text or the envelope is malformed;
/// the caller then falls back to the original string.
fn unwrap_envelope(raw: &str) -> Option<String> {
    if !raw.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<OcrEnvelope>(raw) {
        Ok(envelope) => Some(envelope.extracted_text),
        Err(e) => {
            debug!("OCR envelope parse failed, treating input as plain text: {}", e);
            None
        }
    }
}

/// Collapse whitespace runs to single spaces and trim. Idempotent.
fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run every driving-license rule independently; a failed match leaves the
/// corresponding field at its default.
fn extract_driving_license(text: &str) -> FieldRecord {
    let mut record = FieldRecord::not_found();

    for rule in DL_RULES.iter() {
        let value = rule
            .pattern
            .captures(text)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string());

        if let Some(mut value) = value {
            if rule.strip_whitespace {
                value.retain(|c| !c.is_whitespace());
            }
            if !value.is_empty() {
                *slot_mut(&mut record, rule.field) = value;
            }
        }
    }

    record
}

fn extract_passport(text: &str) -> FieldRecord {
    let mut record = FieldRecord::not_found();

    if let Some(m) = PASSPORT_NUMBER.find(text) {
        record.document_number = m.as_str().to_uppercase();
    }

    if let Some(name) = mrz_name(text).or_else(|| fallback_name(text)) {
        record.name = name;
    }

    // First date in the document is the date of birth, the last the expiry.
    let dates: Vec<&str> = DATE_SLASH.find_iter(text).map(|m| m.as_str()).collect();
    if dates.len() >= 2 {
        record.date_of_birth = dates[0].to_string();
        record.expiration_date = dates[dates.len() - 1].to_string();
    }

    record
}

/// Read the holder name from an MRZ line, if one is present.
fn mrz_name(text: &str) -> Option<String> {
    let cap = MRZ_NAME.captures(text)?;
    let surname = fillers_to_spaces(cap.get(1)?.as_str());
    let given_names = fillers_to_spaces(cap.get(2)?.as_str());

    let full = format!("{} {}", surname, given_names).trim().to_string();
    if full.is_empty() {
        None
    } else {
        Some(full)
    }
}

/// Collapse runs of MRZ `<` fillers into single spaces.
fn fillers_to_spaces(block: &str) -> String {
    block
        .split('<')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fallback when no MRZ line survived OCR: the first run of 2-3 consecutive
/// all-uppercase words that is not anchored to a field label and not the
/// country banner.
fn fallback_name(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split(' ').collect();

    for i in 0..words.len() {
        if !is_name_word(words[i]) {
            continue;
        }
        if i > 0 && NAME_LABELS_BEFORE.contains(&words[i - 1]) {
            continue;
        }
        // Prefer a three-word run; fall back to two when the longer run ends
        // in a denied word.
        for len in [3, 2] {
            if i + len > words.len() {
                continue;
            }
            if !words[i..i + len].iter().all(|w| is_name_word(w)) {
                continue;
            }
            if let Some(next) = words.get(i + len) {
                if NAME_DENY_AFTER.contains(next) {
                    continue;
                }
            }
            return Some(words[i..i + len].join(" "));
        }
    }

    None
}

fn is_name_word(word: &str) -> bool {
    word.len() >= 2 && word.chars().all(|c| c.is_ascii_uppercase())
}

/// Re-normalize every field right before returning; a value that normalizes
/// to empty collapses back to the sentinel. Running this twice is a no-op.
fn finalize(record: FieldRecord) -> FieldRecord {
    FieldRecord {
        name: clean_value(&record.name),
        document_number: clean_value(&record.document_number),
        expiration_date: clean_value(&record.expiration_date),
        date_of_birth: clean_value(&record.date_of_birth),
    }
}

fn clean_value(value: &str) -> String {
    let cleaned = squash_whitespace(value);
    if cleaned.is_empty() {
        NOT_FOUND.to_string()
    } else {
        cleaned
    }
}

fn slot_mut(record: &mut FieldRecord, field: Field) -> &mut String {
    match field {
        Field::Name => &mut record.name,
        Field::DocumentNumber => &mut record.document_number,
        Field::ExpirationDate => &mut record.expiration_date,
        Field::DateOfBirth => &mut record.date_of_birth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DL: Option<DocumentType> = Some(DocumentType::DrivingLicense);
    const PASSPORT: Option<DocumentType> = Some(DocumentType::Passport);

    fn assert_normalized(record: &FieldRecord) {
        for value in [
            &record.name,
            &record.document_number,
            &record.expiration_date,
            &record.date_of_birth,
        ] {
            assert!(!value.is_empty());
            assert_eq!(value.trim(), value.as_str());
            assert!(!value.contains("  "));
            assert!(!value.contains('\n'));
        }
    }

    #[test]
    fn test_driving_license_full_example() {
        let text =
            "Name: JOHN SMITH S/O JAMES DL No. AB1234567890 DOB 15-08-1985 Valid Till 15-08-2030";
        let record = extract_fields(text, DL);

        assert_eq!(record.name, "JOHN SMITH");
        assert_eq!(record.document_number, "AB1234567890");
        assert_eq!(record.date_of_birth, "15-08-1985");
        assert_eq!(record.expiration_date, "15-08-2030");
    }

    #[test]
    fn test_driving_license_alternate_labels() {
        let text = "License No. MH12 20200012345 Valid upto 01/01/2030 Date of Birth: 02/03/1999";
        let record = extract_fields(text, DL);

        assert_eq!(record.document_number, "MH12 20200012345");
        assert_eq!(record.expiration_date, "01/01/2030");
        assert_eq!(record.date_of_birth, "02/03/1999");
        assert_eq!(record.name, NOT_FOUND);
    }

    #[test]
    fn test_driving_license_name_terminators() {
        let record = extract_fields("Name: JANE DOE, 12 Some Street", DL);
        assert_eq!(record.name, "JANE DOE");

        let record = extract_fields("Name JOHN BG O+", DL);
        assert_eq!(record.name, "JOHN");

        let record = extract_fields("Name: MARY ANN W/O PETER", DL);
        assert_eq!(record.name, "MARY ANN");
    }

    #[test]
    fn test_driving_license_misread_glyph() {
        let record = extract_fields("Name ©JOHN SMITH DOB © 01-01-1990 Valid Till© 01-01-2030", DL);
        assert_eq!(record.name, "JOHN SMITH");
        assert_eq!(record.date_of_birth, "01-01-1990");
        assert_eq!(record.expiration_date, "01-01-2030");
    }

    #[test]
    fn test_driving_license_noisy_whitespace() {
        let text = "  Name :   JOHN    SMITH \n\t DOB   01-01-1990 ";
        let record = extract_fields(text, DL);

        assert_eq!(record.name, "JOHN SMITH");
        assert_eq!(record.date_of_birth, "01-01-1990");
        assert_normalized(&record);
    }

    #[test]
    fn test_json_envelope_matches_plain_text() {
        let inner = "Name: JOHN SMITH DOB 01-01-1990";
        let wrapped = r#"{"extractedText":"Name: JOHN SMITH DOB 01-01-1990"}"#;

        assert_eq!(extract_fields(wrapped, DL), extract_fields(inner, DL));
        assert_eq!(extract_fields(wrapped, DL).name, "JOHN SMITH");
    }

    #[test]
    fn test_malformed_envelope_falls_back_to_plain_text() {
        // Not valid JSON at all.
        let record = extract_fields(r#"{"extractedText": "Name: JOHN"#, DL);
        assert_eq!(record.name, "JOHN");

        // Valid JSON, wrong shape.
        let record = extract_fields(r#"{"extractedText": 123}"#, DL);
        assert_eq!(record, FieldRecord::not_found());
    }

    #[test]
    fn test_unknown_document_type() {
        let text = "Name: JOHN SMITH DOB 01-01-1990 P1234567";
        assert_eq!(extract_fields(text, None), FieldRecord::not_found());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_fields("", DL), FieldRecord::not_found());
        assert_eq!(extract_fields("", PASSPORT), FieldRecord::not_found());
        assert_eq!(extract_fields("   \n\t ", PASSPORT), FieldRecord::not_found());
    }

    #[test]
    fn test_passport_mrz_example() {
        let text = "P<INDSMITH<<JOHN<ROBERT 01/01/1990 P1234567 01/01/2030";
        let record = extract_fields(text, PASSPORT);

        assert_eq!(record.name, "SMITH JOHN ROBERT");
        assert_eq!(record.document_number, "P1234567");
        assert_eq!(record.date_of_birth, "01/01/1990");
        assert_eq!(record.expiration_date, "01/01/2030");
    }

    #[test]
    fn test_passport_mrz_fillers_collapse() {
        let text = "P<INDVAN<DER<BERG<<ANNA 01/01/1990 02/02/2030";
        let record = extract_fields(text, PASSPORT);
        assert_eq!(record.name, "VAN DER BERG ANNA");
    }

    #[test]
    fn test_passport_number_uppercased() {
        let record = extract_fields("p1234567 01/01/1990 01/01/2030", PASSPORT);
        assert_eq!(record.document_number, "P1234567");
    }

    #[test]
    fn test_passport_fallback_name() {
        let text = "Republic of India JOHN ROBERT SMITH 01/01/1990 02/02/2030";
        let record = extract_fields(text, PASSPORT);
        assert_eq!(record.name, "JOHN ROBERT SMITH");
    }

    #[test]
    fn test_passport_fallback_name_skips_label_words() {
        let record = extract_fields("Signature JOHN SMITH", PASSPORT);
        assert_eq!(record.name, NOT_FOUND);

        let record = extract_fields("Authority RTO DELHI and JOHN SMITH here", PASSPORT);
        assert_eq!(record.name, "JOHN SMITH");
    }

    #[test]
    fn test_passport_fallback_name_backs_off_before_banner() {
        let record = extract_fields("JOHN ROBERT SMITH INDIA", PASSPORT);
        assert_eq!(record.name, "JOHN ROBERT");
    }

    #[test]
    fn test_passport_needs_two_dates() {
        let record = extract_fields("P1234567 JOHN SMITH 01/01/1990", PASSPORT);
        assert_eq!(record.date_of_birth, NOT_FOUND);
        assert_eq!(record.expiration_date, NOT_FOUND);

        let record = extract_fields("P1234567 JOHN SMITH", PASSPORT);
        assert_eq!(record.date_of_birth, NOT_FOUND);
        assert_eq!(record.expiration_date, NOT_FOUND);
    }

    #[test]
    fn test_passport_first_and_last_dates_win() {
        let text = "ISSUED 05/05/2015 DOB 01/01/1990 ... 02/02/2020 ... 03/03/2033";
        let record = extract_fields(text, PASSPORT);
        assert_eq!(record.date_of_birth, "05/05/2015");
        assert_eq!(record.expiration_date, "03/03/2033");
    }

    #[test]
    fn test_garbage_input_yields_normalized_sentinels() {
        for text in ["@@@ ### !!!", "1234", "{\"broken", "<<<<>>>>"] {
            for doc_type in [DL, PASSPORT, None] {
                let record = extract_fields(text, doc_type);
                assert_normalized(&record);
            }
        }
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let record = extract_fields(
            "Name: JOHN SMITH S/O JAMES DL No. AB1234567890 DOB 15-08-1985 Valid Till 15-08-2030",
            DL,
        );
        assert_eq!(finalize(record.clone()), record);

        let record = FieldRecord::not_found();
        assert_eq!(finalize(record.clone()), record);
    }

    #[test]
    fn test_squash_whitespace() {
        assert_eq!(squash_whitespace("  a \t b \n c  "), "a b c");
        assert_eq!(squash_whitespace("a b c"), "a b c");
        assert_eq!(squash_whitespace("   "), "");
    }
}

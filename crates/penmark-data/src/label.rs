// Label documents: per-writer-attempt JSON metadata
//
// Only `person.id` is consumed. Files may start with a UTF-8 byte order mark,
// and the id may be stored as a string or as any JSON number.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DataError, Result};

#[derive(Debug, Deserialize)]
struct LabelDocument {
    person: Option<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    id: Option<RawId>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Parse the writer id out of label JSON bytes.
pub fn parse_writer_id(bytes: &[u8], path: &Path) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let doc: LabelDocument = serde_json::from_slice(bytes).map_err(|e| DataError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    doc.person
        .and_then(|p| p.id)
        .map(RawId::into_string)
        .ok_or_else(|| DataError::MissingLabelField {
            path: path.to_path_buf(),
        })
}

/// Read a label file and return its writer id.
pub fn read_writer_id(path: &Path) -> Result<String> {
    let raw = fs::read(path).map_err(|e| DataError::io(path, e))?;
    parse_writer_id(&raw, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_string_id_behind_bom() {
        let raw = b"\xEF\xBB\xBF{\"person\": {\"id\": \"W0042\", \"age\": 31}, \"text\": \"...\"}";
        assert_eq!(parse_writer_id(raw, Path::new("l.json")).unwrap(), "W0042");
    }

    #[test]
    fn numeric_id_becomes_decimal_string() {
        let raw = br#"{"person": {"id": 1207}}"#;
        assert_eq!(parse_writer_id(raw, Path::new("l.json")).unwrap(), "1207");
    }

    #[test]
    fn wide_and_fractional_ids_are_accepted() {
        let raw = br#"{"person": {"id": 18446744073709551615}}"#;
        assert_eq!(
            parse_writer_id(raw, Path::new("l.json")).unwrap(),
            "18446744073709551615"
        );
        let raw = br#"{"person": {"id": 12.5}}"#;
        assert_eq!(parse_writer_id(raw, Path::new("l.json")).unwrap(), "12.5");
    }

    #[test]
    fn missing_person_is_reported() {
        let err = parse_writer_id(br#"{"sentence": 1}"#, Path::new("l.json")).unwrap_err();
        assert!(matches!(err, DataError::MissingLabelField { .. }));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = parse_writer_id(b"{person", Path::new("l.json")).unwrap_err();
        assert!(matches!(err, DataError::Json { .. }));
    }
}

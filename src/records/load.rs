use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use super::record::RecordSet;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record file must hold an array of records or a tablets object")]
    UnexpectedShape,
    #[error("tablet {0} has no records array")]
    MissingRecords(String),
    #[error("record {index} in tablet {tablet} is not an object")]
    NotAnObject { tablet: String, index: usize },
    #[error("field {field} in tablet {tablet} holds a nested object")]
    NestedObject { tablet: String, field: String },
}

#[derive(Debug, Deserialize)]
struct TabletsFile {
    tablets: Vec<TabletEntry>,
}

#[derive(Debug, Deserialize)]
struct TabletEntry {
    name: Option<String>,
    records: Option<Vec<Value>>,
}

pub fn load_record_file(path: &Path) -> Result<RecordSet> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read record file {}", path.display()))?;
    let default_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("records");

    let records = parse_records(&raw, default_name)
        .with_context(|| format!("failed to parse record file {}", path.display()))?;
    info!(
        path = %path.display(),
        tablets = records.tablets().len(),
        records = records.len(),
        "loaded record file"
    );
    Ok(records)
}

pub fn parse_records(raw: &str, default_name: &str) -> Result<RecordSet> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in record file")?;
    let mut records = RecordSet::new();

    match &parsed {
        Value::Array(rows) => {
            push_tablet(&mut records, default_name, rows)?;
        }
        Value::Object(_) => {
            let file = TabletsFile::deserialize(&parsed).map_err(|_| RecordError::UnexpectedShape)?;
            for (index, tablet) in file.tablets.into_iter().enumerate() {
                let name = tablet
                    .name
                    .unwrap_or_else(|| format!("{default_name}-{index}"));
                let rows = tablet
                    .records
                    .ok_or_else(|| RecordError::MissingRecords(name.clone()))?;
                push_tablet(&mut records, &name, &rows)?;
            }
        }
        _ => return Err(RecordError::UnexpectedShape.into()),
    }

    Ok(records)
}

fn push_tablet(records: &mut RecordSet, name: &str, rows: &[Value]) -> Result<()> {
    let tablet = records.add_tablet(name, Vec::new());

    for (index, row) in rows.iter().enumerate() {
        let object = row.as_object().ok_or_else(|| RecordError::NotAnObject {
            tablet: name.to_owned(),
            index,
        })?;
        let values = record_values(name, object)?;
        records.push_record(tablet, values);
    }

    Ok(())
}

fn record_values(tablet: &str, object: &Map<String, Value>) -> Result<BTreeMap<String, Vec<String>>> {
    let mut values = BTreeMap::new();

    for (field, value) in object {
        let resolved = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        resolved.push(text);
                    } else if item.is_object() {
                        return Err(RecordError::NestedObject {
                            tablet: tablet.to_owned(),
                            field: field.clone(),
                        }
                        .into());
                    }
                }
                resolved
            }
            Value::Object(_) => {
                return Err(RecordError::NestedObject {
                    tablet: tablet.to_owned(),
                    field: field.clone(),
                }
                .into());
            }
            scalar => scalar_text(scalar).into_iter().collect(),
        };
        values.insert(field.clone(), resolved);
    }

    Ok(values)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BundleId, NOT_SET};
    use pretty_assertions::assert_eq;

    #[test]
    fn array_file_becomes_one_tablet() {
        let raw = r#"[
            {"sip": "1.1.1.1", "dip": "2.2.2.2", "port": 443},
            {"sip": "1.1.1.1", "dip": null, "tags": ["a", "b"]}
        ]"#;
        let records = parse_records(raw, "flows").expect("valid records");

        assert_eq!(records.tablets().len(), 1);
        assert_eq!(records.tablets()[0].name, "flows");
        assert_eq!(records.len(), 2);

        let tablet = &records.tablets()[0];
        let second = records.record(BundleId(1)).expect("second record");
        assert_eq!(tablet.resolve("dip", second), vec![NOT_SET.to_owned()]);
        assert_eq!(tablet.resolve("tags", second), vec!["a".to_owned(), "b".to_owned()]);
        assert!(tablet.can_resolve("port"));
    }

    #[test]
    fn tablets_object_keeps_names() {
        let raw = r#"{"tablets": [
            {"name": "dns", "records": [{"host": "a"}]},
            {"records": [{"user": "bob"}]}
        ]}"#;
        let records = parse_records(raw, "bundle").expect("valid records");
        let names = records
            .tablets()
            .iter()
            .map(|tablet| tablet.name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["dns", "bundle-1"]);
    }

    #[test]
    fn nested_objects_are_rejected() {
        let raw = r#"[{"sip": {"octets": [1, 1, 1, 1]}}]"#;
        let error = parse_records(raw, "flows").expect_err("nested object");

        assert!(matches!(
            error.downcast_ref::<RecordError>(),
            Some(RecordError::NestedObject { .. })
        ));
    }

    #[test]
    fn scalars_other_than_arrays_or_objects_fail() {
        let error = parse_records("42", "flows").expect_err("bad shape");
        assert!(matches!(
            error.downcast_ref::<RecordError>(),
            Some(RecordError::UnexpectedShape)
        ));
    }
}

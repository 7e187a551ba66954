use crate::record::Record;
use serde_json::Value;
use std::io::Write;

const IDENTITY_COLUMNS: [&str; 5] = [
    "source_id",
    "source_name",
    "endpoint",
    "record_id",
    "fetched_at",
];

/// Writes records as CSV: identity columns, then every field name in first-seen order
///
/// String values are written as-is; nested values are JSON-encoded.
pub fn write_csv(records: &[Record], out: &mut dyn Write) -> std::io::Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for name in record.fields().keys() {
            if !columns.contains(&name.as_str()) {
                columns.push(name.as_str());
            }
        }
    }

    let mut writer = csv::Writer::from_writer(out);

    let header = IDENTITY_COLUMNS.iter().copied().chain(columns.iter().copied());
    writer.write_record(header)?;

    for record in records {
        let mut row = vec![
            record.source_id.clone(),
            record.source_name.clone(),
            record.endpoint.clone(),
            record.record_id.clone(),
            record.fetched_at.to_rfc3339(),
        ];
        row.extend(columns.iter().map(|c| cell(record.field(c))));
        writer.write_record(&row)?;
    }

    writer.flush()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

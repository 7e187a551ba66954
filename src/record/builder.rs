use crate::record::{derive_record_id, Record, RESERVED_FIELDS};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Assembles one [`Record`] from independently extracted fields
///
/// Extraction helpers return `Option`; passing `None` to [`RecordBuilder::set`]
/// simply leaves the field out, so a miss on one field never affects the others.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    source_id: String,
    source_name: String,
    endpoint: String,
    record_id: Option<String>,
    fetched_at: DateTime<Utc>,
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Starts a record for `endpoint`, stamped with the current time
    pub fn new(source_id: &str, source_name: &str, endpoint: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            endpoint: endpoint.to_string(),
            record_id: None,
            fetched_at: Utc::now(),
            fields: Map::new(),
        }
    }

    /// Uses a native identifier instead of one derived from the endpoint
    pub fn record_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.trim().is_empty() {
            self.record_id = Some(id);
        }
        self
    }

    pub fn fetched_at(mut self, at: DateTime<Utc>) -> Self {
        self.fetched_at = at;
        self
    }

    /// Sets a field if a value is present; `None` leaves it absent
    pub fn set<V: Into<Value>>(mut self, name: &str, value: Option<V>) -> Self {
        self.insert(name, value);
        self
    }

    /// In-place variant of [`RecordBuilder::set`] for use inside loops
    pub fn insert<V: Into<Value>>(&mut self, name: &str, value: Option<V>) {
        let Some(value) = value else {
            return;
        };

        if RESERVED_FIELDS.contains(&name) {
            tracing::debug!("Ignoring reserved field name '{}' on {}", name, self.endpoint);
            return;
        }

        self.fields.insert(name.to_string(), value.into());
    }

    /// Identifier the built record will carry
    pub fn current_record_id(&self) -> String {
        self.record_id
            .clone()
            .unwrap_or_else(|| derive_record_id(&self.endpoint))
    }

    pub fn build(self) -> Record {
        let record_id = self
            .record_id
            .unwrap_or_else(|| derive_record_id(&self.endpoint));

        Record {
            source_id: self.source_id,
            source_name: self.source_name,
            endpoint: self.endpoint,
            record_id,
            fetched_at: self.fetched_at,
            fields: self.fields,
        }
    }
}

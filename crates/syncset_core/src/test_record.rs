//! Record type shared by the unit tests.

use crate::error::RecordError;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use syncset_codec::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Item {
    pub id: i64,
    pub a: i64,
    pub b: bool,
    pub label: Option<String>,
}

impl Item {
    pub fn new(id: i64, a: i64, b: bool) -> Self {
        Self {
            id,
            a,
            b,
            label: None,
        }
    }
}

impl Record for Item {
    fn field_names() -> &'static [&'static str] {
        &["id", "a", "b", "label"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Integer(self.id)),
            "a" => Some(Value::Integer(self.a)),
            "b" => Some(Value::Bool(self.b)),
            "label" => Some(Value::from(self.label.clone())),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), RecordError> {
        match (name, value) {
            ("id", Value::Integer(v)) => self.id = v,
            ("a", Value::Integer(v)) => self.a = v,
            ("b", Value::Bool(v)) => self.b = v,
            ("label", Value::Text(v)) => self.label = Some(v),
            ("label", Value::Null) => self.label = None,
            ("id" | "a", other) => return Err(RecordError::type_mismatch(name, "integer", &other)),
            ("b", other) => return Err(RecordError::type_mismatch(name, "bool", &other)),
            ("label", other) => return Err(RecordError::type_mismatch(name, "text", &other)),
            _ => return Err(RecordError::unknown_field(name)),
        }
        Ok(())
    }
}

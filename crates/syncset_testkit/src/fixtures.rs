//! Record fixtures and option helpers.
//!
//! [`Foo`] mirrors the smallest useful record: an identity plus one
//! integer and one boolean field. [`Task`] is a larger record for tests
//! that need fields outside both the pick list and the projection.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use syncset_codec::Value;
use syncset_core::{Record, RecordError, SetSchema, SyncSetOptions};

static NEXT_FOO: AtomicU64 = AtomicU64::new(1);

/// A record with a text identity and two tracked fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foo {
    /// Identity.
    pub id: String,
    /// Integer field, 123 by default.
    pub a: i64,
    /// Boolean field, false by default.
    pub b: bool,
}

impl Foo {
    /// Creates a `Foo` with a fresh identity and default fields.
    pub fn new() -> Self {
        let n = NEXT_FOO.fetch_add(1, Ordering::Relaxed);
        Self::with_id(format!("foo-{n}"))
    }

    /// Creates a `Foo` with the given identity and default fields.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            a: 123,
            b: false,
        }
    }

    /// Returns the identity as a [`Value`].
    pub fn key(&self) -> Value {
        Value::Text(self.id.clone())
    }
}

impl Default for Foo {
    fn default() -> Self {
        Self::new()
    }
}

impl Record for Foo {
    fn field_names() -> &'static [&'static str] {
        &["id", "a", "b"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Text(self.id.clone())),
            "a" => Some(Value::Integer(self.a)),
            "b" => Some(Value::Bool(self.b)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), RecordError> {
        match (name, value) {
            ("id", Value::Text(v)) => self.id = v,
            ("a", Value::Integer(v)) => self.a = v,
            ("b", Value::Bool(v)) => self.b = v,
            ("id", other) => return Err(RecordError::type_mismatch(name, "text", &other)),
            ("a", other) => return Err(RecordError::type_mismatch(name, "integer", &other)),
            ("b", other) => return Err(RecordError::type_mismatch(name, "bool", &other)),
            _ => return Err(RecordError::unknown_field(name)),
        }
        Ok(())
    }
}

/// A to-do item keyed by `key` rather than `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identity.
    pub key: i64,
    /// Title.
    pub title: String,
    /// Completion flag.
    pub done: bool,
    /// Priority, higher first.
    pub priority: i64,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl Task {
    /// Creates an open task with priority 0 and no notes.
    pub fn new(key: i64, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            done: false,
            priority: 0,
            notes: None,
        }
    }
}

impl Record for Task {
    fn field_names() -> &'static [&'static str] {
        &["key", "title", "done", "priority", "notes"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "key" => Some(Value::Integer(self.key)),
            "title" => Some(Value::Text(self.title.clone())),
            "done" => Some(Value::Bool(self.done)),
            "priority" => Some(Value::Integer(self.priority)),
            "notes" => Some(Value::from(self.notes.clone())),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), RecordError> {
        match (name, value) {
            ("key", Value::Integer(v)) => self.key = v,
            ("title", Value::Text(v)) => self.title = v,
            ("done", Value::Bool(v)) => self.done = v,
            ("priority", Value::Integer(v)) => self.priority = v,
            ("notes", Value::Text(v)) => self.notes = Some(v),
            ("notes", Value::Null) => self.notes = None,
            ("key" | "priority", other) => {
                return Err(RecordError::type_mismatch(name, "integer", &other))
            }
            ("title" | "notes", other) => {
                return Err(RecordError::type_mismatch(name, "text", &other))
            }
            ("done", other) => return Err(RecordError::type_mismatch(name, "bool", &other)),
            _ => return Err(RecordError::unknown_field(name)),
        }
        Ok(())
    }
}

/// Options for a [`Foo`] set that picks `pick` and projects one field.
///
/// The projection is the raw value of `projected`, compared with `==`.
pub fn foo_options<'a>(
    pick: impl IntoIterator<Item = &'a str>,
    projected: &'static str,
) -> SyncSetOptions<Foo, Value> {
    SyncSetOptions::from_reducer(move |foo: &Foo| foo.field(projected).unwrap_or(Value::Null))
        .with_pick(pick.into_iter().map(str::to_string).collect::<Vec<_>>())
}

/// Options for a [`Task`] set built from a JSON schema.
///
/// The projection is `(title, done)`; priority and notes never count as
/// changes.
pub fn task_options(schema_json: &str) -> serde_json::Result<SyncSetOptions<Task, (String, bool)>> {
    let schema: SetSchema = serde_json::from_str(schema_json)?;
    Ok(SyncSetOptions::from_schema(
        schema,
        |task: &Task| (task.title.clone(), task.done),
        |prev, next| prev == next,
    ))
}

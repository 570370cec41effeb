//! Allow-listed partial updates
//!
//! Each entity exposes a typed `*Update` struct whose `Option` fields map to
//! fixed column names. Only those columns can ever reach an `UPDATE`, so
//! identifiers and creation timestamps stay immutable.

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

#[derive(Debug, Default)]
pub struct Patch {
    columns: Vec<(&'static str, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `column = value` when the field is present.
    pub fn set<T: Into<Value>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.columns.push((column, value.into()));
        }
        self
    }

    /// Record a nullable column: `Some(None)` clears it.
    pub fn set_nullable<T: Into<Value>>(
        &mut self,
        column: &'static str,
        value: Option<Option<T>>,
    ) -> &mut Self {
        if let Some(value) = value {
            let value = value.map(Into::into).unwrap_or(Value::Null);
            self.columns.push((column, value));
        }
        self
    }

    /// Record a JSON-serialised column.
    pub fn set_json<T: serde::Serialize>(
        &mut self,
        column: &'static str,
        value: Option<&T>,
    ) -> Result<&mut Self> {
        if let Some(value) = value {
            self.columns
                .push((column, Value::Text(serde_json::to_string(value)?)));
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(c, _)| *c)
    }

    /// Stamp a column only if something else changes.
    pub fn touch(&mut self, column: &'static str, value: String) -> &mut Self {
        if !self.is_empty() {
            self.columns.push((column, Value::Text(value)));
        }
        self
    }

    /// Run the `UPDATE`. An empty patch executes nothing and returns `false`;
    /// otherwise returns whether a row matched `id`.
    pub fn apply(self, conn: &Connection, table: &str, id: &str) -> Result<bool> {
        if self.columns.is_empty() {
            return Ok(false);
        }

        let assignments = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            assignments,
            self.columns.len() + 1
        );

        let values = self
            .columns
            .into_iter()
            .map(|(_, v)| v)
            .chain(std::iter::once(Value::Text(id.to_string())));
        let changed = conn.execute(&sql, params_from_iter(values))?;
        Ok(changed > 0)
    }
}

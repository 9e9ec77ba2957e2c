use serde::Serialize;
use serde_json::{Map, Value};

use crate::alias::Aliases;

pub type Row = Map<String, Value>;

/// Rows returned by `selectRows`, keyed by user-facing column name, plus
/// whatever else the server reported alongside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
    metadata: Map<String, Value>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>, metadata: Map<String, Value>) -> Self {
        let mut result = QueryResult {
            columns: Vec::new(),
            rows,
            metadata,
        };
        result.columns = union_columns(&result.rows);
        result.fill_missing();
        result
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().filter_map(move |row| row.get(name))
    }

    /// Renames server columns to their aliases. When two columns end up with
    /// the same name the later one wins.
    pub fn rename_columns(&mut self, aliases: &Aliases) {
        if aliases.is_empty() {
            return;
        }

        let mut columns: Vec<String> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let renamed = aliases.to_user(column);
            if !columns.iter().any(|c| c == renamed) {
                columns.push(renamed.to_owned());
            }
        }
        self.columns = columns;

        for row in self.rows.iter_mut() {
            let old = std::mem::take(row);
            *row = old
                .into_iter()
                .map(|(k, v)| (aliases.to_user(&k).to_owned(), v))
                .collect();
        }
    }

    /// Sets `name` to `value` on every row. The column is kept even when
    /// there are no rows.
    pub fn insert_constant(&mut self, name: &str, value: Value) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_owned());
        }
        for row in self.rows.iter_mut() {
            row.insert(name.to_owned(), value.clone());
        }
    }

    /// Stacks results from several servers. Per-server metadata does not
    /// survive the merge.
    pub fn concat(results: impl IntoIterator<Item = QueryResult>) -> QueryResult {
        let mut merged = QueryResult::default();
        for result in results {
            for column in result.columns {
                if !merged.columns.contains(&column) {
                    merged.columns.push(column);
                }
            }
            merged.rows.extend(result.rows);
        }
        merged.fill_missing();
        merged
    }

    fn fill_missing(&mut self) {
        for row in self.rows.iter_mut() {
            if row.len() == self.columns.len() {
                continue;
            }
            let mut old = std::mem::take(row);
            *row = self
                .columns
                .iter()
                .map(|c| (c.clone(), old.remove(c).unwrap_or(Value::Null)))
                .collect();
        }
    }
}

fn union_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in rows.iter().flat_map(|row| row.keys()) {
        if !columns.contains(key) {
            columns.push(key.clone());
        }
    }
    columns
}

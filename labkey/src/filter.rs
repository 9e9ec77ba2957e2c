use serde_json::Value;

use crate::{
    alias::{NativeClaims, ReverseAliases},
    Error, Result,
};

/// One `<column>~<operator>` constraint and the value it is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub operator: String,
    pub value: Value,
}

impl Filter {
    pub fn parse(key: &str, value: Value) -> Result<Self> {
        let (column, operator) = key
            .split_once('~')
            .ok_or_else(|| Error::FilterParse(key.to_owned()))?;

        Ok(Filter {
            column: column.to_owned(),
            operator: operator.to_owned(),
            value,
        })
    }

    /// Request parameter for this filter, with the column in server terms.
    pub fn to_param(
        &self,
        reverse: &ReverseAliases,
        claims: &mut NativeClaims,
    ) -> Result<(String, String)> {
        let column = reverse.resolve(&self.column, claims)?;
        Ok((
            format!("query.{}~{}", column, self.operator),
            render(&self.value),
        ))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Filters keyed the way users write them, e.g. `"gender~eq"`.
#[derive(Debug, Clone, Default)]
pub struct Filters(Vec<(String, Value)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for `key`, replacing an earlier one.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parse(&self) -> Result<Vec<Filter>> {
        self.0
            .iter()
            .map(|(key, value)| Filter::parse(key, value.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (key, value) in iter {
            filters.insert(key, value);
        }
        filters
    }
}

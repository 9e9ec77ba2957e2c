use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{result::Row, Error, Result};

/// Body of a `selectRows.api` reply: the rows, and everything else the
/// server sent (schema name, row count, field metadata, ...).
#[derive(Debug, Deserialize)]
pub struct SelectRowsResponse {
    pub rows: Vec<Row>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl SelectRowsResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::Response(e.to_string()))
    }
}

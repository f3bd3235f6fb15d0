// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use snafu::OptionExt;

use crate::error::{ColumnNotFoundSnafu, Result, UnexpectedValueSnafu};

/// One column of a decoded result set. The statement API reports the
/// declared type as a lowercase string ("text", "fixed", "real", ...).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Raw response body of the statement API. Every field is optional because
/// deferred (202) and error responses carry different subsets.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub result_set_meta_data: Option<ResultSetMetaData>,
    /// Row values always arrive as nullable strings, regardless of the
    /// declared column type.
    pub data: Option<Vec<Vec<Option<String>>>>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub statement_handle: Option<String>,
    pub statement_status_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetMetaData {
    #[serde(default)]
    pub num_rows: u64,
    pub row_type: Vec<ColumnSchema>,
}

/// An in-memory result set: column schema plus rows of nullable strings.
#[derive(Clone, Debug, Default)]
pub struct Records {
    schema: Vec<ColumnSchema>,
    rows: Vec<Vec<Option<String>>>,
}

impl Records {
    pub fn new(schema: Vec<ColumnSchema>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { schema, rows }
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolves a column name to its position. Column names come back from
    /// the platform upper-cased, so the lookup ignores ASCII case.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .context(ColumnNotFoundSnafu { column: name })
    }

    pub fn str_value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Reads a cell as `u64`. `Ok(None)` for SQL NULL, `UnexpectedValue`
    /// when the cell holds something that is not an unsigned integer.
    pub fn u64_value(&self, row: usize, col: usize) -> Result<Option<u64>> {
        let Some(raw) = self.str_value(row, col) else {
            return Ok(None);
        };
        let parsed = raw.parse::<u64>().ok().context(UnexpectedValueSnafu {
            column: self.column_name(col),
            value: raw,
        })?;
        Ok(Some(parsed))
    }

    pub fn f64_value(&self, row: usize, col: usize) -> Result<Option<f64>> {
        let Some(raw) = self.str_value(row, col) else {
            return Ok(None);
        };
        let parsed = raw.parse::<f64>().ok().context(UnexpectedValueSnafu {
            column: self.column_name(col),
            value: raw,
        })?;
        Ok(Some(parsed))
    }

    fn column_name(&self, col: usize) -> String {
        self.schema
            .get(col)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{col}"))
    }
}

impl From<StatementResponse> for Records {
    fn from(response: StatementResponse) -> Self {
        let schema = response
            .result_set_meta_data
            .map(|meta| meta.row_type)
            .unwrap_or_default();
        let rows = response.data.unwrap_or_default();
        Self { schema, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample_response() -> StatementResponse {
        let body = r#"{
            "resultSetMetaData": {
                "numRows": 2,
                "format": "jsonv2",
                "rowType": [
                    {"name": "QUERY_ID", "type": "text"},
                    {"name": "PARTITIONS_SCANNED", "type": "fixed"},
                    {"name": "PARTITIONS_TOTAL", "type": "fixed"}
                ]
            },
            "data": [
                ["01aa-1", "12", "40"],
                ["01aa-2", null, "0"]
            ],
            "code": "090001",
            "statementHandle": "01aa-handle",
            "message": "Statement executed successfully."
        }"#;
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_decode_statement_response() {
        let response = sample_response();
        assert_eq!("01aa-handle", response.statement_handle.as_deref().unwrap());

        let records = Records::from(response);
        assert_eq!(2, records.len());
        assert_eq!(3, records.schema().len());
        assert_eq!("QUERY_ID", records.schema()[0].name);
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let records = Records::from(sample_response());
        assert_eq!(0, records.column_index("query_id").unwrap());
        assert_eq!(2, records.column_index("PARTITIONS_TOTAL").unwrap());
        assert!(matches!(
            records.column_index("nope"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_typed_accessors() {
        let records = Records::from(sample_response());
        assert_eq!(Some("01aa-1"), records.str_value(0, 0));
        assert_eq!(Some(12), records.u64_value(0, 1).unwrap());
        // SQL NULL reads back as None.
        assert_eq!(None, records.u64_value(1, 1).unwrap());
        // A textual cell is not silently coerced to a number.
        assert!(matches!(
            records.u64_value(0, 0),
            Err(Error::UnexpectedValue { .. })
        ));
    }
}

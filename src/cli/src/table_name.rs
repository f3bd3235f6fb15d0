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

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidTableNameSnafu, Result};

/// A fully qualified table name, `<database>.<schema>.<table>`.
///
/// Access history records the accessed object under exactly this form, so
/// the name is kept verbatim (no case folding) and only ever embedded into
/// SQL through [`TableName::sql_literal`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName {
    database: String,
    schema: String,
    table: String,
}

impl TableName {
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Renders the qualified name for embedding inside a single-quoted SQL
    /// string literal. Single quotes are doubled; everything else passes
    /// through untouched.
    pub fn sql_literal(&self) -> String {
        self.to_string().replace('\'', "''")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [database, schema, table]
                if !database.is_empty() && !schema.is_empty() && !table.is_empty() =>
            {
                Ok(Self {
                    database: database.to_string(),
                    schema: schema.to_string(),
                    table: table.to_string(),
                })
            }
            _ => InvalidTableNameSnafu { name: s }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_name() {
        let name: TableName = "SALES.PUBLIC.ORDERS".parse().unwrap();
        assert_eq!("SALES", name.database());
        assert_eq!("PUBLIC", name.schema());
        assert_eq!("ORDERS", name.table());
        assert_eq!("SALES.PUBLIC.ORDERS", name.to_string());
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for input in ["", "orders", "public.orders", "a.b.c.d", "db..orders", ".."] {
            let result: Result<TableName> = input.parse();
            assert!(
                matches!(result, Err(Error::InvalidTableName { .. })),
                "'{input}' should not parse"
            );
        }
    }

    #[test]
    fn test_case_is_preserved() {
        let name: TableName = "Sales.Public.Orders".parse().unwrap();
        assert_eq!("Sales.Public.Orders", name.to_string());
    }

    #[test]
    fn test_sql_literal_escapes_quotes() {
        let name: TableName = "db.schema.o'brien".parse().unwrap();
        assert_eq!("db.schema.o''brien", name.sql_literal());

        let plain: TableName = "db.schema.orders".parse().unwrap();
        assert_eq!("db.schema.orders", plain.sql_literal());
    }
}

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

//! Client for a warehouse's statement REST API: submit a SQL statement,
//! poll deferred results, decode the JSON result set.

mod client;
mod error;
mod records;

use async_trait::async_trait;

pub use self::client::{
    Auth, Client, ClientBuilder, StatementContext, DEFAULT_POLL_INTERVAL,
    DEFAULT_STATEMENT_TIMEOUT, STATEMENTS_PATH,
};
pub use self::error::{Error, Result};
pub use self::records::{ColumnSchema, Records, ResultSetMetaData, StatementResponse};

/// Something that can execute a SQL statement and hand back the decoded
/// result set. The reporting tool is written against this seam so its flow
/// can be exercised without a live warehouse.
#[async_trait]
pub trait SqlRunner: Send + Sync {
    async fn sql(&self, statement: &str) -> Result<Records>;
}

#[async_trait]
impl SqlRunner for Client {
    async fn sql(&self, statement: &str) -> Result<Records> {
        Client::sql(self, statement).await
    }
}

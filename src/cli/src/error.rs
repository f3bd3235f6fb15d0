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

use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display(
        "Invalid table name '{}': expected fully qualified <database>.<schema>.<table>",
        name
    ))]
    InvalidTableName {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid auth '{}': expected <username>:<password>", auth))]
    InvalidAuthBasic {
        auth: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Database error"))]
    Database {
        #[snafu(source)]
        error: client::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "No successful query against '{}' produced scan statistics in the last {} days",
        table,
        lookback_days
    ))]
    NoQualifyingQueries {
        table: String,
        lookback_days: u32,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to serialize the report"))]
    SerializeReport {
        #[snafu(source)]
        error: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

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
    #[snafu(display("Invalid endpoint '{}'", endpoint))]
    InvalidEndpoint {
        endpoint: String,
        #[snafu(source)]
        error: url::ParseError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to build the http client"))]
    BuildHttpClient {
        #[snafu(source)]
        error: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to send statement request to '{}'", endpoint))]
    SendRequest {
        endpoint: String,
        #[snafu(source)]
        error: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to decode statement response"))]
    DecodeResponse {
        #[snafu(source)]
        error: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Server returned status {}: {}", code, message))]
    ServerStatus {
        code: String,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Deferred statement response carries no statement handle"))]
    MissingHandle {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Statement '{}' did not complete within {:?}", handle, timeout))]
    StatementTimeout {
        handle: String,
        timeout: std::time::Duration,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Result set has no column named '{}'", column))]
    ColumnNotFound {
        column: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unexpected value '{}' in column '{}'", value, column))]
    UnexpectedValue {
        column: String,
        value: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

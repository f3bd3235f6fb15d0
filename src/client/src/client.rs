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

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::error::{
    BuildHttpClientSnafu, DecodeResponseSnafu, InvalidEndpointSnafu, MissingHandleSnafu, Result,
    SendRequestSnafu, ServerStatusSnafu, StatementTimeoutSnafu,
};
use crate::records::{Records, StatementResponse};

pub const STATEMENTS_PATH: &str = "/api/v2/statements";

pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(600);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub enum Auth {
    /// An OAuth / session token sent as `Authorization: Bearer`.
    Bearer(String),
    /// `user:password`, base64-encoded on the wire.
    Basic { username: String, password: String },
}

/// Optional statement execution context forwarded with every request.
#[derive(Clone, Debug, Default)]
pub struct StatementContext {
    pub warehouse: Option<String>,
    pub role: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatementRequest<'a> {
    statement: &'a str,
    /// Server-side statement timeout, in seconds.
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

pub struct ClientBuilder {
    endpoint: String,
    auth: Option<Auth>,
    statement_timeout: Duration,
    poll_interval: Duration,
    context: StatementContext,
}

impl ClientBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: None,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            context: StatementContext::default(),
        }
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn context(mut self, context: StatementContext) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> Result<Client> {
        let base = Url::parse(&self.endpoint).context(InvalidEndpointSnafu {
            endpoint: &self.endpoint,
        })?;
        let statements_url = base.join(STATEMENTS_PATH).context(InvalidEndpointSnafu {
            endpoint: &self.endpoint,
        })?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // Each round-trip gets some slack on top of the server-side
            // statement timeout.
            .timeout(self.statement_timeout + Duration::from_secs(30))
            .build()
            .context(BuildHttpClientSnafu)?;
        Ok(Client {
            http,
            statements_url,
            auth: self.auth,
            statement_timeout: self.statement_timeout,
            poll_interval: self.poll_interval,
            context: self.context,
        })
    }
}

/// A client for the warehouse statement REST API.
///
/// Statements are submitted with a single POST. Slow statements come back
/// as deferred (202) responses carrying a handle; those are polled until
/// they complete or the statement timeout passes.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    statements_url: Url,
    auth: Option<Auth>,
    statement_timeout: Duration,
    poll_interval: Duration,
    context: StatementContext,
}

impl Client {
    pub async fn sql(&self, statement: &str) -> Result<Records> {
        let deadline = Instant::now() + self.statement_timeout;
        let body = StatementRequest {
            statement,
            timeout: self.statement_timeout.as_secs(),
            warehouse: self.context.warehouse.as_deref(),
            role: self.context.role.as_deref(),
        };
        debug!("submitting statement to {}", self.statements_url);
        let request = self.with_auth(self.http.post(self.statements_url.clone()).json(&body));
        let response = request.send().await.context(SendRequestSnafu {
            endpoint: self.statements_url.as_str(),
        })?;

        match response.status() {
            StatusCode::OK => {
                let response: StatementResponse =
                    response.json().await.context(DecodeResponseSnafu)?;
                Ok(Records::from(response))
            }
            StatusCode::ACCEPTED => {
                let response: StatementResponse =
                    response.json().await.context(DecodeResponseSnafu)?;
                let handle = response.statement_handle.context(MissingHandleSnafu)?;
                self.poll_statement(&handle, deadline).await
            }
            status => Err(Self::into_server_error(status, response).await),
        }
    }

    async fn poll_statement(&self, handle: &str, deadline: Instant) -> Result<Records> {
        let status_url = self
            .statements_url
            .join(&format!("{STATEMENTS_PATH}/{handle}"))
            .context(InvalidEndpointSnafu {
                endpoint: self.statements_url.as_str(),
            })?;
        while Instant::now() < deadline {
            tokio::time::sleep(self.poll_interval).await;
            debug!("polling deferred statement {handle}");
            let request = self.with_auth(self.http.get(status_url.clone()));
            let response = request.send().await.context(SendRequestSnafu {
                endpoint: status_url.as_str(),
            })?;
            match response.status() {
                StatusCode::OK => {
                    let response: StatementResponse =
                        response.json().await.context(DecodeResponseSnafu)?;
                    return Ok(Records::from(response));
                }
                StatusCode::ACCEPTED => continue,
                status => return Err(Self::into_server_error(status, response).await),
            }
        }
        StatementTimeoutSnafu {
            handle,
            timeout: self.statement_timeout,
        }
        .fail()
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(Auth::Bearer(token)) => request.bearer_auth(token),
            Some(Auth::Basic { username, password }) => {
                let payload = BASE64_STANDARD.encode(format!("{username}:{password}"));
                request.header(AUTHORIZATION, format!("Basic {payload}"))
            }
            None => request,
        }
    }

    /// Surfaces a non-2xx response as `ServerStatus`, preferring the
    /// platform's own error code and message when the body parses.
    async fn into_server_error(status: StatusCode, response: reqwest::Response) -> crate::Error {
        let (code, message) = match response.json::<StatementResponse>().await {
            Ok(body) => (
                body.code.unwrap_or_else(|| status.as_u16().to_string()),
                body.message.unwrap_or_else(|| status.to_string()),
            ),
            Err(_) => (status.as_u16().to_string(), status.to_string()),
        };
        ServerStatusSnafu { code, message }.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_invalid_endpoint() {
        let result = ClientBuilder::new("not an url").build();
        assert!(matches!(result, Err(crate::Error::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_statement_request_body_omits_empty_context() {
        let request = StatementRequest {
            statement: "SELECT 1",
            timeout: 60,
            warehouse: None,
            role: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            serde_json::json!({"statement": "SELECT 1", "timeout": 60}),
            body
        );

        let request = StatementRequest {
            statement: "SELECT 1",
            timeout: 60,
            warehouse: Some("reporting"),
            role: Some("analyst"),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!("reporting", body["warehouse"]);
        assert_eq!("analyst", body["role"]);
    }
}

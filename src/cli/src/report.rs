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

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use client::{Auth, ClientBuilder, Records, SqlRunner, StatementContext};
use snafu::{ensure, OptionExt, ResultExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{
    DatabaseSnafu, InvalidAuthBasicSnafu, NoQualifyingQueriesSnafu, Result, SerializeReportSnafu,
};
use crate::stats::{ScanStat, ScanSummary};
use crate::table_name::TableName;
use crate::Tool;

#[derive(Debug, Default, Clone, ValueEnum)]
enum OutputFormat {
    /// One aligned row, for humans.
    #[default]
    Table,
    Json,
    Csv,
}

/// Estimate how much of a table's physical storage its recent queries
/// actually scanned.
///
/// Walks the account-usage query history for successful queries that
/// touched the table, reads the partition-pruning statistics of each one,
/// and reports the percent-scanned distribution as percentiles.
#[derive(Debug, Parser)]
pub struct ReportCommand {
    /// Fully qualified table name: <database>.<schema>.<table>.
    table: String,

    /// Warehouse account endpoint to connect, e.g.
    /// https://myorg-account.snowflakecomputing.com
    #[clap(long)]
    addr: String,

    /// Bearer token used to authenticate against the endpoint.
    #[clap(long, env = "SCANSCOPE_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Basic authentication, as <username>:<password>. Ignored when a
    /// bearer token is given.
    #[clap(long)]
    auth_basic: Option<String>,

    /// Maximum number of recent queries to sample.
    ///
    /// Operator statistics are fetched one query at a time and the platform
    /// answers slowly, so a full run over the default is a matter of
    /// minutes.
    #[clap(long, default_value = "1000")]
    limit: usize,

    /// How many days of query history to consider. The platform retains
    /// operator statistics for 14 days, so larger values only add ids whose
    /// statistics are already gone.
    #[clap(long, default_value = "14")]
    lookback_days: u32,

    /// Per-statement timeout, also bounding how long a deferred statement
    /// is polled.
    #[clap(long, value_parser = humantime::parse_duration, default_value = "10m")]
    timeout: Duration,

    /// Interval between polls of a deferred statement.
    #[clap(long, value_parser = humantime::parse_duration, default_value = "2s")]
    poll_interval: Duration,

    /// Virtual warehouse to run the metadata statements on.
    #[clap(long)]
    warehouse: Option<String>,

    /// Role to assume for the metadata statements.
    #[clap(long)]
    role: Option<String>,

    /// Output format of the summary row.
    #[clap(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

impl ReportCommand {
    pub async fn build(&self) -> Result<Box<dyn Tool>> {
        let table: TableName = self.table.parse()?;
        let mut builder = ClientBuilder::new(&self.addr)
            .statement_timeout(self.timeout)
            .poll_interval(self.poll_interval)
            .context(StatementContext {
                warehouse: self.warehouse.clone(),
                role: self.role.clone(),
            });
        if let Some(auth) = self.auth()? {
            builder = builder.auth(auth);
        }
        let client = builder.build().context(DatabaseSnafu)?;

        Ok(Box::new(Report {
            table,
            runner: Arc::new(client),
            limit: self.limit,
            lookback_days: self.lookback_days,
            format: self.format.clone(),
        }))
    }

    fn auth(&self) -> Result<Option<Auth>> {
        if let Some(token) = &self.auth_token {
            return Ok(Some(Auth::Bearer(token.clone())));
        }
        let Some(auth) = &self.auth_basic else {
            return Ok(None);
        };
        let (username, password) = auth
            .split_once(':')
            .context(InvalidAuthBasicSnafu { auth })?;
        Ok(Some(Auth::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }))
    }
}

/// One sampled query: its id plus the recorded start time, when the start
/// time survives the trip through the result set.
#[derive(Clone, Debug)]
struct QueryRecord {
    query_id: String,
    start_time: Option<DateTime<Utc>>,
}

pub struct Report {
    table: TableName,
    runner: Arc<dyn SqlRunner>,
    limit: usize,
    lookback_days: u32,
    format: OutputFormat,
}

/// Lists the most recent successful queries that accessed the table within
/// the lookback window: access history flattened over the accessed base
/// objects, joined with query history to keep only successful executions.
fn access_history_sql(table: &TableName, lookback_days: u32, limit: usize) -> String {
    let table_literal = table.sql_literal();
    format!(
        "WITH relevant_queries AS ( \
            SELECT DISTINCT query_id, query_start_time \
            FROM snowflake.account_usage.access_history, \
                LATERAL FLATTEN(snowflake.account_usage.access_history.base_objects_accessed) \
                    AS objects_accessed \
            WHERE objects_accessed.value:objectDomain::TEXT = 'Table' \
                AND objects_accessed.value:objectName::TEXT = '{table_literal}' \
                AND query_start_time > TIMEADD('days', -{lookback_days}, current_timestamp()) \
            ORDER BY query_start_time DESC \
            LIMIT {limit}) \
        SELECT relevant_queries.query_id, relevant_queries.query_start_time \
        FROM relevant_queries \
        INNER JOIN snowflake.account_usage.query_history \
            ON relevant_queries.query_id = query_history.query_id \
        WHERE query_history.start_time > TIMEADD('days', -{lookback_days}, current_timestamp()) \
            AND query_history.execution_status = 'SUCCESS'"
    )
}

/// Partition-pruning counters of the table's scan operators in one query.
fn operator_stats_sql(table: &TableName, query_id: &str) -> String {
    let table_literal = table.sql_literal();
    let query_id = query_id.replace('\'', "''");
    format!(
        "SELECT operator_statistics:pruning:partitions_scanned AS partitions_scanned, \
            operator_statistics:pruning:partitions_total AS partitions_total \
        FROM TABLE(GET_QUERY_OPERATOR_STATS('{query_id}')) \
        WHERE operator_type = 'TableScan' \
            AND operator_attributes:table_name::TEXT = '{table_literal}'"
    )
}

/// Start times come back either as an epoch with fractional seconds
/// (the statement API's wire form for timestamps) or as RFC 3339 text.
fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(epoch) = raw.parse::<f64>() {
        let secs = epoch.trunc() as i64;
        let nanos = (epoch.fract() * 1e9).round() as u32;
        return DateTime::from_timestamp(secs, nanos);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl Report {
    async fn qualifying_queries(&self) -> Result<Vec<QueryRecord>> {
        let sql = access_history_sql(&self.table, self.lookback_days, self.limit);
        let records = self.runner.sql(&sql).await.context(DatabaseSnafu)?;
        if records.is_empty() {
            return Ok(vec![]);
        }
        let id_idx = records.column_index("QUERY_ID").context(DatabaseSnafu)?;
        let start_idx = records
            .column_index("QUERY_START_TIME")
            .context(DatabaseSnafu)?;

        let mut queries = Vec::with_capacity(records.len());
        for row in 0..records.len() {
            let Some(query_id) = records.str_value(row, id_idx) else {
                warn!("query history row {row} has no query id, skipping");
                continue;
            };
            queries.push(QueryRecord {
                query_id: query_id.to_string(),
                start_time: records
                    .str_value(row, start_idx)
                    .and_then(parse_start_time),
            });
        }
        Ok(queries)
    }

    /// Fetches the pruning statistics of each sampled query in turn and
    /// computes its percent-scanned. Queries where the table never shows up
    /// as a scan operator are skipped, as are rows with unusable counters.
    async fn collect_scan_percentages(&self, queries: &[QueryRecord]) -> Result<Vec<f64>> {
        let mut percentages = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            let sql = operator_stats_sql(&self.table, &query.query_id);
            let stats = self.runner.sql(&sql).await.context(DatabaseSnafu)?;
            debug!(
                "query {}/{}: {} scan operator(s) for {}",
                i + 1,
                queries.len(),
                stats.len(),
                query.query_id
            );
            if stats.is_empty() {
                continue;
            }
            let scanned_idx = stats
                .column_index("PARTITIONS_SCANNED")
                .context(DatabaseSnafu)?;
            let total_idx = stats
                .column_index("PARTITIONS_TOTAL")
                .context(DatabaseSnafu)?;
            for row in 0..stats.len() {
                let (Some(partitions_scanned), Some(partitions_total)) = (
                    counter(&stats, row, scanned_idx),
                    counter(&stats, row, total_idx),
                ) else {
                    warn!(
                        "incomplete pruning counters for query {}, skipping row {row}",
                        query.query_id
                    );
                    continue;
                };
                let percent = ScanStat {
                    partitions_scanned,
                    partitions_total,
                }
                .percent_scanned();
                if !(0.0..=100.0).contains(&percent) {
                    warn!(
                        "query {} reports {percent}% scanned, outside [0, 100], skipping",
                        query.query_id
                    );
                    continue;
                }
                percentages.push(percent);
            }
        }
        Ok(percentages)
    }

    async fn run(&self) -> Result<ScanSummary> {
        let timer = Instant::now();
        let queries = self.qualifying_queries().await?;
        ensure!(
            !queries.is_empty(),
            NoQualifyingQueriesSnafu {
                table: self.table.to_string(),
                lookback_days: self.lookback_days,
            }
        );
        let span_start = queries.iter().filter_map(|q| q.start_time).min();
        let span_end = queries.iter().filter_map(|q| q.start_time).max();
        info!(
            "sampling {} queries against {} (started between {:?} and {:?})",
            queries.len(),
            self.table,
            span_start,
            span_end
        );

        let samples = self.collect_scan_percentages(&queries).await?;
        info!(
            "collected {} scan sample(s) from {} queries, cost: {:?}",
            samples.len(),
            queries.len(),
            timer.elapsed()
        );
        ScanSummary::from_samples(&self.table.to_string(), samples).context(
            NoQualifyingQueriesSnafu {
                table: self.table.to_string(),
                lookback_days: self.lookback_days,
            },
        )
    }

    fn render(&self, summary: &ScanSummary) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Table => render_table(summary),
            OutputFormat::Json => {
                serde_json::to_string_pretty(summary).context(SerializeReportSnafu)?
            }
            OutputFormat::Csv => render_csv(summary),
        })
    }
}

const SUMMARY_COLUMNS: [&str; 6] = ["table_name", "p10", "p50", "p90", "p99", "p100"];

fn render_table(summary: &ScanSummary) -> String {
    let width = summary.table_name.len().max(SUMMARY_COLUMNS[0].len());
    let mut out = format!("{:<width$}", SUMMARY_COLUMNS[0]);
    for column in &SUMMARY_COLUMNS[1..] {
        out.push_str(&format!("  {column:>8}"));
    }
    out.push('\n');
    out.push_str(&format!("{:<width$}", summary.table_name));
    for value in summary.percentiles() {
        out.push_str(&format!("  {value:>8.2}"));
    }
    out
}

fn render_csv(summary: &ScanSummary) -> String {
    let mut row = vec![csv_field(&summary.table_name)];
    row.extend(summary.percentiles().map(|v| format!("{v:.2}")));
    format!("{}\n{}", SUMMARY_COLUMNS.join(","), row.join(","))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn counter(records: &Records, row: usize, col: usize) -> Option<u64> {
    match records.u64_value(row, col) {
        Ok(value) => value,
        Err(error) => {
            warn!("unreadable pruning counter: {error}");
            None
        }
    }
}

#[async_trait]
impl Tool for Report {
    #[allow(clippy::print_stdout)]
    async fn do_work(&self) -> Result<()> {
        let summary = self.run().await?;
        println!("{}", self.render(&summary)?);
        Ok(())
    }
}

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

pub mod error;
mod report;
mod stats;
mod table_name;

use async_trait::async_trait;

pub use crate::error::{Error, Result};
pub use crate::report::ReportCommand;
pub use crate::stats::{ScanStat, ScanSummary, REPORT_RANKS};
pub use crate::table_name::TableName;

#[async_trait]
pub trait Tool: Send + Sync {
    async fn do_work(&self) -> Result<()>;
}

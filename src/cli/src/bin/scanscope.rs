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

use clap::{Parser, Subcommand};
use cli::ReportCommand;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanscope", version, about = "Partition scan usage reporter")]
struct App {
    #[clap(subcommand)]
    command: Command,

    /// Log level, overridden by `RUST_LOG` when set.
    #[clap(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Report the percent-scanned percentiles of a table's recent queries.
    Report(ReportCommand),
}

#[tokio::main]
async fn main() {
    let app = App::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match &app.command {
        Command::Report(cmd) => match cmd.build().await {
            Ok(tool) => tool.do_work().await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

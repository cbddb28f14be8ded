mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 初始化日志系统
    rqstr::logger::init_logger(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            if cli::run(args).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::History(args) => {
            cli::history(args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

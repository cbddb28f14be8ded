use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rqstr::collection::{CollectionLoader, RequestCollection};
use rqstr::config::{ConfigLoader, Settings};
use rqstr::output::{ResultRecord, ResultStore, history_table};
use rqstr::runner::{CollectionRunner, CollectionReport, ReportFormat, TestReporter, aggregate};
use tracing::{info, warn};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 日志写入指定文件而不是 stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 执行请求集合（默认在当前目录查找 *.rest.yml / *.rest.json）
    Run(RunArgs),
    /// 查看最近保存的执行结果
    History(HistoryArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// 集合文件或目录
    pub inputs: Vec<PathBuf>,

    /// 有失败时仍以 0 退出
    #[arg(long)]
    pub no_fail_on_error: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// 显示每次尝试的细节
    #[arg(short, long)]
    pub verbose: bool,

    /// 不保存结果
    #[arg(long)]
    pub no_output: bool,

    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// 显示最近 N 条
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    Ok(match path {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::find_and_load(),
    })
}

/// 展开输入：目录递归查找集合文件，文件原样保留
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Ok(CollectionLoader::discover(".")?);
    }
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(CollectionLoader::discover(input)?);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Ctrl-C 信号；无法注册监听时永不完成
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// 执行 `run` 子命令，返回进程是否应以成功退出
pub async fn run(args: RunArgs) -> Result<bool> {
    let settings = load_settings(args.config.as_deref())?;
    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        println!("No collection files found");
        return Ok(true);
    }

    let reporter = TestReporter::new(args.verbose);
    let mut all_passed = true;

    for path in &files {
        let collection = match CollectionLoader::load(path) {
            Ok(collection) => collection,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                all_passed = false;
                continue;
            }
        };

        let mut runner = CollectionRunner::new(settings.client.clone());
        let report = runner.execute_until(&collection, interrupted()).await?;
        let verdict = aggregate(&report);
        println!("{}", reporter.render(&report, &verdict, args.format)?);

        if !args.no_output && settings.output.enabled && collection.output.enabled {
            persist(&settings, &collection, &report);
        }
        all_passed &= verdict.overall_passed;
    }

    Ok(all_passed || args.no_fail_on_error)
}

/// 保存失败只记录警告，不影响退出码
fn persist(settings: &Settings, collection: &RequestCollection, report: &CollectionReport) {
    let dir = ConfigLoader::output_dir(settings, collection.output.output_dir.as_deref());
    let store = ResultStore::in_dir(&dir);
    match store.append(&ResultRecord::from_report(report)) {
        Ok(()) => info!("Results saved to {}", store.path().display()),
        Err(e) => warn!("Failed to save results to {}: {}", dir.display(), e),
    }
}

/// 执行 `history` 子命令
pub fn history(args: HistoryArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    let store = ResultStore::in_dir(ConfigLoader::output_dir(&settings, None));
    let records = store.tail(args.limit)?;

    if records.is_empty() {
        println!("No results recorded yet");
        return Ok(());
    }
    println!("{}", history_table(&records));
    Ok(())
}

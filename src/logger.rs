use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt};

use crate::Result;

/// 初始化日志系统
///
/// 支持通过 RUST_LOG 环境变量控制日志级别
/// 默认级别: info
///
/// 指定 `log_file` 时日志追加写入该文件（不带颜色），否则输出到 stderr，
/// 避免与 stdout 上的报告混在一起。
///
/// 示例:
/// - RUST_LOG=debug rqstr run
/// - rqstr --log-file rqstr_output.log run
pub fn init_logger(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| crate::RqstrError::Other(e.to_string()))?;
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| crate::RqstrError::Other(e.to_string()))?;
        }
    }

    tracing::info!("Logger initialized");
    Ok(())
}

use serde::Deserialize;
use std::path::PathBuf;

/// 默认结果输出目录
pub const DEFAULT_OUTPUT_DIR: &str = ".rqstr/output";

/// 完整的配置文件 (rqstr.toml)
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// HTTP 客户端配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// 传输层总超时（秒），None 表示不限制
    pub timeout_secs: Option<u64>,

    /// 建立连接超时（秒）
    pub connect_timeout_secs: u64,

    pub user_agent: String,

    /// 同时在途的请求上限，None 表示不限制
    pub max_in_flight: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(30),
            connect_timeout_secs: 10,
            user_agent: concat!("rqstr/", env!("CARGO_PKG_VERSION")).to_string(),
            max_in_flight: None,
        }
    }
}

/// 结果持久化配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

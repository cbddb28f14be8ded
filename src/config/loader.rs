use crate::config::types::{DEFAULT_OUTPUT_DIR, Settings};
use crate::{Result, RqstrError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 输出目录的环境变量覆盖
pub const OUTPUT_DIR_ENV: &str = "RQSTR_OUTPUT_DIR";

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "rqstr.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RqstrError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content)
            .map_err(|e| RqstrError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// 查找并加载配置文件，找不到时使用默认值
    /// 查找顺序：
    /// 1. 当前目录及父目录
    /// 2. 用户配置目录 ~/.config/rqstr/
    pub fn find_and_load() -> Settings {
        let found = Self::find_in_current_dir().or_else(Self::find_in_user_dir);
        match found {
            Some(path) => match Self::load_from_path(&path) {
                Ok(settings) => {
                    debug!("Loaded config from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    Settings::default()
                }
            },
            None => Settings::default(),
        }
    }

    fn find_in_current_dir() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    fn find_in_user_dir() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("rqstr").join(Self::CONFIG_FILE);
        config_path.is_file().then_some(config_path)
    }

    /// 决定结果输出目录
    /// 优先级：集合内声明 > 环境变量 > 配置文件 > 默认值
    pub fn output_dir(settings: &Settings, collection_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = collection_dir {
            return dir.to_path_buf();
        }
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV)
            && !dir.trim().is_empty()
        {
            return PathBuf::from(dir);
        }
        settings
            .output
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

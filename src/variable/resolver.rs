use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::warn;

/// 环境变量替换器
pub struct VariableResolver;

impl VariableResolver {
    fn env_regex() -> &'static Regex {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        ENV_REGEX.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
                .expect("env placeholder pattern is valid")
        })
    }

    /// 解析并替换系统环境变量 `${VAR}` / `${VAR:-default}`
    ///
    /// 未设置且没有默认值的变量保持原样。
    pub fn resolve_env_vars(text: &str) -> String {
        Self::resolve_with(text, |name| std::env::var(name).ok())
    }

    /// 使用给定的查找函数替换，便于测试
    pub fn resolve_with<F>(text: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::env_regex()
            .replace_all(text, |caps: &Captures| {
                let name = &caps[1];
                match (lookup(name), caps.get(2)) {
                    (Some(value), _) => value,
                    (None, Some(default)) => default.as_str().to_string(),
                    (None, None) => {
                        warn!("Environment variable {} is not set", name);
                        caps[0].to_string()
                    }
                }
            })
            .to_string()
    }
}

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// 对单次响应的期望：状态码与耗时
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssertionRule {
    /// 精确匹配的状态码；未设置时任意 2xx 均通过
    #[serde(default, alias = "status_code")]
    pub expected_status: Option<u16>,

    /// 软超时（秒）；未设置时不检查耗时
    #[serde(default, alias = "timeout_s", deserialize_with = "de_secs")]
    pub soft_timeout: Option<Duration>,
}

/// 两项检查各自的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed_status: bool,
    pub passed_timing: bool,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.passed_status && self.passed_timing
    }
}

impl AssertionRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn with_soft_timeout(mut self, timeout: Duration) -> Self {
        self.soft_timeout = Some(timeout);
        self
    }

    pub fn evaluate(&self, status_code: u16, elapsed: Duration) -> CheckOutcome {
        let passed_status = match self.expected_status {
            Some(expected) => status_code == expected,
            None => (200..300).contains(&status_code),
        };
        let passed_timing = match self.soft_timeout {
            Some(limit) => elapsed <= limit,
            None => true,
        };
        CheckOutcome {
            passed_status,
            passed_timing,
        }
    }
}

fn de_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs: Option<f64> = Option::deserialize(deserializer)?;
    secs.map(|s| {
        Duration::try_from_secs_f64(s)
            .map_err(|_| serde::de::Error::custom(format!("invalid soft_timeout: {}", s)))
    })
    .transpose()
}

use crate::assertion::AssertionRule;
use crate::http::{Response, TransportErrorKind, TransportFailure};
use serde::{Serialize, Serializer};
use std::time::Duration;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}

/// 单次尝试的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// 收到了响应，检查结果见两个布尔值
    Received {
        status_code: u16,
        #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
        elapsed: Duration,
        body_text: String,
        passed_status_check: bool,
        passed_timing_check: bool,
    },
    /// 没有收到响应
    TransportError {
        kind: TransportErrorKind,
        description: String,
    },
}

impl Outcome {
    /// 用断言规则解释一次响应
    pub fn received(response: Response, rule: &AssertionRule) -> Self {
        let checks = rule.evaluate(response.status.code(), response.duration);
        Outcome::Received {
            status_code: response.status.code(),
            elapsed: response.duration,
            body_text: response.body,
            passed_status_check: checks.passed_status,
            passed_timing_check: checks.passed_timing,
        }
    }

    pub fn transport(failure: TransportFailure) -> Self {
        Outcome::TransportError {
            kind: failure.kind,
            description: failure.description,
        }
    }

    pub fn overall_passed(&self) -> bool {
        match self {
            Outcome::Received {
                passed_status_check,
                passed_timing_check,
                ..
            } => *passed_status_check && *passed_timing_check,
            Outcome::TransportError { .. } => false,
        }
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, Outcome::TransportError { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Outcome::Received { status_code, .. } => Some(*status_code),
            Outcome::TransportError { .. } => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Outcome::Received { elapsed, .. } => Some(*elapsed),
            Outcome::TransportError { .. } => None,
        }
    }

    /// 严重程度：传输错误 > 检查失败 > 通过
    fn severity(&self) -> u8 {
        match self {
            Outcome::TransportError { .. } => 2,
            Outcome::Received { .. } if !self.overall_passed() => 1,
            Outcome::Received { .. } => 0,
        }
    }
}

/// benchmark 的耗时统计，只统计收到响应的尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    pub samples: usize,
    #[serde(rename = "min_ms", serialize_with = "as_millis")]
    pub min: Duration,
    #[serde(rename = "max_ms", serialize_with = "as_millis")]
    pub max: Duration,
    #[serde(rename = "mean_ms", serialize_with = "as_millis")]
    pub mean: Duration,
    #[serde(rename = "p50_ms", serialize_with = "as_millis")]
    pub p50: Duration,
}

impl LatencyStats {
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort();
        let (min, max) = (*sorted.first()?, *sorted.last()?);
        let total: Duration = sorted.iter().sum();
        let count = u32::try_from(sorted.len()).ok()?;
        Some(Self {
            samples: sorted.len(),
            min,
            max,
            mean: total / count,
            p50: sorted[(sorted.len() - 1) / 2],
        })
    }
}

/// 单个请求的全部尝试，按发起顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestReport {
    pub name: String,
    pub method: String,
    pub url: String,
    pub attempts: Vec<Outcome>,
}

impl RequestReport {
    pub fn passed(&self) -> bool {
        self.attempts.iter().all(Outcome::overall_passed)
    }

    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|o| !o.overall_passed()).count()
    }

    /// 最差的一次尝试，同等严重时取最早的
    pub fn worst(&self) -> Option<&Outcome> {
        self.attempts
            .iter()
            .enumerate()
            .max_by_key(|(index, outcome)| (outcome.severity(), std::cmp::Reverse(*index)))
            .map(|(_, outcome)| outcome)
    }

    pub fn latency(&self) -> Option<LatencyStats> {
        let samples: Vec<Duration> = self.attempts.iter().filter_map(Outcome::elapsed).collect();
        LatencyStats::from_samples(&samples)
    }
}

/// 一个集合的完整执行结果，请求按声明顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub title: String,
    pub requests: Vec<RequestReport>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl CollectionReport {
    pub fn get(&self, name: &str) -> Option<&RequestReport> {
        self.requests.iter().find(|r| r.name == name)
    }

    pub fn outcomes(&self, name: &str) -> Option<&[Outcome]> {
        self.get(name).map(|r| r.attempts.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn overall_passed(&self) -> bool {
        self.requests.iter().all(RequestReport::passed)
    }
}

/// 单个请求的摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub name: String,
    pub passed: bool,
    pub attempts: usize,
    pub failed_attempts: usize,
    pub worst: Option<Outcome>,
    pub latency: Option<LatencyStats>,
}

/// 整体结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub overall_passed: bool,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_attempts: usize,
    pub summaries: Vec<RequestSummary>,
}

impl Verdict {
    pub fn from_report(report: &CollectionReport) -> Self {
        let summaries: Vec<RequestSummary> = report
            .requests
            .iter()
            .map(|r| RequestSummary {
                name: r.name.clone(),
                passed: r.passed(),
                attempts: r.attempts.len(),
                failed_attempts: r.failed_attempts(),
                worst: r.worst().cloned(),
                latency: r.latency(),
            })
            .collect();
        let passed = summaries.iter().filter(|s| s.passed).count();

        Self {
            overall_passed: passed == summaries.len(),
            total: summaries.len(),
            passed,
            failed: summaries.len() - passed,
            total_attempts: summaries.iter().map(|s| s.attempts).sum(),
            summaries,
        }
    }
}

/// 汇总一个集合的结果
pub fn aggregate(report: &CollectionReport) -> Verdict {
    Verdict::from_report(report)
}

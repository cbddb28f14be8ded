use crate::Result;
use crate::runner::types::{CollectionReport, LatencyStats, Outcome, RequestReport, Verdict};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Table};
use serde::Serialize;
use std::time::Duration;

/// 报告输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// 超过该长度的响应体只显示字节数
const MAX_INLINE_BODY: usize = 200;

pub struct TestReporter {
    verbose: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a CollectionReport,
    verdict: &'a Verdict,
}

impl TestReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// 渲染完整报告
    pub fn render(&self, report: &CollectionReport, verdict: &Verdict, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text(report, verdict)),
            ReportFormat::Json => Self::render_json(report, verdict),
        }
    }

    pub fn render_json(report: &CollectionReport, verdict: &Verdict) -> Result<String> {
        let json = JsonReport { report, verdict };
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn render_text(&self, report: &CollectionReport, verdict: &Verdict) -> String {
        let mut lines = Vec::new();
        lines.push(format!("{}", report.title.bold()));
        for request in &report.requests {
            self.render_request(request, &mut lines);
        }
        lines.push(Self::render_summary(verdict, report.elapsed));
        lines.join("\n")
    }

    fn render_request(&self, request: &RequestReport, lines: &mut Vec<String>) {
        let symbol = if request.passed() {
            "✓".green()
        } else {
            "✗".red()
        };

        let detail = match request.worst() {
            Some(outcome) if request.attempts.len() == 1 => Self::describe(outcome),
            _ => format!(
                "{}/{} attempts passed",
                request.attempts.len() - request.failed_attempts(),
                request.attempts.len()
            ),
        };

        lines.push(format!(
            " {} {} {} {} ({})",
            symbol,
            request.name,
            request.method.cyan(),
            request.url,
            detail
        ));

        if request.attempts.len() > 1
            && let Some(stats) = request.latency()
        {
            for line in Self::latency_table(&stats).lines() {
                lines.push(format!("   {}", line));
            }
        }

        // 失败的尝试或 verbose 模式下显示每次尝试的细节
        for (index, outcome) in request.attempts.iter().enumerate() {
            if !self.verbose && outcome.overall_passed() {
                continue;
            }
            lines.push(format!("   [{}] {}", index + 1, Self::describe(outcome)));
            if let Outcome::Received { body_text, .. } = outcome
                && !body_text.is_empty()
            {
                lines.push(format!("       {}", Self::body_preview(body_text)));
            }
        }
    }

    fn describe(outcome: &Outcome) -> String {
        match outcome {
            Outcome::Received {
                status_code,
                elapsed,
                passed_status_check,
                passed_timing_check,
                ..
            } => {
                let mut text = format!("status {} in {}ms", status_code, elapsed.as_millis());
                if !passed_status_check {
                    text.push_str(&format!(", {}", "unexpected status".red()));
                }
                if !passed_timing_check {
                    text.push_str(&format!(", {}", "too slow".red()));
                }
                text
            }
            Outcome::TransportError { kind, description } => {
                format!("{} {}: {}", "error".red().bold(), kind, description)
            }
        }
    }

    fn body_preview(body: &str) -> String {
        if body.len() > MAX_INLINE_BODY {
            return format!("Body: {} bytes", body.len());
        }
        // 尝试压缩 JSON 为一行，失败则显示原始内容
        serde_json::from_str::<serde_json::Value>(body)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| body.replace('\n', " "))
    }

    fn latency_table(stats: &LatencyStats) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Samples", "Min", "P50", "Mean", "Max"]);
        table.add_row(vec![
            Cell::new(stats.samples),
            Cell::new(Self::millis(stats.min)),
            Cell::new(Self::millis(stats.p50)),
            Cell::new(Self::millis(stats.mean)),
            Cell::new(Self::millis(stats.max)),
        ]);
        table.to_string()
    }

    fn millis(duration: Duration) -> String {
        format!("{:.1}ms", duration.as_secs_f64() * 1000.0)
    }

    fn render_summary(verdict: &Verdict, elapsed: Duration) -> String {
        let mut lines = vec![String::new(), "━".repeat(50)];
        if verdict.failed == 0 {
            lines.push(format!(
                "  {}: {} passed, {} total",
                "Requests".bold(),
                verdict.passed.to_string().green(),
                verdict.total
            ));
        } else {
            lines.push(format!(
                "  {}: {} passed, {} failed, {} total",
                "Requests".bold(),
                verdict.passed.to_string().green(),
                verdict.failed.to_string().red(),
                verdict.total
            ));
        }
        lines.push(format!(
            "  {}: {}",
            "Attempts".bold(),
            verdict.total_attempts
        ));
        lines.push(format!("  {}: {:.3}s", "Duration".bold(), elapsed.as_secs_f64()));
        lines.join("\n")
    }
}

impl Default for TestReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

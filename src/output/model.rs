use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::runner::{CollectionReport, Outcome};

/// 持久化的单次尝试记录（不含任何凭据）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// 唯一 ID (UUID)
    pub id: String,

    /// 同一次执行的记录共享 run_id
    pub run_id: String,

    pub timestamp: DateTime<Utc>,

    pub collection: String,

    pub request: String,

    /// 从 1 开始的尝试序号
    pub attempt: usize,

    pub method: String,

    pub url: String,

    pub passed: bool,

    /// 传输错误时为空
    pub status: Option<u16>,

    pub duration_ms: Option<u64>,

    pub error: Option<String>,
}

impl ResultRecord {
    /// 把一次执行的报告展开为记录，按请求声明顺序、尝试顺序排列
    pub fn from_report(report: &CollectionReport) -> Vec<ResultRecord> {
        let run_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();

        report
            .requests
            .iter()
            .flat_map(|request| {
                request
                    .attempts
                    .iter()
                    .enumerate()
                    .map(|(index, outcome)| ResultRecord {
                        id: Uuid::new_v4().to_string(),
                        run_id: run_id.clone(),
                        timestamp,
                        collection: report.title.clone(),
                        request: request.name.clone(),
                        attempt: index + 1,
                        method: request.method.clone(),
                        url: request.url.clone(),
                        passed: outcome.overall_passed(),
                        status: outcome.status_code(),
                        duration_ms: outcome.elapsed().map(|d| d.as_millis() as u64),
                        error: match outcome {
                            Outcome::TransportError { kind, description } => {
                                Some(format!("{}: {}", kind, description))
                            }
                            Outcome::Received { .. } => None,
                        },
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

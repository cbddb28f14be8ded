use crate::Result;
use crate::http::types::Status;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub body: String,
    /// 从发出请求到读完响应体的耗时
    pub duration: Duration,
}

impl Response {
    pub fn new(status: u16, body: String, duration: Duration) -> Result<Self> {
        Ok(Self {
            status: Status::new(status)?,
            body,
            duration,
        })
    }
}

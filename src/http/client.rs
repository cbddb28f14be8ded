use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::http::request::WireRequest;
use crate::http::response::Response;
use crate::{Result, RqstrError};

/// 传输层失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// DNS、拒绝连接、TLS 握手等
    Connect,
    Timeout,
    /// 请求定义本身无效（URL、方法、header），从未发出
    InvalidRequest,
    /// 收到了无法解释的响应
    InvalidResponse,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::InvalidRequest => "invalid request",
            TransportErrorKind::InvalidResponse => "invalid response",
            TransportErrorKind::Other => "transport",
        };
        f.write_str(s)
    }
}

/// 没有拿到可用响应的一次尝试
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: TransportErrorKind,
    pub description: String,
}

impl TransportFailure {
    pub fn new(kind: TransportErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_builder() {
            TransportErrorKind::InvalidRequest
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::InvalidResponse
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, error_chain(err))
    }
}

impl From<&RqstrError> for TransportFailure {
    fn from(err: &RqstrError) -> Self {
        let kind = if err.is_request_local() {
            TransportErrorKind::InvalidRequest
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// reqwest 的错误信息分散在 source 链上，拼成一行便于定位
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

/// 共享的 HTTP 客户端，内部连接池可并发使用
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        // 不跟随重定向，3xx 原样交给断言
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let inner = builder.build().map_err(RqstrError::ClientBuild)?;
        Ok(Self { inner })
    }

    pub async fn execute(&self, request: &WireRequest) -> std::result::Result<Response, TransportFailure> {
        let headers = request
            .headers
            .to_header_map()
            .map_err(|e| TransportFailure::from(&e))?;

        let mut req = self
            .inner
            .request(request.method.to_reqwest(), request.url.clone())
            .headers(headers);

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        debug!("Sending request {}", request);
        let start = Instant::now();
        let response = req.send().await.map_err(|e| TransportFailure::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportFailure::from_reqwest(&e))?;
        // 耗时包含响应体的读取
        let duration = start.elapsed();

        Response::new(status, body, duration)
            .map_err(|e| TransportFailure::new(TransportErrorKind::InvalidResponse, e.to_string()))
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RqstrError {
    /// 集合文件内容无法解码或校验失败
    #[error("解析错误: {0}")]
    Decode(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("无效的 HTTP 方法: {0}")]
    InvalidMethod(String),

    #[error("无效的 Header: {0}")]
    InvalidHeader(String),

    /// 无法创建共享的 HTTP 客户端
    #[error("HTTP 客户端创建失败: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("配置错误: {0}")]
    Config(String),

    /// 执行被外部信号取消
    #[error("执行已取消")]
    Cancelled,

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl RqstrError {
    /// 是否属于单个请求定义的问题（不影响同一集合中的其他请求）
    pub fn is_request_local(&self) -> bool {
        matches!(
            self,
            RqstrError::InvalidUrl(_)
                | RqstrError::InvalidMethod(_)
                | RqstrError::InvalidHeader(_)
        )
    }
}

impl From<serde_yaml::Error> for RqstrError {
    fn from(err: serde_yaml::Error) -> Self {
        RqstrError::Decode(err.to_string())
    }
}

/// Result type for rqstr crate
pub type Result<T> = std::result::Result<T, RqstrError>;

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use url::Url;

use crate::http::auth::AuthMethod;
use crate::http::headers::HeaderSet;
use crate::http::types::Method;
use crate::{Result, RqstrError};

/// 单个查询参数的值
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// `k: v` => `k=v`
    One(String),
    /// `k: [v1, v2]` => `k=v1&k=v2`
    Many(Vec<String>),
    /// `k: null` => `k=`
    Empty,
}

/// 有序、可多值的查询参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: QueryValue) -> Self {
        self.params.push((key.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// 展开为 `key=value` 对，按声明顺序，多值的 key 重复出现
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.params {
            match value {
                QueryValue::One(v) => pairs.push((key.as_str(), v.as_str())),
                QueryValue::Many(values) => {
                    pairs.extend(values.iter().map(|v| (key.as_str(), v.as_str())));
                }
                QueryValue::Empty => pairs.push((key.as_str(), "")),
            }
        }
        pairs
    }
}

struct QueryParamsVisitor;

impl<'de> Visitor<'de> for QueryParamsVisitor {
    type Value = QueryParams;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of query keys to a string, a list of strings or null")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut params = Vec::new();
        while let Some((key, value)) = access.next_entry::<String, Option<QueryValue>>()? {
            params.push((key, value.unwrap_or(QueryValue::Empty)));
        }
        Ok(QueryParams { params })
    }

    fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(QueryParams::new())
    }
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(QueryParamsVisitor)
    }
}

/// 校验并解析绝对 URL，只接受 http/https
pub fn parse_absolute_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| RqstrError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(RqstrError::InvalidUrl(format!("{}: missing host", raw))),
        other => Err(RqstrError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            raw, other
        ))),
    }
}

/// 可直接发送的请求
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderSet,
    pub body: Option<Value>,
}

impl WireRequest {
    pub fn new(method: &str, url: &str) -> Result<Self> {
        Ok(Self {
            method: method.parse()?,
            url: parse_absolute_url(url)?,
            headers: HeaderSet::new(),
            body: None,
        })
    }

    pub fn with_query(mut self, query: &QueryParams) -> Self {
        let pairs = query.pairs();
        if !pairs.is_empty() {
            let mut serializer = self.url.query_pairs_mut();
            for (key, value) in pairs {
                serializer.append_pair(key, value);
            }
        }
        self
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    /// Authorization 总是追加在所有 header 之后
    pub fn with_auth(mut self, auth: &AuthMethod) -> Self {
        if let Some(value) = auth.header_value() {
            self.headers.push_sensitive("Authorization", value);
        }
        self
    }

    pub fn with_json(mut self, body: Option<&Map<String, Value>>) -> Self {
        self.body = body.map(|map| Value::Object(map.clone()));
        self
    }

    /// 组装完整请求，按 method、URL、header 的顺序校验
    pub fn build(
        method: &str,
        url: &str,
        query: &QueryParams,
        headers: HeaderSet,
        auth: &AuthMethod,
        body: Option<&Map<String, Value>>,
    ) -> Result<Self> {
        let request = Self::new(method, url)?
            .with_query(query)
            .with_headers(headers)
            .with_auth(auth)
            .with_json(body);
        // 提前暴露非法 header，而不是等到发送时
        request.headers.to_header_map()?;
        Ok(request)
    }
}

impl fmt::Display for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7} {}", self.method.as_str(), self.url)
    }
}

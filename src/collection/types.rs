use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::assertion::AssertionRule;
use crate::http::{AuthMethod, HeaderSet, QueryParams, WireRequest, resolve_auth};
use crate::{Result, RqstrError};

/// 单个命名请求的完整定义
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestSpec {
    /// 集合内唯一的请求名（来自 requests 映射的 key）
    #[serde(skip)]
    pub name: String,

    /// HTTP 方法，发送前才解析，保证单个请求写错不影响其他请求
    pub method: String,

    /// 绝对 URL，只支持 http/https
    pub url: String,

    #[serde(default)]
    pub query_params: QueryParams,

    /// JSON 请求体
    #[serde(default)]
    pub body: Option<Map<String, Value>>,

    #[serde(default)]
    pub headers: HeaderSet,

    /// 值不出现在日志中的 header
    #[serde(default)]
    pub secret_headers: HeaderSet,

    /// None 表示继承集合的认证方式
    #[serde(default)]
    pub auth: Option<AuthMethod>,

    #[serde(default, rename = "assert", alias = "check")]
    pub assert: AssertionRule,

    /// 重复发送次数（benchmark），0 与未设置都按 1 次处理
    #[serde(default, rename = "benchmark", alias = "repeat")]
    pub repeat_count: Option<u32>,
}

impl RequestSpec {
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            url: url.into(),
            query_params: QueryParams::new(),
            body: None,
            headers: HeaderSet::new(),
            secret_headers: HeaderSet::new(),
            auth: None,
            assert: AssertionRule::new(),
            repeat_count: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(name, value);
        self
    }

    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_assert(mut self, rule: AssertionRule) -> Self {
        self.assert = rule;
        self
    }

    pub fn with_repeat(mut self, count: u32) -> Self {
        self.repeat_count = Some(count);
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query_params = query;
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// 实际发送次数，至少 1 次
    pub fn attempts(&self) -> usize {
        self.repeat_count.map_or(1, |n| n.max(1) as usize)
    }

    /// 请求自身声明的 header（普通在前，敏感在后）
    pub fn own_headers(&self) -> HeaderSet {
        HeaderSet::merge(&self.headers, &self.secret_headers.clone().into_sensitive())
    }

    /// 根据已合并的 header 与认证方式构造线路请求
    pub fn build_wire_request(
        &self,
        effective_headers: HeaderSet,
        effective_auth: &AuthMethod,
    ) -> Result<WireRequest> {
        WireRequest::build(
            &self.method,
            &self.url,
            &self.query_params,
            effective_headers,
            effective_auth,
            self.body.as_ref(),
        )
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7} {}", self.method.to_uppercase(), self.url)
    }
}

/// 结果持久化设置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub enabled: bool,
    pub output_dir: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: None,
        }
    }
}

/// 请求集合：共享默认值 + 按声明顺序排列的请求
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestCollection {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub headers: HeaderSet,

    #[serde(default)]
    pub secret_headers: HeaderSet,

    #[serde(default)]
    pub auth: AuthMethod,

    #[serde(default)]
    pub output: OutputSettings,

    #[serde(deserialize_with = "ordered_requests")]
    pub requests: Vec<RequestSpec>,
}

impl RequestCollection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            headers: HeaderSet::new(),
            secret_headers: HeaderSet::new(),
            auth: AuthMethod::None,
            output: OutputSettings::default(),
            requests: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(name, value);
        self
    }

    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// 添加请求，名称必须唯一
    pub fn add_request(&mut self, spec: RequestSpec) -> Result<()> {
        if self.get(&spec.name).is_some() {
            return Err(RqstrError::Decode(format!(
                "duplicate request name '{}'",
                spec.name
            )));
        }
        self.requests.push(spec);
        Ok(())
    }

    pub fn with_request(mut self, spec: RequestSpec) -> Result<Self> {
        self.add_request(spec)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&RequestSpec> {
        self.requests.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// 集合级默认 header（普通在前，敏感在后）
    pub fn default_headers(&self) -> HeaderSet {
        HeaderSet::merge(&self.headers, &self.secret_headers.clone().into_sensitive())
    }

    pub fn effective_headers(&self, spec: &RequestSpec) -> HeaderSet {
        HeaderSet::merge(&self.default_headers(), &spec.own_headers())
    }

    pub fn effective_auth(&self, spec: &RequestSpec) -> AuthMethod {
        resolve_auth(&self.auth, spec.auth.as_ref())
    }

    /// 合并集合默认值后构造线路请求
    pub fn wire_request(&self, spec: &RequestSpec) -> Result<WireRequest> {
        spec.build_wire_request(self.effective_headers(spec), &self.effective_auth(spec))
    }

    /// 在执行前校验所有请求都能构造出合法的线路请求
    pub fn validate(&self) -> Result<()> {
        for spec in &self.requests {
            self.wire_request(spec).map_err(|e| {
                RqstrError::Decode(format!("request '{}': {}", spec.name, e))
            })?;
        }
        Ok(())
    }
}

struct RequestsVisitor;

impl<'de> Visitor<'de> for RequestsVisitor {
    type Value = Vec<RequestSpec>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of request names to request definitions")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        let mut requests = Vec::new();
        while let Some(name) = access.next_key::<String>()? {
            if !seen.insert(name.clone()) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate request name '{}'",
                    name
                )));
            }
            let mut spec: RequestSpec = access.next_value()?;
            spec.name = name;
            requests.push(spec);
        }
        Ok(requests)
    }

    fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Vec::new())
    }
}

/// 保持 requests 映射的声明顺序
fn ordered_requests<'de, D>(deserializer: D) -> std::result::Result<Vec<RequestSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(RequestsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_minimum_one() {
        let spec = RequestSpec::new("a", "GET", "https://example.test");
        assert_eq!(spec.attempts(), 1);
        assert_eq!(spec.clone().with_repeat(0).attempts(), 1);
        assert_eq!(spec.with_repeat(5).attempts(), 5);
    }

    #[test]
    fn test_effective_headers_collection_first() {
        let collection = RequestCollection::new("c").with_header("X-Tag", "collection");
        let spec = RequestSpec::new("a", "GET", "https://example.test").with_header("X-Tag", "request");
        let headers = collection.effective_headers(&spec);
        assert_eq!(headers.get_all("x-tag"), vec!["collection", "request"]);
    }

    #[test]
    fn test_secret_headers_are_sensitive() {
        let mut spec = RequestSpec::new("a", "GET", "https://example.test");
        spec.secret_headers.push("X-Api-Key", "k-123");
        let headers = spec.own_headers();
        let entry = headers.iter().find(|e| e.name == "X-Api-Key").unwrap();
        assert!(entry.sensitive);
        assert!(!format!("{:?}", spec.own_headers()).contains("k-123"));
    }

    #[test]
    fn test_effective_auth_inherit_and_override() {
        let collection = RequestCollection::new("c").with_auth(AuthMethod::bearer("shared"));

        let inherits = RequestSpec::new("a", "GET", "https://example.test");
        assert_eq!(collection.effective_auth(&inherits), AuthMethod::bearer("shared"));

        let opts_out = RequestSpec::new("b", "GET", "https://example.test").with_auth(AuthMethod::None);
        assert_eq!(collection.effective_auth(&opts_out), AuthMethod::None);
    }

    #[test]
    fn test_duplicate_request_name_rejected() {
        let collection = RequestCollection::new("c")
            .with_request(RequestSpec::new("a", "GET", "https://example.test"))
            .unwrap();
        let err = collection
            .with_request(RequestSpec::new("a", "POST", "https://example.test"))
            .unwrap_err();
        assert!(matches!(err, RqstrError::Decode(_)));
    }

    #[test]
    fn test_validate_reports_request_name() {
        let collection = RequestCollection::new("c")
            .with_request(RequestSpec::new("ok", "GET", "https://example.test"))
            .unwrap()
            .with_request(RequestSpec::new("broken", "GET", "ftp://example.test"))
            .unwrap();
        let err = collection.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_wire_request_uses_effective_values() {
        let collection = RequestCollection::new("c")
            .with_header("Accept", "application/json")
            .with_auth(AuthMethod::basic("u", "p"));
        let spec = RequestSpec::new("a", "delete", "https://example.test/items/1");
        let wire = collection.wire_request(&spec).unwrap();
        assert_eq!(wire.method.as_str(), "DELETE");
        assert_eq!(wire.headers.get("accept"), Some("application/json"));
        assert_eq!(wire.headers.get("authorization"), Some("Basic dTpw"));
    }
}

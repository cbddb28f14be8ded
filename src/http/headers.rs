use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::{Result, RqstrError};

const REDACTED: &str = "***";

/// 单个 Header 条目，名称保持原样发送
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
    /// 敏感值只在线路上发送，不出现在日志或序列化输出中
    pub sensitive: bool,
}

impl HeaderEntry {
    /// 用于日志和展示的值
    pub fn display_value(&self) -> &str {
        if self.sensitive { REDACTED } else { &self.value }
    }
}

impl fmt::Debug for HeaderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.display_value())
    }
}

/// 有序的 Header 列表
///
/// 查找时名称不区分大小写；同名条目是叠加关系，全部都会发送。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<HeaderEntry>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(HeaderEntry {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        });
    }

    pub fn push_sensitive(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(HeaderEntry {
            name: name.into(),
            value: value.into(),
            sensitive: true,
        });
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// 把所有条目标记为敏感
    pub fn into_sensitive(mut self) -> Self {
        for entry in &mut self.entries {
            entry.sensitive = true;
        }
        self
    }

    /// 第一个同名条目的值
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 合并集合级与请求级 Header：先集合后请求，同名不覆盖
    pub fn merge(collection: &HeaderSet, request: &HeaderSet) -> HeaderSet {
        let mut entries = Vec::with_capacity(collection.len() + request.len());
        entries.extend(collection.entries.iter().cloned());
        entries.extend(request.entries.iter().cloned());
        HeaderSet { entries }
    }

    /// 转换为线路格式；同名条目使用 append 保留多值
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            let name = HeaderName::from_bytes(entry.name.as_bytes())
                .map_err(|_| RqstrError::InvalidHeader(entry.name.clone()))?;
            let mut value = HeaderValue::from_str(&entry.value).map_err(|_| {
                RqstrError::InvalidHeader(format!("{}: {}", entry.name, entry.display_value()))
            })?;
            value.set_sensitive(entry.sensitive);
            map.append(name, value);
        }
        Ok(map)
    }
}

impl fmt::Debug for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (name, value) in iter {
            set.push(name, value);
        }
        set
    }
}

/// 文件中的 Header 值：单个字符串或字符串列表
#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

struct HeaderSetVisitor;

impl<'de> Visitor<'de> for HeaderSetVisitor {
    type Value = HeaderSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of header names to a string or a list of strings")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut set = HeaderSet::new();
        while let Some((name, values)) = access.next_entry::<String, HeaderValues>()? {
            match values {
                HeaderValues::One(value) => set.push(name, value),
                HeaderValues::Many(values) => {
                    for value in values {
                        set.push(name.clone(), value);
                    }
                }
            }
        }
        Ok(set)
    }

    fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(HeaderSet::new())
    }
}

impl<'de> Deserialize<'de> for HeaderSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(HeaderSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_additive() {
        let collection = HeaderSet::new().with("X-Tag", "collection").with("Accept", "*/*");
        let request = HeaderSet::new().with("x-tag", "request");

        let merged = HeaderSet::merge(&collection, &request);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get_all("X-TAG"), vec!["collection", "request"]);
        // 原集合不被修改
        assert_eq!(collection.len(), 2);
        assert_eq!(request.len(), 1);
    }

    #[test]
    fn test_merge_preserves_order_and_case() {
        let collection = HeaderSet::new().with("A", "1");
        let request = HeaderSet::new().with("b-Header", "2");
        let merged = HeaderSet::merge(&collection, &request);
        let names: Vec<_> = merged.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "b-Header"]);
    }

    #[test]
    fn test_merge_with_empty_request_keeps_collection() {
        let collection = HeaderSet::new().with("X-Env", "staging");
        let merged = HeaderSet::merge(&collection, &HeaderSet::new());
        assert_eq!(merged, collection);
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let set = HeaderSet::new().with("Content-Type", "application/json");
        assert_eq!(set.get("content-type"), Some("application/json"));
        assert!(set.contains("CONTENT-TYPE"));
        assert_eq!(set.get("accept"), None);
    }

    #[test]
    fn test_to_header_map_keeps_duplicates() {
        let set = HeaderSet::new().with("X-Tag", "a").with("X-Tag", "b");
        let map = set.to_header_map().unwrap();
        let values: Vec<_> = map
            .get_all("x-tag")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_names_kept_verbatim_until_wire() {
        let set = HeaderSet::new().with("X-Api-Version", "2");
        assert_eq!(set.iter().next().unwrap().name, "X-Api-Version");
        assert_eq!(format!("{:?}", set), "[X-Api-Version: 2]");

        // 线路格式的名称不区分大小写
        let map = set.to_header_map().unwrap();
        assert_eq!(map.get("x-api-version").unwrap(), "2");
        assert_eq!(map.get("X-API-VERSION").unwrap(), "2");
    }

    #[test]
    fn test_to_header_map_rejects_invalid_name() {
        let set = HeaderSet::new().with("bad header", "x");
        assert!(matches!(
            set.to_header_map(),
            Err(RqstrError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_debug_redacts_sensitive_values() {
        let mut set = HeaderSet::new().with("X-Public", "visible");
        set.push_sensitive("X-Api-Key", "super-secret");
        let debug = format!("{:?}", set);
        assert!(debug.contains("visible"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains(REDACTED));
    }

    #[test]
    fn test_deserialize_string_and_list_values() {
        let yaml = "Accept: application/json\nX-Tag:\n  - one\n  - two\n";
        let set: HeaderSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("accept"), Some("application/json"));
        assert_eq!(set.get_all("x-tag"), vec!["one", "two"]);
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::collection::types::RequestCollection;
use crate::variable::VariableResolver;
use crate::{Result, RqstrError};

/// 集合文件的后缀
pub const COLLECTION_SUFFIXES: [&str; 3] = [".rest.yml", ".rest.yaml", ".rest.json"];

/// 目录扫描时跳过的目录
const SKIPPED_DIRS: [&str; 2] = ["target", "node_modules"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// 根据扩展名判断，`.json` 之外一律按 YAML 解析
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// 集合文件加载器
pub struct CollectionLoader;

impl CollectionLoader {
    /// 从文件加载并校验集合
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RequestCollection> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let collection = Self::decode(&content, Format::from_path(path))
            .map_err(|e| RqstrError::Decode(format!("{}: {}", path.display(), e)))?;
        debug!(
            "Loaded collection '{}' with {} requests from {}",
            collection.title,
            collection.len(),
            path.display()
        );
        Ok(collection)
    }

    /// 解码文本内容：先替换 `${VAR}`，再解析并校验
    pub fn decode(content: &str, format: Format) -> Result<RequestCollection> {
        let resolved = VariableResolver::resolve_env_vars(content);
        let collection: RequestCollection = match format {
            Format::Yaml => serde_yaml::from_str(&resolved)?,
            Format::Json => serde_json::from_str(&resolved)
                .map_err(|e| RqstrError::Decode(e.to_string()))?,
        };
        collection.validate()?;
        Ok(collection)
    }

    /// 递归查找目录下的所有集合文件，结果按路径排序
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        Self::walk(root.as_ref(), &mut found)?;
        found.sort();
        info!(
            "Found {} collection files under {}",
            found.len(),
            root.as_ref().display()
        );
        Ok(found)
    }

    fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) {
                    continue;
                }
                Self::walk(&path, found)?;
            } else if file_type.is_file() && Self::is_collection_file(&name) {
                found.push(path);
            }
        }
        Ok(())
    }

    pub fn is_collection_file(name: &str) -> bool {
        COLLECTION_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{AuthMethod, Method};
    use std::time::Duration;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
title: Users API
description: smoke tests
headers:
  Accept: application/json
auth:
  token: shared-token
requests:
  list_users:
    method: GET
    url: https://example.test/users
    query_params:
      role: [admin, dev]
      page: "1"
    assert:
      expected_status: 200
      soft_timeout: 0.5
    benchmark: 3
  create_user:
    method: post
    url: https://example.test/users
    body:
      name: alice
    auth:
      username: admin
      password: hunter2
  health:
    method: GET
    url: https://example.test/health
    auth: none
"#;

    #[test]
    fn test_decode_yaml() {
        let collection = CollectionLoader::decode(SAMPLE, Format::Yaml).unwrap();
        assert_eq!(collection.title, "Users API");
        assert_eq!(collection.description.as_deref(), Some("smoke tests"));

        let names: Vec<_> = collection.requests.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["list_users", "create_user", "health"]);

        let list = collection.get("list_users").unwrap();
        assert_eq!(list.attempts(), 3);
        assert_eq!(list.assert.expected_status, Some(200));
        assert_eq!(list.assert.soft_timeout, Some(Duration::from_millis(500)));
        assert_eq!(
            list.query_params.pairs(),
            vec![("role", "admin"), ("role", "dev"), ("page", "1")]
        );
        assert_eq!(list.auth, None);
        assert_eq!(collection.effective_auth(list), AuthMethod::bearer("shared-token"));

        let create = collection.get("create_user").unwrap();
        assert_eq!(Method::parse(&create.method).unwrap(), Method::Post);
        assert_eq!(create.auth, Some(AuthMethod::basic("admin", "hunter2")));
        assert!(create.body.is_some());

        let health = collection.get("health").unwrap();
        assert_eq!(collection.effective_auth(health), AuthMethod::None);
    }

    #[test]
    fn test_decode_json() {
        let json = r#"{
            "title": "json",
            "requests": {
                "ping": {"method": "HEAD", "url": "http://example.test/ping", "check": {"status_code": 204}}
            }
        }"#;
        let collection = CollectionLoader::decode(json, Format::Json).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.requests[0].assert.expected_status, Some(204));
    }

    #[test]
    fn test_decode_empty_requests() {
        let collection = CollectionLoader::decode("title: empty\nrequests: {}\n", Format::Yaml).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_decode_missing_title() {
        let err = CollectionLoader::decode("requests: {}\n", Format::Yaml).unwrap_err();
        assert!(matches!(err, RqstrError::Decode(_)));
    }

    #[test]
    fn test_decode_invalid_method() {
        let yaml = "title: t\nrequests:\n  bad:\n    method: FETCH\n    url: https://example.test\n";
        let err = CollectionLoader::decode(yaml, Format::Yaml).unwrap_err();
        assert!(matches!(err, RqstrError::Decode(ref m) if m.contains("bad")));
    }

    #[test]
    fn test_decode_invalid_scheme() {
        let yaml = "title: t\nrequests:\n  bad:\n    method: GET\n    url: ftp://example.test\n";
        assert!(matches!(
            CollectionLoader::decode(yaml, Format::Yaml),
            Err(RqstrError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_unknown_field() {
        let yaml = "title: t\nrequests:\n  a:\n    method: GET\n    url: https://example.test\n    retries: 3\n";
        assert!(CollectionLoader::decode(yaml, Format::Yaml).is_err());
    }

    #[test]
    fn test_decode_interpolates_env() {
        unsafe {
            std::env::set_var("RQSTR_LOADER_TEST_TOKEN", "from-env");
        }
        let yaml = "title: t\nauth:\n  token: ${RQSTR_LOADER_TEST_TOKEN}\nrequests:\n  a:\n    method: GET\n    url: ${RQSTR_LOADER_TEST_BASE:-https://example.test}/a\n";
        let collection = CollectionLoader::decode(yaml, Format::Yaml).unwrap();
        assert_eq!(collection.auth, AuthMethod::bearer("from-env"));
        assert_eq!(collection.requests[0].url, "https://example.test/a");
        unsafe {
            std::env::remove_var("RQSTR_LOADER_TEST_TOKEN");
        }
    }

    #[test]
    fn test_load_and_discover() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("api").join("v1");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(temp_dir.path().join(".hidden")).unwrap();

        let first = temp_dir.path().join("a.rest.yml");
        let second = nested.join("b.rest.json");
        fs::write(&first, "title: a\nrequests: {}\n").unwrap();
        fs::write(&second, r#"{"title": "b", "requests": {}}"#).unwrap();
        fs::write(temp_dir.path().join(".hidden").join("c.rest.yml"), "title: c\nrequests: {}\n").unwrap();
        fs::write(temp_dir.path().join("notes.yml"), "title: x\n").unwrap();

        let found = CollectionLoader::discover(temp_dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&first));
        assert!(found.contains(&second));

        assert_eq!(CollectionLoader::load(&first).unwrap().title, "a");
        assert_eq!(CollectionLoader::load(&second).unwrap().title, "b");
    }

    #[test]
    fn test_load_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.rest.yml");
        fs::write(&path, "title: [unclosed\n").unwrap();
        let err = CollectionLoader::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.rest.yml"));
    }
}

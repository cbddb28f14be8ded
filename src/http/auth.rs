use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

/// 敏感字符串，Debug/Display 只输出掩码
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 取出明文，仅在构造线路请求时使用
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// 支持的认证方式
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "AuthRepr")]
pub enum AuthMethod {
    #[default]
    None,
    Basic {
        username: String,
        password: Secret,
    },
    BearerToken {
        token: Secret,
    },
}

impl AuthMethod {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthMethod::Basic {
            username: username.into(),
            password: Secret::new(password),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        AuthMethod::BearerToken {
            token: Secret::new(token),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AuthMethod::None)
    }

    /// 生成 Authorization header 的值；`None` 不产生 header
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthMethod::None => None,
            AuthMethod::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password.expose()));
                Some(format!("Basic {}", encoded))
            }
            AuthMethod::BearerToken { token } => Some(format!("Bearer {}", token.expose())),
        }
    }

    /// 用于日志的简短描述，不含凭据
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::Basic { .. } => "basic",
            AuthMethod::BearerToken { .. } => "bearer",
        }
    }
}

/// 解析请求最终使用的认证方式
///
/// 请求声明了 auth（包括显式的 `none`）就以请求为准，否则继承集合默认值。
pub fn resolve_auth(collection: &AuthMethod, request: Option<&AuthMethod>) -> AuthMethod {
    request.unwrap_or(collection).clone()
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum AuthKeyword {
    None,
}

/// 文件中的 auth 写法：`none`、`{username, password}` 或 `{token}`
#[derive(Deserialize)]
#[serde(untagged)]
enum AuthRepr {
    Keyword(AuthKeyword),
    Basic { username: String, password: Secret },
    Bearer { token: Secret },
}

impl From<AuthRepr> for AuthMethod {
    fn from(repr: AuthRepr) -> Self {
        match repr {
            AuthRepr::Keyword(AuthKeyword::None) => AuthMethod::None,
            AuthRepr::Basic { username, password } => AuthMethod::Basic { username, password },
            AuthRepr::Bearer { token } => AuthMethod::BearerToken { token },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header() {
        let auth = AuthMethod::basic("user", "pass");
        // base64("user:pass")
        assert_eq!(auth.header_value(), Some("Basic dXNlcjpwYXNz".to_string()));
    }

    #[test]
    fn test_bearer_header() {
        let auth = AuthMethod::bearer("abc123");
        assert_eq!(auth.header_value(), Some("Bearer abc123".to_string()));
    }

    #[test]
    fn test_none_has_no_header() {
        assert_eq!(AuthMethod::None.header_value(), None);
    }

    #[test]
    fn test_debug_hides_credentials() {
        let basic = format!("{:?}", AuthMethod::basic("alice", "hunter2"));
        assert!(basic.contains("alice"));
        assert!(!basic.contains("hunter2"));

        let bearer = format!("{:?}", AuthMethod::bearer("tok-999"));
        assert!(!bearer.contains("tok-999"));
    }

    #[test]
    fn test_resolve_inherits_when_absent() {
        let collection = AuthMethod::bearer("collection-token");
        assert_eq!(resolve_auth(&collection, None), collection);
    }

    #[test]
    fn test_resolve_request_wins() {
        let collection = AuthMethod::bearer("collection-token");
        let request = AuthMethod::basic("u", "p");
        assert_eq!(resolve_auth(&collection, Some(&request)), request);
    }

    #[test]
    fn test_resolve_explicit_none_overrides() {
        let collection = AuthMethod::bearer("collection-token");
        assert_eq!(
            resolve_auth(&collection, Some(&AuthMethod::None)),
            AuthMethod::None
        );
    }

    #[test]
    fn test_deserialize_variants() {
        let basic: AuthMethod = serde_yaml::from_str("username: u\npassword: p\n").unwrap();
        assert_eq!(basic, AuthMethod::basic("u", "p"));

        let bearer: AuthMethod = serde_yaml::from_str("token: t\n").unwrap();
        assert_eq!(bearer, AuthMethod::bearer("t"));

        let none: AuthMethod = serde_yaml::from_str("none").unwrap();
        assert_eq!(none, AuthMethod::None);

        assert!(serde_yaml::from_str::<AuthMethod>("username: only\n").is_err());
    }
}

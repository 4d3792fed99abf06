use regex::Regex;
use std::sync::LazyLock;

/// Local development servers are always allowed.
static LOCALHOST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://localhost:\d+$").expect("pattern is valid"));

/// Allow-list of origins permitted to read the snapshot files.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    exact: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            exact: allowed.into_iter().collect(),
        }
    }

    /// Whether the given origin is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        LOCALHOST_RE.is_match(origin) || self.exact.iter().any(|allowed| allowed == origin)
    }

    /// The origin value to echo in `Access-Control-Allow-Origin`, if the
    /// request's origin is present and allowed.
    #[must_use]
    pub fn echo<'a>(&self, origin: Option<&'a str>) -> Option<&'a str> {
        origin.filter(|o| self.is_allowed(o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(["https://example.org".to_string()])
    }

    #[test]
    fn test_exact_origin_allowed() {
        assert!(policy().is_allowed("https://example.org"));
    }

    #[test]
    fn test_unknown_origin_denied() {
        assert!(!policy().is_allowed("https://evil.example"));
    }

    #[test]
    fn test_scheme_matters() {
        assert!(!policy().is_allowed("http://example.org"));
    }

    #[test]
    fn test_localhost_any_port_allowed() {
        let policy = policy();
        assert!(policy.is_allowed("http://localhost:3000"));
        assert!(policy.is_allowed("https://localhost:8443"));
    }

    #[test]
    fn test_localhost_without_port_denied() {
        assert!(!policy().is_allowed("http://localhost"));
    }

    #[test]
    fn test_localhost_prefix_denied() {
        assert!(!policy().is_allowed("http://localhost:3000.evil.example"));
    }

    #[test]
    fn test_echo_allowed_origin() {
        assert_eq!(policy().echo(Some("https://example.org")), Some("https://example.org"));
    }

    #[test]
    fn test_echo_disallowed_origin() {
        assert_eq!(policy().echo(Some("https://evil.example")), None);
    }

    #[test]
    fn test_echo_absent_origin() {
        assert_eq!(policy().echo(None), None);
    }
}

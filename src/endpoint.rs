use crate::types::Environment;

pub const LIVE_BASE_URL: &str = "https://api-m.example.com";
pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.example.com";

/// Path of the client-credentials token endpoint, relative to the base URL
pub const TOKEN_PATH: &str = "/v1/oauth2/token";

/// Resolve the API origin for a dispatch.
///
/// A non-blank `custom_base_url` wins and is used verbatim minus trailing
/// slashes; otherwise the fixed origin of `environment` is returned.
pub fn resolve_base_url(environment: Environment, custom_base_url: Option<&str>) -> String {
    match custom_base_url.map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.trim_end_matches('/').to_string(),
        _ => match environment {
            Environment::Live => LIVE_BASE_URL.to_string(),
            Environment::Sandbox => SANDBOX_BASE_URL.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_origins() {
        assert_eq!(resolve_base_url(Environment::Live, None), LIVE_BASE_URL);
        assert_eq!(resolve_base_url(Environment::Sandbox, None), SANDBOX_BASE_URL);
    }

    #[test]
    fn test_custom_base_url_overrides_environment() {
        assert_eq!(
            resolve_base_url(Environment::Live, Some("http://localhost:8080///")),
            "http://localhost:8080"
        );
        assert_eq!(
            resolve_base_url(Environment::Sandbox, Some("https://proxy.internal/api")),
            "https://proxy.internal/api"
        );
    }

    #[test]
    fn test_blank_custom_base_url_is_ignored() {
        assert_eq!(resolve_base_url(Environment::Live, Some("")), LIVE_BASE_URL);
        assert_eq!(resolve_base_url(Environment::Sandbox, Some("  ")), SANDBOX_BASE_URL);
    }

    #[test]
    fn test_unknown_environment_means_sandbox() {
        assert_eq!(Environment::from("production"), Environment::Sandbox);
        assert_eq!(Environment::from("LIVE"), Environment::Live);
    }
}

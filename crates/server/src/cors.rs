use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowCredentials, AllowOrigin, CorsLayer};

use crate::config::{CorsConfig, Environment};

/// Decides which request origins get credentialed CORS headers.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    development_origin: Option<String>,
    preview_prefix: String,
    preview_host: String,
}

impl OriginPolicy {
    pub fn new(config: &CorsConfig, environment: Environment) -> Self {
        Self {
            allowed: config.allowed_origins.clone(),
            development_origin: (!environment.is_production())
                .then(|| config.development_origin.clone()),
            preview_prefix: config.preview_prefix.clone(),
            preview_host: config.preview_host.clone(),
        }
    }

    /// Exact allow-list match, the development origin outside production,
    /// or a preview deployment of the frontend project.
    pub fn is_allowed(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        if self.allowed.iter().any(|o| o == origin) {
            return true;
        }
        if self.development_origin.as_deref() == Some(origin) {
            return true;
        }
        self.is_preview(origin)
    }

    /// `{scheme}://{label}{preview_host}` where the scheme and the start of
    /// `label` come from `preview_prefix`. No port, path or extra labels.
    fn is_preview(&self, origin: &str) -> bool {
        if self.preview_host.is_empty() {
            return false;
        }
        let Some((prefix_scheme, label_prefix)) = self.preview_prefix.split_once("://") else {
            return false;
        };
        let Some((scheme, host)) = origin.split_once("://") else {
            return false;
        };
        if !scheme.eq_ignore_ascii_case(prefix_scheme)
            || host.contains(['/', ':', '@', '?', '#'])
        {
            return false;
        }
        let Some(label) = host.strip_suffix(self.preview_host.as_str()) else {
            return false;
        };
        !label.is_empty() && !label.contains('.') && label.starts_with(label_prefix)
    }
}

/// CORS layer that echoes allowed origins with credentials and sends no
/// `Access-Control-Allow-Origin` otherwise.
pub fn cors_layer(policy: OriginPolicy) -> CorsLayer {
    let policy = Arc::new(policy);
    let origin_policy = Arc::clone(&policy);
    let credentials_policy = policy;

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .is_ok_and(|o| origin_policy.is_allowed(o))
        }))
        .allow_credentials(AllowCredentials::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .is_ok_and(|o| credentials_policy.is_allowed(o))
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(86_400))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(environment: Environment) -> OriginPolicy {
        OriginPolicy::new(&CorsConfig::default(), environment)
    }

    #[test]
    fn production_origins_are_allowed() {
        let policy = policy(Environment::Production);
        assert!(policy.is_allowed("https://exposrmvp.vercel.app"));
        assert!(policy.is_allowed("https://www.exposrai.com"));
        assert!(!policy.is_allowed("https://exposrai.com"));
    }

    #[test]
    fn localhost_only_in_development() {
        assert!(policy(Environment::Development).is_allowed("http://localhost:3000"));
        assert!(!policy(Environment::Production).is_allowed("http://localhost:3000"));
        assert!(!policy(Environment::Development).is_allowed("http://localhost:3001"));
    }

    #[test]
    fn preview_deployments_match_pattern() {
        let policy = policy(Environment::Production);
        assert!(policy.is_allowed("https://exposrmvp-git-feature-x.oshaea30s-projects.vercel.app"));
        assert!(!policy.is_allowed("https://exposrmvp-x.vercel.app"));
        assert!(!policy.is_allowed("https://other-x.oshaea30s-projects.vercel.app"));
    }

    #[test]
    fn preview_pattern_requires_host_suffix() {
        let policy = policy(Environment::Production);
        assert!(!policy.is_allowed("https://exposrmvp-x.oshaea30s-projects.vercel.app.evil.com"));
        assert!(!policy.is_allowed("https://exposrmvp-x.evil.com/.oshaea30s-projects.vercel.app"));
        assert!(!policy.is_allowed("https://exposrmvp-x.oshaea30s-projects.vercel.app:8443"));
        assert!(!policy.is_allowed("http://exposrmvp-x.oshaea30s-projects.vercel.app"));
        assert!(!policy.is_allowed("https://evil.exposrmvp-x.oshaea30s-projects.vercel.app"));
        assert!(!policy.is_allowed("https://.oshaea30s-projects.vercel.app"));
    }

    #[test]
    fn unknown_origins_are_rejected() {
        let policy = policy(Environment::Development);
        assert!(!policy.is_allowed("https://evil.example.com"));
        assert!(!policy.is_allowed(""));
    }
}

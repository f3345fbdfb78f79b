use axum::http::HeaderMap;

/// Scheme and host a request was addressed to, used to build file URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicOrigin {
    pub scheme: String,
    pub host: String,
}

impl Default for PublicOrigin {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
        }
    }
}

impl PublicOrigin {
    /// Reads `Host` and honours `X-Forwarded-Proto: https` from a proxy
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let default = Self::default();

        let host = headers
            .get("x-forwarded-host")
            .or_else(|| headers.get(axum::http::header::HOST))
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default.host);

        let forwarded_https = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("https"));

        Self {
            scheme: if forwarded_https { "https" } else { "http" }.to_string(),
            host,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

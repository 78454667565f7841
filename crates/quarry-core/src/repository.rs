//! Remote repository model: endpoint URL, credentials, proxy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A remote repository artifacts can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    /// Layout/content type marker, `default` for the standard layout.
    pub repository_type: String,
    pub credentials: Option<Credentials>,
    pub proxy: Option<Proxy>,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            repository_type: "default".to_string(),
            credentials: None,
            proxy: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn has_auth(&self) -> bool {
        self.credentials.is_some()
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// Username/password or token credentials for a repository or proxy.
///
/// A password without a username is treated as a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            username: None,
            password: Some(token.into()),
        }
    }
}

/// An HTTP proxy in front of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ProxyCredentials>,
}

/// Credentials for the proxy itself, kept apart from repository credentials
/// so the two can differ on one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl Proxy {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trip() {
        let repo = RemoteRepository::new("central", "https://repo.example.org/releases")
            .with_credentials(Credentials::basic("user", "pass"));
        assert!(repo.has_auth());
        assert_eq!(repo.repository_type, "default");
        assert_eq!(repo.to_string(), "central (https://repo.example.org/releases)");
    }

    #[test]
    fn proxy_url() {
        let proxy = Proxy::new("proxy.corp", 8080);
        assert_eq!(proxy.url(), "http://proxy.corp:8080");
    }
}

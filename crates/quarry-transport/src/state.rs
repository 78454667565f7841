//! Session-scoped and transporter-scoped transport state.
//!
//! [`GlobalState`] lives in the session's data map, one instance per
//! session: the HTTP client pool, the user-token cache, per-host auth hints,
//! and the expect-continue support map are all shared across transporters so
//! connections and negotiated state survive individual transporter
//! lifetimes. [`LocalState`] is per transporter: its borrowed client and the
//! WebDAV probe result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use reqwest::Client;

use quarry_core::repository::Proxy;
use quarry_core::session::Session;

use crate::error::TransportError;

/// Total idle connections the pool may retain per client.
const POOL_MAX_IDLE_PER_HOST: usize = 50;

/// Everything that distinguishes one pooled client from another. Two
/// repositories with equal keys share connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClientKey {
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub proxy: Option<Proxy>,
    /// TLS protocol names from `https.protocols`, e.g. `TLSv1.3`.
    pub protocols: Option<Vec<String>>,
    /// Opaque cipher-suite names; distinct suites get distinct pools even
    /// though the client cannot configure them individually.
    pub cipher_suites: Option<Vec<String>>,
}

/// Identifies a cached user token: same repository, endpoint, credentials
/// and proxy reuse the same stateful connection token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserTokenKey {
    pub repo_id: String,
    pub url: String,
    pub username: Option<String>,
    pub proxy: Option<String>,
}

/// A successfully negotiated authentication scheme for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHint {
    pub scheme: AuthScheme,
    pub realm: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

/// Per-session shared transport state. Install via [`GlobalState::from_session`];
/// the session data map serializes first-time initialization.
pub struct GlobalState {
    clients: Mutex<HashMap<ClientKey, Client>>,
    user_tokens: Mutex<HashMap<UserTokenKey, String>>,
    auth_hints: RwLock<HashMap<String, AuthHint>>,
    expect_continue: Mutex<HashMap<(String, Option<String>), bool>>,
}

impl GlobalState {
    fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            user_tokens: Mutex::new(HashMap::new()),
            auth_hints: RwLock::new(HashMap::new()),
            expect_continue: Mutex::new(HashMap::new()),
        }
    }

    /// The session's `GlobalState`, installed on first use.
    pub fn from_session(session: &Session) -> Arc<GlobalState> {
        session.data().get_or_insert_with(GlobalState::new)
    }

    /// Fetch or build the pooled client for `key`.
    pub fn client(&self, key: &ClientKey) -> Result<Client, TransportError> {
        let mut clients = lock(&self.clients);
        if let Some(existing) = clients.get(key) {
            return Ok(existing.clone());
        }
        let client = build_client(key)?;
        clients.insert(key.clone(), client.clone());
        Ok(client)
    }

    pub fn user_token(&self, key: &UserTokenKey) -> Option<String> {
        lock(&self.user_tokens).get(key).cloned()
    }

    pub fn store_user_token(&self, key: UserTokenKey, token: String) {
        lock(&self.user_tokens).insert(key, token);
    }

    /// The auth scheme this host accepted earlier, if any.
    pub fn auth_hint(&self, host: &str) -> Option<AuthHint> {
        match self.auth_hints.read() {
            Ok(hints) => hints.get(host).cloned(),
            Err(poisoned) => poisoned.into_inner().get(host).cloned(),
        }
    }

    /// Remember that `host` accepted `hint`; future requests authenticate
    /// preemptively instead of waiting for a challenge.
    pub fn prime_auth_hint(&self, host: &str, hint: AuthHint) {
        let mut hints = match self.auth_hints.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        hints.insert(host.to_string(), hint);
    }

    /// Forget the negotiated scheme after a 401/407.
    pub fn invalidate_auth_hint(&self, host: &str) {
        let mut hints = match self.auth_hints.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        hints.remove(host);
    }

    /// Whether the endpoint is known to support (or reject) the
    /// expect-continue handshake. `None` means untested.
    pub fn expect_continue(&self, url: &str, proxy: Option<&str>) -> Option<bool> {
        lock(&self.expect_continue)
            .get(&(url.to_string(), proxy.map(str::to_string)))
            .copied()
    }

    pub fn set_expect_continue(&self, url: &str, proxy: Option<&str>, supported: bool) {
        lock(&self.expect_continue)
            .insert((url.to_string(), proxy.map(str::to_string)), supported);
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn build_client(key: &ClientKey) -> Result<Client, TransportError> {
    let mut builder = Client::builder().pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST);
    if let Some(ms) = key.connect_timeout_ms {
        builder = builder.connect_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = key.request_timeout_ms {
        builder = builder.read_timeout(Duration::from_millis(ms));
    }
    if let Some(ref proxy) = key.proxy {
        let mut p = reqwest::Proxy::all(proxy.url())?;
        if let Some(ref creds) = proxy.credentials {
            p = p.basic_auth(&creds.username, &creds.password);
        }
        builder = builder.proxy(p);
    }
    if let Some(ref protocols) = key.protocols {
        if protocols.iter().any(|p| p == "TLSv1.3") && !protocols.iter().any(|p| p == "TLSv1.2") {
            builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_3);
        } else if protocols.iter().any(|p| p == "TLSv1.2") {
            builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_2);
        }
    }
    Ok(builder.build()?)
}

/// Tri-state flags stored as an atomic: unknown / no / yes.
const TRI_UNKNOWN: i8 = -1;
const TRI_NO: i8 = 0;
const TRI_YES: i8 = 1;

/// Per-transporter state. The client is borrowed from [`GlobalState`]; a
/// transporter built without session state owns a standalone client, which
/// simply drops with the transporter.
pub struct LocalState {
    client: Client,
    global: Arc<GlobalState>,
    webdav: AtomicI8,
    user_token: Mutex<Option<String>>,
}

impl LocalState {
    pub fn new(client: Client, global: Arc<GlobalState>) -> Self {
        Self {
            client,
            global,
            webdav: AtomicI8::new(TRI_UNKNOWN),
            user_token: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn global(&self) -> &Arc<GlobalState> {
        &self.global
    }

    /// Result of the WebDAV OPTIONS probe, if it ran. Races between two
    /// probes are benign: last store wins.
    pub fn webdav(&self) -> Option<bool> {
        match self.webdav.load(Ordering::Acquire) {
            TRI_YES => Some(true),
            TRI_NO => Some(false),
            _ => None,
        }
    }

    pub fn set_webdav(&self, supported: bool) {
        let value = if supported { TRI_YES } else { TRI_NO };
        self.webdav.store(value, Ordering::Release);
    }

    pub fn user_token(&self) -> Option<String> {
        lock(&self.user_token).clone()
    }

    pub fn set_user_token(&self, token: String) {
        *lock(&self.user_token) = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_state_installed_once_per_session() {
        let session = Session::new();
        let first = GlobalState::from_session(&session);
        let second = GlobalState::from_session(&session);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn clients_are_pooled_by_key() {
        let state = GlobalState::new();
        let key = ClientKey {
            connect_timeout_ms: Some(5000),
            ..ClientKey::default()
        };
        let other = ClientKey {
            connect_timeout_ms: Some(9000),
            ..ClientKey::default()
        };
        let _ = state.client(&key).unwrap();
        let _ = state.client(&key).unwrap();
        let _ = state.client(&other).unwrap();
        // same key reuses the cached client, distinct keys get their own
        assert_eq!(lock(&state.clients).len(), 2);
    }

    #[test]
    fn auth_hints_prime_and_invalidate() {
        let state = GlobalState::new();
        assert!(state.auth_hint("repo.example:443").is_none());
        state.prime_auth_hint(
            "repo.example:443",
            AuthHint {
                scheme: AuthScheme::Basic,
                realm: Some("releases".to_string()),
            },
        );
        assert_eq!(
            state.auth_hint("repo.example:443").map(|h| h.scheme),
            Some(AuthScheme::Basic)
        );
        state.invalidate_auth_hint("repo.example:443");
        assert!(state.auth_hint("repo.example:443").is_none());
    }

    #[test]
    fn expect_continue_is_tri_state() {
        let state = GlobalState::new();
        assert_eq!(state.expect_continue("http://repo.example/", None), None);
        state.set_expect_continue("http://repo.example/", None, false);
        assert_eq!(
            state.expect_continue("http://repo.example/", None),
            Some(false)
        );
        // distinct proxies get distinct entries
        assert_eq!(
            state.expect_continue("http://repo.example/", Some("proxy:8080")),
            None
        );
    }

    #[test]
    fn webdav_flag_is_tri_state() {
        let state = GlobalState::new();
        let local = LocalState::new(Client::new(), Arc::new(state));
        assert_eq!(local.webdav(), None);
        local.set_webdav(true);
        assert_eq!(local.webdav(), Some(true));
        local.set_webdav(false);
        assert_eq!(local.webdav(), Some(false));
    }
}

//! The HTTP/HTTPS transporter.
//!
//! Protocol behavior in one place: the request skeleton every call shares,
//! resumable downloads with a single 412 fallback, uploads with
//! expect-continue handling and the WebDAV MKCOL preamble, challenge-driven
//! authentication backed by the session's auth-hint cache, and bounded
//! reconnect retries for idempotent requests.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_RANGE, COOKIE,
    EXPECT, IF_UNMODIFIED_SINCE, PRAGMA, RANGE, SET_COOKIE, USER_AGENT,
};
use reqwest::{Body, Method, RequestBuilder, Response, StatusCode};
use url::Url;

use quarry_core::repository::RemoteRepository;
use quarry_core::session::Session;

use crate::auth;
use crate::checksum::{default_extractors, ChecksumExtractor, ExtractOutcome};
use crate::error::{ErrorKind, NoTransporterError, TransportError};
use crate::state::{AuthHint, AuthScheme, ClientKey, GlobalState, LocalState, UserTokenKey};
use crate::task::{GetTask, PeekTask, PutSource, PutTask};
use crate::uri;

pub const CONFIG_CONNECT_TIMEOUT: &str = "connect-timeout";
pub const CONFIG_REQUEST_TIMEOUT: &str = "request-timeout";
pub const CONFIG_USER_AGENT: &str = "user-agent";
pub const CONFIG_HTTP_HEADERS: &str = "http-headers";
pub const CONFIG_CREDENTIAL_ENCODING: &str = "credential-encoding";
pub const CONFIG_RETRY_COUNT: &str = "retry-handler-count";
pub const CONFIG_CIPHER_SUITES: &str = "https.cipherSuites";
pub const CONFIG_PROTOCOLS: &str = "https.protocols";
pub const CONFIG_WEBDAV: &str = "webdav-enabled";
pub const CONFIG_PREEMPTIVE_AUTH: &str = "preemptive-auth";

const DEFAULT_USER_AGENT: &str = concat!("quarry/", env!("CARGO_PKG_VERSION"));
const DEFAULT_RETRY_COUNT: u64 = 3;

/// WebDAV collection handling before uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebDavMode {
    /// Never probe, never create collections.
    Off,
    /// Probe with OPTIONS once; create collections only when the server
    /// advertises `DAV`.
    Auto,
    /// Always create collections, even when the server hides the `DAV`
    /// header.
    On,
}

impl WebDavMode {
    fn from_config(value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(serde_json::Value::Bool(true)) => WebDavMode::Auto,
            Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("on") => WebDavMode::On,
            Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("auto") => {
                WebDavMode::Auto
            }
            _ => WebDavMode::Off,
        }
    }
}

/// Builds transporters for `http`/`https` repositories.
#[derive(Debug, Default)]
pub struct HttpTransporterFactory;

impl HttpTransporterFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn new_instance(
        &self,
        session: &Session,
        repository: &RemoteRepository,
    ) -> Result<HttpTransporter, NoTransporterError> {
        let no_transporter = |reason: String| NoTransporterError {
            id: repository.id.clone(),
            url: repository.url.clone(),
            reason,
        };

        let mut base = Url::parse(&repository.url)
            .map_err(|e| no_transporter(format!("malformed URL: {e}")))?;
        let scheme = base.scheme().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(no_transporter(format!("unsupported scheme {scheme:?}")));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let config = &session.config;
        let repo = Some(repository.id.as_str());
        let key = ClientKey {
            connect_timeout_ms: config.get_u64(CONFIG_CONNECT_TIMEOUT, repo),
            request_timeout_ms: config.get_u64(CONFIG_REQUEST_TIMEOUT, repo),
            proxy: repository.proxy.clone(),
            protocols: config.get_str_list(CONFIG_PROTOCOLS, repo),
            cipher_suites: config.get_str_list(CONFIG_CIPHER_SUITES, repo),
        };
        let global = GlobalState::from_session(session);
        let client = global
            .client(&key)
            .map_err(|e| no_transporter(format!("client construction failed: {e}")))?;

        let headers = config
            .get_object(CONFIG_HTTP_HEADERS, repo)
            .map(|map| {
                map.iter()
                    .map(|(name, value)| (name.clone(), value.as_str().map(str::to_string)))
                    .collect()
            })
            .unwrap_or_default();

        let host = match (base.host_str(), base.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => base.to_string(),
        };

        Ok(HttpTransporter {
            repository: repository.clone(),
            base,
            host,
            local: LocalState::new(client, global),
            headers,
            user_agent: config
                .get_str(CONFIG_USER_AGENT, repo)
                .unwrap_or(DEFAULT_USER_AGENT)
                .to_string(),
            credential_encoding: config
                .get_str(CONFIG_CREDENTIAL_ENCODING, repo)
                .unwrap_or("UTF-8")
                .to_string(),
            preemptive_auth: config.get_bool(CONFIG_PREEMPTIVE_AUTH, repo).unwrap_or(false),
            webdav: WebDavMode::from_config(config.get(CONFIG_WEBDAV, repo)),
            retry_count: config
                .get_u64(CONFIG_RETRY_COUNT, repo)
                .unwrap_or(DEFAULT_RETRY_COUNT) as u32,
            extractors: default_extractors(),
            closed: AtomicBool::new(false),
        })
    }
}

/// One transporter per repository per caller. Methods are `async` and return
/// only when the protocol interaction is complete; the pooled connections
/// live in the session's [`GlobalState`].
pub struct HttpTransporter {
    repository: RemoteRepository,
    base: Url,
    host: String,
    local: LocalState,
    headers: Vec<(String, Option<String>)>,
    user_agent: String,
    credential_encoding: String,
    preemptive_auth: bool,
    webdav: WebDavMode,
    retry_count: u32,
    extractors: Vec<Arc<dyn ChecksumExtractor>>,
    closed: AtomicBool,
}

impl HttpTransporter {
    /// Distinguish 404-ish outcomes from other failures without exposing
    /// error internals.
    pub fn classify(&self, error: &TransportError) -> ErrorKind {
        error.kind()
    }

    /// Existence check via HEAD.
    pub async fn peek(&self, task: &PeekTask) -> Result<(), TransportError> {
        self.ensure_open()?;
        let url = uri::resolve(&self.base, &task.location)?;
        let response = self
            .issue(|with_auth| self.request_skeleton(Method::HEAD, url.clone(), with_auth), true)
            .await?;
        self.check_status(response, &url).await?;
        Ok(())
    }

    /// Download, resumable when the task carries both a destination and a
    /// resume offset.
    pub async fn get(&self, task: &mut GetTask) -> Result<(), TransportError> {
        self.ensure_open()?;
        let url = uri::resolve(&self.base, &task.location)?;

        let mut resume = task.resume_offset > 0
            && task
                .destination
                .as_deref()
                .map(Path::exists)
                .unwrap_or(false);
        let mut hints = true;

        loop {
            let build = |with_auth: bool| {
                let mut request = self.request_skeleton(Method::GET, url.clone(), with_auth);
                for extractor in &self.extractors {
                    request = extractor.prepare(request, hints);
                }
                if resume {
                    request = request.header(RANGE, format!("bytes={}-", task.resume_offset));
                    if let Some(since) = task
                        .destination
                        .as_deref()
                        .and_then(|d| std::fs::metadata(d).ok())
                        .and_then(|m| m.modified().ok())
                        .and_then(|t| t.checked_sub(Duration::from_secs(60)))
                    {
                        request = request.header(IF_UNMODIFIED_SINCE, http_date(since));
                    }
                    request = request.header(ACCEPT_ENCODING, "identity");
                }
                request
            };
            let response = self.issue(build, true).await?;

            if response.status() == StatusCode::PRECONDITION_FAILED && resume {
                // stale local file: fall back to a full download, once
                tracing::debug!(url = %url, "resume rejected with 412, restarting from scratch");
                drop(response);
                resume = false;
                continue;
            }

            let response = self.check_status(response, &url).await?;

            let mut checksums = HashMap::new();
            let mut retry_without_hints = false;
            for extractor in &self.extractors {
                match extractor.extract(response.headers()) {
                    ExtractOutcome::Checksums(found) => checksums.extend(found),
                    ExtractOutcome::Retry if hints => retry_without_hints = true,
                    _ => {}
                }
            }
            if retry_without_hints {
                drop(response);
                hints = false;
                continue;
            }
            task.set_checksums(checksums);

            let (offset, length) = if response.status() == StatusCode::PARTIAL_CONTENT {
                let header = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .ok_or_else(|| TransportError::InvalidContentRange {
                        header: String::new(),
                    })?;
                let (start, end) = parse_content_range(&header)
                    .ok_or(TransportError::InvalidContentRange { header })?;
                if start != task.resume_offset {
                    return Err(TransportError::ResumeMismatch {
                        offset: task.resume_offset,
                        start,
                    });
                }
                (start, Some(end + 1))
            } else {
                (0, response.content_length())
            };

            if let Some(ref listener) = task.listener {
                if listener.transfer_started(offset, length).is_err() {
                    return Err(TransportError::Cancelled);
                }
            }

            return match task.destination.clone() {
                Some(dest) => self.stream_to_file(response, task, &dest, offset).await,
                None => self.stream_to_memory(response, task).await,
            };
        }
    }

    /// Upload. The source is repeatable, so expect-continue fallback can
    /// resend the body.
    pub async fn put(&self, task: &PutTask) -> Result<(), TransportError> {
        self.ensure_open()?;
        let url = uri::resolve(&self.base, &task.location)?;

        match self.webdav {
            WebDavMode::Off => {}
            WebDavMode::On => self.ensure_collections(&url).await,
            WebDavMode::Auto => {
                if self.local.webdav().is_none() {
                    self.probe_webdav(&url).await;
                }
                if self.local.webdav() == Some(true) {
                    self.ensure_collections(&url).await;
                }
            }
        }

        // the source is read up front; retries resend the same bytes
        let data = match task.source {
            PutSource::Bytes(ref bytes) => bytes.clone(),
            PutSource::File(ref path) => std::fs::read(path)?,
        };
        let length = data.len() as u64;
        let mut expect = self
            .local
            .global()
            .expect_continue(self.base.as_str(), self.proxy_key().as_deref())
            .unwrap_or(true);

        if let Some(ref listener) = task.listener {
            if listener.transfer_started(0, Some(length)).is_err() {
                return Err(TransportError::Cancelled);
            }
        }

        loop {
            let cancelled = Arc::new(AtomicBool::new(false));
            let build = |with_auth: bool| {
                let mut request = self.request_skeleton(Method::PUT, url.clone(), with_auth);
                if expect && length > 0 {
                    request = request.header(EXPECT, "100-continue");
                }
                request.body(put_body(
                    data.clone(),
                    task.listener.clone(),
                    cancelled.clone(),
                ))
            };

            let response = match self.issue(build, false).await {
                Ok(response) => response,
                Err(error) => {
                    // a cancellation inside the body stream comes back
                    // wrapped in an I/O-ish transport error; unwrap it
                    if cancelled.load(Ordering::Acquire) {
                        return Err(TransportError::Cancelled);
                    }
                    return Err(error);
                }
            };

            if response.status() == StatusCode::EXPECTATION_FAILED && expect && length > 0 {
                tracing::debug!(url = %url, "server rejected Expect: 100-continue, disabling");
                self.local.global().set_expect_continue(
                    self.base.as_str(),
                    self.proxy_key().as_deref(),
                    false,
                );
                drop(response);
                expect = false;
                continue;
            }

            self.check_status(response, &url).await?;
            return Ok(());
        }
    }

    /// Idempotent; pooled connections return to the session pool. Task
    /// calls after closing fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    /// The header skeleton shared by every request, plus cached user token
    /// and (optionally) credentials.
    fn request_skeleton(&self, method: Method, url: Url, with_auth: bool) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        if let Some(token) = self.cached_user_token() {
            if let Ok(value) = HeaderValue::from_str(&token) {
                headers.insert(COOKIE, value);
            }
        }
        for (name, value) in &self.headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            match value {
                Some(value) => {
                    if let Ok(value) = HeaderValue::from_str(value) {
                        headers.insert(name, value);
                    }
                }
                None => {
                    headers.remove(name);
                }
            }
        }

        let mut request = self.local.client().request(method, url).headers(headers);
        if with_auth {
            request = auth::apply_auth(
                request,
                self.repository.credentials.as_ref(),
                &self.credential_encoding,
            );
        }
        request
    }

    /// Send a request, answering one auth challenge from the hint cache and
    /// retrying reconnectable failures for idempotent requests.
    async fn issue<F>(&self, build: F, idempotent: bool) -> Result<Response, TransportError>
    where
        F: Fn(bool) -> RequestBuilder,
    {
        let global = self.local.global().clone();
        let mut with_auth = self.repository.credentials.is_some()
            && (self.preemptive_auth || global.auth_hint(&self.host).is_some());

        let mut challenged = false;
        loop {
            let response = self.send_with_retries(build(with_auth), idempotent).await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::PROXY_AUTHENTICATION_REQUIRED
            {
                global.invalidate_auth_hint(&self.host);
                if !challenged && !with_auth && self.repository.credentials.is_some() {
                    // answer the challenge and remember the scheme
                    global.prime_auth_hint(&self.host, self.hint_for_credentials());
                    challenged = true;
                    with_auth = true;
                    drop(response);
                    continue;
                }
            } else if with_auth && status.as_u16() < 400 {
                global.prime_auth_hint(&self.host, self.hint_for_credentials());
            }

            self.remember_user_token(&response);
            return Ok(response);
        }
    }

    async fn send_with_retries(
        &self,
        request: RequestBuilder,
        idempotent: bool,
    ) -> Result<Response, TransportError> {
        let retries = if idempotent { self.retry_count } else { 0 };
        for attempt in 0..retries {
            match request.try_clone() {
                Some(clone) => match clone.send().await {
                    Ok(response) => return Ok(response),
                    Err(error) if error.is_timeout() || error.is_connect() => {
                        tracing::debug!(attempt, error = %error, "retrying request");
                        continue;
                    }
                    Err(error) => return Err(error.into()),
                },
                None => break,
            }
        }
        Ok(request.send().await?)
    }

    /// Status gate: anything ≥ 300 is an error carrying the status code.
    /// The body of failed responses is drained so the connection can return
    /// to the pool.
    async fn check_status(&self, response: Response, url: &Url) -> Result<Response, TransportError> {
        let status = response.status();
        if status.as_u16() < 300 {
            return Ok(response);
        }
        let _ = response.bytes().await;
        Err(TransportError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }

    async fn stream_to_file(
        &self,
        mut response: Response,
        task: &GetTask,
        dest: &Path,
        offset: u64,
    ) -> Result<(), TransportError> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        quarry_util::fs::ensure_dir(parent)?;
        let mut staged = tempfile::NamedTempFile::new_in(parent)?;

        if offset > 0 {
            // carry over the prefix that was already downloaded
            let existing = std::fs::File::open(dest)?;
            let mut prefix = existing.take(offset);
            std::io::copy(&mut prefix, staged.as_file_mut())?;
        }

        while let Some(chunk) = response.chunk().await? {
            staged.as_file_mut().write_all(&chunk)?;
            if let Some(ref listener) = task.listener {
                if listener.transfer_progressed(&chunk).is_err() {
                    // the temp file is dropped and deleted with it
                    return Err(TransportError::Cancelled);
                }
            }
        }

        staged.as_file_mut().flush()?;
        staged.persist(dest).map_err(|e| e.error)?;
        Ok(())
    }

    async fn stream_to_memory(
        &self,
        mut response: Response,
        task: &mut GetTask,
    ) -> Result<(), TransportError> {
        task.clear_data();
        while let Some(chunk) = response.chunk().await? {
            task.push_data(&chunk);
            if let Some(ref listener) = task.listener {
                if listener.transfer_progressed(&chunk).is_err() {
                    return Err(TransportError::Cancelled);
                }
            }
        }
        Ok(())
    }

    /// OPTIONS probe recording whether the server advertises WebDAV.
    async fn probe_webdav(&self, url: &Url) {
        let result = self
            .issue(
                |with_auth| self.request_skeleton(Method::OPTIONS, url.clone(), with_auth),
                true,
            )
            .await;
        match result {
            Ok(response) => {
                let dav = response.headers().contains_key("dav");
                self.local.set_webdav(dav);
                let _ = response.bytes().await;
            }
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "WebDAV probe failed");
                self.local.set_webdav(false);
            }
        }
    }

    /// Create every missing ancestor collection of `url`: climb with MKCOL
    /// until one exists, then create the missing ones top-down. Failures are
    /// logged and abort the preamble; the PUT itself will surface the real
    /// error if the collection truly could not be created.
    async fn ensure_collections(&self, url: &Url) {
        let directories = uri::directories(&self.base, url);
        let mut missing = Vec::new();
        for dir in directories {
            match self.mkcol(&dir).await {
                Ok(status) if status < 300 || status == 405 => break,
                Ok(409) => {
                    missing.push(dir);
                    continue;
                }
                Ok(status) => {
                    tracing::warn!(url = %dir, status, "unexpected MKCOL response, skipping collection setup");
                    return;
                }
                Err(error) => {
                    tracing::warn!(url = %dir, error = %error, "MKCOL failed, skipping collection setup");
                    return;
                }
            }
        }
        for dir in missing.into_iter().rev() {
            match self.mkcol(&dir).await {
                Ok(status) if status < 300 || status == 405 => {}
                Ok(status) => {
                    tracing::warn!(url = %dir, status, "could not create collection");
                    return;
                }
                Err(error) => {
                    tracing::warn!(url = %dir, error = %error, "could not create collection");
                    return;
                }
            }
        }
    }

    async fn mkcol(&self, url: &Url) -> Result<u16, TransportError> {
        let method = Method::from_bytes(b"MKCOL").expect("valid method");
        let response = self
            .issue(
                |with_auth| self.request_skeleton(method.clone(), url.clone(), with_auth),
                true,
            )
            .await?;
        let status = response.status().as_u16();
        let _ = response.bytes().await;
        Ok(status)
    }

    fn hint_for_credentials(&self) -> AuthHint {
        let scheme = match self.repository.credentials {
            Some(ref creds) if creds.username.is_none() => AuthScheme::Bearer,
            _ => AuthScheme::Basic,
        };
        AuthHint {
            scheme,
            realm: None,
        }
    }

    fn proxy_key(&self) -> Option<String> {
        self.repository
            .proxy
            .as_ref()
            .map(|p| format!("{}:{}", p.host, p.port))
    }

    fn user_token_key(&self) -> UserTokenKey {
        UserTokenKey {
            repo_id: self.repository.id.clone(),
            url: self.base.to_string(),
            username: self
                .repository
                .credentials
                .as_ref()
                .and_then(|c| c.username.clone()),
            proxy: self.proxy_key(),
        }
    }

    fn cached_user_token(&self) -> Option<String> {
        self.local
            .user_token()
            .or_else(|| self.local.global().user_token(&self.user_token_key()))
    }

    fn remember_user_token(&self, response: &Response) {
        let Some(cookie) = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        let token = cookie.split(';').next().unwrap_or(cookie).trim().to_string();
        if token.is_empty() {
            return;
        }
        self.local.set_user_token(token.clone());
        self.local
            .global()
            .store_user_token(self.user_token_key(), token);
    }
}

/// A body stream that reports progress and flags listener cancellation so
/// the caller can unwrap it from the wrapping send error.
fn put_body(
    data: Vec<u8>,
    listener: Option<Arc<dyn crate::task::TransferListener>>,
    cancelled: Arc<AtomicBool>,
) -> Body {
    let chunks: Vec<Vec<u8>> = data.chunks(32 * 1024).map(<[u8]>::to_vec).collect();
    let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        if let Some(ref listener) = listener {
            if listener.transfer_progressed(&chunk).is_err() {
                cancelled.store(true, Ordering::Release);
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "transfer cancelled",
                ));
            }
        }
        Ok(chunk)
    }));
    Body::wrap_stream(stream)
}

/// Parse `bytes A-B/total` into `(A, B)`.
fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let rest = value.trim().strip_prefix("bytes")?.trim();
    let (range, _total) = rest.split_once('/')?;
    let (start, end) = range.trim().split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    (start <= end).then_some((start, end))
}

/// RFC 1123 date for `If-Unmodified-Since`.
fn http_date(time: SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::repository::RemoteRepository;

    #[test]
    fn content_range_parsing() {
        assert_eq!(parse_content_range("bytes 2-8/9"), Some((2, 8)));
        assert_eq!(parse_content_range("bytes 0-0/*"), Some((0, 0)));
        assert_eq!(parse_content_range("bytes 9-2/9"), None);
        assert_eq!(parse_content_range("items 2-8/9"), None);
        assert_eq!(parse_content_range("bytes 2-8"), None);
    }

    #[test]
    fn webdav_mode_from_config() {
        use serde_json::json;
        assert_eq!(WebDavMode::from_config(None), WebDavMode::Off);
        assert_eq!(WebDavMode::from_config(Some(&json!(false))), WebDavMode::Off);
        assert_eq!(WebDavMode::from_config(Some(&json!(true))), WebDavMode::Auto);
        assert_eq!(WebDavMode::from_config(Some(&json!("auto"))), WebDavMode::Auto);
        assert_eq!(WebDavMode::from_config(Some(&json!("on"))), WebDavMode::On);
        assert_eq!(WebDavMode::from_config(Some(&json!("off"))), WebDavMode::Off);
    }

    #[test]
    fn factory_rejects_unsupported_schemes() {
        let session = Session::new();
        let factory = HttpTransporterFactory::new();
        let ftp = RemoteRepository::new("ftp", "ftp://repo.example.org/releases");
        assert!(factory.new_instance(&session, &ftp).is_err());
        let junk = RemoteRepository::new("junk", "not a url at all");
        assert!(factory.new_instance(&session, &junk).is_err());
    }

    #[test]
    fn factory_accepts_http_case_insensitively() {
        let session = Session::new();
        let factory = HttpTransporterFactory::new();
        let upper = RemoteRepository::new("up", "HTTPS://repo.example.org/releases");
        assert!(factory.new_instance(&session, &upper).is_ok());
        let plain = RemoteRepository::new("plain", "http://repo.example.org/releases");
        assert!(factory.new_instance(&session, &plain).is_ok());
    }

    #[test]
    fn http_date_format() {
        let epoch = SystemTime::UNIX_EPOCH;
        assert_eq!(http_date(epoch), "Thu, 01 Jan 1970 00:00:00 GMT");
    }
}

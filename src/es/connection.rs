//! Connection management for the search engine.
//!
//! Resolves an endpoint from configuration (cloud id, host list or the local
//! default), checks it anonymously and only asks a [`CredentialResolver`] for
//! credentials when anonymous access is rejected.

use std::fmt;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use console::Term;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ElasticsearchConfig;
use crate::error::{MigrateError, Result};

/// Where the engine lives, in resolution order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Cloud { cloud_id: String, url: String },
    Hosts(Vec<String>),
    Local(String),
}

impl Endpoint {
    pub fn from_config(config: &ElasticsearchConfig) -> Result<Self> {
        if let Some(cloud_id) = config.cloud_id.as_deref().map(str::trim) {
            if !cloud_id.is_empty() {
                let url = decode_cloud_id(cloud_id)?;
                return Ok(Self::Cloud {
                    cloud_id: cloud_id.to_string(),
                    url,
                });
            }
        }
        if !config.hosts.is_empty() {
            let hosts = config
                .hosts
                .iter()
                .map(|host| normalize_url(host))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::Hosts(hosts));
        }
        Ok(Self::Local(normalize_url(&config.local_endpoint)?))
    }

    pub const fn is_remote(&self) -> bool {
        !matches!(self, Self::Local(_))
    }

    /// Candidate base URLs, tried in order.
    pub fn urls(&self) -> Vec<String> {
        match self {
            Self::Cloud { url, .. } => vec![url.clone()],
            Self::Hosts(hosts) => hosts.clone(),
            Self::Local(url) => vec![url.clone()],
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud { cloud_id, .. } => write!(f, "cloud id {cloud_id}"),
            Self::Hosts(hosts) => write!(f, "hosts [{}]", hosts.join(", ")),
            Self::Local(url) => write!(f, "local {url}"),
        }
    }
}

/// Decode an Elastic Cloud id (`name:base64(host$es_uuid$kibana_uuid)`) into
/// the HTTPS URL of its Elasticsearch deployment.
pub fn decode_cloud_id(cloud_id: &str) -> Result<String> {
    let encoded = cloud_id
        .split_once(':')
        .map_or(cloud_id, |(_, encoded)| encoded)
        .trim();
    if encoded.is_empty() {
        return Err(MigrateError::Config(format!(
            "cloud id '{cloud_id}' has no encoded payload"
        )));
    }
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|err| MigrateError::Config(format!("cloud id is not valid base64: {err}")))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|err| MigrateError::Config(format!("cloud id is not valid UTF-8: {err}")))?;

    let mut parts = decoded.split('$');
    let host = parts.next().unwrap_or_default().trim_end_matches('/');
    let es_uuid = parts.next().unwrap_or_default();
    if host.is_empty() || es_uuid.is_empty() {
        return Err(MigrateError::Config(format!(
            "cloud id '{cloud_id}' is missing host or deployment id"
        )));
    }

    let (host, port) = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => (name, Some(port)),
        _ => (host, None),
    };
    Ok(match port {
        Some(port) if port != "443" => format!("https://{es_uuid}.{host}:{port}"),
        _ => format!("https://{es_uuid}.{host}"),
    })
}

fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(MigrateError::Config("empty endpoint URL".to_string()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{trimmed}"))
    }
}

/// Basic-auth credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of credentials, consulted only after anonymous access is rejected.
pub trait CredentialResolver {
    fn resolve(&self, endpoint: &str) -> Result<Credentials>;
}

/// Fixed credentials, from configuration or a test.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialResolver for StaticCredentials {
    fn resolve(&self, _endpoint: &str) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// Interactive prompt on the controlling terminal; the password is read
/// without echo.
#[derive(Debug, Clone, Default)]
pub struct TerminalPrompt {
    pub username: Option<String>,
}

impl CredentialResolver for TerminalPrompt {
    fn resolve(&self, endpoint: &str) -> Result<Credentials> {
        let term = Term::stderr();
        if !term.is_term() {
            return Err(MigrateError::Credentials(format!(
                "{endpoint} requires credentials and no terminal is attached"
            )));
        }
        let prompt_err = |err: std::io::Error| MigrateError::Credentials(err.to_string());

        term.write_line(&format!("Enter credentials for {endpoint}"))
            .map_err(prompt_err)?;
        let username = match self.username.as_deref() {
            Some(name) => name.trim().to_string(),
            None => {
                term.write_str("Username: ").map_err(prompt_err)?;
                term.read_line().map_err(prompt_err)?.trim().to_string()
            }
        };
        check_username(&username)?;
        term.write_str("Password: ").map_err(prompt_err)?;
        let password = term.read_secure_line().map_err(prompt_err)?;
        Ok(Credentials::new(username, password))
    }
}

fn check_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(MigrateError::Credentials("empty username".to_string()));
    }
    Ok(())
}

/// Resolver used when prompting is disabled and nothing is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialResolver for NoCredentials {
    fn resolve(&self, endpoint: &str) -> Result<Credentials> {
        Err(MigrateError::Credentials(format!(
            "{endpoint} requires credentials; set elasticsearch.username/password \
             or enable prompt_for_credentials"
        )))
    }
}

enum Reachability {
    Reachable,
    AuthRequired(StatusCode),
    Unreachable(String),
}

/// Establishes and validates a [`Connection`].
pub struct ConnectionManager {
    config: ElasticsearchConfig,
    resolver: Box<dyn CredentialResolver>,
}

impl ConnectionManager {
    /// Picks a resolver from configuration: configured username and password
    /// win, then the terminal prompt if allowed.
    pub fn new(config: ElasticsearchConfig) -> Self {
        let resolver: Box<dyn CredentialResolver> =
            match (config.username.clone(), config.password.clone()) {
                (Some(user), Some(pass)) => Box::new(StaticCredentials(Credentials::new(user, pass))),
                (username, _) if config.prompt_for_credentials => {
                    Box::new(TerminalPrompt { username })
                }
                _ => Box::new(NoCredentials),
            };
        Self { config, resolver }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Box<dyn CredentialResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Try each candidate URL anonymously. Credentials are resolved, and
    /// one authenticated retry made, only after a remote endpoint answers
    /// 401/403; a transport failure on a remote locator never prompts.
    pub fn connect(&self) -> Result<Connection> {
        let endpoint = Endpoint::from_config(&self.config)?;
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| MigrateError::Connection(format!("http client: {err}")))?;
        let request_timeout = Duration::from_secs(self.config.request_timeout_secs.max(1));
        let reindex_timeout = match self.config.reindex_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let open = |base_url: String, credentials: Option<Credentials>| Connection {
            base_url,
            client: client.clone(),
            credentials,
            request_timeout,
            reindex_timeout,
        };

        info!(%endpoint, "connecting to search engine");

        let mut challenged = None;
        let mut failures = Vec::new();
        for url in endpoint.urls() {
            match check_reachable(&client, &url, None, request_timeout) {
                Reachability::Reachable => {
                    info!(url = %url, "connected anonymously");
                    return Ok(open(url, None));
                }
                Reachability::AuthRequired(status) => {
                    debug!(url = %url, %status, "anonymous access rejected");
                    challenged = Some(url);
                    break;
                }
                Reachability::Unreachable(reason) => {
                    warn!(url = %url, %reason, "endpoint unreachable");
                    failures.push(format!("{url}: {reason}"));
                }
            }
        }

        let Some(url) = challenged else {
            return Err(MigrateError::Connection(format!(
                "no reachable endpoint for {endpoint} ({})",
                failures.join("; ")
            )));
        };
        if !endpoint.is_remote() {
            return Err(MigrateError::Unauthorized { endpoint: url });
        }

        let credentials = self.resolver.resolve(&url)?;
        match check_reachable(&client, &url, Some(&credentials), request_timeout) {
            Reachability::Reachable => {
                info!(url = %url, user = %credentials.username, "connected with credentials");
                Ok(open(url, Some(credentials)))
            }
            Reachability::AuthRequired(_) => Err(MigrateError::Unauthorized { endpoint: url }),
            Reachability::Unreachable(reason) => Err(MigrateError::Connection(format!("{url}: {reason}"))),
        }
    }
}

fn check_reachable(client: &Client, url: &str, credentials: Option<&Credentials>, timeout: Duration) -> Reachability {
    let mut request = client.head(format!("{url}/")).timeout(timeout);
    if let Some(creds) = credentials {
        request = request.basic_auth(&creds.username, Some(creds.password()));
    }
    match request.send() {
        Ok(response) if response.status().is_success() => Reachability::Reachable,
        Ok(response)
            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            Reachability::AuthRequired(response.status())
        }
        Ok(response) => Reachability::Unreachable(format!("HTTP {}", response.status())),
        Err(err) => Reachability::Unreachable(err.to_string()),
    }
}

/// Basic facts about the connected cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub number: String,
}

/// Authenticated handle to the engine, owned by one process invocation and
/// lent to the index, reindex and alias managers.
pub struct Connection {
    base_url: String,
    client: Client,
    credentials: Option<Credentials>,
    request_timeout: Duration,
    reindex_timeout: Option<Duration>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("request_timeout", &self.request_timeout)
            .field("reindex_timeout", &self.reindex_timeout)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn info(&self) -> Result<ClusterInfo> {
        let response = self.send(self.request(Method::GET, "/"))?;
        self.read_json(response)
    }

    /// Request builder with auth and the default per-request timeout applied.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .timeout(self.request_timeout);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(creds.password()));
        }
        request
    }

    /// Request builder for a long blocking call: no timeout unless one is
    /// configured.
    pub(crate) fn long_request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(timeout) = self.reindex_timeout {
            request = request.timeout(timeout);
        }
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(creds.password()));
        }
        request
    }

    pub(crate) fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        debug!(url = %response.url(), status = %response.status(), "engine response");
        Ok(response)
    }

    /// HEAD-style existence check: 2xx is true, 404 is false, anything else
    /// is an engine error.
    pub(crate) fn exists(&self, path: &str) -> Result<bool> {
        let response = self.send(self.request(Method::HEAD, path))?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(MigrateError::from_engine_response(
                status.as_u16(),
                response.text().unwrap_or_default(),
            )),
        }
    }

    /// Decode a successful response body, or turn the failure into an
    /// engine error that keeps the raw body.
    pub(crate) fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(MigrateError::from_engine_response(status.as_u16(), body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Percent-encode one path segment (index or alias name).
pub(crate) fn segment(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

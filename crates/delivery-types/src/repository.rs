//! Remote repository references.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::error::ParseError;

/// Short host selectors and the forge domains they expand to.
pub const HOST_ALIASES: &[(&str, &str)] = &[
    ("github", "github.com"),
    ("gitlab", "gitlab.com"),
    ("bitbucket", "bitbucket.org"),
];

/// Basic-auth credentials forwarded from an inbound request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parses an `Authorization: Basic ...` header value.
    ///
    /// Returns `None` for other schemes and for malformed payloads.
    pub fn from_authorization(value: &str) -> Option<Self> {
        let (scheme, payload) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(payload.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }

    /// Returns the user name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Encodes the pair as an `Authorization` header value.
    pub fn to_authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An HTTPS reference to a remote repository.
///
/// The URL itself never carries credentials; they travel alongside it and are
/// handed to git out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReference {
    url: Url,
    owner: String,
    name: String,
    credentials: Option<Credentials>,
}

impl RepoReference {
    /// Creates a reference to `https://{host}/{owner}/{name}`.
    ///
    /// `host` is either an alias from [`HOST_ALIASES`] or a fully-qualified
    /// host name, optionally with a port.
    pub fn new(host: &str, owner: &str, name: &str) -> Result<Self, ParseError> {
        if [owner, name].iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
            return Err(ParseError::Incomplete);
        }

        let host = expand_host(host)?;
        let unsupported = || ParseError::UnsupportedHost(host.to_string());

        let mut url = Url::parse(&format!("https://{host}/")).map_err(|_| unsupported())?;
        url.path_segments_mut()
            .map_err(|()| unsupported())?
            .clear()
            .push(owner)
            .push(name);

        Ok(Self {
            url,
            owner: owner.to_string(),
            name: name.to_string(),
            credentials: None,
        })
    }

    /// Attaches credentials to the reference.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Returns the anonymous clone URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the resolved host name.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Returns the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the forwarded credentials, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

impl std::fmt::Display for RepoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Maps a host selector to a host name.
fn expand_host(selector: &str) -> Result<&str, ParseError> {
    if let Some((_, host)) = HOST_ALIASES.iter().find(|(alias, _)| *alias == selector) {
        return Ok(host);
    }
    if is_qualified_host(selector) {
        return Ok(selector);
    }
    Err(ParseError::UnsupportedHost(selector.to_string()))
}

/// Accepts `name.tld` style hosts with an optional numeric port.
fn is_qualified_host(value: &str) -> bool {
    let (host, port) = match value.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (value, None),
    };

    if let Some(port) = port {
        if port.is_empty() || port.parse::<u16>().is_err() {
            return false;
        }
    }

    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

//! Cookie plumbing shared by the session backends, and the cookie-carried
//! store itself.

use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SessionConfig;
use crate::session::{SessionError, SessionStore};

/// Characters escaped by `encodeURIComponent`: everything but
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Attributes of the cookie a backend issues.
#[derive(Debug, Clone)]
pub struct CookieAttributes {
    pub name: String,
    pub max_age_secs: u64,
    pub secure: bool,
}

impl CookieAttributes {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name().to_string(),
            max_age_secs: config.ttl_secs,
            secure: config.secure,
        }
    }

    /// Build a `Set-Cookie` value for an already-encoded cookie value.
    ///
    /// `SameSite=None` is only honoured by browsers together with `Secure`,
    /// so insecure deployments fall back to `Lax`.
    pub fn set_cookie(&self, value: &str) -> Result<HeaderValue, SessionError> {
        let site = if self.secure {
            "SameSite=None; Secure"
        } else {
            "SameSite=Lax"
        };
        let cookie = format!(
            "{}={}; Path=/; Max-Age={}; {}",
            self.name, value, self.max_age_secs, site
        );
        HeaderValue::from_str(&cookie).map_err(|_| SessionError::InvalidCookie(self.name.clone()))
    }

    /// The named cookie's raw value from every `Cookie` header of a request.
    /// Empty values count as absent.
    pub fn read<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.name && !value.is_empty())
            .map(|(_, value)| value)
    }
}

/// Percent-encode a blob the way `encodeURIComponent` does.
pub fn encode_component(blob: &str) -> String {
    utf8_percent_encode(blob, URI_COMPONENT).to_string()
}

/// Decode a cookie value written by [`encode_component`].
pub fn decode_component(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Session store whose blob travels in the caller's cookie jar.
///
/// Nothing is kept server-side; the caller's browser binds the blob to the
/// session and expires it after `Max-Age`.
#[derive(Debug, Clone)]
pub struct CookieSessionStore {
    cookie: CookieAttributes,
}

impl CookieSessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookie: CookieAttributes::from_config(config),
        }
    }
}

impl SessionStore for CookieSessionStore {
    fn store(&self, _request: &HeaderMap, blob: String) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, self.cookie.set_cookie(&encode_component(&blob))?);
        Ok(headers)
    }

    fn retrieve(&self, request: &HeaderMap) -> Result<Option<String>, SessionError> {
        Ok(self.cookie.read(request).map(decode_component))
    }
}

//! Session tokens.
//!
//! A successful login yields a signed JWT (HS256) carrying the identity's
//! id, display name and role. The token travels in an HttpOnly cookie, or in
//! an `Authorization: Bearer` header for non-browser clients. Sessions are
//! self-contained: validating one needs no storage lookup.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use metis_rbac::{Identity, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ServerError, ServerResult};
use crate::http::HttpRequest;

/// Message for requests without a session.
pub const MISSING_SESSION: &str = "Unauthorized";
/// Message for sessions that fail validation.
pub const INVALID_SESSION: &str = "Invalid token";

/// Session token configuration.
#[derive(Clone)]
pub struct SessionConfig {
    /// Secret key for signing/verifying tokens.
    secret: String,
    /// Token lifetime, also used as the cookie `Max-Age`.
    pub ttl: Duration,
    /// Issuer claim.
    pub issuer: String,
    /// Audience claim.
    pub audience: String,
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Adds `Secure` to the session cookie.
    pub secure_cookie: bool,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::from_secs(3600),
            issuer: "metis".to_string(),
            audience: "metis".to_string(),
            cookie_name: "session_token".to_string(),
            secure_cookie: false,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity id).
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Role, lowercase.
    pub role: String,
    /// Issued at timestamp (seconds since epoch).
    pub iat: u64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: u64,
    pub iss: String,
    pub aud: String,
}

/// Issues and validates session tokens.
pub struct AuthService {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: SessionConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Signs a session token for `identity`.
    pub fn issue_token(&self, identity: &Identity) -> ServerResult<String> {
        let now = unix_now();
        let claims = Claims {
            sub: identity.id.to_string(),
            name: identity.display_name.clone(),
            role: identity.role.as_str().to_string(),
            iat: now,
            exp: now + self.config.ttl.as_secs(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        debug!(identity = %identity.id, role = %identity.role, "session issued");
        Ok(token)
    }

    /// Validates a token and returns the identity it was issued for.
    ///
    /// Bad signatures, expired tokens, foreign issuers or audiences and
    /// unknown roles are all rejected with [`INVALID_SESSION`].
    pub fn authenticate(&self, token: &str) -> ServerResult<Identity> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| {
                debug!(error = %err, "session token rejected");
                ServerError::Unauthorized(INVALID_SESSION)
            })?
            .claims;

        let role: Role = claims.role.parse().map_err(|err| {
            debug!(error = %err, "session token carries an unknown role");
            ServerError::Unauthorized(INVALID_SESSION)
        })?;

        Ok(Identity::new(claims.sub, claims.name, role))
    }

    /// Authenticates a request from its session cookie, falling back to a
    /// bearer token.
    pub fn authenticate_request(&self, request: &HttpRequest) -> ServerResult<Identity> {
        let token = request
            .cookie(&self.config.cookie_name)
            .filter(|token| !token.is_empty())
            .or_else(|| request.bearer_token())
            .ok_or(ServerError::Unauthorized(MISSING_SESSION))?;

        self.authenticate(token)
    }

    /// `Set-Cookie` value carrying a fresh session.
    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, self.config.ttl.as_secs())
    }

    /// `Set-Cookie` value that removes the session.
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: u64) -> String {
        let secure = if self.config.secure_cookie {
            "; Secure"
        } else {
            ""
        };
        format!(
            "{}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}{secure}",
            self.config.cookie_name
        )
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

//! Shared-secret authentication for the gallery.
//!
//! Every protected route compares a presented secret against the single
//! configured secret. How the secret is presented depends on the route:
//!
//! - **Query token** (image fetches): `GET /nyc/a.jpg?password=<secret>`.
//!   Failures answer `401 {"status":false,"errors":["Access denied."]}`.
//! - **Basic auth** (listings): the password half of an
//!   `Authorization: Basic` header; the username is ignored. Failures answer
//!   `401 {"status":false,"errors":["Invalid credentials"]}` with
//!   `WWW-Authenticate: Basic realm="example"`.
//!
//! Image fetches also accept HMAC-SHA256 signed URLs when the server hands out
//! signed access URLs instead of embedding the secret:
//!
//! ```text
//! signature = HMAC-SHA256(secret, "{decoded_path}?{canonical_query}")
//! /nyc/a.jpg?exp=1735689600&sig=abc123...
//! ```
//!
//! All comparisons are constant-time.
//!
//! # Example
//!
//! ```rust
//! use city_gallery::server::auth::{SharedSecret, SignedUrlAuth};
//! use std::time::Duration;
//!
//! let secret = SharedSecret::new("hunter2");
//! assert!(secret.check(Some("hunter2")));
//! assert!(!secret.check(None));
//!
//! let auth = SignedUrlAuth::new("hunter2");
//! let (signature, expiry) = auth.sign("/nyc/a.jpg", Duration::from_secs(3600));
//! assert!(auth.verify("/nyc/a.jpg", &signature, expiry, &[]).is_ok());
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// `WWW-Authenticate` challenge sent with basic-auth failures.
pub const BASIC_REALM_CHALLENGE: &str = r#"Basic realm="example""#;

/// Which credential check a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// No credential required
    Public,

    /// Secret in the `password` query parameter (or a signed URL)
    QueryToken,

    /// Secret as the password of HTTP Basic credentials
    Basic,
}

/// Authentication failure, shaped by the scheme that rejected the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Query-token check failed
    AccessDenied,

    /// Basic-auth check failed
    InvalidCredentials,
}

impl AuthError {
    /// Message placed in the `errors` array of the response body.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::AccessDenied => "Access denied.",
            AuthError::InvalidCredentials => "Invalid credentials",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.message()));

        match self {
            AuthError::AccessDenied => (StatusCode::UNAUTHORIZED, body).into_response(),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                [(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(BASIC_REALM_CHALLENGE),
                )],
                body,
            )
                .into_response(),
        }
    }
}

/// Reasons a signed URL fails verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Signature has expired
    Expired {
        /// When the signature expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Signature does not match
    InvalidSignature,

    /// Signature is not valid hex
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Signature expired at {} (current time: {})",
                expired_at, current_time
            ),
            SignatureError::InvalidSignature => write!(f, "Invalid signature"),
            SignatureError::InvalidSignatureFormat => write!(f, "Invalid signature format"),
        }
    }
}

// =============================================================================
// Shared Secret
// =============================================================================

/// The configured shared secret.
#[derive(Clone)]
pub struct SharedSecret {
    secret: Arc<str>,
}

impl SharedSecret {
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    /// Exact, case-sensitive, constant-time comparison.
    pub fn matches(&self, presented: &str) -> bool {
        presented.as_bytes().ct_eq(self.secret.as_bytes()).into()
    }

    /// Check a presented secret. A missing secret always fails.
    pub fn check(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|value| self.matches(value))
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

// =============================================================================
// Signed URL Authentication
// =============================================================================

/// Signed URL authenticator using HMAC-SHA256.
///
/// Signatures bind the request path, any extra query parameters, and an
/// expiry time.
#[derive(Clone)]
pub struct SignedUrlAuth {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,
}

impl SignedUrlAuth {
    /// Create a new authenticator with the given secret key.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Sign a path with an expiry duration.
    ///
    /// Returns the hex-encoded signature and the expiry timestamp (Unix epoch seconds).
    pub fn sign(&self, path: &str, ttl: Duration) -> (String, u64) {
        self.sign_with_params(path, ttl, &[])
    }

    /// Sign a path with extra query parameters.
    ///
    /// `params` should exclude `exp` and `sig`; those are added automatically.
    pub fn sign_with_params(
        &self,
        path: &str,
        ttl: Duration,
        params: &[(&str, &str)],
    ) -> (String, u64) {
        let expiry = unix_now() + ttl.as_secs();
        let signature = self.compute_signature(path, expiry, params);
        (signature, expiry)
    }

    /// Sign a path with a specific expiry timestamp.
    pub fn sign_with_expiry(&self, path: &str, expiry: u64) -> String {
        self.compute_signature(path, expiry, &[])
    }

    /// Verify a signature for a path and expiry.
    pub fn verify(
        &self,
        path: &str,
        signature: &str,
        expiry: u64,
        params: &[(&str, &str)],
    ) -> Result<(), SignatureError> {
        let current_time = unix_now();
        if current_time > expiry {
            return Err(SignatureError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        let provided_sig =
            hex::decode(signature).map_err(|_| SignatureError::InvalidSignatureFormat)?;

        let expected_sig = self.compute_mac(path, expiry, params);

        if provided_sig.ct_eq(&expected_sig).into() {
            Ok(())
        } else {
            Err(SignatureError::InvalidSignature)
        }
    }

    fn compute_mac(&self, path: &str, expiry: u64, params: &[(&str, &str)]) -> Vec<u8> {
        let message = signature_base(path, expiry, params);

        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn compute_signature(&self, path: &str, expiry: u64, params: &[(&str, &str)]) -> String {
        hex::encode(self.compute_mac(path, expiry, params))
    }

    /// Generate a complete signed URL.
    pub fn generate_signed_url(
        &self,
        base_url: &str,
        path: &str,
        ttl: Duration,
        extra_params: &[(&str, &str)],
    ) -> String {
        let (signature, expiry) = self.sign_with_params(path, ttl, extra_params);

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in extra_params {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("exp", &expiry.to_string());
        serializer.append_pair("sig", &signature);

        format!("{}{}?{}", base_url, path, serializer.finish())
    }
}

impl std::fmt::Debug for SignedUrlAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SignedUrlAuth(..)")
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn signature_base(path: &str, expiry: u64, params: &[(&str, &str)]) -> String {
    let mut all_params: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    all_params.push(("exp".to_string(), expiry.to_string()));

    format!("{}?{}", canonical_path(path), canonical_query(&mut all_params))
}

/// Percent-decoded form of a request path.
///
/// Signatures cover the decoded path so `/nyc/p(1).jpg` and
/// `/nyc/p%281%29.jpg` verify alike.
fn canonical_path(path: &str) -> String {
    let decoded = urlencoding::decode_binary(path.as_bytes());
    String::from_utf8_lossy(&decoded).into_owned()
}

fn canonical_query(params: &mut [(String, String)]) -> String {
    params.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

// =============================================================================
// Credential Extraction
// =============================================================================

/// Extract the password from an `Authorization: Basic` header value.
///
/// The scheme is matched case-insensitively and the credentials are split on
/// the first `:`, so passwords may themselves contain colons.
pub fn parse_basic_password(value: &str) -> Option<String> {
    let value = value.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (_user, password) = credentials.split_once(':')?;
    Some(password.to_string())
}

/// Credentials found in a query string.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct QueryCredentials {
    pub password: Option<String>,
    pub sig: Option<String>,
    pub exp: Option<String>,
    pub extra: Vec<(String, String)>,
    /// A credential parameter appeared more than once
    pub ambiguous: bool,
}

impl QueryCredentials {
    /// Split a raw query string into credential and extra parameters.
    pub fn parse(query: &str) -> Self {
        let mut creds = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "password" => &mut creds.password,
                "sig" => &mut creds.sig,
                "exp" => &mut creds.exp,
                _ => {
                    creds.extra.push((key.into_owned(), value.into_owned()));
                    continue;
                }
            };
            if slot.is_some() {
                creds.ambiguous = true;
            }
            *slot = Some(value.into_owned());
        }

        creds
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// State shared by the authentication middleware.
#[derive(Clone, Debug)]
pub struct AuthState {
    pub secret: SharedSecret,

    /// Present when signed access URLs are accepted
    pub signer: Option<SignedUrlAuth>,
}

impl AuthState {
    pub fn new(secret: SharedSecret) -> Self {
        Self {
            secret,
            signer: None,
        }
    }

    /// Also accept signed URLs produced by `signer`.
    pub fn with_signer(mut self, signer: SignedUrlAuth) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Run the query-token check against a request path and raw query string.
    pub fn check_query(&self, path: &str, query: &str) -> Result<(), AuthError> {
        let creds = QueryCredentials::parse(query);
        if creds.ambiguous {
            debug!(path = path, "Rejected query with repeated credential parameters");
            return Err(AuthError::AccessDenied);
        }

        if let Some(password) = creds.password.as_deref() {
            if self.secret.matches(password) {
                return Ok(());
            }
            warn!(path = path, "Authentication failed: wrong password parameter");
            return Err(AuthError::AccessDenied);
        }

        if let (Some(signer), Some(sig), Some(exp)) =
            (&self.signer, creds.sig.as_deref(), creds.exp.as_deref())
        {
            let expiry = exp.parse::<u64>().map_err(|_| AuthError::AccessDenied)?;
            let extra: Vec<(&str, &str)> = creds
                .extra
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect();

            return signer.verify(path, sig, expiry, &extra).map_err(|e| {
                match e {
                    SignatureError::Expired { .. } => {
                        debug!(path = path, "Authentication failed: {}", e)
                    }
                    _ => warn!(path = path, "Authentication failed: {}", e),
                }
                AuthError::AccessDenied
            });
        }

        debug!(path = path, "Authentication failed: no credential in query");
        Err(AuthError::AccessDenied)
    }

    /// Run the basic-auth check against an `Authorization` header value.
    pub fn check_basic(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let Some(password) = authorization.and_then(parse_basic_password) else {
            debug!("Authentication failed: missing or malformed basic credentials");
            return Err(AuthError::InvalidCredentials);
        };

        if self.secret.matches(&password) {
            Ok(())
        } else {
            warn!("Authentication failed: wrong basic-auth password");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Middleware requiring the shared secret in the query string.
pub async fn query_token_middleware(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let uri = request.uri();
    auth.check_query(uri.path(), uri.query().unwrap_or(""))?;
    Ok(next.run(request).await)
}

/// Middleware requiring the shared secret as the basic-auth password.
pub async fn basic_auth_middleware(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    auth.check_basic(authorization)?;
    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================

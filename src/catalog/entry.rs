//! Catalog entries and access URL construction.

use std::time::Duration;

use serde::Serialize;
use url::form_urlencoded;

use crate::server::auth::SignedUrlAuth;

/// A discovered image with the URL a client can fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    /// File name, unique within its city
    pub name: String,

    /// City directory the image lives in
    pub city: String,

    /// Absolute URL including the credential needed to fetch the image
    pub location: String,
}

/// Build the request path for an image, percent-encoding both segments.
pub fn image_path(city: &str, name: &str) -> String {
    format!(
        "/{}/{}",
        urlencoding::encode(city),
        urlencoding::encode(name)
    )
}

#[derive(Clone)]
enum UrlCredential {
    Password(String),
    Signed { auth: SignedUrlAuth, ttl: Duration },
}

/// Builds access URLs for listing responses.
#[derive(Clone)]
pub struct AccessUrlBuilder {
    base_url: String,
    credential: UrlCredential,
}

impl AccessUrlBuilder {
    /// URLs carry the shared secret as a `password` query parameter.
    pub fn with_password(hostname: &str, password: impl Into<String>) -> Self {
        Self {
            base_url: base_url(hostname),
            credential: UrlCredential::Password(password.into()),
        }
    }

    /// URLs carry a time-limited signature instead of the secret.
    pub fn with_signing(hostname: &str, auth: SignedUrlAuth, ttl: Duration) -> Self {
        Self {
            base_url: base_url(hostname),
            credential: UrlCredential::Signed { auth, ttl },
        }
    }

    /// Base URL every access URL starts with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the access URL for one image.
    pub fn build(&self, city: &str, name: &str) -> String {
        let path = image_path(city, name);

        match &self.credential {
            UrlCredential::Password(password) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("password", password)
                    .finish();
                format!("{}{}?{}", self.base_url, path, query)
            }
            UrlCredential::Signed { auth, ttl } => {
                auth.generate_signed_url(&self.base_url, &path, *ttl, &[])
            }
        }
    }

    /// Build a full entry for one image.
    pub fn entry(&self, city: &str, name: &str) -> ImageEntry {
        ImageEntry {
            name: name.to_string(),
            city: city.to_string(),
            location: self.build(city, name),
        }
    }
}

impl std::fmt::Debug for AccessUrlBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.credential {
            UrlCredential::Password(_) => "password",
            UrlCredential::Signed { .. } => "signed",
        };
        f.debug_struct("AccessUrlBuilder")
            .field("base_url", &self.base_url)
            .field("mode", &mode)
            .finish()
    }
}

/// Hostnames without a scheme are served over https.
fn base_url(hostname: &str) -> String {
    let hostname = hostname.trim().trim_end_matches('/');
    if hostname.starts_with("http://") || hostname.starts_with("https://") {
        hostname.to_string()
    } else {
        format!("https://{}", hostname)
    }
}

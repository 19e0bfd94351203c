/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Request signing.
//!
//! The signer computes an HMAC-SHA256 signature over a canonical rendering
//! of the request and attaches it as headers. The signing key is derived by
//! chaining HMACs over the date, region, and signing name, so a leaked
//! signature never exposes the secret key. Credential acquisition and
//! refresh are someone else's problem: the signer only consumes a
//! [`ProvideCredentials`] implementation.

use crate::error::BoxError;
use crate::request::Request;
use hmac::digest::FixedOutput;
use hmac::{Hmac, Mac};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, trace};

const ALGORITHM: &str = "SKIFF4-HMAC-SHA256";
const REQUEST_TAG: &str = "skiff4_request";
fn date_header() -> HeaderName {
    HeaderName::from_static("x-skiff-date")
}

fn token_header() -> HeaderName {
    HeaderName::from_static("x-skiff-security-token")
}

const DATE_TIME_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");
const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year][month][day]");

/// Access key material.
///
/// The secret is redacted from debug output.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    /// Creates credentials from key material.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// The access key id.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

/// Yields access key material on demand.
pub trait ProvideCredentials: Send + Sync + fmt::Debug {
    /// Returns credentials for signing one request.
    fn provide_credentials(&self) -> Result<Credentials, CredentialsError>;
}

impl ProvideCredentials for Credentials {
    fn provide_credentials(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.clone())
    }
}

/// No credentials could be produced.
#[derive(Debug)]
pub struct CredentialsError {
    message: String,
}

impl CredentialsError {
    /// Creates a credentials error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to provide credentials: {}", self.message)
    }
}

impl std::error::Error for CredentialsError {}

/// The signature algorithm a client resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVersion {
    /// HMAC-SHA256 derived-key signing.
    V4,
    /// No authentication is attached.
    Anonymous,
}

impl FromStr for SignatureVersion {
    type Err = UnknownSignatureVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v4" | "4" => Ok(SignatureVersion::V4),
            "none" | "anonymous" => Ok(SignatureVersion::Anonymous),
            other => Err(UnknownSignatureVersion {
                version: other.to_string(),
            }),
        }
    }
}

/// A signature version string the runtime does not implement.
#[derive(Debug)]
pub struct UnknownSignatureVersion {
    version: String,
}

impl fmt::Display for UnknownSignatureVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown signature version `{}`", self.version)
    }
}

impl std::error::Error for UnknownSignatureVersion {}

/// Computes request authentication for one client.
#[derive(Debug)]
pub struct RequestSigner {
    region: String,
    signing_name: String,
    signature_version: SignatureVersion,
    credentials: Option<Arc<dyn ProvideCredentials>>,
}

impl RequestSigner {
    /// Creates a signer.
    pub fn new(
        region: impl Into<String>,
        signing_name: impl Into<String>,
        signature_version: SignatureVersion,
        credentials: Option<Arc<dyn ProvideCredentials>>,
    ) -> Self {
        Self {
            region: region.into(),
            signing_name: signing_name.into(),
            signature_version,
            credentials,
        }
    }

    /// The region requests are signed for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The resolved signature version.
    pub fn signature_version(&self) -> SignatureVersion {
        self.signature_version
    }

    /// Signs a request in place, attaching authentication headers.
    ///
    /// Anonymous clients (no credentials, or `SignatureVersion::Anonymous`)
    /// leave the request untouched.
    pub fn sign(&self, operation_name: &str, request: &mut Request) -> Result<(), SigningError> {
        if self.signature_version == SignatureVersion::Anonymous {
            trace!(operation = operation_name, "anonymous client, skipping signing");
            return Ok(());
        }
        let Some(provider) = &self.credentials else {
            trace!(operation = operation_name, "no credentials configured, skipping signing");
            return Ok(());
        };
        let credentials = provider
            .provide_credentials()
            .map_err(|err| SigningError::new("credential provider failed").with_source(err))?;
        let now = OffsetDateTime::now_utc();
        self.sign_at(operation_name, request, &credentials, now)
    }

    fn sign_at(
        &self,
        operation_name: &str,
        request: &mut Request,
        credentials: &Credentials,
        now: OffsetDateTime,
    ) -> Result<(), SigningError> {
        let timestamp = now
            .format(DATE_TIME_FORMAT)
            .map_err(|err| SigningError::new("failed to format timestamp").with_source(err))?;
        let date = now
            .format(DATE_FORMAT)
            .map_err(|err| SigningError::new("failed to format date").with_source(err))?;

        request.set_header(
            date_header(),
            HeaderValue::from_str(&timestamp)
                .map_err(|err| SigningError::new("invalid timestamp header").with_source(err))?,
        );
        if let Some(token) = &credentials.session_token {
            request.set_header(
                token_header(),
                HeaderValue::from_str(token)
                    .map_err(|err| SigningError::new("invalid session token").with_source(err))?,
            );
        }

        let scope = format!(
            "{date}/{region}/{service}/{REQUEST_TAG}",
            region = self.region,
            service = self.signing_name,
        );
        let (canonical, signed_headers) = canonical_request(request);
        let string_to_sign = format!(
            "{ALGORITHM}\n{timestamp}\n{scope}\n{}",
            sha256_hex(canonical.as_bytes())
        );
        let signing_key = derive_signing_key(
            &credentials.secret_access_key,
            &date,
            &self.region,
            &self.signing_name,
        );
        let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id,
        );
        request.set_header(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization)
                .map_err(|err| SigningError::new("invalid authorization header").with_source(err))?,
        );
        debug!(
            operation = operation_name,
            service = %self.signing_name,
            region = %self.region,
            "request signed"
        );
        Ok(())
    }
}

/// The canonical rendering that gets signed: method, path, sorted headers,
/// and the body hash. Returns the rendering and the signed-headers list.
fn canonical_request(request: &Request) -> (String, String) {
    let mut headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_ascii_lowercase(),
                value.to_str().unwrap_or("").trim().to_string(),
            )
        })
        .collect();
    headers.sort();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let header_lines = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let canonical = format!(
        "{method}\n{path}\n{header_lines}\n{signed_headers}\n{body_hash}",
        method = request.method(),
        path = request.path(),
        body_hash = sha256_hex(request.body()),
    );
    (canonical, signed_headers)
}

fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let seed = format!("SKIFF4{secret}");
    let tag = hmac(seed.as_bytes(), date.as_bytes());
    let tag = hmac(&tag, region.as_bytes());
    let tag = hmac(&tag, service.as_bytes());
    hmac(&tag, REQUEST_TAG.as_bytes())
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize_fixed().to_vec()
}

fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hex::encode(hasher.finalize_fixed())
}

/// A request could not be signed.
#[derive(Debug)]
pub struct SigningError {
    message: String,
    source: Option<BoxError>,
}

impl SigningError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signing failed: {}", self.message)
    }
}

impl std::error::Error for SigningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

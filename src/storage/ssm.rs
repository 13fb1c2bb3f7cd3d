//! Remote parameter store speaking the SSM JSON protocol.
//!
//! Requests are signed with SigV4 and sent with a blocking `ureq` agent.
//! Throttling and unavailability are retried with exponential backoff; every
//! retry sleep goes through the caller's `CallContext` so a deadline or
//! Ctrl-C cuts it short.

use crate::context::CallContext;
use crate::models::Parameter;
use crate::storage::backend::{Page, PageRequest, ParameterStore};
use crate::storage::sigv4::{self, AMZ_DATE_FORMAT, SigningParams};
use crate::storage::{StoreError, StoreResult};
use crate::{Error, Result};
use chrono::Utc;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "ssm";
const TARGET_PREFIX: &str = "AmazonSSM";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const USER_AGENT: &str = concat!("pargolo/", env!("CARGO_PKG_VERSION"));

/// The service refuses larger pages for recursive listings.
pub const MAX_PAGE_SIZE: usize = 10;

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Static credentials used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN` from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::from_env`] with an injectable lookup.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            access_key_id: non_empty("AWS_ACCESS_KEY_ID")?,
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY")?,
            session_token: non_empty("AWS_SESSION_TOKEN"),
        })
    }
}

/// Exponential backoff for throttled or unavailable requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(MAX_BACKOFF)
    }
}

/// Connection settings for [`SsmStore`].
#[derive(Debug, Clone)]
pub struct SsmConfig {
    pub region: String,
    /// Override for the regional endpoint, e.g. a local emulator
    pub endpoint: Option<String>,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterInput<'a> {
    name: &'a str,
    with_decryption: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterOutput {
    parameter: SsmParameter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetParametersByPathInput<'a> {
    path: &'a str,
    recursive: bool,
    with_decryption: bool,
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParametersByPathOutput {
    #[serde(default)]
    parameters: Vec<SsmParameter>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutParameterInput<'a> {
    name: &'a str,
    #[serde(rename = "Type")]
    param_type: &'a str,
    value: &'a str,
    overwrite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteParameterInput<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SsmParameter {
    name: String,
    #[serde(rename = "Type")]
    param_type: String,
    value: String,
}

impl From<SsmParameter> for Parameter {
    fn from(p: SsmParameter) -> Self {
        Parameter::new(p.name, p.param_type, p.value)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// Map an error response to `action` onto the store error taxonomy.
fn classify_error(action: &str, status: u16, body: &str, subject: &str) -> StoreError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    // `__type` may be namespaced, e.g. `com.amazonaws.ssm#ParameterNotFound`.
    let code = parsed
        .error_type
        .rsplit('#')
        .next()
        .unwrap_or_default()
        .to_string();

    match code.as_str() {
        "ParameterNotFound" | "ParameterVersionNotFound" => {
            StoreError::NotFound(subject.to_string())
        }
        // A name the service refuses to parse cannot exist.
        "ValidationException" if action == "GetParameter" => {
            StoreError::NotFound(subject.to_string())
        }
        "ParameterAlreadyExists" => StoreError::AlreadyExists(subject.to_string()),
        "ThrottlingException" | "TooManyUpdates" => StoreError::Throttled(format!(
            "{}: {}",
            code, parsed.message
        )),
        _ if status == 429 => StoreError::Throttled(format!("HTTP 429: {}", parsed.message)),
        _ if status >= 500 => StoreError::Unavailable(format!("HTTP {}: {}", status, body)),
        "" => StoreError::Transport(format!("HTTP {}: {}", status, body)),
        _ => StoreError::Transport(format!("HTTP {} {}: {}", status, code, parsed.message)),
    }
}

/// Split an endpoint URL into `(url, host)`; the host includes any port.
fn parse_endpoint(endpoint: &str) -> Result<(String, String)> {
    let (scheme, rest) = endpoint
        .split_once("://")
        .ok_or_else(|| Error::Config(format!("endpoint must include a scheme: {}", endpoint)))?;
    if scheme != "http" && scheme != "https" {
        return Err(Error::Config(format!(
            "unsupported endpoint scheme '{}' in {}",
            scheme, endpoint
        )));
    }
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(Error::Config(format!("endpoint has no host: {}", endpoint)));
    }
    Ok((format!("{}://{}/", scheme, host), host.to_string()))
}

/// Listing paths are sent without a trailing slash, except for the root.
fn listing_path(prefix: &str) -> &str {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

pub struct SsmStore {
    agent: ureq::Agent,
    url: String,
    host: String,
    region: String,
    credentials: Credentials,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for SsmStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsmStore")
            .field("url", &self.url)
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl SsmStore {
    pub fn new(config: SsmConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://ssm.{}.amazonaws.com", config.region));
        let (url, host) = parse_endpoint(&endpoint)?;

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build();

        tracing::debug!(url = %url, region = %config.region, "SSM store initialized");

        Ok(Self {
            agent,
            url,
            host,
            region: config.region,
            credentials: config.credentials,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    /// Call `action` with `input`, retrying transient failures.
    fn call<I: Serialize, O: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        action: &str,
        subject: &str,
        input: &I,
    ) -> StoreResult<O> {
        let payload = serde_json::to_vec(input).map_err(|e| {
            StoreError::InvalidResponse(format!("failed to encode {} request: {}", action, e))
        })?;

        let mut attempt = 0u32;
        loop {
            ctx.check()?;
            match self.send(ctx, action, subject, &payload) {
                Ok(body) => {
                    return serde_json::from_str(&body).map_err(|e| {
                        StoreError::InvalidResponse(format!("{} response: {}", action, e))
                    });
                }
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        action,
                        subject,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying store request"
                    );
                    ctx.sleep(delay)?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn send(
        &self,
        ctx: &CallContext,
        action: &str,
        subject: &str,
        payload: &[u8],
    ) -> StoreResult<String> {
        let target = format!("{}.{}", TARGET_PREFIX, action);
        let now = Utc::now();
        let amz_date = now.format(AMZ_DATE_FORMAT).to_string();

        let mut headers: Vec<(&str, &str)> = vec![
            ("content-type", CONTENT_TYPE),
            ("host", self.host.as_str()),
            ("x-amz-date", amz_date.as_str()),
            ("x-amz-target", target.as_str()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.as_str()));
        }

        let authorization = sigv4::authorization(
            &SigningParams {
                access_key_id: &self.credentials.access_key_id,
                secret_access_key: &self.credentials.secret_access_key,
                region: &self.region,
                service: SERVICE,
                time: now,
            },
            "POST",
            "/",
            &headers,
            payload,
        );

        // ureq derives the Host header from the URL.
        let mut request = self.agent.post(&self.url);
        for (name, value) in headers.iter().filter(|(name, _)| *name != "host") {
            request = request.set(name, value);
        }
        request = request.set("Authorization", &authorization);
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining.min(self.timeout));
        }

        tracing::debug!(action, subject, "Sending store request");

        match request.send_bytes(payload) {
            Ok(resp) => resp.into_string().map_err(|e| {
                StoreError::Unavailable(format!("failed to read {} response: {}", action, e))
            }),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(classify_error(action, code, &body, subject))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(StoreError::Unavailable(transport.to_string()))
            }
        }
    }
}

impl ParameterStore for SsmStore {
    fn get(&self, ctx: &CallContext, name: &str) -> StoreResult<Parameter> {
        let output: GetParameterOutput = self.call(
            ctx,
            "GetParameter",
            name,
            &GetParameterInput {
                name,
                with_decryption: true,
            },
        )?;
        Ok(output.parameter.into())
    }

    fn put(
        &mut self,
        ctx: &CallContext,
        parameter: &Parameter,
        overwrite: bool,
    ) -> StoreResult<()> {
        let _: IgnoredAny = self.call(
            ctx,
            "PutParameter",
            &parameter.name,
            &PutParameterInput {
                name: &parameter.name,
                param_type: &parameter.param_type,
                value: &parameter.value,
                overwrite,
            },
        )?;
        Ok(())
    }

    fn delete(&mut self, ctx: &CallContext, name: &str) -> StoreResult<()> {
        let _: IgnoredAny = self.call(ctx, "DeleteParameter", name, &DeleteParameterInput { name })?;
        Ok(())
    }

    fn list_page(&self, ctx: &CallContext, request: &PageRequest<'_>) -> StoreResult<Page> {
        let path = listing_path(request.prefix);
        let output: GetParametersByPathOutput = self.call(
            ctx,
            "GetParametersByPath",
            path,
            &GetParametersByPathInput {
                path,
                recursive: true,
                with_decryption: true,
                max_results: request.page_size.clamp(1, MAX_PAGE_SIZE),
                next_token: request.next_token,
            },
        )?;
        Ok(Page {
            parameters: output.parameters.into_iter().map(Parameter::from).collect(),
            next_token: output.next_token.filter(|t| !t.is_empty()),
        })
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    fn backend_type(&self) -> &'static str {
        "ssm"
    }
}

//! reqwest client for the authority REST backend.
//!
//! Responses may arrive bare or wrapped in an envelope object (`data`,
//! `application`, `applications`, `users`). Error bodies carry `message` or
//! `error`. A 404 with no message means the route itself is missing.

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::workflows::noc::{Application, ApplicationId, BackendError, ForwardPayload, NocBackend};
use crate::workflows::registry::{EntityId, EntityKind, RegistryBackend};

const APPLICATION_ENVELOPE: [&str; 2] = ["data", "application"];
const APPLICATIONS_ENVELOPE: [&str; 2] = ["data", "applications"];
const USERS_ENVELOPE: [&str; 2] = ["data", "users"];

/// [`NocBackend`] and [`RegistryBackend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base: config.url().clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Base URL extended by `segments`, each percent-encoded as exactly one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        if let Some(id) = segments
            .iter()
            .find(|segment| matches!(segment.trim(), "" | "." | ".."))
        {
            return Err(BackendError::InvalidId { id: id.to_string() });
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::Malformed(format!("{} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue one request. `Ok(None)` is a successful response without a JSON body.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Option<Value>, BackendError> {
        let route = format!("{method} /{}", segments.join("/"));
        let url = self.endpoint(segments)?;
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%route, "calling backend");
        let response = request.send().await.map_err(|error| {
            warn!(%route, %error, "backend unreachable");
            BackendError::Transport(error.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;
        let parsed = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Value>(&text).ok()
        };

        if status.is_success() {
            return Ok(parsed);
        }

        let message = parsed.as_ref().and_then(error_message);
        warn!(%route, status = status.as_u16(), message = ?message, "backend returned an error");
        if status == reqwest::StatusCode::NOT_FOUND && message.is_none() {
            return Err(BackendError::MissingRoute { route });
        }
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn expect_body(
        &self,
        method: Method,
        segments: &[&str],
        envelope: &[&str],
    ) -> Result<Value, BackendError> {
        let body = self.send(method, segments, None).await?.ok_or_else(|| {
            BackendError::Malformed(format!("/{} returned no JSON body", segments.join("/")))
        })?;
        Ok(unwrap_envelope(body, envelope))
    }
}

/// Strip envelope objects until the payload is reached.
fn unwrap_envelope(value: Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(mut map) => match keys.iter().find(|key| map.contains_key(**key)) {
            Some(key) => {
                let inner = map.remove(*key).unwrap_or(Value::Null);
                unwrap_envelope(inner, keys)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn decode_application(value: Value) -> Result<Application, BackendError> {
    serde_json::from_value(value).map_err(|error| BackendError::Malformed(error.to_string()))
}

/// The backend's echo of a transitioned application, when it sent one.
fn echoed_application(body: Option<Value>) -> Option<Application> {
    body.map(|value| unwrap_envelope(value, &APPLICATION_ENVELOPE))
        .and_then(|value| serde_json::from_value(value).ok())
}

#[async_trait]
impl NocBackend for HttpBackend {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError> {
        let body = self
            .expect_body(Method::GET, &["applications"], &APPLICATIONS_ENVELOPE)
            .await?;
        let Value::Array(items) = body else {
            return Err(BackendError::Malformed(
                "application list is not an array".to_string(),
            ));
        };
        items.into_iter().map(decode_application).collect()
    }

    async fn application_details(&self, id: &ApplicationId) -> Result<Application, BackendError> {
        let segments = ["applications", id.0.as_str(), "details"];
        let body = self
            .expect_body(Method::GET, &segments, &APPLICATION_ENVELOPE)
            .await?;
        decode_application(body)
    }

    async fn forward(
        &self,
        id: &ApplicationId,
        payload: &ForwardPayload,
    ) -> Result<Option<Application>, BackendError> {
        let segments = ["applications", id.0.as_str(), "forward"];
        let body = serde_json::to_value(payload)
            .map_err(|error| BackendError::Malformed(error.to_string()))?;
        let response = self.send(Method::POST, &segments, Some(&body)).await?;
        Ok(echoed_application(response))
    }

    async fn reject(
        &self,
        id: &ApplicationId,
        remarks: &str,
    ) -> Result<Option<Application>, BackendError> {
        let body = json!({ "remarks": remarks });
        let response = self
            .send(Method::PUT, &["reject", id.0.as_str()], Some(&body))
            .await?;
        Ok(echoed_application(response))
    }
}

#[async_trait]
impl RegistryBackend for HttpBackend {
    async fn list_users(&self) -> Result<Vec<Value>, BackendError> {
        match self
            .expect_body(Method::GET, &["users"], &USERS_ENVELOPE)
            .await?
        {
            Value::Array(users) => Ok(users),
            _ => Err(BackendError::Malformed(
                "user directory is not an array".to_string(),
            )),
        }
    }

    async fn verify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        let segments = [kind.collection(), id.0.as_str(), "verify"];
        self.send(Method::PUT, &segments, None).await.map(|_| ())
    }

    async fn unverify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        let segments = [kind.collection(), id.0.as_str(), "unverify"];
        self.send(Method::PUT, &segments, None).await.map(|_| ())
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        self.send(Method::DELETE, &[kind.collection(), id.0.as_str()], None)
            .await
            .map(|_| ())
    }
}

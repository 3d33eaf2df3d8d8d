use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::error::{AppError, AppResult, RunError, StageFailure};
use crate::stage::catalog::{RequestEncoding, Stage};
use crate::stage::payload::{StageOutput, StageReply, StageRequest};

/// Performs one remote call and relays its outcome without interpreting it.
///
/// Implementations do not retry and do not enforce timeouts of their own.
#[async_trait]
pub trait StageInvoker: Send + Sync {
    async fn invoke(&self, stage: Stage, request: StageRequest) -> Result<StageReply, StageFailure>;

    async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>, StageFailure>;
}

/// Liveness check against the service root, used by `doctor`.
#[async_trait]
pub trait BackendProbe: Send + Sync {
    async fn probe(&self) -> Result<String, String>;
}

/// Runs one stage, racing the call against the run's cancellation token.
///
/// A call that resolves after its run was cancelled is reported as
/// [`RunError::Cancelled`] so the caller never acts on it.
pub async fn invoke_stage(
    invoker: &dyn StageInvoker,
    stage: Stage,
    request: StageRequest,
    cancel: &CancellationToken,
) -> Result<StageOutput, RunError> {
    tracing::debug!(stage = %stage, "invoking stage");
    if request.encoding() != stage.encoding() {
        return Err(RunError::Unexpected(format!(
            "{stage} expects a {:?} payload, got {:?}",
            stage.encoding(),
            request.encoding()
        )));
    }

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RunError::Cancelled),
        outcome = invoker.invoke(stage, request) => outcome,
    };

    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    match outcome {
        Ok(reply) => StageOutput::from_reply(stage, &reply),
        Err(failure) => {
            tracing::warn!(stage = %stage, status = ?failure.status, "stage failed: {}", failure.message);
            Err(RunError::Stage(failure))
        }
    }
}

#[derive(Clone)]
pub struct HttpStageInvoker {
    client: Client,
    base_url: Url,
    credential_header: HeaderName,
    credential: Option<HeaderValue>,
}

impl HttpStageInvoker {
    pub fn new(config: &ServiceConfig) -> AppResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|error| {
            AppError::Config(format!("service.base_url `{}`: {error}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "service.base_url `{}` cannot carry a path",
                config.base_url
            )));
        }

        let credential_header = HeaderName::from_bytes(config.credential_header.as_bytes())
            .map_err(|error| AppError::Config(format!("service.credential_header: {error}")))?;
        let credential = match &config.api_key {
            Some(key) => {
                let mut value = HeaderValue::from_str(key)
                    .map_err(|error| AppError::Config(format!("service.api_key: {error}")))?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30));
        if let Some(seconds) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            credential_header,
            credential,
        })
    }

    pub fn stage_url(&self, stage: Stage) -> Url {
        self.url_with_segments(&[stage.endpoint().trim_start_matches('/')])
    }

    /// `GET /files/{reference}` with the reference encoded as one segment.
    pub fn artifact_url(&self, reference: &str) -> Url {
        let files = Stage::FileRetrieval.endpoint().trim_start_matches('/');
        self.url_with_segments(&[files, reference])
    }

    fn url_with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // The base URL was checked to be hierarchical in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Some(value) => builder.header(self.credential_header.clone(), value.clone()),
            None => builder,
        }
    }

    pub fn build_request(
        &self,
        stage: Stage,
        request: StageRequest,
    ) -> Result<reqwest::Request, StageFailure> {
        if stage.encoding() == RequestEncoding::Path {
            return Err(StageFailure::transport(
                stage,
                "artifacts are fetched with fetch_artifact, not posted",
            ));
        }

        let builder = self.client.post(self.stage_url(stage));
        let builder = match request {
            StageRequest::File { file_name, bytes } => {
                let part = Part::bytes(bytes).file_name(file_name);
                builder.multipart(Form::new().part("file", part))
            }
            StageRequest::Form(fields) => {
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value));
                builder.multipart(form)
            }
            StageRequest::Json(body) => builder.json(&body),
        };

        self.authorize(builder)
            .build()
            .map_err(|error| StageFailure::transport(stage, error.to_string()))
    }
}

#[async_trait]
impl StageInvoker for HttpStageInvoker {
    async fn invoke(&self, stage: Stage, request: StageRequest) -> Result<StageReply, StageFailure> {
        let request = self.build_request(stage, request)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|error| StageFailure::transport(stage, error.to_string()))?;

        let status = response.status();
        tracing::debug!(stage = %stage, %status, "stage responded");
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("<unreadable body: {error}>"));
            return Err(StageFailure::status(stage, status.as_u16(), body));
        }

        response
            .bytes()
            .await
            .map(|body| StageReply(body.to_vec()))
            .map_err(|error| StageFailure::transport(stage, error.to_string()))
    }

    async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>, StageFailure> {
        let stage = Stage::FileRetrieval;
        let response = self
            .authorize(self.client.get(self.artifact_url(reference)))
            .send()
            .await
            .map_err(|error| StageFailure::transport(stage, error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageFailure::status(stage, status.as_u16(), body));
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|error| StageFailure::transport(stage, error.to_string()))
    }
}

#[async_trait]
impl BackendProbe for HttpStageInvoker {
    async fn probe(&self) -> Result<String, String> {
        let response = self
            .authorize(self.client.get(self.base_url.clone()))
            .send()
            .await
            .map_err(|error| error.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("service root answered {status}"));
        }

        let body: serde_json::Value = response.json().await.map_err(|error| error.to_string())?;
        Ok(body
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("ok")
            .to_owned())
    }
}

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use mig_scheduler_core::contract::{GroupInfo, GroupRef, ResizeOperation};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::adapters::compute::{ComputeError, InstanceGroupApi};

pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GceSettings {
    pub endpoint: String,
    pub metadata_host: String,
    /// Static bearer token; when unset tokens come from the metadata server.
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for GceSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPUTE_ENDPOINT.to_string(),
            metadata_host: DEFAULT_METADATA_HOST.to_string(),
            access_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Compute Engine `regionInstanceGroupManagers` REST client.
pub struct GceComputeClient {
    http: Client,
    endpoint: Url,
    credentials: Credentials,
}

enum Credentials {
    Static(String),
    Metadata {
        token_url: Url,
        cached: Mutex<Option<CachedToken>>,
    },
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceGroupManager {
    name: String,
    #[serde(default)]
    target_size: u64,
    #[serde(default)]
    status: Option<InstanceGroupManagerStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceGroupManagerStatus {
    #[serde(default)]
    is_stable: bool,
}

#[derive(Deserialize)]
struct Operation {
    name: String,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl GceComputeClient {
    pub fn new(settings: GceSettings) -> Result<Self, ComputeError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|error| ComputeError::InvalidUrl(format!("{}: {error}", settings.endpoint)))?;
        if endpoint.cannot_be_a_base() {
            return Err(ComputeError::InvalidUrl(settings.endpoint));
        }

        let credentials = match settings
            .access_token
            .filter(|token| !token.trim().is_empty())
        {
            Some(token) => Credentials::Static(token),
            None => {
                let raw = format!(
                    "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
                    settings.metadata_host
                );
                let token_url = Url::parse(&raw)
                    .map_err(|error| ComputeError::InvalidUrl(format!("{raw}: {error}")))?;
                Credentials::Metadata {
                    token_url,
                    cached: Mutex::new(None),
                }
            }
        };

        Ok(Self {
            http,
            endpoint,
            credentials,
        })
    }

    pub async fn fetch_group(&self, group: &GroupRef) -> Result<GroupInfo, ComputeError> {
        let url = self.group_url(group, None)?;
        let token = self.access_token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let manager: InstanceGroupManager = parse_json(response).await?;

        Ok(GroupInfo {
            name: manager.name,
            region: group.region.clone(),
            target_size: manager.target_size,
            is_stable: manager.status.map(|status| status.is_stable).unwrap_or(false),
        })
    }

    pub async fn submit_resize(
        &self,
        group: &GroupRef,
        size: u64,
    ) -> Result<ResizeOperation, ComputeError> {
        let mut url = self.group_url(group, Some("resize"))?;
        url.query_pairs_mut()
            .append_pair("size", &size.to_string());
        let token = self.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .body(Vec::<u8>::new())
            .send()
            .await?;
        let operation: Operation = parse_json(response).await?;

        Ok(ResizeOperation {
            name: operation.name,
        })
    }

    fn group_url(&self, group: &GroupRef, action: Option<&str>) -> Result<Url, ComputeError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ComputeError::InvalidUrl(self.endpoint.to_string()))?;
            segments.pop_if_empty().extend([
                "projects",
                group.project.as_str(),
                "regions",
                group.region.as_str(),
                "instanceGroupManagers",
                group.name.as_str(),
            ]);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    async fn access_token(&self) -> Result<String, ComputeError> {
        let (token_url, cached) = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::Metadata { token_url, cached } => (token_url, cached),
        };

        {
            let guard = cached.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(token) = guard.as_ref() {
                if Instant::now() < token.refresh_at {
                    return Ok(token.value.clone());
                }
            }
        }

        let response = self
            .http
            .get(token_url.clone())
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|error| ComputeError::Token(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ComputeError::Token(format!(
                "metadata server returned {status}"
            )));
        }
        let token: MetadataToken = response
            .json()
            .await
            .map_err(|error| ComputeError::Token(error.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        // An expiry past what `Instant` can represent is not cached.
        if let Some(refresh_at) = Instant::now().checked_add(lifetime) {
            let mut guard = cached.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = Some(CachedToken {
                value: token.access_token.clone(),
                refresh_at,
            });
        }
        Ok(token.access_token)
    }
}

impl InstanceGroupApi for GceComputeClient {
    fn get_group(&self, group: &GroupRef) -> Result<GroupInfo, ComputeError> {
        block_on_current(self.fetch_group(group))
    }

    fn resize_group(&self, group: &GroupRef, size: u64) -> Result<ResizeOperation, ComputeError> {
        block_on_current(self.submit_resize(group, size))
    }
}

fn block_on_current<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ComputeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ComputeError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

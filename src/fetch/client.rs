//! HTTP access to the listings backend

use crate::core::config::ClientConfig;
use crate::core::constants::PROJECTS_API_PATH;
use crate::core::property::{PropertyRecord, PropertyTypeFilter};
use crate::fetch::request::{FetchRequest, FetchTarget};
use crate::traits::PropertyFetcher;
use crate::{Error, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Shared async HTTP client, built once so connection pools and TLS setup
/// are reused across fetchers.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    let defaults = ClientConfig::default();
    reqwest::Client::builder()
        .user_agent(defaults.user_agent.as_str())
        .timeout(defaults.timeout())
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// One page of the `/api/v1/projects/` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectsPage {
    /// Records that fail to decode are skipped, not fatal to the page
    #[serde(deserialize_with = "lenient_records")]
    pub projects: Vec<PropertyRecord>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl ProjectsPage {
    pub fn is_last_page(&self) -> bool {
        self.page >= self.total_pages
    }
}

fn lenient_records<'de, D>(deserializer: D) -> std::result::Result<Vec<PropertyRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();
    let records: Vec<PropertyRecord> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping project #{} in response: {}", index, e);
                None
            }
        })
        .collect();
    if records.len() < total {
        log::warn!("Decoded {} of {} projects", records.len(), total);
    }
    Ok(records)
}

/// Fetches listings from the backend REST API
#[derive(Debug, Clone)]
pub struct HttpPropertyFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPropertyFetcher {
    /// Uses the shared client when `config` matches the defaults, otherwise
    /// builds a dedicated one.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let defaults = ClientConfig::default();
        let client = if config.timeout_ms == defaults.timeout_ms
            && config.user_agent == defaults.user_agent
        {
            HTTP_CLIENT.clone()
        } else {
            reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .timeout(config.timeout())
                .build()?
        };
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), PROJECTS_API_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query parameters for a fetch, in the form the backend expects
    pub fn query_params(
        target: &FetchTarget,
        filter: PropertyTypeFilter,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(7);
        match target {
            FetchTarget::Bounds { bounds, per_page } => {
                params.extend(bounds.to_query_pairs());
                params.push(("per_page", per_page.to_string()));
            }
            FetchTarget::City {
                city_key,
                page,
                per_page,
            } => {
                params.push(("city_key", city_key.clone()));
                params.push(("page", page.to_string()));
                params.push(("per_page", per_page.to_string()));
            }
        }
        if let Some(project_type) = filter.as_param() {
            params.push(("project_type", project_type.to_string()));
        }
        params
    }

    /// Fetch and decode one page
    pub async fn fetch_page(&self, request: &FetchRequest) -> Result<ProjectsPage> {
        let params = Self::query_params(&request.target, request.filter);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.bytes().await?;
        let page: ProjectsPage = serde_json::from_slice(&body)?;
        log::debug!(
            "Page {}/{} for {}: {} of {} projects",
            page.page,
            page.total_pages,
            request.target,
            page.projects.len(),
            page.total
        );
        Ok(page)
    }
}

#[async_trait]
impl PropertyFetcher for HttpPropertyFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<PropertyRecord>> {
        Ok(self.fetch_page(request).await?.projects)
    }
}

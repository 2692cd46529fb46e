//! `FixtureSource` backed by the upstream REST API

use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::fetch_utils::{RetryPolicy, fetch};
use super::http_client::create_http_client_with_timeout;
use super::source::FixtureSource;
use super::urls::{build_fixtures_url, build_live_fixtures_url};
use crate::config::Config;
use crate::data_fetcher::models::{Fixture, FixturesResponse};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct HttpFixtureSource {
    client: Client,
    api_domain: String,
    api_key: Option<String>,
    timezone: Option<String>,
    retry: RetryPolicy,
}

impl HttpFixtureSource {
    pub fn new(client: Client, api_domain: impl Into<String>) -> Self {
        Self {
            client,
            api_domain: api_domain.into(),
            api_key: None,
            timezone: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds a source with its own pooled client from the configuration
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = create_http_client_with_timeout(config.http_timeout_seconds)?;
        let mut source = Self::new(client, config.api_domain.clone());
        source.api_key = config.api_key.clone();
        source.timezone = config.timezone.clone();
        Ok(source)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_list(&self, url: &str) -> Result<Vec<Fixture>, AppError> {
        let response: FixturesResponse =
            fetch(&self.client, url, self.api_key.as_deref(), &self.retry).await?;

        if let Some(reported) = response.results
            && reported != response.fixtures.len()
        {
            debug!(
                "Upstream reported {} results but returned {} fixtures",
                reported,
                response.fixtures.len()
            );
        }
        Ok(response.fixtures)
    }
}

impl FixtureSource for HttpFixtureSource {
    #[instrument(skip(self), fields(date = %date))]
    async fn fetch_fixtures_for_date(&self, date: NaiveDate) -> Result<Vec<Fixture>, AppError> {
        let url = build_fixtures_url(&self.api_domain, date, self.timezone.as_deref());
        let fixtures = self.fetch_list(&url).await?;
        info!("Fetched {} fixtures for {}", fixtures.len(), date);
        Ok(fixtures)
    }

    #[instrument(skip(self))]
    async fn fetch_live_fixtures(&self) -> Result<Vec<Fixture>, AppError> {
        let url = build_live_fixtures_url(&self.api_domain);
        let fixtures = self.fetch_list(&url).await?;
        info!("Fetched {} live fixtures", fixtures.len());
        Ok(fixtures)
    }
}

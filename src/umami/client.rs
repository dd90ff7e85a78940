//! Authenticated REST client for the Umami API.

use super::decode::{decode_active, decode_metrics, decode_page_views, decode_stats, decode_websites};
use super::error::{UmamiError, UmamiResult};
use super::models::{MetricPoint, PageViewPoint, Stats, Website};
use crate::config::Config;
use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Every upstream call is bounded by this timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metric type that some Umami releases renamed to [`PATH_METRIC`].
pub const URL_METRIC: &str = "url";
/// Replacement metric type tried once when a `url` query fails.
pub const PATH_METRIC: &str = "path";

/// Client bound to one Umami instance and one set of credentials.
///
/// The bearer token is written once by [`UmamiClient::authenticate`] and only
/// read afterwards, so an authenticated client can be shared behind an `Arc`.
pub struct UmamiClient {
    base_url: String,
    username: String,
    password: String,
    token: String,
    http: Client,
}

impl fmt::Debug for UmamiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UmamiClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("authenticated", &!self.token.is_empty())
            .finish()
    }
}

impl UmamiClient {
    /// Creates an unauthenticated client. A trailing `/` on the URL is dropped.
    pub fn new(config: &Config) -> UmamiResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            token: String::new(),
            http,
        })
    }

    /// Creates a client and logs in. Fails without retrying if the login fails.
    pub async fn connect(config: &Config) -> UmamiResult<Self> {
        let mut client = Self::new(config)?;
        client.authenticate().await?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// Exchanges the credentials for a bearer token via `POST /api/auth/login`.
    pub async fn authenticate(&mut self) -> UmamiResult<()> {
        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
        }

        let url = format!("{}/api/auth/login", self.base_url);
        debug!(url = %url, username = %self.username, "Authenticating");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(UmamiError::AuthRequest)?;

        if response.status() != StatusCode::OK {
            return Err(UmamiError::AuthStatus(response.status().as_u16()));
        }

        let login: LoginResponse = response.json().await.map_err(UmamiError::AuthDecode)?;
        self.token = login.token;
        Ok(())
    }

    /// Issues an authenticated GET and returns the raw body.
    async fn get(&self, path: &str, params: &[(&str, String)]) -> UmamiResult<Bytes> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let response = self
            .http
            .get(&url)
            .query(params)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status.as_u16() >= 400 {
            return Err(UmamiError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }

    /// Lists the websites visible to the authenticated user.
    pub async fn get_websites(&self, include_teams: bool) -> UmamiResult<Vec<Website>> {
        let mut params = Vec::new();
        if include_teams {
            params.push(("includeTeams", "true".to_string()));
        }

        let body = self.get("/api/websites", &params).await?;
        Ok(decode_websites(&body)?)
    }

    /// Summary counters for a website between two millisecond timestamps.
    pub async fn get_stats(&self, website_id: &str, start_at: &str, end_at: &str) -> UmamiResult<Stats> {
        let params = [("startAt", start_at.to_string()), ("endAt", end_at.to_string())];

        let body = self
            .get(&format!("/api/websites/{website_id}/stats"), &params)
            .await?;
        Ok(decode_stats(&body)?)
    }

    /// Page-view time series grouped by `unit` (hour, day, month...).
    pub async fn get_page_views(
        &self,
        website_id: &str,
        start_at: &str,
        end_at: &str,
        unit: &str,
    ) -> UmamiResult<Vec<PageViewPoint>> {
        let params = [
            ("startAt", start_at.to_string()),
            ("endAt", end_at.to_string()),
            ("unit", unit.to_string()),
        ];

        let body = self
            .get(&format!("/api/websites/{website_id}/pageviews"), &params)
            .await?;
        Ok(decode_page_views(&body)?)
    }

    /// Top values for a metric type (url, referrer, browser, country...).
    pub async fn get_metrics(
        &self,
        website_id: &str,
        start_at: &str,
        end_at: &str,
        metric_type: &str,
        limit: i64,
    ) -> UmamiResult<Vec<MetricPoint>> {
        let body = self
            .fetch_metrics_with_fallback(website_id, start_at, end_at, metric_type, limit)
            .await?;
        Ok(decode_metrics(&body)?)
    }

    /// A failed `url` query is repeated once as `path`; the second outcome wins.
    async fn fetch_metrics_with_fallback(
        &self,
        website_id: &str,
        start_at: &str,
        end_at: &str,
        metric_type: &str,
        limit: i64,
    ) -> UmamiResult<Bytes> {
        match self
            .fetch_metrics(website_id, start_at, end_at, metric_type, limit)
            .await
        {
            Err(err) if metric_type == URL_METRIC => {
                warn!(error = %err, "Metric type url failed, retrying as path");
                self.fetch_metrics(website_id, start_at, end_at, PATH_METRIC, limit)
                    .await
            }
            result => result,
        }
    }

    async fn fetch_metrics(
        &self,
        website_id: &str,
        start_at: &str,
        end_at: &str,
        metric_type: &str,
        limit: i64,
    ) -> UmamiResult<Bytes> {
        let params = [
            ("startAt", start_at.to_string()),
            ("endAt", end_at.to_string()),
            ("type", metric_type.to_string()),
            ("limit", limit.to_string()),
        ];

        self.get(&format!("/api/websites/{website_id}/metrics"), &params)
            .await
    }

    /// Visitors active on the website right now.
    pub async fn get_active(&self, website_id: &str) -> UmamiResult<Vec<MetricPoint>> {
        let body = self
            .get(&format!("/api/websites/{website_id}/active"), &[])
            .await?;
        Ok(decode_active(&body)?)
    }
}

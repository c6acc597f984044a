use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::types::{DisplayValue, IndicatorBundle};

const CSRF_FIELD: &str = "csrfmiddlewaretoken";
const CSRF_HEADER: &str = "X-CSRFToken";

/// HTTP client for the analytics backend. Cookies are kept so the CSRF token
/// scraped from the dashboard page stays paired with its session cookie.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
}

#[derive(Serialize)]
struct NotifyRequest<'a> {
    chat_id: &'a str,
    pairs: &'a [String],
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: None,
        })
    }

    /// Fetches the server-rendered dashboard page once and scrapes the
    /// embedded `csrfmiddlewaretoken` form field for later dispatches.
    pub async fn fetch_csrf_token(&mut self) -> Result<()> {
        let body = self
            .client
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let token = extract_csrf_token(&body)
            .with_context(|| format!("no {} field on dashboard page", CSRF_FIELD))?;
        debug!("CSRF token acquired");
        self.csrf_token = Some(token);
        Ok(())
    }

    /// GET /prices/json/ — pair identifier to current price.
    pub async fn get_prices(&self) -> Result<HashMap<String, DisplayValue>> {
        let url = format!("{}/prices/json/", self.base_url);
        let prices = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(prices)
    }

    /// GET /indicators/json/ — pair identifier to indicator bundle.
    pub async fn get_indicators(&self) -> Result<HashMap<String, IndicatorBundle>> {
        let url = format!("{}/indicators/json/", self.base_url);
        let indicators = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(indicators)
    }

    /// POST /send_notifications/ with the batch of newly-qualifying pairs.
    /// Only success or failure is consumed from the response.
    pub async fn send_notifications(&self, chat_id: &str, pairs: &[String]) -> Result<()> {
        let url = format!("{}/send_notifications/", self.base_url);
        let mut request = self.client.post(&url).json(&NotifyRequest { chat_id, pairs });
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// Pulls the value of the hidden `csrfmiddlewaretoken` input out of the
/// server-rendered page without a full HTML parser.
fn extract_csrf_token(html: &str) -> Option<String> {
    let field_at = html.find(CSRF_FIELD)?;
    let rest = &html[field_at..];
    // The value attribute follows the name attribute in Django's rendering;
    // stop at the end of the tag so we never read a later input's value.
    let tag_end = rest.find('>').unwrap_or(rest.len());
    let tag = &rest[..tag_end];
    let value_at = tag.find("value=")? + "value=".len();
    let quoted = &tag[value_at..];
    let quote = quoted.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &quoted[1..];
    let close = inner.find(quote)?;
    Some(inner[..close].to_string())
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use strum::{Display, EnumString};
use url::{Position, Url};

/// HTTP method declared by an HTML form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum FormMethod {
    Get,
    #[default]
    Post,
}

impl FormMethod {
    /// Method from a `method` attribute; anything missing or unknown is POST.
    pub fn from_attr(raw: Option<&str>) -> Self {
        raw.and_then(|m| m.trim().parse().ok()).unwrap_or_default()
    }
}

/// A fetched response. `url` is the final URL after redirects.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub url: Url,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network seam of the scraper. Errors are transport failures only;
/// HTTP status is reported in the returned [`Page`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Page>;

    async fn submit(&self, method: FormMethod, url: &Url, fields: &[(String, String)])
        -> Result<Page>;
}

/// One cookie-carrying session against the target site.
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn open(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).context("invalid User-Agent header")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

/// `url` up to its path. Query strings of submitted GET forms carry
/// credentials, so only this form may reach logs and error messages.
pub fn without_query(url: &Url) -> &str {
    &url[..Position::AfterPath]
}

async fn read_page(response: Response) -> Result<Page> {
    let status = response.status();
    let url = response.url().clone();
    log::debug!("Response status: {} ({})", status, without_query(&url));

    let body = response
        .text()
        .await
        .map_err(reqwest::Error::without_url)
        .context("failed to read response body")?;
    log::debug!("Received content length: {}", body.len());

    Ok(Page {
        status: status.as_u16(),
        url,
        body,
    })
}

#[async_trait]
impl Transport for HttpSession {
    async fn get(&self, url: &Url) -> Result<Page> {
        let shown = without_query(url);
        log::debug!("Fetching URL: {}", shown);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET {} failed", shown))?;
        read_page(response).await
    }

    async fn submit(
        &self,
        method: FormMethod,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<Page> {
        // Field values carry credentials; only the count is logged.
        let shown = without_query(url);
        log::debug!("Submitting {} fields via {} to {}", fields.len(), method, shown);
        let request = match method {
            FormMethod::Get => self.client.get(url.clone()).query(fields),
            FormMethod::Post => self.client.post(url.clone()).form(fields),
        };
        let response = request
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("{} {} failed", method, shown))?;
        read_page(response).await
    }
}

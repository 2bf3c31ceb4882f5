use anyhow::{Context, Result};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::core::config::{Credentials, LoginPolicy};
use crate::filings::visible_text;
use crate::utils::http::{without_query, FormMethod, Transport};

static LOGIN_TRIGGER: Lazy<Selector> = Lazy::new(|| Selector::parse("a, button").unwrap());
static FORM: Lazy<Selector> = Lazy::new(|| Selector::parse("form").unwrap());
static FORM_FIELD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input, select, textarea").unwrap());

/// Logs a session into the site following a [`LoginPolicy`].
///
/// Strategies run in order and the first success wins: the configured
/// endpoints are posted to directly, then the login form linked from the
/// root page is filled in and submitted.
pub struct Authenticator {
    base: Url,
    policy: LoginPolicy,
}

impl Authenticator {
    pub fn new(base: Url, policy: LoginPolicy) -> Self {
        Authenticator { base, policy }
    }

    /// Returns `false` when every strategy fails. Errors are logged, never
    /// returned, and the session remains usable either way.
    pub async fn authenticate<T>(&self, session: &T, credentials: &Credentials) -> bool
    where
        T: Transport + ?Sized,
    {
        info!("Attempting to login to {}", self.base);

        let root = match session.get(&self.base).await {
            Ok(page) if page.is_success() => Some(page.body),
            Ok(page) => {
                warn!("Root page {} returned HTTP {}", self.base, page.status);
                None
            }
            Err(e) => {
                warn!("Failed to fetch root page {}: {:#}", self.base, e);
                None
            }
        };

        if self.try_endpoints(session, credentials).await {
            return true;
        }

        if let Some(root) = root {
            info!("Trying to find login form on main page");
            match self.try_login_form(session, credentials, &root).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => warn!("Login form submission failed: {:#}", e),
            }
        }

        warn!("Login failed - check credentials, or the site structure may have changed");
        false
    }

    async fn try_endpoints<T>(&self, session: &T, credentials: &Credentials) -> bool
    where
        T: Transport + ?Sized,
    {
        let payload = self.direct_payload(credentials);

        for endpoint in &self.policy.endpoints {
            let url = match self.base.join(&endpoint.path) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping login endpoint {:?}: {}", endpoint.path, e);
                    continue;
                }
            };

            match session.submit(FormMethod::Post, &url, &payload).await {
                Ok(page)
                    if page.is_success()
                        && (endpoint.success.body_matches(&page.body)
                            || endpoint.success.url_matches(&page.url)) =>
                {
                    info!("Login successful via {}", url);
                    return true;
                }
                Ok(page) => debug!("Login endpoint {} did not accept (HTTP {})", url, page.status),
                Err(e) => debug!("Login endpoint {} unreachable: {:#}", url, e),
            }
        }

        false
    }

    fn direct_payload(&self, credentials: &Credentials) -> Vec<(String, String)> {
        let mut payload = vec![
            (
                self.policy.identifier_field.clone(),
                credentials.identifier().to_string(),
            ),
            (
                self.policy.secret_field.clone(),
                credentials.secret().to_string(),
            ),
        ];
        payload.extend(self.policy.extra_fields.iter().cloned());
        payload
    }

    async fn try_login_form<T>(
        &self,
        session: &T,
        credentials: &Credentials,
        root_html: &str,
    ) -> Result<bool>
    where
        T: Transport + ?Sized,
    {
        let Some(href) = find_login_link(root_html, &self.policy.login_link_text) else {
            debug!("No login link on root page");
            return Ok(false);
        };
        let login_url = self
            .base
            .join(&href)
            .with_context(|| format!("invalid login link {:?}", href))?;
        info!("Found login URL: {}", without_query(&login_url));

        let login_page = session.get(&login_url).await?;
        let Some(form) = LoginForm::parse(&login_page.body, credentials, &self.policy) else {
            debug!("No form on {}", without_query(&login_url));
            return Ok(false);
        };

        let submit_url = self
            .base
            .join(&form.action)
            .with_context(|| format!("invalid form action {:?}", form.action))?;
        let requested = form.requested_url(&submit_url);

        let page = session.submit(form.method, &submit_url, &form.fields).await?;
        let succeeded =
            self.policy.form_success.body_matches(&page.body) || page.url != requested;
        if succeeded {
            info!("Login successful via form at {}", without_query(&submit_url));
        }
        Ok(succeeded)
    }
}

/// `href` of the first link or button whose text mentions `text`.
pub fn find_login_link(html: &str, text: &str) -> Option<String> {
    let needle = text.to_lowercase();
    let document = Html::parse_document(html);
    document
        .select(&LOGIN_TRIGGER)
        .filter(|el| visible_text(*el).to_lowercase().contains(&needle))
        .find_map(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

/// A login form filled in with credentials, ready to submit.
pub struct LoginForm {
    pub action: String,
    pub method: FormMethod,
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Fills the first form of `html`: password inputs get the secret,
    /// fields named like an identifier get the identifier, and every other
    /// field with a declared value keeps it.
    pub fn parse(html: &str, credentials: &Credentials, policy: &LoginPolicy) -> Option<Self> {
        let document = Html::parse_document(html);
        let form = document.select(&FORM).next()?;

        // Empty resolves to the base URL; only a missing action uses the default.
        let action = form
            .value()
            .attr("action")
            .map(str::trim)
            .unwrap_or(policy.default_action.as_str())
            .to_string();
        let method = FormMethod::from_attr(form.value().attr("method"));

        let hints: Vec<String> = policy
            .identifier_hints
            .iter()
            .map(|h| h.to_lowercase())
            .collect();

        let mut fields = Vec::new();
        for field in form.select(&FORM_FIELD) {
            let element = field.value();
            let Some(name) = element.attr("name") else {
                continue;
            };
            let lower_name = name.to_lowercase();

            let value = if element
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("password"))
            {
                credentials.secret().to_string()
            } else if hints.iter().any(|h| lower_name.contains(h.as_str())) {
                credentials.identifier().to_string()
            } else if let Some(value) = element.attr("value") {
                value.to_string()
            } else {
                continue;
            };
            fields.push((name.to_string(), value));
        }

        Some(LoginForm {
            action,
            method,
            fields,
        })
    }

    /// URL the request will actually hit; GET forms carry their fields in
    /// the query string.
    pub fn requested_url(&self, submit_url: &Url) -> Url {
        let mut url = submit_url.clone();
        if self.method == FormMethod::Get {
            url.query_pairs_mut().extend_pairs(self.fields.iter());
            if url.query() == Some("") {
                url.set_query(None);
            }
        }
        url
    }
}

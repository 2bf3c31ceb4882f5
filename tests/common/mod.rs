#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sec_amendments::utils::http::{FormMethod, Page, Transport};
use sec_amendments::utils::rate_limit::RateLimit;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

pub const BASE: &str = "https://www.stocktitan.net/";
pub const LISTING: &str = "https://www.stocktitan.net/sec-filings/live.html";

#[derive(Clone)]
struct Reply {
    status: u16,
    body: String,
    redirect: Option<String>,
}

/// One request seen by the fake, form fields included.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub fields: Vec<(String, String)>,
}

/// Scripted in-memory transport. Unscripted URLs fail like a refused
/// connection.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<(String, String), Reply>,
    requests: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(
            ("GET".to_string(), url.to_string()),
            Reply { status, body: body.to_string(), redirect: None },
        );
        self
    }

    pub fn on_post(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(
            ("POST".to_string(), url.to_string()),
            Reply { status, body: body.to_string(), redirect: None },
        );
        self
    }

    /// POST that ends on `final_url` after redirects.
    pub fn on_post_redirect(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.routes.insert(
            ("POST".to_string(), url.to_string()),
            Reply {
                status: 200,
                body: body.to_string(),
                redirect: Some(final_url.to_string()),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn respond(&self, method: &str, url: &Url, fields: &[(String, String)]) -> Result<Page> {
        self.requests.lock().unwrap().push(Request {
            method: method.to_string(),
            url: url.to_string(),
            fields: fields.to_vec(),
        });

        let reply = self
            .routes
            .get(&(method.to_string(), url.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {} {}", method, url))?;
        let final_url = match reply.redirect {
            Some(target) => Url::parse(&target)?,
            None => url.clone(),
        };
        Ok(Page {
            status: reply.status,
            url: final_url,
            body: reply.body,
        })
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &Url) -> Result<Page> {
        self.respond("GET", url, &[])
    }

    async fn submit(
        &self,
        method: FormMethod,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<Page> {
        match method {
            FormMethod::Get => {
                let mut with_query = url.clone();
                with_query.query_pairs_mut().extend_pairs(fields.iter());
                self.respond("GET", &with_query, fields)
            }
            FormMethod::Post => self.respond("POST", url, fields),
        }
    }
}

/// Counts waits instead of sleeping.
#[derive(Default)]
pub struct CountingLimiter {
    waits: AtomicUsize,
}

impl CountingLimiter {
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimit for CountingLimiter {
    async fn wait(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}

pub fn listing_page(rows: &[[&str; 6]]) -> String {
    let mut html = String::from(
        "<html><body><table><tr><th>Date</th><th>Time</th><th>Symbol</th>\
         <th>Form</th><th>Company</th><th>Title</th></tr>",
    );
    for row in rows {
        html.push_str("<tr>");
        for (idx, cell) in row.iter().enumerate() {
            if idx == 5 {
                html.push_str(&format!(
                    "<td><a href=\"/sec-filings/{}/{}.html\">{}</a></td>",
                    row[2],
                    row[3].replace('/', "-").to_lowercase(),
                    cell
                ));
            } else {
                html.push_str(&format!("<td>{}</td>", cell));
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></body></html>");
    html
}

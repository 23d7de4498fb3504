use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::{ElasticConfig, HarvestConfig};
use crate::error::SourceError;
use crate::harvest::source::{Page, PageSource};
use crate::types::SourceRecord;

/// Elasticsearch scroll cursor over `match_all`.
///
/// A scroll request both extends the lease and returns the next hits,
/// so `renew` performs the request and parks the page for `next_page`.
#[derive(Debug)]
pub struct ElasticScrollSource {
    client: Client,
    config: ElasticConfig,
    page_size: usize,
    initial_lease: Duration,
    renew_lease: Duration,
    scroll_id: Option<String>,
    opened: bool,
    pending: Option<Page>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value } => *value,
            TotalHits::Count(value) => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
}

impl ElasticScrollSource {
    pub fn new(config: ElasticConfig, harvest: &HarvestConfig) -> Result<Self, SourceError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            config,
            page_size: harvest.page_size,
            initial_lease: harvest.initial_lease,
            renew_lease: harvest.renew_lease,
            scroll_id: None,
            opened: false,
            pending: None,
            total: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.host.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn open(&mut self) -> Result<Page, SourceError> {
        let url = self.url(&format!("{}/_search", self.config.index));
        let response = self
            .client
            .post(url)
            .query(&[("scroll", lease_param(self.initial_lease))])
            .json(&json!({ "query": { "match_all": {} }, "size": self.page_size }))
            .send()?;
        let body: SearchResponse = check(response)?.json()?;
        self.opened = true;
        self.total = body.hits.total.as_ref().map(TotalHits::value);
        info!(index = %self.config.index, total = ?self.total, "opened scroll cursor");
        Ok(self.accept(body))
    }

    fn scroll(&mut self) -> Result<Page, SourceError> {
        let Some(scroll_id) = self.scroll_id.clone() else {
            return Err(SourceError::Protocol("scroll id missing from previous response".into()));
        };
        let response = self
            .client
            .post(self.url("_search/scroll"))
            .json(&json!({ "scroll": lease_param(self.renew_lease), "scroll_id": scroll_id }))
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::Expired);
        }
        let body: SearchResponse = check(response)?.json()?;
        Ok(self.accept(body))
    }

    fn accept(&mut self, body: SearchResponse) -> Page {
        if body.scroll_id.is_some() {
            self.scroll_id = body.scroll_id;
        }
        let records: Vec<SourceRecord> = body
            .hits
            .hits
            .into_iter()
            .map(|hit| hit_to_record(hit, &self.config))
            .collect();
        Page {
            has_more: !records.is_empty(),
            records,
            total_hint: self.total,
        }
    }
}

impl PageSource for ElasticScrollSource {
    fn next_page(&mut self) -> Result<Page, SourceError> {
        if let Some(page) = self.pending.take() {
            return Ok(page);
        }
        if !self.opened {
            return self.open();
        }
        self.scroll()
    }

    fn renew(&mut self) -> Result<(), SourceError> {
        if !self.opened {
            return Ok(());
        }
        let page = self.scroll()?;
        self.pending = Some(page);
        Ok(())
    }

    fn release(&mut self) -> Result<(), SourceError> {
        let Some(scroll_id) = self.scroll_id.take() else {
            return Ok(());
        };
        let response = self
            .client
            .delete(self.url("_search/scroll"))
            .json(&json!({ "scroll_id": [scroll_id] }))
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::Expired);
        }
        check(response)?;
        debug!("scroll cursor released");
        Ok(())
    }
}

fn check(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(SourceError::Protocol(format!("HTTP {status}: {}", truncate(&body, 512))))
}

fn hit_to_record(hit: Hit, config: &ElasticConfig) -> SourceRecord {
    let text_field = |name: &str| -> String {
        hit.source
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    SourceRecord {
        category: text_field(&config.category_field).trim().to_string(),
        raw_text: text_field(&config.content_field),
        id: hit.id.clone(),
    }
}

/// `Duration` -> Elasticsearch time unit string
fn lease_param(lease: Duration) -> String {
    format!("{}s", lease.as_secs().max(1))
}

fn truncate(text: &str, max: usize) -> &str {
    let mut cut = text.len().min(max);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

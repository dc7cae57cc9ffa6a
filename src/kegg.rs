use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{CompoundId, Organism, PathwayId};
use crate::error::MetseaError;

pub trait KeggClient: Send + Sync {
    /// Raw `list/pathway/<org>` table: one pathway per line with its name.
    fn fetch_pathway_list(&self, organism: &Organism) -> Result<String, MetseaError>;
    /// Raw `link/cpd/pathway` table: reference pathway to compound pairs.
    fn fetch_compound_links(&self) -> Result<String, MetseaError>;
}

#[derive(Clone)]
pub struct KeggHttpClient {
    client: Client,
}

impl KeggHttpClient {
    pub fn new() -> Result<Self, MetseaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("metsea/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MetseaError::Filesystem(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| MetseaError::KeggHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, MetseaError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(MetseaError::KeggHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, MetseaError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "KEGG request failed".to_string());
        Err(MetseaError::KeggStatus { status, message })
    }

    pub fn pathway_list_url(organism: &Organism) -> String {
        format!("https://rest.kegg.jp/list/pathway/{}", organism.as_str())
    }

    pub fn compound_links_url() -> String {
        "https://rest.kegg.jp/link/cpd/pathway".to_string()
    }
}

impl KeggClient for KeggHttpClient {
    fn fetch_pathway_list(&self, organism: &Organism) -> Result<String, MetseaError> {
        let url = Self::pathway_list_url(organism);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| MetseaError::KeggHttp(err.to_string()))
    }

    fn fetch_compound_links(&self) -> Result<String, MetseaError> {
        let url = Self::compound_links_url();
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| MetseaError::KeggHttp(err.to_string()))
    }
}

/// Parse a `list/pathway/<org>` table into (pathway, display name) rows.
///
/// Lines are tab-separated; older KEGG dumps prefix IDs with `path:`.
/// The trailing " - <organism>" that KEGG appends to every
/// organism-specific name is dropped. Malformed lines are skipped.
pub fn parse_pathway_list(text: &str) -> Vec<(PathwayId, String)> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(2, '\t');
        let Some(id_field) = fields.next() else {
            continue;
        };
        let id_field = id_field.strip_prefix("path:").unwrap_or(id_field);
        let Ok(id) = id_field.parse::<PathwayId>() else {
            continue;
        };
        let name = fields.next().unwrap_or("").trim();
        let name = match name.rsplit_once(" - ") {
            Some((head, _)) => head,
            None => name,
        };
        rows.push((id, name.to_string()));
    }
    rows
}

/// Parse a `link/cpd/pathway` table into (pathway, compound) rows.
///
/// Lines look like `path:map00010\tcpd:C00022`; both prefixes are
/// stripped and unparsable lines are skipped.
pub fn parse_compound_links(text: &str) -> Vec<(PathwayId, CompoundId)> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(2, '\t');
        let (Some(pathway_field), Some(compound_field)) = (fields.next(), fields.next()) else {
            continue;
        };
        let pathway_field = pathway_field.strip_prefix("path:").unwrap_or(pathway_field);
        let compound_field = compound_field.trim();
        let compound_field = compound_field.strip_prefix("cpd:").unwrap_or(compound_field);
        let Ok(pathway) = pathway_field.parse::<PathwayId>() else {
            continue;
        };
        let Ok(compound) = compound_field.parse::<CompoundId>() else {
            continue;
        };
        rows.push((pathway, compound));
    }
    rows
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

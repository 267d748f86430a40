//! Bearer-authenticated GET against Azure Resource Manager.
//!
//! Every list call in this crate goes through [`ManagementClient::get_list`].

use crate::config::Config;
use azure_core::auth::Secret;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;

/// ARM list envelope, `value` array with an optional `nextLink`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArmList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// HTTP client bound to one management endpoint and api-version.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl ManagementClient {
    pub fn new(base_url: &str, api_version: &str) -> ManagementClient {
        ManagementClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> ManagementClient {
        ManagementClient::new(&config.management_url, &config.api_version)
    }

    /// `{base}/{path}?api-version={version}`, path segments are used verbatim.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{base}/{path}?api-version={version}",
            base = self.base_url,
            path = path.trim_start_matches('/'),
            version = self.api_version
        )
    }

    /// GET `url` and collect every item, following `nextLink` pages.
    ///
    /// The body may be either the `{"value": [...]}` envelope or a bare JSON array.
    ///
    /// # Returns
    /// * `Ok(Vec<T>)` - All items in the order the service returned them
    /// * `Err` - On network failure, non-success status, unparsable body or a repeating `nextLink`
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &Secret,
    ) -> Result<Vec<T>, Box<dyn Error>> {
        let mut items: Vec<T> = Vec::new();
        let mut next_url = Some(url.to_string());
        let mut seen: HashSet<String> = HashSet::new();
        let mut count_pages = 0;

        while let Some(page_url) = next_url.take() {
            if !seen.insert(page_url.clone()) {
                return Err(
                    format!("nextLink not unique - possible infinite loop: {page_url}").into(),
                );
            }
            let body = self.get_text(&page_url, token).await?;
            let page: ArmList<T> = parse_page(&body).map_err(|e| {
                log::error!("BODY START:\n\n{}\n\nBODY END\n", body);
                format!("Error parsing page {count_pages} of {page_url}: {e}")
            })?;

            let count = page.value.len();
            items.extend(page.value);
            log::info!(
                "got page#{count_pages:2} record_count=+{count:3} => {total:3} from {page_url}",
                total = items.len()
            );

            match page.next_link {
                Some(link) if !link.is_empty() => next_url = Some(link),
                _ => {}
            }
            count_pages += 1;
        }

        Ok(items)
    }

    async fn get_text(&self, url: &str, token: &Secret) -> Result<String, Box<dyn Error>> {
        log::debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .send()
            .await
            .map_err(|e| format!("GET {url} failed: {e}"))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            log::warn!("GET {url} returned {status}");
            return Err(format!("GET {url} returned {status}: {body}").into());
        }
        Ok(body)
    }
}

/// Accept both the `value` envelope and a bare array.
fn parse_page<T: DeserializeOwned>(body: &str) -> Result<ArmList<T>, Box<dyn Error>> {
    let json: serde_json::Value = serde_json::from_str(body)?;
    if json.is_array() {
        let value: Vec<T> = serde_path_to_error::deserialize(json)
            .map_err(|e| format!("path={} error={}", e.path(), e))?;
        return Ok(ArmList {
            value,
            next_link: None,
        });
    }
    let page: ArmList<T> = serde_path_to_error::deserialize(json)
        .map_err(|e| format!("path={} error={}", e.path(), e))?;
    Ok(page)
}

//! Bulk API 2.0 query jobs.
//!
//! Large extractions run as an asynchronous job on the remote side:
//! submit, poll until the results are staged, then page through CSV result
//! sets via the locator header. Every page carries its own header line;
//! stripping it is the extractor's job.

use std::time::Duration;

use anyhow::{bail, Context, Result};

use attex_core::{http_client, SHARED_RUNTIME};

use crate::session::{Session, API_VERSION};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const LOCATOR_HEADER: &str = "Sforce-Locator";

/// A submitted bulk query job.
pub struct QueryJob<'a> {
    session: &'a Session,
    id: String,
}

impl<'a> QueryJob<'a> {
    /// Submit a bulk query job. A rejected query (bad SOQL) is fatal here.
    pub fn submit(session: &'a Session, soql: &str) -> Result<Self> {
        let url = format!(
            "{}/services/data/{}/jobs/query",
            session.base_url, API_VERSION
        );
        let payload = serde_json::json!({ "operation": "query", "query": soql });

        let response: serde_json::Value = SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .post(&url)
                .header("Authorization", session.auth_header())
                .header("Content-Type", "application/json")
                .body(payload.to_string())
                .send()
                .await
                .context("bulk query submit failed")?;
            let status = resp.status();
            let text = resp
                .text()
                .await
                .context("failed to read bulk query response")?;
            if !status.is_success() {
                bail!("bulk query rejected with HTTP {status}: {text}");
            }
            serde_json::from_str(&text).context("bulk query response is not valid JSON")
        })?;

        let id = response["id"]
            .as_str()
            .context("bulk query response missing job id")?
            .to_string();
        log::debug!("bulk query job {id} submitted");
        Ok(Self { session, id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Block until the job reaches JobComplete. Failed/Aborted is fatal and
    /// carries the remote error message.
    pub fn wait(&self) -> Result<()> {
        loop {
            let info = self.fetch_info()?;
            let state = info["state"].as_str().unwrap_or("Unknown");
            match state {
                "JobComplete" => return Ok(()),
                "Failed" | "Aborted" => {
                    let message = info["errorMessage"].as_str().unwrap_or("no error message");
                    bail!("bulk query job {} {state}: {message}", self.id);
                }
                _ => {
                    log::debug!("bulk query job {} state {state}, polling", self.id);
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    fn fetch_info(&self) -> Result<serde_json::Value> {
        let url = format!(
            "{}/services/data/{}/jobs/query/{}",
            self.session.base_url, API_VERSION, self.id
        );
        SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .get(&url)
                .header("Authorization", self.session.auth_header())
                .send()
                .await
                .context("bulk job status request failed")?
                .error_for_status()
                .context("bulk job status request rejected")?;
            let text = resp
                .text()
                .await
                .context("failed to read bulk job status")?;
            serde_json::from_str(&text).context("bulk job status is not valid JSON")
        })
    }

    /// Iterate result pages as raw CSV text, `page_size` rows per page.
    pub fn pages(&self, page_size: u32) -> Pages<'_> {
        Pages {
            job: self,
            page_size,
            locator: None,
            done: false,
        }
    }

    /// Fetch one result page; returns the page text and the next locator.
    fn fetch_page(&self, locator: Option<&str>, page_size: u32) -> Result<(String, Option<String>)> {
        let url = format!(
            "{}/services/data/{}/jobs/query/{}/results",
            self.session.base_url, API_VERSION, self.id
        );
        SHARED_RUNTIME.handle().block_on(async {
            let mut request = http_client()
                .get(&url)
                .header("Authorization", self.session.auth_header())
                .header("Accept", "text/csv")
                .query(&[("maxRecords", page_size.to_string())]);
            if let Some(locator) = locator {
                request = request.query(&[("locator", locator)]);
            }
            let resp = request
                .send()
                .await
                .context("bulk result page request failed")?
                .error_for_status()
                .context("bulk result page request rejected")?;
            let next = next_locator(
                resp.headers()
                    .get(LOCATOR_HEADER)
                    .and_then(|v| v.to_str().ok()),
            );
            let page = resp
                .text()
                .await
                .context("failed to read bulk result page")?;
            Ok((page, next))
        })
    }
}

/// Normalize the locator header: absent, empty, or the literal `null`
/// all mean "no more pages".
fn next_locator(header: Option<&str>) -> Option<String> {
    match header {
        None | Some("") | Some("null") => None,
        Some(locator) => Some(locator.to_string()),
    }
}

/// Iterator over a completed job's CSV result pages.
pub struct Pages<'j> {
    job: &'j QueryJob<'j>,
    page_size: u32,
    locator: Option<String>,
    done: bool,
}

impl Iterator for Pages<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.job.fetch_page(self.locator.as_deref(), self.page_size) {
            Ok((page, next)) => {
                self.done = next.is_none();
                self.locator = next;
                Some(Ok(page))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

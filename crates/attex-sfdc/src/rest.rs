//! Synchronous REST surface: SOQL queries and binary body fetches.

use anyhow::{bail, Context, Result};

use attex_core::{http_client, FetchError, SHARED_RUNTIME};

use crate::session::{Session, API_VERSION};

/// Run a synchronous SOQL query. Small result sets only; large
/// extractions go through [`crate::bulk`].
pub fn query(session: &Session, soql: &str) -> Result<serde_json::Value> {
    let url = format!("{}/services/data/{}/query", session.base_url, API_VERSION);
    SHARED_RUNTIME.handle().block_on(async {
        let resp = http_client()
            .get(&url)
            .query(&[("q", soql)])
            .header("Authorization", session.auth_header())
            .send()
            .await
            .context("query request failed")?;
        let status = resp.status();
        let body = resp.text().await.context("failed to read query response")?;
        if !status.is_success() {
            bail!("query rejected with HTTP {status}: {body}");
        }
        serde_json::from_str(&body).context("query response is not valid JSON")
    })
}

/// Resolve the three-character key prefix for an sObject by API name.
pub fn key_prefix(session: &Session, object_name: &str) -> Result<String> {
    let soql = format!(
        "SELECT KeyPrefix FROM EntityDefinition WHERE QualifiedApiName = '{object_name}'"
    );
    let result = query(session, &soql)?;
    extract_key_prefix(&result)
        .with_context(|| format!("no key prefix found for object {object_name}"))
}

fn extract_key_prefix(result: &serde_json::Value) -> Option<String> {
    result["records"]
        .get(0)?
        .get("KeyPrefix")?
        .as_str()
        .map(str::to_string)
}

/// URL of an attachment's binary body.
pub fn body_url(session: &Session, attachment_id: &str) -> String {
    format!(
        "{}/services/data/{}/sobjects/Attachment/{attachment_id}/Body",
        session.base_url, API_VERSION
    )
}

/// Authenticated GET of an attachment body.
///
/// Non-2xx becomes a [`FetchError::Http`] with the status; the caller owns
/// the URL and attaches it when reporting the failure.
pub fn fetch_body(session: &Session, url: &str) -> Result<Vec<u8>, FetchError> {
    SHARED_RUNTIME.handle().block_on(async {
        let resp = http_client()
            .get(url)
            .header("Authorization", session.auth_header())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: Some(status.as_u16()),
                message: format!("body fetch returned {status}"),
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(bytes.to_vec())
    })
}

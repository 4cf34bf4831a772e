//! Session establishment via the SOAP login endpoint.
//!
//! One login per run; the resulting session is shared read-only by every
//! worker. Token refresh is out of scope.

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;

use attex_core::{http_client, SHARED_RUNTIME};

/// REST API version used for every data path.
pub const API_VERSION: &str = "v61.0";

const SOAP_LOGIN_PATH: &str = "/services/Soap/u/61.0";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub security_token: String,
    /// Login host, e.g. `login.salesforce.com`, `test.salesforce.com`, or
    /// `acme.my.salesforce.com`.
    pub login_host: String,
}

/// An authenticated session against one instance.
#[derive(Debug, Clone)]
pub struct Session {
    /// Scheme + instance host, e.g. `https://na139.salesforce.com`.
    pub base_url: String,
    pub session_id: String,
}

impl Session {
    /// Log in with username + password‖security-token.
    ///
    /// A SOAP fault (bad credentials, locked user) is fatal and carries the
    /// remote fault message.
    pub fn login(creds: &Credentials) -> Result<Session> {
        let url = format!("https://{}{}", creds.login_host, SOAP_LOGIN_PATH);
        let envelope = login_envelope(&creds.username, &creds.password, &creds.security_token);

        let (status, body) = SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .post(&url)
                .header("Content-Type", "text/xml; charset=UTF-8")
                .header("SOAPAction", "login")
                .body(envelope)
                .send()
                .await
                .with_context(|| format!("login request to {} failed", creds.login_host))?;
            let status = resp.status();
            let body = resp.text().await.context("failed to read login response")?;
            Ok::<_, anyhow::Error>((status, body))
        })?;

        // faults come back as HTTP 500 with the message in the body
        if let Some(fault) = extract_tag(&body, "faultstring") {
            bail!("login rejected: {fault}");
        }
        if !status.is_success() {
            bail!("login failed with HTTP {status}");
        }

        let session_id = extract_tag(&body, "sessionId")
            .context("login response missing sessionId")?;
        let server_url = extract_tag(&body, "serverUrl")
            .context("login response missing serverUrl")?;
        let instance = instance_host(&server_url)?;
        log::debug!("logged in, instance {instance}");

        Ok(Session {
            base_url: format!("https://{instance}"),
            session_id,
        })
    }

    /// Value for the Authorization header on data requests.
    pub fn auth_header(&self) -> String {
        format!("OAuth {}", self.session_id)
    }
}

fn login_envelope(username: &str, password: &str, token: &str) -> String {
    use quick_xml::escape::escape;
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns:urn="urn:partner.soap.sforce.com"><soapenv:Body><urn:login>"#,
            "<urn:username>{}</urn:username><urn:password>{}{}</urn:password>",
            "</urn:login></soapenv:Body></soapenv:Envelope>"
        ),
        escape(username),
        escape(password),
        escape(token)
    )
}

/// Text content of the first element with the given local name.
fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut inside = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == tag.as_bytes() => inside = true,
            Ok(Event::Text(t)) if inside => return t.unescape().ok().map(|c| c.into_owned()),
            Ok(Event::End(_)) if inside => return None,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Host part of the SOAP serverUrl (`https://<instance>/services/...`).
fn instance_host(server_url: &str) -> Result<&str> {
    let rest = server_url
        .strip_prefix("https://")
        .or_else(|| server_url.strip_prefix("http://"))
        .with_context(|| format!("unexpected serverUrl: {server_url}"))?;
    Ok(rest.split('/').next().unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_OK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns="urn:partner.soap.sforce.com">
  <soapenv:Body>
    <loginResponse>
      <result>
        <serverUrl>https://na139.salesforce.com/services/Soap/u/61.0/00D123</serverUrl>
        <sessionId>00D123!AQcAQH0dMHZfz972Szmpkb58urFRkgeBGsxL</sessionId>
      </result>
    </loginResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

    const LOGIN_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>INVALID_LOGIN</faultcode>
      <faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn extracts_session_and_server_url() {
        assert_eq!(
            extract_tag(LOGIN_OK, "sessionId").as_deref(),
            Some("00D123!AQcAQH0dMHZfz972Szmpkb58urFRkgeBGsxL")
        );
        assert_eq!(
            extract_tag(LOGIN_OK, "serverUrl").as_deref(),
            Some("https://na139.salesforce.com/services/Soap/u/61.0/00D123")
        );
    }

    #[test]
    fn extracts_fault_message() {
        let fault = extract_tag(LOGIN_FAULT, "faultstring").unwrap();
        assert!(fault.contains("INVALID_LOGIN"));
        assert_eq!(extract_tag(LOGIN_FAULT, "sessionId"), None);
    }

    #[test]
    fn instance_host_strips_scheme_and_path() {
        assert_eq!(
            instance_host("https://na139.salesforce.com/services/Soap/u/61.0/00D123").unwrap(),
            "na139.salesforce.com"
        );
        assert!(instance_host("ftp://whatever").is_err());
    }

    #[test]
    fn envelope_escapes_credentials() {
        let env = login_envelope("a&b@example.com", "p<w>d", "tok\"en");
        assert!(env.contains("a&amp;b@example.com"));
        assert!(env.contains("p&lt;w&gt;d"));
        assert!(!env.contains("p<w>d"));
    }

    #[test]
    fn auth_header_format() {
        let session = Session {
            base_url: "https://na139.salesforce.com".to_string(),
            session_id: "sid123".to_string(),
        };
        assert_eq!(session.auth_header(), "OAuth sid123");
    }
}

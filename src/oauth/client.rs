use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use ccwait_core::usage::resolve;
use ccwait_core::{FetchError, UsageSource, UsageStatus};

use super::credentials::load_oauth_token;
use crate::config::UsageSettings;

/// Usage endpoint client authenticated with the local OAuth token.
///
/// The token is re-read on every fetch so a refreshed credentials file is
/// picked up without a restart.
pub struct OAuthUsageClient {
    agent: ureq::Agent,
    url: String,
    beta_header: String,
    credentials_path: Option<PathBuf>,
}

impl OAuthUsageClient {
    pub fn new(settings: &UsageSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
            url: settings.url.clone(),
            beta_header: settings.beta_header.clone(),
            credentials_path: settings.credentials_path(),
        }
    }

    fn token(&self) -> Option<String> {
        self.credentials_path.as_deref().and_then(load_oauth_token)
    }
}

impl UsageSource for OAuthUsageClient {
    fn fetch(&self) -> Result<UsageStatus, FetchError> {
        let token = self.token().ok_or(FetchError::NoCredentials)?;

        let mut response = self
            .agent
            .get(&self.url)
            .header("Authorization", &format!("Bearer {}", token))
            .header("anthropic-beta", &self.beta_header)
            .call()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload: Value = response
            .body_mut()
            .read_json()
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        debug!("Usage payload received");

        resolve(&payload).ok_or_else(|| FetchError::Malformed("unexpected usage shape".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned HTTP response, returning the request head
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/oauth/usage", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            head
        });
        (url, handle)
    }

    fn client(url: String, credentials: &tempfile::NamedTempFile) -> OAuthUsageClient {
        OAuthUsageClient::new(&UsageSettings {
            url,
            credentials_path: Some(credentials.path().to_path_buf()),
            ..UsageSettings::default()
        })
    }

    fn credentials() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"claudeAiOauth": {"accessToken": "tok-123"}}"#)
            .unwrap();
        file
    }

    #[test]
    fn test_fetch_sends_auth_headers() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"five_hour":{"utilization":100.0,"resets_at":"2026-01-17T15:00:00Z"},"seven_day":{"utilization":20.0,"resets_at":null}}"#,
        );
        let creds = credentials();
        let status = client(url, &creds).fetch().unwrap();
        assert!(status.is_limited());

        let head = server.join().unwrap().to_lowercase();
        assert!(head.starts_with("get /api/oauth/usage"));
        assert!(head.contains("authorization: bearer tok-123"));
        assert!(head.contains("anthropic-beta: oauth-2025-04-20"));
    }

    #[test]
    fn test_http_error_status() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"error":"expired"}"#);
        let creds = credentials();
        let err = client(url, &creds).fetch().unwrap_err();
        assert!(matches!(err, FetchError::Status(401)));
        server.join().unwrap();
    }

    #[test]
    fn test_malformed_payload() {
        let (url, server) = serve_once("200 OK", r#"{"five_hour": 7}"#);
        let creds = credentials();
        let err = client(url, &creds).fetch().unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        server.join().unwrap();
    }

    #[test]
    fn test_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let client = OAuthUsageClient::new(&UsageSettings {
            credentials_path: Some(dir.path().join("missing.json")),
            ..UsageSettings::default()
        });
        assert!(matches!(client.fetch(), Err(FetchError::NoCredentials)));
    }
}

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Shape of `~/.claude/.credentials.json` (only the fields we read)
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "claudeAiOauth")]
    oauth: Option<OAuthCredentials>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthCredentials {
    access_token: Option<String>,
}

/// Read the OAuth access token; a missing file or malformed JSON yields `None`
pub fn load_oauth_token(path: &Path) -> Option<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Cannot read credentials {:?}: {}", path, e);
            return None;
        }
    };
    let file: CredentialsFile = match serde_json::from_str(&content) {
        Ok(file) => file,
        Err(e) => {
            debug!("Malformed credentials {:?}: {}", path, e);
            return None;
        }
    };
    file.oauth
        .and_then(|oauth| oauth.access_token)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_credentials(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_access_token() {
        let file = write_credentials(
            r#"{"claudeAiOauth": {"accessToken": "sk-ant-oat01-abc", "refreshToken": "r", "expiresAt": 1}}"#,
        );
        assert_eq!(
            load_oauth_token(file.path()),
            Some("sk-ant-oat01-abc".to_string())
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_oauth_token(&dir.path().join("nope.json")), None);
    }

    #[test]
    fn test_malformed_or_incomplete() {
        assert_eq!(load_oauth_token(write_credentials("{not json").path()), None);
        assert_eq!(load_oauth_token(write_credentials("{}").path()), None);
        assert_eq!(
            load_oauth_token(write_credentials(r#"{"claudeAiOauth": {}}"#).path()),
            None
        );
        assert_eq!(
            load_oauth_token(write_credentials(r#"{"claudeAiOauth": {"accessToken": 5}}"#).path()),
            None
        );
    }
}

use tracing::debug;

use ccwait_core::{Session, SessionBackend};

use super::client::TmuxClient;

/// [`SessionBackend`] over tmux panes running the assistant.
///
/// Every failure is logged at debug level and degraded to the fail-soft
/// value.
pub struct TmuxSessions {
    client: TmuxClient,
    resume_text: String,
}

impl TmuxSessions {
    pub fn new(client: TmuxClient, resume_text: impl Into<String>) -> Self {
        Self {
            client,
            resume_text: resume_text.into(),
        }
    }

    /// The manual equivalent of [`SessionBackend::resume`]
    pub fn manual_resume_command(&self, id: &str) -> String {
        format!("tmux send-keys -t {} '{}' Enter", id, self.resume_text)
    }
}

impl SessionBackend for TmuxSessions {
    fn is_available(&self) -> bool {
        self.client.is_available()
    }

    fn list_sessions(&self) -> Vec<Session> {
        match self.client.list_panes() {
            Ok(panes) => panes
                .into_iter()
                .filter(|pane| pane.is_claude())
                .map(|pane| Session::new(pane.pane_id, pane.session_name, pane.command))
                .collect(),
            Err(e) => {
                debug!("Failed to list panes: {}", e);
                Vec::new()
            }
        }
    }

    fn capture(&self, id: &str, lines: usize) -> String {
        self.client.capture_pane(id, lines).unwrap_or_else(|e| {
            debug!("Failed to capture {}: {}", id, e);
            String::new()
        })
    }

    fn resume(&self, id: &str) -> bool {
        let sent = self
            .client
            .send_keys_literal(id, &self.resume_text)
            .and_then(|_| self.client.send_keys(id, "Enter"));
        match sent {
            Ok(()) => true,
            Err(e) => {
                debug!("Failed to resume {}: {}", id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_manual_resume_command() {
        let sessions = TmuxSessions::new(TmuxClient::new(), "continue");
        assert_eq!(
            sessions.manual_resume_command("%4"),
            "tmux send-keys -t %4 'continue' Enter"
        );
    }

    #[test]
    fn test_invalid_ids_fail_soft() {
        let sessions = TmuxSessions::new(TmuxClient::with_timeout(Duration::from_millis(50)), "go");
        assert_eq!(sessions.capture("not a pane", 10), "");
        assert!(!sessions.resume("not a pane"));
    }
}

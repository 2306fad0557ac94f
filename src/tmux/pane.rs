/// A pane as reported by `tmux list-panes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneInfo {
    /// Pane id (e.g. "%3")
    pub pane_id: String,
    /// Session name
    pub session_name: String,
    /// Current command running in the pane
    pub command: String,
}

impl PaneInfo {
    /// Format string passed to `list-panes -F`
    pub const FORMAT: &'static str = "#{pane_id}\t#{session_name}\t#{pane_current_command}";

    /// Parse a pane info line from tmux list-panes output
    /// Format: pane_id\tsession_name\tcommand
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, '\t');
        let pane_id = parts.next()?.trim();
        let session_name = parts.next()?;
        let command = parts.next()?.trim_end();
        if pane_id.is_empty() {
            return None;
        }

        Some(Self {
            pane_id: pane_id.to_string(),
            session_name: session_name.to_string(),
            command: command.to_string(),
        })
    }

    /// Whether the pane is running the assistant
    pub fn is_claude(&self) -> bool {
        self.command.to_lowercase().contains("claude")
    }
}

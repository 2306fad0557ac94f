//! Server-rendered HTML dashboard.

use chrono::{DateTime, FixedOffset, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};

use ccwait_core::format::format_duration_short;
use ccwait_core::{Session, UsageStatus, UsageWindow};

/// Seconds between automatic page reloads
const REFRESH_SECS: u32 = 30;

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; background: #0f1115; color: #e6e6e6; margin: 0; padding: 24px; }
h1 { font-size: 20px; margin: 0 0 16px; }
h2 { font-size: 15px; color: #9aa0aa; margin: 24px 0 8px; }
.cards, .tiles { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 12px; }
.card, .tile { background: #181b21; border: 1px solid #262a33; border-radius: 8px; padding: 14px; }
.card .value { font-size: 28px; font-weight: 600; }
.card .reset, .tile .meta { color: #9aa0aa; font-size: 12px; margin-top: 6px; }
.bar { height: 6px; background: #262a33; border-radius: 3px; margin-top: 10px; overflow: hidden; }
.bar .fill { height: 100%; }
.ok .value { color: #4cc38a; } .ok .fill { background: #4cc38a; }
.warning .value { color: #f5a524; } .warning .fill { background: #f5a524; }
.limited .value { color: #f31260; } .limited .fill { background: #f31260; }
.tile.limited { border-color: #f31260; }
.badge { font-size: 11px; font-weight: 600; }
.tile.limited .badge { color: #f31260; } .tile.ok .badge { color: #4cc38a; }
.error { background: #3a1218; border: 1px solid #f31260; border-radius: 8px; padding: 12px; }
.empty { color: #9aa0aa; }
footer { color: #5c626c; font-size: 12px; margin-top: 24px; }
"#;

/// Render the full dashboard page
pub fn render(
    usage: Option<&UsageStatus>,
    sessions: &[Session],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Markup {
    let limited = sessions.iter().filter(|s| s.rate_limited).count();
    let updated = now
        .with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S %:z")
        .to_string();

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta http-equiv="refresh" content=(REFRESH_SECS);
                title { "cc-wait" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "cc-wait" }

                h2 { "Usage" }
                @if let Some(status) = usage {
                    div.cards {
                        (usage_card("5-Hour Usage", &status.five_hour, now))
                        (usage_card("Weekly Usage", &status.seven_day, now))
                        @if let Some(opus) = &status.seven_day_opus {
                            (usage_card("Weekly Opus Usage", opus, now))
                        }
                    }
                } @else {
                    div.error { "Unable to fetch usage data. Check Claude Code credentials." }
                }

                h2 { "Sessions (" (sessions.len()) " total, " (limited) " rate limited)" }
                @if sessions.is_empty() {
                    p.empty { "No Claude sessions found" }
                } @else {
                    div.tiles {
                        @for session in sorted_sessions(sessions) {
                            (session_tile(session))
                        }
                    }
                }

                footer { "Updated " (updated) " · refreshes every " (REFRESH_SECS) "s" }
            }
        }
    }
}

/// CSS class for a utilization level
fn status_class(utilization: f64) -> &'static str {
    if utilization >= 100.0 {
        "limited"
    } else if utilization >= 80.0 {
        "warning"
    } else {
        "ok"
    }
}

fn usage_card(title: &str, window: &UsageWindow, now: DateTime<Utc>) -> Markup {
    let reset = match window.resets_in_seconds(now) {
        Some(secs) => format!("Resets in {}", format_duration_short(secs)),
        None => "Reset time unknown".to_string(),
    };
    let width = window.utilization.clamp(0.0, 100.0);

    html! {
        div class={ "card " (status_class(window.utilization)) } {
            div.title { (title) }
            div.value { (format!("{:.1}%", window.utilization)) }
            div.bar {
                div.fill style={ "width: " (format!("{:.1}", width)) "%" } {}
            }
            div.reset { (reset) }
        }
    }
}

/// Limited sessions first, then by session name
fn sorted_sessions(sessions: &[Session]) -> Vec<&Session> {
    let mut sorted: Vec<&Session> = sessions.iter().collect();
    sorted.sort_by(|a, b| {
        b.rate_limited
            .cmp(&a.rate_limited)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    sorted
}

fn session_tile(session: &Session) -> Markup {
    let (class, badge) = if session.rate_limited {
        ("limited", "RATE LIMITED")
    } else {
        ("ok", "OK")
    };

    html! {
        div class={ "tile " (class) } {
            div.name { (session.display_name) }
            div.meta {
                code.pane { (session.id) }
                " · " (session.last_known_command)
                @if let Some(hint) = &session.reset_hint {
                    " · resets " (hint)
                }
            }
            div.badge { (badge) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn session(id: &str, name: &str, limited: bool) -> Session {
        let mut s = Session::new(id, name, "claude");
        s.rate_limited = limited;
        s
    }

    #[test]
    fn test_status_class_thresholds() {
        assert_eq!(status_class(12.0), "ok");
        assert_eq!(status_class(80.0), "warning");
        assert_eq!(status_class(99.9), "warning");
        assert_eq!(status_class(100.0), "limited");
    }

    #[test]
    fn test_sessions_sorted_limited_first_then_name() {
        let sessions = vec![
            session("%1", "beta", false),
            session("%2", "zeta", true),
            session("%3", "alpha", false),
            session("%4", "gamma", true),
        ];
        let ids: Vec<&str> = sorted_sessions(&sessions).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["%4", "%2", "%3", "%1"]);
    }

    #[test]
    fn test_render_usage_cards() {
        let status = UsageStatus {
            five_hour: UsageWindow::new(85.0, Some(now() + chrono::Duration::minutes(90))),
            seven_day: UsageWindow::new(12.0, None),
            seven_day_opus: None,
        };
        let html = render(Some(&status), &[], now(), utc()).into_string();

        assert!(html.contains("http-equiv=\"refresh\" content=\"30\""));
        assert!(html.contains("card warning"));
        assert!(html.contains("85.0%"));
        assert!(html.contains("Resets in 1h 30m"));
        assert!(html.contains("Weekly Usage"));
        assert!(html.contains("Reset time unknown"));
        assert!(!html.contains("Weekly Opus Usage"));
        assert!(html.contains("No Claude sessions found"));
    }

    #[test]
    fn test_render_without_usage_shows_banner() {
        let html = render(None, &[session("%1", "work", false)], now(), utc()).into_string();
        assert!(html.contains("Unable to fetch usage data"));
        assert!(html.contains("Sessions (1 total, 0 rate limited)"));
    }

    #[test]
    fn test_render_escapes_session_names() {
        let html = render(None, &[session("%1", "<script>", true)], now(), utc()).into_string();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_footer_uses_local_offset() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let html = render(None, &[], now(), offset).into_string();
        assert!(html.contains("Updated 2026-01-17 21:00:00 +09:00"));
    }
}

//! Stop hook adapter: stdin JSON in, exactly one JSON line out.
//!
//! Progress goes to the diagnostic stream; stdout carries only the decision.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::debug;

use ccwait_core::{Clock, HookEngine, HookOutput, PaneDetector, RateLimitSignal};

use crate::config::Settings;

/// Read the last `lines` lines of a JSONL transcript, skipping lines that
/// are not valid JSON. A missing file yields no entries.
pub fn read_transcript_tail(path: &Path, lines: usize) -> Vec<Value> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open transcript {:?}: {}", path, e);
            return Vec::new();
        }
    };

    let mut tail = VecDeque::with_capacity(lines);
    for line in BufReader::new(file).lines().map_while(|l| l.ok()) {
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail.iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Hook input followed by the most recent `max_entries` transcript entries,
/// newest first
pub fn search_text(input: &Value, entries: &[Value], max_entries: usize) -> String {
    let mut text = input.to_string();
    for entry in entries.iter().rev().take(max_entries) {
        text.push(' ');
        text.push_str(&entry.to_string());
    }
    text
}

/// Look for a live rate-limit screen in a terminal output log
pub fn check_terminal_output(
    path: &Path,
    detector: &PaneDetector,
    clock: &dyn Clock,
) -> Option<RateLimitSignal> {
    let content = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(e) => {
            debug!("Cannot read terminal output {:?}: {}", path, e);
            return None;
        }
    };
    let hit = detector.detect(&content)?;
    debug!(matched = %hit.raw_match, "Rate limit found in terminal output");
    hit.to_signal(clock)
}

/// Run one Stop hook invocation
pub fn run<C: Clock>(
    settings: &Settings,
    clock: C,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    debug!("Hook invoked");

    let output = decide(settings, clock, stdin, stderr);
    let line = output.to_json_line()?;
    debug!("Returning: {}", line);
    writeln!(stdout, "{}", line).context("Failed to write hook output")?;
    stdout.flush().context("Failed to flush hook output")?;
    Ok(())
}

fn decide<C: Clock>(
    settings: &Settings,
    clock: C,
    stdin: &mut dyn Read,
    stderr: &mut dyn Write,
) -> HookOutput {
    let mut raw = String::new();
    if let Err(e) = stdin.read_to_string(&mut raw) {
        debug!("Failed to read stdin: {}", e);
        return HookOutput::approve();
    }
    debug!("Raw stdin length: {}", raw.len());

    let input: Value = if raw.trim().is_empty() {
        json!({})
    } else {
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("JSON decode error: {}", e);
                return HookOutput::approve();
            }
        }
    };

    let engine = HookEngine::new(clock, settings.hook_config());

    if let Some(path) = &settings.hook.output_file {
        let detector = PaneDetector::new(settings.pane_detector_config());
        if let Some(signal) = check_terminal_output(path, &detector, engine.clock()) {
            return engine.decide_signal(Some(signal), stderr);
        }
    }

    let entries = match input.get("transcript_path").and_then(Value::as_str) {
        Some(path) if !path.is_empty() => {
            let entries = read_transcript_tail(Path::new(path), settings.hook.transcript_lines);
            debug!("Read {} transcript entries", entries.len());
            entries
        }
        _ => Vec::new(),
    };

    let text = search_text(&input, &entries, settings.hook.transcript_entries);
    engine.decide(&text, stderr)
}

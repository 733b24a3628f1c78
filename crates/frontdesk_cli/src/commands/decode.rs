//! Decode command implementation.

use frontdesk_protocol::decode_frame;
use frontdesk_store::{Store, StoreStats};
use frontdesk_sync::{DispatchOutcome, UpdateDispatcher};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// What happened to one input line.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LineResult {
    /// A known envelope.
    Envelope {
        /// Wire kind.
        kind: String,
        /// Record id.
        record_id: i64,
        /// Store effect, when applied.
        #[serde(skip_serializing_if = "Option::is_none")]
        effect: Option<String>,
    },
    /// A well-formed frame of unknown kind.
    Ignored,
    /// A frame that failed to decode.
    Malformed {
        /// Decode error.
        error: String,
    },
}

/// One decoded line.
#[derive(Debug, Serialize)]
pub struct DecodedLine {
    /// 1-based line number.
    pub line: usize,
    /// Outcome.
    #[serde(flatten)]
    pub result: LineResult,
}

/// Decode report.
#[derive(Debug, Serialize)]
pub struct DecodeReport {
    /// Per-line outcomes.
    pub lines: Vec<DecodedLine>,
    /// Store counts after applying, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreStats>,
}

/// Decodes every non-blank line of `input`.
pub fn decode_lines(input: &str, apply: bool) -> DecodeReport {
    let store = apply.then(|| UpdateDispatcher::new(Store::new()));
    let mut lines = Vec::new();

    for (index, text) in input.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }

        let result = match decode_frame(text) {
            Ok(Some(envelope)) => {
                let kind = envelope.kind().as_wire().to_string();
                let record_id = envelope.record_id();
                let effect = store.as_ref().map(|d| {
                    match d.apply(envelope) {
                        DispatchOutcome::Inserted => "inserted",
                        DispatchOutcome::Replaced => "replaced",
                        DispatchOutcome::Dropped => "dropped",
                    }
                    .to_string()
                });
                LineResult::Envelope {
                    kind,
                    record_id,
                    effect,
                }
            }
            Ok(None) => LineResult::Ignored,
            Err(e) => LineResult::Malformed {
                error: e.to_string(),
            },
        };
        lines.push(DecodedLine {
            line: index + 1,
            result,
        });
    }

    DecodeReport {
        lines,
        store: store.map(|d| d.store().stats()),
    }
}

/// Runs the decode command.
pub fn run(file: Option<&Path>, apply: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let report = decode_lines(&input, apply);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &DecodeReport) {
    for decoded in &report.lines {
        match &decoded.result {
            LineResult::Envelope {
                kind,
                record_id,
                effect,
            } => match effect {
                Some(effect) => println!("{:>4}: {} #{} -> {}", decoded.line, kind, record_id, effect),
                None => println!("{:>4}: {} #{}", decoded.line, kind, record_id),
            },
            LineResult::Ignored => println!("{:>4}: ignored (unknown kind)", decoded.line),
            LineResult::Malformed { error } => println!("{:>4}: malformed: {}", decoded.line, error),
        }
    }

    if let Some(stats) = &report.store {
        println!();
        println!(
            "Requests: {} pending, {} in progress, {} completed",
            stats.requests.pending, stats.requests.in_progress, stats.requests.completed
        );
        println!(
            "Feedback: {} positive, {} negative, {} neutral",
            stats.feedback.positive, stats.feedback.negative, stats.feedback.neutral
        );
    }
}

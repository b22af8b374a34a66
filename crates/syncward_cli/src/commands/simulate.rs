//! Simulate command implementation.
//!
//! Replays a script of server responses through a fresh engine and prints
//! how the engine reacted to each one.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use syncward_engine::{
    Directive, EngineConfig, EngineState, EngineStatus, EscalationConfig, MockTransport,
    RetryConfig, SyncEngine,
};
use syncward_protocol::{ClientAction, ErrorType, ProtocolError, ProtocolParseError};
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading a response script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A line could not be parsed.
    #[error("line {line}: {source}")]
    Parse {
        /// 1-based line (or list position).
        line: usize,
        /// Underlying parse error.
        #[source]
        source: ProtocolParseError,
    },

    /// The script has no entries.
    #[error("response script is empty")]
    Empty,
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// The server answers the next cycle with this error.
    Respond(ProtocolError),
    /// The user re-enables sync.
    Reenable,
}

/// Parses one entry: `ok`, `reenable`, or `TYPE[:ACTION[:DESCRIPTION]]`.
pub fn parse_step(entry: &str) -> Result<ScriptStep, ProtocolParseError> {
    let entry = entry.trim();
    match entry.to_ascii_lowercase().as_str() {
        "ok" | "success" => return Ok(ScriptStep::Respond(ProtocolError::none())),
        "reenable" => return Ok(ScriptStep::Reenable),
        _ => {}
    }

    let mut parts = entry.splitn(3, ':');
    let error_type: ErrorType = parts.next().unwrap_or_default().trim().parse()?;
    let mut error = ProtocolError::new(error_type);
    if let Some(action) = parts.next() {
        error = error.with_action(action.trim().parse::<ClientAction>()?);
    }
    if let Some(description) = parts.next() {
        error = error.with_description(description.trim());
    }
    Ok(ScriptStep::Respond(error))
}

/// Parses a script, skipping blank lines and `#` comments.
pub fn parse_script<'a, I>(entries: I) -> Result<Vec<ScriptStep>, ScriptError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut steps = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let entry = entry.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        let step = parse_step(entry).map_err(|source| ScriptError::Parse {
            line: index + 1,
            source,
        })?;
        steps.push(step);
    }

    if steps.is_empty() {
        return Err(ScriptError::Empty);
    }
    Ok(steps)
}

/// Outcome of one scripted step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    /// 1-based step number.
    pub step: usize,
    /// What was injected.
    pub input: String,
    /// Directive returned by the engine, if a cycle ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
    /// Engine state after the step.
    pub state: EngineState,
    /// Engine status after the step.
    pub status: EngineStatus,
}

fn describe_directive(directive: &Directive) -> String {
    match directive {
        Directive::Continue => "continue".to_string(),
        Directive::Backoff { attempt, delay } => {
            format!("backoff #{attempt} ({}ms)", delay.as_millis())
        }
        Directive::Halt => "halt".to_string(),
    }
}

/// Replays `steps` through a new engine and returns one report per step.
pub fn simulate(
    steps: &[ScriptStep],
    escalation: EscalationConfig,
) -> Result<(SyncEngine, Vec<StepReport>), Box<dyn std::error::Error>> {
    let config = EngineConfig::new()
        .with_retry(RetryConfig::default().with_jitter(false))
        .with_escalation(escalation);
    let engine = SyncEngine::new(config)?;
    let transport = MockTransport::new();
    engine.start_setup()?;

    let mut reports = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let (input, directive) = match step {
            ScriptStep::Reenable => {
                engine.reenable()?;
                ("reenable".to_string(), None)
            }
            ScriptStep::Respond(error) => {
                let directive = if engine.state().is_active() {
                    transport.push_error(error.clone());
                    engine.run_cycle(&transport)?
                } else {
                    debug!(step = index + 1, "engine inactive, delivering response directly");
                    engine.on_server_response(error.clone(), std::time::SystemTime::now())
                };
                (error.to_string(), Some(describe_directive(&directive)))
            }
        };

        reports.push(StepReport {
            step: index + 1,
            input,
            directive,
            state: engine.state(),
            status: engine.status(),
        });
    }

    Ok((engine, reports))
}

/// Runs the simulate command.
pub fn run(
    script: Option<&Path>,
    responses: Option<&str>,
    threshold: u32,
    window_secs: u64,
    events: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = match (script, responses) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(list)) => list.replace(',', "\n"),
        (None, None) => return Err("either --script or --responses is required".into()),
    };
    let steps = parse_script(text.lines())?;

    let escalation = EscalationConfig::new(threshold, Duration::from_secs(window_secs));
    let (engine, reports) = simulate(&steps, escalation)?;

    match format {
        "json" => {
            let events: Vec<_> = engine.events(events).iter().map(|e| e.to_value()).collect();
            let output = serde_json::json!({
                "session_id": engine.session_id().to_string(),
                "steps": reports,
                "events": events,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_text_output(&engine, &reports, events),
    }

    Ok(())
}

fn print_text_output(engine: &SyncEngine, reports: &[StepReport], events: usize) {
    println!("Session {}", engine.session_id());
    println!("================");
    println!();

    for report in reports {
        print!("[{:03}] {:<48}", report.step, report.input);
        if let Some(ref directive) = report.directive {
            print!(" -> {:<22}", directive);
        }
        println!(
            " state={:?} enabled={} unrecoverable={} setup={}",
            report.state,
            report.status.sync_enabled,
            report.status.unrecoverable_error,
            report.status.setup_in_progress
        );
    }

    let recent = engine.events(events);
    if !recent.is_empty() {
        println!();
        println!("Recent events ({}):", recent.len());
        for event in recent {
            println!("  {:<30} {}", event.event_type(), event.details());
        }
    }
}

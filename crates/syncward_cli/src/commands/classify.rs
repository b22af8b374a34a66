//! Classify command implementation.

use serde::Serialize;
use syncward_engine::{classify, ClassifiedOutcome};
use syncward_protocol::{ClientAction, ErrorType, ProtocolError};

/// Classification of a single protocol error.
#[derive(Debug, Serialize)]
pub struct ClassificationInfo {
    /// Error type as given.
    pub error_type: ErrorType,
    /// Action as given.
    pub action: ClientAction,
    /// Classified outcome.
    pub outcome: String,
    /// Whether the outcome ends the session.
    pub terminal: bool,
    /// Whether the outcome turns sync off.
    pub disables_sync: bool,
}

/// Classifies the error given on the command line.
pub fn describe(error: &ProtocolError) -> ClassificationInfo {
    let outcome = classify(error);
    let (label, disables_sync) = match outcome {
        ClassifiedOutcome::NoError => ("no error".to_string(), false),
        ClassifiedOutcome::RetryableTransient => ("retryable transient".to_string(), false),
        ClassifiedOutcome::BirthdayMismatch => ("birthday mismatch".to_string(), true),
        ClassifiedOutcome::ActionRequired(action) => {
            (format!("action required: {action}"), action.disables_sync())
        }
    };

    ClassificationInfo {
        error_type: error.error_type,
        action: error.action,
        outcome: label,
        terminal: outcome.is_terminal(),
        disables_sync,
    }
}

/// Runs the classify command.
pub fn run(error_type: &str, action: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let error = ProtocolError::new(error_type.parse()?).with_action(action.parse()?);
    let info = describe(&error);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        _ => {
            println!("Error type:    {}", info.error_type);
            println!("Action:        {}", info.action);
            println!("Outcome:       {}", info.outcome);
            println!("Terminal:      {}", info.terminal);
            println!("Disables sync: {}", info.disables_sync);
        }
    }

    Ok(())
}

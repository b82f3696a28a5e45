use chrono::Utc;
use clap::Parser;
use interview_recorder::capture::MicrophoneCapture;
use interview_recorder::config::{self, ConfigError};
use interview_recorder::sequencer::format_timestamp;
use interview_recorder::{
    run_session, CandidateFields, DriverCommand, HttpApplicationSubmitter, HttpUploadGateway,
    InterviewClient, InterviewError, InterviewRecordingController, SessionError, SessionEvent,
    SessionStatus, SubmissionError, UploadError,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SUBMIT_ATTEMPTS: usize = 3;
const SUBMIT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Interview(#[from] InterviewError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Recording ended in {0:?}")]
    Incomplete(SessionStatus),
}

#[derive(Debug, Parser)]
#[command(name = "interview-recorder")]
#[command(about = "Record a timed interview from the microphone and submit the application")]
struct Cli {
    interview_id: String,
    name: String,
    surname: String,
    email: String,
    phone: String,

    /// Consent to the processing of the recording and personal data
    #[arg(long)]
    gdpr_consent: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interview_recorder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting interview-recorder v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let args = Cli::parse();
    let config = config::load()?;

    let interview = InterviewClient::from_config(&config)?
        .fetch(&args.interview_id)
        .await?;
    interview.ensure_open(Utc::now())?;

    let candidate = CandidateFields {
        interview_id: interview.id.clone(),
        name: args.name,
        surname: args.surname,
        email: args.email,
        phone: args.phone,
        gdpr_consent: args.gdpr_consent,
    };
    candidate.validate()?;

    let questions = interview.playback_questions();
    println!(
        "{}: {} questions, {}",
        interview.title,
        questions.len(),
        format_timestamp(interview.total_duration_secs())
    );

    let mut controller = InterviewRecordingController::new(
        Box::new(MicrophoneCapture::new(config.input_device_name.clone())),
        Box::new(HttpUploadGateway::from_config(&config)?),
        Box::new(HttpApplicationSubmitter::from_config(&config)?),
    );
    let events = controller.subscribe();

    controller.request_permission().await?;
    println!("Recording. Type 'n' + Enter for the next question, 's' + Enter to stop.");
    controller.begin_recording(questions).await?;

    let controller = Arc::new(Mutex::new(controller));
    let (command_tx, command_rx) = mpsc::channel(8);
    let printer = tokio::spawn(print_events(events));
    let reader = tokio::spawn(read_commands(command_tx));

    let status = run_session(
        controller.clone(),
        command_rx,
        Duration::from_millis(config.tick_interval_ms),
    )
    .await?;
    reader.abort();

    if status != SessionStatus::Stopped {
        printer.abort();
        return Err(CliError::Incomplete(status));
    }

    let mut guard = controller.lock().await;
    let mut attempt = 1;
    let confirmation = loop {
        match guard.submit(&candidate).await {
            Ok(confirmation) => break confirmation.clone(),
            Err(e @ (SessionError::Upload(_) | SessionError::Submission(_)))
                if attempt < SUBMIT_ATTEMPTS =>
            {
                tracing::warn!(
                    "Submit attempt {}/{} failed: {}",
                    attempt,
                    SUBMIT_ATTEMPTS,
                    e
                );
                attempt += 1;
                tokio::time::sleep(SUBMIT_RETRY_DELAY).await;
            }
            Err(e) => {
                printer.abort();
                return Err(e.into());
            }
        }
    };
    printer.abort();

    match serde_json::to_string_pretty(&confirmation) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("Submitted: {}", confirmation.video_url),
    }
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::QuestionStarted {
                index,
                text,
                remaining_seconds,
            }) => {
                println!(
                    "\nQuestion {} ({}): {}",
                    index + 1,
                    format_timestamp(remaining_seconds as u64),
                    text
                );
            }
            Ok(SessionEvent::Tick {
                remaining_seconds, ..
            }) if remaining_seconds > 0 && remaining_seconds % 10 == 0 => {
                println!("  {} left", format_timestamp(remaining_seconds as u64));
            }
            Ok(SessionEvent::StatusChanged(status)) => {
                tracing::info!("Status: {:?}", status);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Event printer lagged by {}", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn read_commands(commands: mpsc::Sender<DriverCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "n" | "next" => DriverCommand::NextQuestion,
            "s" | "stop" => DriverCommand::StopEarly,
            "" => continue,
            other => {
                println!("Unknown command '{}'", other);
                continue;
            }
        };
        if commands.send(command).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_candidate_and_consent() {
        let cli = Cli::try_parse_from([
            "interview-recorder",
            "665f",
            "Ada",
            "Lovelace",
            "ada@example.com",
            "555-0100",
            "--gdpr-consent",
        ])
        .unwrap();
        assert_eq!(cli.interview_id, "665f");
        assert_eq!(cli.email, "ada@example.com");
        assert!(cli.gdpr_consent);
    }

    #[test]
    fn test_cli_consent_defaults_off() {
        let cli = Cli::try_parse_from(["interview-recorder", "i", "a", "b", "c@d.e", "1"]).unwrap();
        assert!(!cli.gdpr_consent);
    }

    #[test]
    fn test_cli_rejects_missing_fields_and_unknown_flags() {
        assert!(Cli::try_parse_from(["interview-recorder", "i", "a"]).is_err());
        assert!(Cli::try_parse_from([
            "interview-recorder",
            "i",
            "a",
            "b",
            "c@d.e",
            "1",
            "--consent"
        ])
        .is_err());
    }
}

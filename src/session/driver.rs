//! Drives a recording controller from a wall-clock interval.
//!
//! The controller itself never reads a clock; this loop feeds it one `tick` per period and
//! forwards the candidate's "next question" and "stop" presses from a command channel.

use super::{InterviewRecordingController, SessionError, SessionStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    NextQuestion,
    StopEarly,
}

/// Runs until the controller leaves `Recording`, then returns the status it ended in.
///
/// Dropping every command sender does not stop the recording; the timer keeps it going until
/// the questions run out.
pub async fn run_session(
    controller: Arc<Mutex<InterviewRecordingController>>,
    mut commands: mpsc::Receiver<DriverCommand>,
    period: Duration,
) -> Result<SessionStatus, SessionError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    let mut commands_open = true;

    loop {
        {
            let guard = controller.lock().await;
            if !guard.status().is_recording() {
                return Ok(guard.status().clone());
            }
        }

        tokio::select! {
            _ = interval.tick() => {
                let mut guard = controller.lock().await;
                if guard.status().is_recording() {
                    guard.tick().await?;
                }
            }
            command = commands.recv(), if commands_open => {
                let Some(command) = command else {
                    tracing::debug!("Driver command channel closed");
                    commands_open = false;
                    continue;
                };

                let mut guard = controller.lock().await;
                if !guard.status().is_recording() {
                    continue;
                }
                match command {
                    DriverCommand::NextQuestion => guard.advance_manually().await?,
                    DriverCommand::StopEarly => guard.stop_early().await?,
                }
            }
        }
    }
}

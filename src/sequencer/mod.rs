//! Timed question sequencing.
//!
//! A pure state machine: it never reads a clock. The owner calls [`QuestionSequencer::tick`]
//! once per second (see `session::driver`) and every call reports the transitions it caused.

use serde::{Deserialize, Serialize};

pub mod timeline;

pub use timeline::{format_timestamp, QuestionMark};

/// A single interview question and the time the candidate gets to answer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub duration_seconds: u32,
}

impl Question {
    pub fn new(text: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            text: text.into(),
            duration_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequencerStatus {
    Idle,
    Running,
    Completed,
}

impl Default for SequencerStatus {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerState {
    pub status: SequencerStatus,
    pub current_index: usize,
    pub remaining_seconds: u32,
}

/// Transitions reported back to the caller of a sequencer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    /// The question at `index` became active with `remaining_seconds` on the clock.
    QuestionStarted { index: usize, remaining_seconds: u32 },
    /// The list was exhausted or the sequencer was stopped. Emitted once.
    Completed,
}

/// Rendering snapshot of the active question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerSnapshot {
    pub status: SequencerStatus,
    pub question: Option<String>,
    pub index: usize,
    pub total: usize,
    pub remaining_seconds: u32,
}

#[derive(Debug, Default)]
pub struct QuestionSequencer {
    questions: Vec<Question>,
    state: SequencerState,
    elapsed_secs: u64,
    timeline: Vec<QuestionMark>,
}

impl QuestionSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn status(&self) -> SequencerStatus {
        self.state.status
    }

    pub fn is_running(&self) -> bool {
        self.state.status == SequencerStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.state.status == SequencerStatus::Completed
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Ticks consumed since `start`.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn current_question(&self) -> Option<&Question> {
        if !self.is_running() {
            return None;
        }
        self.questions.get(self.state.current_index)
    }

    pub fn timeline(&self) -> &[QuestionMark] {
        &self.timeline
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            status: self.state.status,
            question: self.current_question().map(|q| q.text.clone()),
            index: self.state.current_index,
            total: self.questions.len(),
            remaining_seconds: self.state.remaining_seconds,
        }
    }

    pub fn start(&mut self, questions: Vec<Question>) -> Vec<SequencerEvent> {
        if self.state.status != SequencerStatus::Idle {
            tracing::warn!("Sequencer start ignored: status is {:?}", self.state.status);
            return Vec::new();
        }

        self.questions = questions;
        let mut events = Vec::new();

        if self.questions.is_empty() {
            tracing::info!("Sequencer started with no questions, completing");
            self.complete(&mut events);
            return events;
        }

        tracing::info!("Sequencer started: {} questions", self.questions.len());
        self.state.status = SequencerStatus::Running;
        self.enter(0, &mut events);
        if self.state.remaining_seconds == 0 {
            self.advance(&mut events);
        }
        events
    }

    pub fn tick(&mut self) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }

        self.elapsed_secs += 1;
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            self.advance(&mut events);
        }
        events
    }

    pub fn advance_manually(&mut self) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }

        tracing::info!(
            "Manual advance from question {} ({}s left)",
            self.state.current_index,
            self.state.remaining_seconds
        );
        self.advance(&mut events);
        events
    }

    /// Forces `Completed` from any state. Calling it again does nothing.
    pub fn stop(&mut self) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if self.is_completed() {
            return events;
        }

        tracing::info!("Sequencer stopped at question {}", self.state.current_index);
        self.complete(&mut events);
        events
    }

    /// Moves past the current question, skipping zero-duration entries, until a question with
    /// time on the clock is active or the list runs out.
    fn advance(&mut self, events: &mut Vec<SequencerEvent>) {
        loop {
            let next = self.state.current_index + 1;
            if next >= self.questions.len() {
                self.complete(events);
                return;
            }

            self.enter(next, events);
            if self.state.remaining_seconds > 0 {
                return;
            }
        }
    }

    fn enter(&mut self, index: usize, events: &mut Vec<SequencerEvent>) {
        self.close_open_mark();

        let question = &self.questions[index];
        self.state.current_index = index;
        self.state.remaining_seconds = question.duration_seconds;
        self.timeline.push(QuestionMark {
            index,
            text: question.text.clone(),
            started_at_secs: self.elapsed_secs,
            ended_at_secs: None,
        });

        tracing::debug!(
            "Question {} active for {}s",
            index,
            question.duration_seconds
        );
        events.push(SequencerEvent::QuestionStarted {
            index,
            remaining_seconds: question.duration_seconds,
        });
    }

    fn complete(&mut self, events: &mut Vec<SequencerEvent>) {
        self.close_open_mark();
        self.state.status = SequencerStatus::Completed;
        self.state.remaining_seconds = 0;
        tracing::info!("Sequencer completed after {}s", self.elapsed_secs);
        events.push(SequencerEvent::Completed);
    }

    fn close_open_mark(&mut self) {
        if let Some(mark) = self.timeline.last_mut() {
            if mark.ended_at_secs.is_none() {
                mark.ended_at_secs = Some(self.elapsed_secs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_questions() -> Vec<Question> {
        vec![
            Question::new("Tell us about yourself", 30),
            Question::new("Why this role?", 20),
        ]
    }

    fn started_indices(events: &[SequencerEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                SequencerEvent::QuestionStarted { index, .. } => Some(*index),
                SequencerEvent::Completed => None,
            })
            .collect()
    }

    #[test]
    fn test_two_question_scenario() {
        let mut seq = QuestionSequencer::new();
        let events = seq.start(two_questions());
        assert_eq!(
            events,
            vec![SequencerEvent::QuestionStarted {
                index: 0,
                remaining_seconds: 30
            }]
        );

        for _ in 0..29 {
            assert!(seq.tick().is_empty());
        }
        assert_eq!(seq.state().current_index, 0);
        assert_eq!(seq.state().remaining_seconds, 1);

        let events = seq.tick();
        assert_eq!(
            events,
            vec![SequencerEvent::QuestionStarted {
                index: 1,
                remaining_seconds: 20
            }]
        );
        assert_eq!(seq.state().current_index, 1);
        assert_eq!(seq.state().remaining_seconds, 20);

        for _ in 0..19 {
            assert!(seq.tick().is_empty());
        }
        assert_eq!(seq.tick(), vec![SequencerEvent::Completed]);
        assert!(seq.is_completed());
        assert_eq!(seq.elapsed_secs(), 50);
    }

    #[test]
    fn test_empty_list_completes_immediately() {
        let mut seq = QuestionSequencer::new();
        assert_eq!(seq.start(Vec::new()), vec![SequencerEvent::Completed]);
        assert!(seq.is_completed());
        assert_eq!(seq.elapsed_secs(), 0);
        assert!(seq.tick().is_empty());
    }

    #[test]
    fn test_zero_duration_questions_never_stall() {
        let mut seq = QuestionSequencer::new();
        let events = seq.start(vec![
            Question::new("intro", 0),
            Question::new("skip me", 0),
            Question::new("real", 2),
            Question::new("also skipped", 0),
        ]);
        assert_eq!(started_indices(&events), vec![0, 1, 2]);
        assert_eq!(seq.state().current_index, 2);
        assert_eq!(seq.state().remaining_seconds, 2);

        assert!(seq.tick().is_empty());
        let events = seq.tick();
        assert_eq!(started_indices(&events), vec![3]);
        assert_eq!(events.last(), Some(&SequencerEvent::Completed));
        assert!(seq.is_completed());
    }

    #[test]
    fn test_all_zero_durations_complete_on_start() {
        let mut seq = QuestionSequencer::new();
        let events = seq.start(vec![Question::new("a", 0), Question::new("b", 0)]);
        assert_eq!(started_indices(&events), vec![0, 1]);
        assert_eq!(events.last(), Some(&SequencerEvent::Completed));
        assert!(seq.is_completed());
    }

    #[test]
    fn test_visits_every_index_once_in_order() {
        let lists: Vec<Vec<u32>> = vec![
            vec![1],
            vec![3, 1, 4],
            vec![0, 5, 0, 0, 2],
            vec![2, 0],
            vec![1, 1, 1, 1, 1, 1],
        ];

        for durations in lists {
            let questions: Vec<Question> = durations
                .iter()
                .enumerate()
                .map(|(i, d)| Question::new(format!("q{}", i), *d))
                .collect();
            let total: u64 = durations.iter().map(|d| *d as u64).sum();

            let mut seq = QuestionSequencer::new();
            let mut events = seq.start(questions);
            let mut ticks = 0u64;
            while seq.is_running() {
                events.extend(seq.tick());
                ticks += 1;
                assert!(ticks <= total, "sequencer overran {:?}", durations);
            }

            let expected: Vec<usize> = (0..durations.len()).collect();
            assert_eq!(started_indices(&events), expected);
            assert_eq!(ticks, total);
            assert_eq!(
                events
                    .iter()
                    .filter(|e| **e == SequencerEvent::Completed)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_manual_advance_skips_and_completes() {
        let mut seq = QuestionSequencer::new();
        seq.start(vec![
            Question::new("first", 10),
            Question::new("empty", 0),
            Question::new("last", 10),
        ]);
        seq.tick();

        let events = seq.advance_manually();
        assert_eq!(started_indices(&events), vec![1, 2]);
        assert_eq!(seq.state().remaining_seconds, 10);

        assert_eq!(seq.advance_manually(), vec![SequencerEvent::Completed]);
        assert!(seq.is_completed());
        assert!(seq.advance_manually().is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut seq = QuestionSequencer::new();
        seq.start(two_questions());
        for _ in 0..10 {
            seq.tick();
        }
        assert_eq!(seq.stop(), vec![SequencerEvent::Completed]);
        assert!(seq.stop().is_empty());
        assert_eq!(seq.state().current_index, 0);
        assert!(seq.tick().is_empty());
        assert!(seq.current_question().is_none());
    }

    #[test]
    fn test_stop_from_idle_completes() {
        let mut seq = QuestionSequencer::new();
        assert_eq!(seq.stop(), vec![SequencerEvent::Completed]);
        assert!(seq.start(two_questions()).is_empty());
        assert!(seq.is_completed());
    }

    #[test]
    fn test_tick_while_idle_is_noop() {
        let mut seq = QuestionSequencer::new();
        assert!(seq.tick().is_empty());
        assert_eq!(seq.status(), SequencerStatus::Idle);
        assert_eq!(seq.elapsed_secs(), 0);
    }

    #[test]
    fn test_remaining_stays_within_duration() {
        let mut seq = QuestionSequencer::new();
        let questions = vec![Question::new("a", 3), Question::new("b", 2)];
        seq.start(questions.clone());
        while seq.is_running() {
            let state = seq.state();
            let duration = questions[state.current_index].duration_seconds;
            assert!(state.remaining_seconds <= duration);
            assert!(state.remaining_seconds > 0);
            seq.tick();
        }
    }

    #[test]
    fn test_timeline_records_question_spans() {
        let mut seq = QuestionSequencer::new();
        seq.start(two_questions());
        for _ in 0..30 {
            seq.tick();
        }
        for _ in 0..5 {
            seq.tick();
        }
        seq.stop();

        let timeline = seq.timeline();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].started_at_secs, 0);
        assert_eq!(timeline[0].ended_at_secs, Some(30));
        assert_eq!(timeline[1].started_at_secs, 30);
        assert_eq!(timeline[1].ended_at_secs, Some(35));
    }

    #[test]
    fn test_snapshot_reports_active_question() {
        let mut seq = QuestionSequencer::new();
        seq.start(two_questions());
        seq.tick();

        let snapshot = seq.snapshot();
        assert_eq!(snapshot.status, SequencerStatus::Running);
        assert_eq!(snapshot.question.as_deref(), Some("Tell us about yourself"));
        assert_eq!(snapshot.index, 0);
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.remaining_seconds, 29);
    }
}

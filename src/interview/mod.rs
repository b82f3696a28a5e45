//! Interview definitions as the admin backend serves them, and their conversion into the
//! ordered question list the sequencer plays.

mod client;

pub use client::InterviewClient;

use crate::sequencer::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("Interview {0} not found")]
    NotFound(String),

    #[error("Interview {0} is not published")]
    NotPublished(String),

    #[error("Interview {id} expired at {expired_at}")]
    Expired { id: String, expired_at: DateTime<Utc> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Invalid interview payload: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageQuestion {
    pub text: String,
    #[serde(default)]
    pub minutes: f64,
    #[serde(default)]
    pub seconds: u32,
    #[serde(default)]
    pub order: Option<i64>,
}

impl PackageQuestion {
    pub fn duration_seconds(&self) -> u32 {
        let from_minutes = if self.minutes.is_finite() && self.minutes > 0.0 {
            (self.minutes * 60.0).round() as u32
        } else {
            0
        };
        from_minutes.saturating_add(self.seconds)
    }

    fn to_question(&self) -> Question {
        Question::new(self.text.trim(), self.duration_seconds())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPackage {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<PackageQuestion>,
}

/// `questionPacks` is either populated with full packages or left as bare ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageRef {
    Populated(QuestionPackage),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub link: Option<String>,
    pub expire_date: DateTime<Utc>,
    #[serde(default)]
    pub question_packs: Vec<PackageRef>,
    #[serde(default)]
    pub questions: Vec<PackageQuestion>,
}

impl Interview {
    /// Questions in playback order: each package in turn (sorted by `order`), then the
    /// interview's own questions.
    pub fn playback_questions(&self) -> Vec<Question> {
        let mut out = Vec::new();

        for pack in &self.question_packs {
            match pack {
                PackageRef::Populated(package) => {
                    out.extend(ordered(&package.questions).map(PackageQuestion::to_question));
                }
                PackageRef::Id(id) => {
                    tracing::warn!(
                        "Interview {}: question package {} was not populated, skipping",
                        self.id,
                        id
                    );
                }
            }
        }

        out.extend(ordered(&self.questions).map(PackageQuestion::to_question));
        out
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.playback_questions()
            .iter()
            .map(|q| q.duration_seconds as u64)
            .sum()
    }

    /// Candidates may only record against a published interview that has not expired.
    pub fn ensure_open(&self, now: DateTime<Utc>) -> Result<(), InterviewError> {
        if !self.is_published {
            return Err(InterviewError::NotPublished(self.id.clone()));
        }
        if now >= self.expire_date {
            return Err(InterviewError::Expired {
                id: self.id.clone(),
                expired_at: self.expire_date,
            });
        }
        Ok(())
    }
}

fn ordered(questions: &[PackageQuestion]) -> impl Iterator<Item = &PackageQuestion> {
    let mut sorted: Vec<&PackageQuestion> = questions.iter().collect();
    sorted.sort_by_key(|q| q.order.unwrap_or(i64::MAX));
    sorted.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INTERVIEW_JSON: &str = r#"{
        "_id": "665f1c2e9b1e8a0012345678",
        "title": "Backend Engineer",
        "isPublished": true,
        "link": "backend-engineer",
        "expireDate": "2030-01-01T00:00:00.000Z",
        "questionPacks": [
            {
                "_id": "p1",
                "title": "Intro",
                "questions": [
                    {"text": "Why this role?", "minutes": 1, "order": 2},
                    {"text": "Tell us about yourself", "minutes": 2, "order": 1}
                ]
            },
            "p-unpopulated",
            {
                "title": "Technical",
                "questions": [
                    {"text": "Describe a hard bug", "minutes": 0, "seconds": 45, "order": 1}
                ]
            }
        ],
        "questions": [
            {"text": "Anything else?", "minutes": 0.5}
        ],
        "applications": []
    }"#;

    fn interview() -> Interview {
        serde_json::from_str(INTERVIEW_JSON).unwrap()
    }

    #[test]
    fn test_playback_order_and_durations() {
        let questions = interview().playback_questions();
        assert_eq!(
            questions,
            vec![
                Question::new("Tell us about yourself", 120),
                Question::new("Why this role?", 60),
                Question::new("Describe a hard bug", 45),
                Question::new("Anything else?", 30),
            ]
        );
        assert_eq!(interview().total_duration_secs(), 255);
    }

    #[test]
    fn test_stable_order_for_equal_keys() {
        let questions = vec![
            PackageQuestion {
                text: "a".into(),
                minutes: 1.0,
                seconds: 0,
                order: None,
            },
            PackageQuestion {
                text: "b".into(),
                minutes: 1.0,
                seconds: 0,
                order: None,
            },
        ];
        let texts: Vec<_> = ordered(&questions).map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_negative_or_bad_minutes_are_zero() {
        let q = PackageQuestion {
            text: "x".into(),
            minutes: -3.0,
            seconds: 5,
            order: None,
        };
        assert_eq!(q.duration_seconds(), 5);
    }

    #[test]
    fn test_ensure_open() {
        let mut interview = interview();
        let before = Utc.with_ymd_and_hms(2029, 12, 31, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert!(interview.ensure_open(before).is_ok());
        assert!(matches!(
            interview.ensure_open(after),
            Err(InterviewError::Expired { .. })
        ));

        interview.is_published = false;
        assert!(matches!(
            interview.ensure_open(before),
            Err(InterviewError::NotPublished(_))
        ));
    }
}

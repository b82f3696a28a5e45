use serde::Serialize;

/// Where a question sits inside the finished recording, in seconds from the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMark {
    pub index: usize,
    pub text: String,
    pub started_at_secs: u64,
    /// `None` while the question is still on screen.
    pub ended_at_secs: Option<u64>,
}

impl QuestionMark {
    pub fn span_secs(&self) -> Option<u64> {
        self.ended_at_secs
            .map(|end| end.saturating_sub(self.started_at_secs))
    }

    /// `MM:SS - MM:SS - text`, the layout reviewers read next to the video.
    pub fn label(&self) -> String {
        let end = self
            .ended_at_secs
            .map(format_timestamp)
            .unwrap_or_else(|| "--:--".to_string());
        format!(
            "{} - {} - {}",
            format_timestamp(self.started_at_secs),
            end,
            self.text
        )
    }
}

pub fn format_timestamp(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

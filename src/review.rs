use serde::{Deserialize, Serialize};

use crate::{questions::Question, store::PersistentStore};

/// One answered question as shown in the review view. `selected_answer` is
/// `None` when the countdown ran out before a choice was made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredRecord {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub selected_answer: Option<String>,
}

impl AnsweredRecord {
    pub fn from_question(question: &Question, selected: Option<&str>) -> Self {
        Self {
            question: question.prompt.clone(),
            options: question.options.clone(),
            correct_answer: question.correct_option.clone(),
            selected_answer: selected.map(str::to_string),
        }
    }

    pub fn is_correct(&self) -> bool {
        self.selected_answer.as_deref() == Some(self.correct_answer.as_str())
    }
}

/// Accumulates the answers of the current stage attempt and writes the whole
/// list back after every answer, so a partial attempt survives a restart.
#[derive(Debug, Clone)]
pub struct ReviewRecorder {
    store: PersistentStore,
    topic: String,
    records: Vec<AnsweredRecord>,
}

impl ReviewRecorder {
    /// Start a fresh attempt for `topic`; the first append overwrites whatever
    /// list an earlier attempt left behind.
    pub fn begin_attempt(store: PersistentStore, topic: &str) -> Self {
        Self {
            store,
            topic: topic.to_string(),
            records: Vec::new(),
        }
    }

    pub fn append_answer(&mut self, record: AnsweredRecord) {
        self.records.push(record);
        self.persist();
    }

    pub fn persist(&self) {
        self.store.save_answers(&self.topic, &self.records);
    }

    pub fn records(&self) -> &[AnsweredRecord] {
        &self.records
    }

    pub fn load_answers(store: &PersistentStore, topic: &str) -> Vec<AnsweredRecord> {
        store.load_answers(topic)
    }
}

/// Aggregate counts for the review header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub total: usize,
    pub correct: usize,
    pub unanswered: usize,
}

impl ReviewSummary {
    pub fn from_records(records: &[AnsweredRecord]) -> Self {
        Self {
            total: records.len(),
            correct: records.iter().filter(|record| record.is_correct()).count(),
            unanswered: records
                .iter()
                .filter(|record| record.selected_answer.is_none())
                .count(),
        }
    }
}

use std::collections::BTreeSet;

use crate::{
    log_util::log_debug,
    stage_batch::STAGE_COUNT,
    store::{PersistentStore, ProfileSnapshot, StageProgress},
};

/// Whether the saved profile has been read into memory yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loaded,
}

/// Where picking a stage on the stage list leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEntry {
    Quiz,
    Review,
}

/// Where "next" on the result view leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterResult {
    NextStage,
    FinishGame,
}

/// The single active game session: identity, topic, stage, score, and the
/// completed stages per topic.
#[derive(Debug)]
pub struct GameSession {
    store: PersistentStore,
    load_state: LoadState,
    username: String,
    selected_topic: Option<String>,
    stage: u8,
    score: u32,
    stage_progress: StageProgress,
    session_total: u32,
}

impl GameSession {
    /// A session with default values; call [`Self::initialize`] or
    /// [`Self::apply_snapshot`] to pull in saved data.
    pub fn new(store: PersistentStore) -> Self {
        Self {
            store,
            load_state: LoadState::NotLoaded,
            username: String::new(),
            selected_topic: None,
            stage: 1,
            score: 0,
            stage_progress: StageProgress::new(),
            session_total: 0,
        }
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Read username and progress synchronously.
    pub fn initialize(&mut self) {
        let snapshot = self.store.load_snapshot();
        self.apply_snapshot(snapshot);
    }

    /// Adopt a snapshot read elsewhere (e.g. on the startup worker).
    pub fn apply_snapshot(&mut self, snapshot: ProfileSnapshot) {
        if let Some(name) = snapshot.username.filter(|name| !name.is_empty()) {
            self.username = name;
        }
        self.stage_progress = snapshot.progress;
        self.load_state = LoadState::Loaded;
        log_debug(&format!(
            "Session: profile loaded ({} topic(s) with progress)",
            self.stage_progress.len()
        ));
    }

    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Store the name in memory and durably. Callers trim and reject empty input.
    pub fn set_username(&mut self, name: &str) {
        self.username = name.to_string();
        if !self.username.is_empty() {
            self.store.save_username(&self.username);
        }
    }

    pub fn selected_topic(&self) -> Option<&str> {
        self.selected_topic.as_deref()
    }

    /// Not validated; an unknown key surfaces later as an empty batch.
    pub fn set_selected_topic(&mut self, file_key: &str) {
        self.selected_topic = Some(file_key.to_string());
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn set_stage(&mut self, stage: u8) {
        self.stage = stage;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn reset_stage(&mut self) {
        self.score = 0;
    }

    pub fn record_correct_answer(&mut self) {
        self.score += 1;
    }

    /// Sum of stage scores finished since the session started or was reset.
    pub fn session_total(&self) -> u32 {
        self.session_total
    }

    pub fn bank_stage_score(&mut self) {
        self.session_total += self.score;
    }

    pub fn stage_progress(&self) -> &StageProgress {
        &self.stage_progress
    }

    pub fn completed_stages(&self, topic: &str) -> BTreeSet<u8> {
        self.stage_progress.get(topic).cloned().unwrap_or_default()
    }

    pub fn is_stage_completed(&self, topic: &str, stage: u8) -> bool {
        self.stage_progress
            .get(topic)
            .is_some_and(|stages| stages.contains(&stage))
    }

    /// Add `stage` to the topic's completed set (unioned with what is already
    /// stored) and persist that set.
    pub fn mark_stage_completed(&mut self, topic: &str, stage: u8) {
        let stored = self.store.get_progress_by_topic(topic);
        let completed = self.stage_progress.entry(topic.to_string()).or_default();
        completed.extend(stored);
        completed.insert(stage);
        let snapshot = completed.clone();
        self.store.save_progress(topic, &snapshot);
        log_debug(&format!(
            "Session: stage {} completed for topic {} ({:?})",
            stage, topic, snapshot
        ));
    }

    /// Re-read progress from the store, replacing the in-memory copy.
    pub fn load_progress(&mut self) {
        self.stage_progress = self.store.get_all_progress();
    }

    /// Clear the durable profile first, then every in-memory field.
    pub fn reset_all(&mut self) {
        self.store.clear_all_progress();
        self.username.clear();
        self.selected_topic = None;
        self.stage = 1;
        self.score = 0;
        self.stage_progress.clear();
        self.session_total = 0;
        log_debug("Session: all game data cleared");
    }

    /// Completed stages open the review; anything else starts a quiz run.
    pub fn stage_entry(&self, stage: u8) -> StageEntry {
        match self.selected_topic.as_deref() {
            Some(topic) if self.is_stage_completed(topic, stage) => StageEntry::Review,
            _ => StageEntry::Quiz,
        }
    }

    /// Prepare for `stage` when it leads to a quiz; reviews leave the session untouched.
    pub fn choose_stage(&mut self, stage: u8) -> StageEntry {
        let entry = self.stage_entry(stage);
        if entry == StageEntry::Quiz {
            self.set_stage(stage);
            self.reset_stage();
        }
        entry
    }

    pub fn after_result(&mut self) -> AfterResult {
        if self.stage < STAGE_COUNT {
            self.reset_stage();
            AfterResult::NextStage
        } else {
            AfterResult::FinishGame
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailingStore, MemoryStore};
    use std::sync::Arc;

    fn loaded_session() -> GameSession {
        let mut session = GameSession::new(PersistentStore::in_memory());
        session.initialize();
        session
    }

    #[test]
    fn defaults_are_observed_until_loaded() {
        let store = PersistentStore::in_memory();
        store.save_username("ada");
        store.save_progress("software", &BTreeSet::from([1]));

        let mut session = GameSession::new(store);
        assert!(!session.is_loaded());
        assert_eq!(session.username(), "");
        assert!(session.stage_progress().is_empty());

        session.initialize();
        assert!(session.is_loaded());
        assert_eq!(session.username(), "ada");
        assert!(session.is_stage_completed("software", 1));
    }

    #[test]
    fn username_is_persisted() {
        let mut session = loaded_session();
        session.set_username("grace");
        assert_eq!(session.store().get_username().as_deref(), Some("grace"));
    }

    #[test]
    fn mark_stage_completed_is_idempotent() {
        let mut once = loaded_session();
        once.mark_stage_completed("software", 2);

        let mut twice = loaded_session();
        twice.mark_stage_completed("software", 2);
        twice.mark_stage_completed("software", 2);

        assert_eq!(once.completed_stages("software"), twice.completed_stages("software"));
        assert_eq!(
            twice.store().get_progress_by_topic("software"),
            BTreeSet::from([2])
        );
    }

    #[test]
    fn progress_only_grows_by_union() {
        let mut session = loaded_session();
        session.mark_stage_completed("ai", 1);
        session.mark_stage_completed("ai", 3);
        session.mark_stage_completed("cloud", 5);
        assert_eq!(session.completed_stages("ai"), BTreeSet::from([1, 3]));
        assert_eq!(
            session.store().get_all_progress(),
            session.stage_progress().clone()
        );
    }

    #[test]
    fn reset_all_clears_durable_and_memory_state() {
        let mut session = loaded_session();
        session.set_username("ada");
        session.set_selected_topic("software");
        session.set_stage(4);
        session.record_correct_answer();
        session.mark_stage_completed("software", 4);

        session.reset_all();

        assert_eq!(session.store().get_username(), None);
        assert!(session.store().get_all_progress().is_empty());
        assert_eq!(session.username(), "");
        assert_eq!(session.selected_topic(), None);
        assert_eq!(session.stage(), 1);
        assert_eq!(session.score(), 0);
        assert!(session.stage_progress().is_empty());
    }

    #[test]
    fn load_progress_resynchronises_with_store() {
        let backend = Arc::new(MemoryStore::new());
        let store = PersistentStore::new(backend);
        let mut session = GameSession::new(store.clone());
        session.initialize();

        store.save_progress("iot", &BTreeSet::from([2, 4]));
        assert!(session.completed_stages("iot").is_empty());

        session.load_progress();
        assert_eq!(session.completed_stages("iot"), BTreeSet::from([2, 4]));
    }

    #[test]
    fn completed_stage_routes_to_review_without_score_change() {
        let mut session = loaded_session();
        session.set_selected_topic("ai");
        session.mark_stage_completed("ai", 3);
        session.set_stage(2);
        session.record_correct_answer();

        assert_eq!(session.choose_stage(3), StageEntry::Review);
        assert_eq!(session.score(), 1);
        assert_eq!(session.stage(), 2);

        assert_eq!(session.choose_stage(4), StageEntry::Quiz);
        assert_eq!(session.stage(), 4);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn stage_without_topic_starts_a_quiz() {
        let session = loaded_session();
        assert_eq!(session.stage_entry(1), StageEntry::Quiz);
    }

    #[test]
    fn after_result_advances_until_final_stage() {
        let mut session = loaded_session();
        session.set_stage(4);
        session.record_correct_answer();
        assert_eq!(session.after_result(), AfterResult::NextStage);
        assert_eq!(session.score(), 0);

        session.set_stage(5);
        session.record_correct_answer();
        assert_eq!(session.after_result(), AfterResult::FinishGame);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn storage_failures_never_escape_the_session() {
        let mut session = GameSession::new(PersistentStore::new(Arc::new(FailingStore)));
        session.initialize();
        assert!(session.is_loaded());

        session.set_username("ada");
        session.mark_stage_completed("software", 1);
        assert!(session.is_stage_completed("software", 1));

        session.reset_all();
        assert!(session.stage_progress().is_empty());
    }
}

use std::time::{Duration, Instant};

use rand::Rng;

use crate::{
    config::AppConfig,
    game_session::GameSession,
    log_util::log_debug,
    questions::{Question, QuestionProvider},
    review::{AnsweredRecord, ReviewRecorder},
    stage_batch::build_batch,
    store::PersistentStore,
};

/// Countdown and settle timings for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTiming {
    pub question: Duration,
    pub answer_settle: Duration,
    pub timeout_settle: Duration,
    /// Write an AnsweredRecord with no selection when the countdown expires.
    pub record_timeouts: bool,
}

impl RunTiming {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            question: config.question_duration(),
            answer_settle: config.answer_settle(),
            timeout_settle: config.timeout_settle(),
            record_timeouts: config.record_timeouts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No batch yet.
    Loading,
    /// The batch came back empty; terminal.
    Unavailable,
    /// Countdown running, one answer may be accepted.
    Active,
    /// Answer taken or time expired; waiting for the settle delay.
    Locked,
    /// Batch exhausted; terminal.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    TimedOut,
}

/// What a call into the run changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    Idle,
    /// Input arrived while no answer could be accepted.
    Rejected,
    Locked(AnswerOutcome),
    /// Moved on to the question at this index.
    Advanced(usize),
    Finished { score: u32, total: usize },
}

/// A timer owned by one question. It only fires while that question is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledTask {
    question_index: usize,
    due: Instant,
}

impl ScheduledTask {
    fn fires(&self, current_index: usize, now: Instant) -> bool {
        self.question_index == current_index && now >= self.due
    }
}

/// Drives one stage attempt: one question at a time, a countdown per question,
/// and at most one scoring event per question.
#[derive(Debug)]
pub struct QuizRun {
    topic: String,
    stage: u8,
    batch: Vec<Question>,
    index: usize,
    phase: RunPhase,
    selected: Option<String>,
    countdown: Option<ScheduledTask>,
    settle: Option<ScheduledTask>,
    remaining_at_lock: Duration,
    recorder: ReviewRecorder,
    timing: RunTiming,
}

impl QuizRun {
    pub fn new(topic: &str, stage: u8, store: PersistentStore, timing: RunTiming) -> Self {
        Self {
            topic: topic.to_string(),
            stage,
            batch: Vec::new(),
            index: 0,
            phase: RunPhase::Loading,
            selected: None,
            countdown: None,
            settle: None,
            remaining_at_lock: Duration::ZERO,
            recorder: ReviewRecorder::begin_attempt(store, topic),
            timing,
        }
    }

    /// Begin an attempt at the session's topic and stage. Returns `None` when no
    /// topic is selected.
    pub fn start<R: Rng + ?Sized>(
        session: &mut GameSession,
        provider: &mut QuestionProvider,
        rng: &mut R,
        timing: RunTiming,
        now: Instant,
    ) -> Option<Self> {
        let topic = session.selected_topic()?.to_string();
        let stage = session.stage();
        session.reset_stage();

        let mut run = Self::new(&topic, stage, session.store().clone(), timing);
        let batch = build_batch(provider, &topic, stage, rng);
        run.load_batch(batch, now);
        Some(run)
    }

    pub fn load_batch(&mut self, batch: Vec<Question>, now: Instant) {
        if self.phase != RunPhase::Loading {
            return;
        }
        self.batch = batch;
        self.index = 0;
        if self.batch.is_empty() {
            self.phase = RunPhase::Unavailable;
            log_debug(&format!(
                "Quiz: no questions available for {} stage {}",
                self.topic, self.stage
            ));
            return;
        }
        self.activate(now);
        log_debug(&format!(
            "Quiz: started {} stage {} with {} question(s)",
            self.topic,
            self.stage,
            self.batch.len()
        ));
    }

    pub fn select_index(&mut self, session: &mut GameSession, option_index: usize, now: Instant) -> RunEvent {
        let Some(option) = self
            .current_question()
            .and_then(|question| question.options.get(option_index))
            .cloned()
        else {
            return RunEvent::Rejected;
        };
        self.select_option(session, &option, now)
    }

    /// Accept `option` as the answer to the current question. An expired
    /// countdown takes precedence over a selection arriving at the same time.
    pub fn select_option(&mut self, session: &mut GameSession, option: &str, now: Instant) -> RunEvent {
        if self.phase != RunPhase::Active {
            return RunEvent::Rejected;
        }
        if self
            .countdown
            .is_some_and(|task| task.fires(self.index, now))
        {
            return self.lock(session, None, now);
        }
        self.lock(session, Some(option), now)
    }

    /// Fire whichever timer is due. Handles at most one transition per call.
    pub fn tick(&mut self, session: &mut GameSession, now: Instant) -> RunEvent {
        match self.phase {
            RunPhase::Active => match self.countdown {
                Some(task) if task.fires(self.index, now) => self.lock(session, None, now),
                _ => RunEvent::Idle,
            },
            RunPhase::Locked => match self.settle {
                Some(task) if task.fires(self.index, now) => self.advance(session, now),
                _ => RunEvent::Idle,
            },
            RunPhase::Loading | RunPhase::Unavailable | RunPhase::Finished => RunEvent::Idle,
        }
    }

    /// Drop pending timers, e.g. when the quiz view is left.
    pub fn cancel_timers(&mut self) {
        self.countdown = None;
        self.settle = None;
    }

    fn activate(&mut self, now: Instant) {
        self.phase = RunPhase::Active;
        self.selected = None;
        self.settle = None;
        self.countdown = Some(ScheduledTask {
            question_index: self.index,
            due: now + self.timing.question,
        });
    }

    fn lock(&mut self, session: &mut GameSession, selected: Option<&str>, now: Instant) -> RunEvent {
        let Some(question) = self.batch.get(self.index) else {
            return RunEvent::Rejected;
        };

        let outcome = match selected {
            Some(option) if question.is_correct(option) => AnswerOutcome::Correct,
            Some(_) => AnswerOutcome::Incorrect,
            None => AnswerOutcome::TimedOut,
        };
        let record = match selected {
            Some(_) => Some(AnsweredRecord::from_question(question, selected)),
            None if self.timing.record_timeouts => Some(AnsweredRecord::from_question(question, None)),
            None => None,
        };

        self.remaining_at_lock = self.remaining(now);
        self.countdown = None;
        self.phase = RunPhase::Locked;
        self.selected = selected.map(str::to_string);

        if outcome == AnswerOutcome::Correct {
            session.record_correct_answer();
        }
        if let Some(record) = record {
            self.recorder.append_answer(record);
        }

        let delay = if outcome == AnswerOutcome::TimedOut {
            self.timing.timeout_settle
        } else {
            self.timing.answer_settle
        };
        self.settle = Some(ScheduledTask {
            question_index: self.index,
            due: now + delay,
        });

        log_debug(&format!(
            "Quiz: question {} of {} locked as {:?} (score {})",
            self.index + 1,
            self.batch.len(),
            outcome,
            session.score()
        ));
        RunEvent::Locked(outcome)
    }

    fn advance(&mut self, session: &mut GameSession, now: Instant) -> RunEvent {
        self.settle = None;
        if self.index + 1 < self.batch.len() {
            self.index += 1;
            self.activate(now);
            RunEvent::Advanced(self.index)
        } else {
            self.finish(session)
        }
    }

    fn finish(&mut self, session: &mut GameSession) -> RunEvent {
        self.cancel_timers();
        self.phase = RunPhase::Finished;
        self.recorder.persist();
        session.bank_stage_score();
        session.mark_stage_completed(&self.topic, self.stage);
        log_debug(&format!(
            "Quiz: finished {} stage {} with score {}/{}",
            self.topic,
            self.stage,
            session.score(),
            self.batch.len()
        ));
        RunEvent::Finished {
            score: session.score(),
            total: self.batch.len(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            RunPhase::Active | RunPhase::Locked => self.batch.get(self.index),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.batch.len()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn records(&self) -> &[AnsweredRecord] {
        self.recorder.records()
    }

    /// Time left on the current countdown; frozen once the question locks.
    pub fn remaining(&self, now: Instant) -> Duration {
        match (self.phase, self.countdown) {
            (RunPhase::Active, Some(task)) => task.due.saturating_duration_since(now),
            (RunPhase::Locked, _) => self.remaining_at_lock,
            _ => Duration::ZERO,
        }
    }

    /// Remaining time as a fraction of the full countdown, for the timer bar.
    pub fn countdown_ratio(&self, now: Instant) -> f64 {
        let full = self.timing.question.as_secs_f64();
        if full <= 0.0 {
            return 0.0;
        }
        (self.remaining(now).as_secs_f64() / full).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::sample_questions;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    const SETTLE: Duration = Duration::from_millis(700);
    const TIMEOUT_SETTLE: Duration = Duration::from_millis(800);
    const QUESTION: Duration = Duration::from_secs(25);

    fn timing(record_timeouts: bool) -> RunTiming {
        RunTiming {
            question: QUESTION,
            answer_settle: SETTLE,
            timeout_settle: TIMEOUT_SETTLE,
            record_timeouts,
        }
    }

    fn session_for(topic: &str, stage: u8) -> GameSession {
        let mut session = GameSession::new(PersistentStore::in_memory());
        session.initialize();
        session.set_selected_topic(topic);
        session.set_stage(stage);
        session
    }

    fn provider_with(topic: &str, count: usize) -> QuestionProvider {
        let mut banks = HashMap::new();
        banks.insert(topic.to_string(), sample_questions(topic, count));
        QuestionProvider::with_banks(banks)
    }

    fn start_run(session: &mut GameSession, count: usize, record_timeouts: bool, now: Instant) -> QuizRun {
        let topic = session.selected_topic().unwrap().to_string();
        let mut provider = provider_with(&topic, count);
        let mut rng = StdRng::seed_from_u64(1);
        QuizRun::start(session, &mut provider, &mut rng, timing(record_timeouts), now).unwrap()
    }

    fn correct_option(run: &QuizRun) -> String {
        run.current_question().unwrap().correct_option.clone()
    }

    fn wrong_option(run: &QuizRun) -> String {
        let question = run.current_question().unwrap();
        question
            .options
            .iter()
            .find(|option| **option != question.correct_option)
            .cloned()
            .unwrap()
    }

    #[test]
    fn all_correct_stage_scores_twenty_and_completes() {
        let mut session = session_for("software", 1);
        let mut now = Instant::now();
        let mut run = start_run(&mut session, 60, false, now);
        assert_eq!(run.phase(), RunPhase::Active);
        assert_eq!(run.total(), 20);

        let mut finished = None;
        for _ in 0..20 {
            let answer = correct_option(&run);
            assert_eq!(
                run.select_option(&mut session, &answer, now),
                RunEvent::Locked(AnswerOutcome::Correct)
            );
            now += SETTLE;
            match run.tick(&mut session, now) {
                RunEvent::Advanced(_) => {}
                event @ RunEvent::Finished { .. } => finished = Some(event),
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(finished, Some(RunEvent::Finished { score: 20, total: 20 }));
        assert_eq!(run.phase(), RunPhase::Finished);
        assert_eq!(session.score(), 20);
        assert!(session.is_stage_completed("software", 1));
        assert!(session.store().get_progress_by_topic("software").contains(&1));

        let records = session.store().load_answers("software");
        assert_eq!(records.len(), 20);
        assert!(records
            .iter()
            .all(|record| record.selected_answer.as_deref() == Some(record.correct_answer.as_str())));
    }

    #[test]
    fn answers_after_lock_are_rejected() {
        let mut session = session_for("software", 1);
        let now = Instant::now();
        let mut run = start_run(&mut session, 20, false, now);

        let wrong = wrong_option(&run);
        let right = correct_option(&run);
        assert_eq!(
            run.select_option(&mut session, &wrong, now),
            RunEvent::Locked(AnswerOutcome::Incorrect)
        );
        assert_eq!(run.select_option(&mut session, &right, now), RunEvent::Rejected);
        assert_eq!(session.score(), 0);
        assert_eq!(run.records().len(), 1);
        assert_eq!(run.selected(), Some(wrong.as_str()));
    }

    #[test]
    fn timeout_leaves_score_and_advances_with_fresh_countdown() {
        let mut session = session_for("software", 1);
        let mut now = Instant::now();
        let mut run = start_run(&mut session, 20, false, now);

        for _ in 0..4 {
            let answer = correct_option(&run);
            run.select_option(&mut session, &answer, now);
            now += SETTLE;
            run.tick(&mut session, now);
        }
        assert_eq!(run.index(), 4);
        assert_eq!(session.score(), 4);

        now += QUESTION - Duration::from_millis(1);
        assert_eq!(run.tick(&mut session, now), RunEvent::Idle);
        now += Duration::from_millis(1);
        assert_eq!(
            run.tick(&mut session, now),
            RunEvent::Locked(AnswerOutcome::TimedOut)
        );
        assert_eq!(session.score(), 4);
        assert_eq!(run.records().len(), 4);

        now += SETTLE;
        assert_eq!(run.tick(&mut session, now), RunEvent::Idle);
        now += TIMEOUT_SETTLE - SETTLE;
        assert_eq!(run.tick(&mut session, now), RunEvent::Advanced(5));
        assert_eq!(run.remaining(now), QUESTION);
        assert_eq!(run.phase(), RunPhase::Active);
    }

    #[test]
    fn timeouts_are_recorded_when_enabled() {
        let mut session = session_for("cloud", 1);
        let mut now = Instant::now();
        let mut run = start_run(&mut session, 20, true, now);

        now += QUESTION;
        run.tick(&mut session, now);
        assert_eq!(run.records().len(), 1);
        assert_eq!(run.records()[0].selected_answer, None);
        assert_eq!(session.store().load_answers("cloud").len(), 1);
    }

    #[test]
    fn selection_at_expiry_resolves_to_a_single_timeout() {
        let mut session = session_for("software", 1);
        let mut now = Instant::now();
        let mut run = start_run(&mut session, 20, true, now);

        now += QUESTION;
        let answer = correct_option(&run);
        assert_eq!(
            run.select_option(&mut session, &answer, now),
            RunEvent::Locked(AnswerOutcome::TimedOut)
        );
        assert_eq!(run.tick(&mut session, now), RunEvent::Idle);
        assert_eq!(run.select_option(&mut session, &answer, now), RunEvent::Rejected);
        assert_eq!(session.score(), 0);
        assert_eq!(run.records().len(), 1);

        now += TIMEOUT_SETTLE;
        assert_eq!(run.tick(&mut session, now), RunEvent::Advanced(1));
        assert_eq!(run.tick(&mut session, now), RunEvent::Idle);
        assert_eq!(run.index(), 1);
    }

    #[test]
    fn selection_just_before_expiry_cancels_the_countdown() {
        let mut session = session_for("software", 1);
        let mut now = Instant::now();
        let mut run = start_run(&mut session, 20, true, now);

        now += QUESTION - Duration::from_millis(1);
        let answer = correct_option(&run);
        assert_eq!(
            run.select_option(&mut session, &answer, now),
            RunEvent::Locked(AnswerOutcome::Correct)
        );
        now += Duration::from_millis(1);
        assert_eq!(run.tick(&mut session, now), RunEvent::Idle);
        assert_eq!(session.score(), 1);
        assert_eq!(run.records().len(), 1);
    }

    #[test]
    fn empty_batch_is_unavailable() {
        let mut session = session_for("astrology", 1);
        let mut provider = QuestionProvider::with_banks(HashMap::new());
        let mut rng = StdRng::seed_from_u64(3);
        let now = Instant::now();
        let mut run =
            QuizRun::start(&mut session, &mut provider, &mut rng, timing(false), now).unwrap();

        assert_eq!(run.phase(), RunPhase::Unavailable);
        assert!(run.current_question().is_none());
        assert_eq!(run.select_index(&mut session, 0, now), RunEvent::Rejected);
        assert_eq!(run.tick(&mut session, now + QUESTION), RunEvent::Idle);
        assert!(!session.is_stage_completed("astrology", 1));
    }

    #[test]
    fn oversized_configured_countdown_is_capped() {
        let config = AppConfig {
            question_seconds: u64::MAX,
            answer_settle_ms: u64::MAX,
            ..AppConfig::default()
        };
        let mut session = session_for("software", 1);
        let mut provider = provider_with("software", 20);
        let mut rng = StdRng::seed_from_u64(4);
        let now = Instant::now();
        let mut run = QuizRun::start(
            &mut session,
            &mut provider,
            &mut rng,
            RunTiming::from_config(&config),
            now,
        )
        .unwrap();

        assert_eq!(run.phase(), RunPhase::Active);
        assert_eq!(run.remaining(now), Duration::from_secs(120));
        run.select_index(&mut session, 0, now);
        assert_eq!(
            run.tick(&mut session, now + Duration::from_secs(5)),
            RunEvent::Advanced(1)
        );
    }

    #[test]
    fn start_without_topic_returns_none() {
        let mut session = GameSession::new(PersistentStore::in_memory());
        let mut provider = QuestionProvider::with_banks(HashMap::new());
        let mut rng = StdRng::seed_from_u64(3);
        assert!(
            QuizRun::start(&mut session, &mut provider, &mut rng, timing(false), Instant::now())
                .is_none()
        );
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut session = session_for("software", 1);
        let now = Instant::now();
        let mut run = start_run(&mut session, 20, true, now);

        run.cancel_timers();
        assert_eq!(run.tick(&mut session, now + QUESTION * 2), RunEvent::Idle);
        assert!(run.records().is_empty());
    }

    #[test]
    fn short_batch_finishes_early() {
        let mut session = session_for("iot", 1);
        let mut now = Instant::now();
        let mut run = start_run(&mut session, 2, false, now);
        assert_eq!(run.total(), 2);

        run.select_index(&mut session, 0, now);
        now += SETTLE;
        assert_eq!(run.tick(&mut session, now), RunEvent::Advanced(1));
        now += QUESTION;
        run.tick(&mut session, now);
        now += TIMEOUT_SETTLE;
        assert!(matches!(
            run.tick(&mut session, now),
            RunEvent::Finished { total: 2, .. }
        ));
        assert!(session.is_stage_completed("iot", 1));
        assert_eq!(run.tick(&mut session, now + QUESTION), RunEvent::Idle);
    }

    #[test]
    fn starting_a_run_resets_the_stage_score() {
        let mut session = session_for("software", 2);
        session.record_correct_answer();
        let run = start_run(&mut session, 40, false, Instant::now());
        assert_eq!(session.score(), 0);
        assert_eq!(run.stage(), 2);
        assert_eq!(run.topic(), "software");
    }
}

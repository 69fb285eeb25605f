use crate::{
    App, AppView,
    config,
    log_util::log_debug,
    questions::OPTION_COUNT,
    quiz_run::{AnswerOutcome, QuizRun, RunEvent, RunPhase, RunTiming},
};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::Instant;

/// Option labels shown next to each answer, in option order.
pub(crate) const OPTION_LETTERS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D'];

pub(crate) struct QuizManager<'a> {
    app: &'a mut App,
}

impl<'a> QuizManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    /// Begin a run for the session's topic and stage.
    pub(crate) fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub(crate) fn start_at(&mut self, now: Instant) {
        let timing = RunTiming::from_config(&config::current());
        let mut rng = rand::rng();
        let app = &mut *self.app;
        match QuizRun::start(&mut app.session, &mut app.provider, &mut rng, timing, now) {
            Some(run) => {
                app.quiz = Some(run);
                app.status = None;
                app.view = AppView::Quiz;
            }
            None => {
                App::push_error(&mut app.error, "Pick a topic before starting a stage.".to_string());
                log_debug("App: quiz requested without a selected topic");
                app.view = AppView::TopicSelect;
            }
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        self.handle_key_at(key, Instant::now());
    }

    pub(crate) fn handle_key_at(&mut self, key: KeyEvent, now: Instant) {
        let phase = self.app.quiz.as_ref().map(QuizRun::phase);
        match key.code {
            KeyCode::Esc => self.leave_quiz(),
            KeyCode::Enter if matches!(phase, Some(RunPhase::Unavailable) | None) => {
                self.leave_quiz()
            }
            KeyCode::Char(ch) => {
                if let Some(option_index) = option_index_for(ch) {
                    self.select(option_index, now);
                }
            }
            _ => {}
        }
    }

    fn select(&mut self, option_index: usize, now: Instant) {
        let app = &mut *self.app;
        let Some(run) = app.quiz.as_mut() else {
            return;
        };
        let event = run.select_index(&mut app.session, option_index, now);
        self.apply_event(event);
    }

    /// Fire due timers on the active run.
    pub(crate) fn on_tick(&mut self, now: Instant) {
        if self.app.view != AppView::Quiz {
            return;
        }
        let app = &mut *self.app;
        let Some(run) = app.quiz.as_mut() else {
            return;
        };
        let event = run.tick(&mut app.session, now);
        self.apply_event(event);
    }

    fn apply_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Locked(outcome) => {
                self.app.status = Some(outcome_message(outcome).to_string());
            }
            RunEvent::Advanced(index) => {
                self.app.status = None;
                log_debug(&format!("App: showing question {}", index + 1));
            }
            RunEvent::Finished { score, total } => {
                log_debug(&format!("App: stage result {}/{}", score, total));
                self.app.status = None;
                self.app.result_index = 0;
                self.app.view = AppView::Result;
            }
            RunEvent::Idle | RunEvent::Rejected => {}
        }
    }

    /// Abandon the run; its timers never fire afterwards.
    fn leave_quiz(&mut self) {
        if let Some(mut run) = self.app.quiz.take() {
            run.cancel_timers();
            if run.phase() != RunPhase::Unavailable {
                log_debug(&format!(
                    "Quiz: left {} stage {} at question {} with {} answer(s) recorded",
                    run.topic(),
                    run.stage(),
                    run.index() + 1,
                    run.records().len()
                ));
            }
        }
        self.app.session.reset_stage();
        self.app.status = None;
        self.app.view = AppView::StageSelect;
    }
}

fn outcome_message(outcome: AnswerOutcome) -> &'static str {
    match outcome {
        AnswerOutcome::Correct => "Correct!",
        AnswerOutcome::Incorrect => "Wrong answer.",
        AnswerOutcome::TimedOut => "Time's up!",
    }
}

/// `1`-`4` and `A`-`D` (either case) pick options by position.
pub(crate) fn option_index_for(ch: char) -> Option<usize> {
    match ch.to_ascii_uppercase() {
        digit @ '1'..='4' => Some(digit as usize - '1' as usize),
        letter => OPTION_LETTERS.iter().position(|candidate| *candidate == letter),
    }
}

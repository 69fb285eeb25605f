mod config;
mod game_session;
mod learning_modules;
mod log_util;
mod output_manager;
mod questions;
mod quiz_run;
mod ratings;
mod review;
mod stage_batch;
mod store;
mod ui_renderer;
mod view_managers;

use color_eyre::Result;
use config::ConfigForm;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dotenvy::dotenv;
use game_session::GameSession;
use learning_modules::{LearningModule, ModuleLibrary};
use log_util::log_debug;
use questions::{QuestionProvider, Topic};
use quiz_run::QuizRun;
use ratatui::{DefaultTerminal, Frame};
use review::AnsweredRecord;
use std::{
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
    time::{Duration, Instant},
};
use store::{PersistentStore, ProfileSnapshot};
use ui_renderer::UiRenderer;
use view_managers::{
    ConfigManager, MenuManager, QuizManager, ResultManager, StageManager, TopicManager,
};

pub(crate) const LOADING_FRAMES: [&str; 4] = ["-", "\\", "|", "/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppView {
    NameEntry,
    Home,
    TopicSelect,
    LearningModule,
    StageSelect,
    Quiz,
    Result,
    Congrats,
    Review,
    Config,
}

fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    let terminal = ratatui::init();
    let result = App::new().run(terminal);
    ratatui::restore();
    result
}

/// The main application which holds the state and logic of the application.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub(crate) running: bool,
    /// Current view being displayed.
    pub(crate) view: AppView,
    /// Player identity, topic, stage, score and completed stages.
    pub(crate) session: GameSession,
    pub(crate) provider: QuestionProvider,
    pub(crate) modules: ModuleLibrary,
    /// Text typed on the name entry view.
    pub(crate) name_input: String,
    /// Currently selected index in the home menu.
    pub(crate) menu_index: usize,
    /// Whether the home view is asking to confirm a full reset.
    pub(crate) confirm_reset: bool,
    pub(crate) topic_index: usize,
    /// Topic whose learning module is on screen.
    pub(crate) module_topic: Option<&'static Topic>,
    pub(crate) learning_module: Option<LearningModule>,
    pub(crate) module_scroll: u16,
    pub(crate) stage_index: usize,
    /// The stage attempt in progress, if any.
    pub(crate) quiz: Option<QuizRun>,
    /// Selected action on the result view.
    pub(crate) result_index: usize,
    pub(crate) review_stage: u8,
    pub(crate) review_records: Vec<AnsweredRecord>,
    pub(crate) review_scroll: u16,
    /// Any error encountered while loading files or saving settings.
    pub(crate) error: Option<String>,
    /// Short feedback line for the current view.
    pub(crate) status: Option<String>,
    /// Holds the editable configuration state when rendering the config view.
    pub(crate) config_form: ConfigForm,
    /// Spinner frame index while the saved profile is loading.
    pub(crate) loading_frame: usize,
    /// Receives the saved profile from the startup worker.
    startup_receiver: Option<Receiver<ProfileSnapshot>>,
}

impl App {
    /// Construct a new instance of [`App`] and start loading the saved profile.
    pub fn new() -> Self {
        let mut aggregated_error: Option<String> = None;

        if let Err(err) = config::initialize() {
            Self::push_error(
                &mut aggregated_error,
                format!("Configuration load failed: {}", err),
            );
        }

        let settings = config::current();
        let store = PersistentStore::open_default();
        let mut app = Self::with_parts(
            store.clone(),
            QuestionProvider::with_content_dir(&settings.content_dir),
            ModuleLibrary::with_content_dir(&settings.content_dir),
        );
        app.error = aggregated_error;

        let (sender, receiver) = mpsc::channel();
        app.startup_receiver = Some(receiver);
        thread::spawn(move || {
            log_debug("App: loading saved profile");
            let _ = sender.send(store.load_snapshot());
        });
        app
    }

    /// An [`App`] on the name entry view whose profile has not been loaded yet.
    pub(crate) fn with_parts(
        store: PersistentStore,
        provider: QuestionProvider,
        modules: ModuleLibrary,
    ) -> Self {
        Self {
            running: false,
            view: AppView::NameEntry,
            session: GameSession::new(store),
            provider,
            modules,
            name_input: String::new(),
            menu_index: 0,
            confirm_reset: false,
            topic_index: 0,
            module_topic: None,
            learning_module: None,
            module_scroll: 0,
            stage_index: 0,
            quiz: None,
            result_index: 0,
            review_stage: 1,
            review_records: Vec::new(),
            review_scroll: 0,
            error: None,
            status: None,
            config_form: ConfigForm::from_config(config::current()),
            loading_frame: 0,
            startup_receiver: None,
        }
    }

    /// Run the application's main loop.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.running = true;
        let tick_rate = Duration::from_millis(120);
        while self.running {
            self.poll_startup();
            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events(tick_rate)?;
        }
        if let Some(run) = self.quiz.as_mut() {
            run.cancel_timers();
        }
        Ok(())
    }

    /// Dispatch rendering based on the active view.
    fn render(&mut self, frame: &mut Frame) {
        UiRenderer::new(self).render(frame);
    }

    /// Reads the crossterm events and updates the state of [`App`].
    fn handle_crossterm_events(&mut self, tick_rate: Duration) -> Result<()> {
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
                Event::Mouse(_) => {}
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
        self.on_tick(Instant::now());
        Ok(())
    }

    pub(crate) fn on_tick(&mut self, now: Instant) {
        if !self.session.is_loaded() {
            self.loading_frame = (self.loading_frame + 1) % LOADING_FRAMES.len();
        }
        self.poll_startup();
        QuizManager::new(self).on_tick(now);
    }

    fn poll_startup(&mut self) {
        let Some(receiver) = self.startup_receiver.as_ref() else {
            return;
        };
        match receiver.try_recv() {
            Ok(snapshot) => {
                self.startup_receiver = None;
                self.apply_profile(snapshot);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.startup_receiver = None;
                log_debug("App: startup worker disconnected; loading profile on the main thread");
                self.session.initialize();
                self.open_home_if_known();
            }
        }
    }

    /// Adopt the saved profile and skip name entry when a username exists.
    pub(crate) fn apply_profile(&mut self, snapshot: ProfileSnapshot) {
        self.session.apply_snapshot(snapshot);
        self.open_home_if_known();
    }

    fn open_home_if_known(&mut self) {
        if self.view == AppView::NameEntry && !self.session.username().is_empty() {
            self.view = AppView::Home;
            log_debug("App: saved username found; opening home");
        }
    }

    /// Handles the key events and updates the state of [`App`].
    pub(crate) fn on_key_event(&mut self, key: KeyEvent) {
        if let (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) =
            (key.modifiers, key.code)
        {
            self.quit();
            return;
        }
        match self.view {
            AppView::NameEntry => MenuManager::new(self).handle_name_key(key),
            AppView::Home => MenuManager::new(self).handle_home_key(key),
            AppView::TopicSelect => TopicManager::new(self).handle_topic_key(key),
            AppView::LearningModule => TopicManager::new(self).handle_module_key(key),
            AppView::StageSelect => StageManager::new(self).handle_stage_key(key),
            AppView::Review => StageManager::new(self).handle_review_key(key),
            AppView::Quiz => QuizManager::new(self).handle_key(key),
            AppView::Result => ResultManager::new(self).handle_result_key(key),
            AppView::Congrats => ResultManager::new(self).handle_congrats_key(key),
            AppView::Config => ConfigManager::new(self).handle_key(key),
        }
    }

    pub(crate) fn return_to_home(&mut self) {
        if matches!(self.view, AppView::Config) {
            self.config_form = ConfigForm::from_config(config::current());
        }
        self.confirm_reset = false;
        self.status = None;
        self.view = AppView::Home;
    }

    /// Wipe the profile and every view's state, then ask for a name again.
    pub(crate) fn reset_all(&mut self) {
        if let Some(run) = self.quiz.as_mut() {
            run.cancel_timers();
        }
        self.quiz = None;
        self.session.reset_all();
        self.name_input.clear();
        self.menu_index = 0;
        self.confirm_reset = false;
        self.topic_index = 0;
        self.module_topic = None;
        self.learning_module = None;
        self.stage_index = 0;
        self.result_index = 0;
        self.review_records.clear();
        self.status = None;
        self.view = AppView::NameEntry;
        log_debug("App: reset all progress; back to name entry");
    }

    /// Set running to false to quit the application.
    pub(crate) fn quit(&mut self) {
        self.running = false;
    }

    /// Append a message to an optional error slot.
    pub(crate) fn push_error(slot: &mut Option<String>, message: String) {
        if let Some(existing) = slot {
            existing.push_str(" | ");
            existing.push_str(&message);
        } else {
            *slot = Some(message);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::questions::sample_questions;
    use crossterm::event::{KeyEvent, KeyModifiers};
    use std::collections::HashMap;

    /// A loaded app over in-memory storage with a 60-question "software" bank.
    pub(crate) fn loaded_app() -> App {
        let mut banks = HashMap::new();
        banks.insert("software".to_string(), sample_questions("software", 60));
        let mut app = App::with_parts(
            PersistentStore::in_memory(),
            QuestionProvider::with_banks(banks),
            ModuleLibrary::with_content_dir(std::env::temp_dir().join("stagequiz-no-content")),
        );
        app.apply_profile(ProfileSnapshot::default());
        app
    }

    pub(crate) fn press(app: &mut App, code: KeyCode) {
        app.on_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    pub(crate) fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }
}

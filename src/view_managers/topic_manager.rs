use crate::{
    App, AppView,
    log_util::log_debug,
    questions::{TOPICS, Topic},
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const MODULE_SCROLL_STEP: u16 = 10;

/// Topic list and the learning module shown before a topic's stages.
pub(crate) struct TopicManager<'a> {
    app: &'a mut App,
}

impl<'a> TopicManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_topics(app: &mut App) {
        app.session.load_progress();
        app.status = None;
        app.view = AppView::TopicSelect;
    }

    pub(crate) fn handle_topic_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.select_next(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.select_previous(),
            (KeyModifiers::NONE, KeyCode::Enter) => self.open_module(),
            (_, KeyCode::Esc) | (KeyModifiers::NONE, KeyCode::Char('b')) => {
                self.app.return_to_home()
            }
            _ => {}
        }
    }

    pub(crate) fn handle_module_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.app.module_scroll = self.app.module_scroll.saturating_add(1);
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.app.module_scroll = self.app.module_scroll.saturating_sub(1);
            }
            (KeyModifiers::NONE, KeyCode::PageDown) => {
                self.app.module_scroll = self.app.module_scroll.saturating_add(MODULE_SCROLL_STEP);
            }
            (KeyModifiers::NONE, KeyCode::PageUp) => {
                self.app.module_scroll = self.app.module_scroll.saturating_sub(MODULE_SCROLL_STEP);
            }
            (KeyModifiers::NONE, KeyCode::Enter | KeyCode::Char('c')) => self.continue_to_stages(),
            (_, KeyCode::Esc) | (KeyModifiers::NONE, KeyCode::Char('b')) => {
                Self::show_topics(self.app)
            }
            _ => {}
        }
    }

    fn select_next(&mut self) {
        self.app.topic_index = (self.app.topic_index + 1) % TOPICS.len();
    }

    fn select_previous(&mut self) {
        if self.app.topic_index == 0 {
            self.app.topic_index = TOPICS.len() - 1;
        } else {
            self.app.topic_index -= 1;
        }
    }

    fn open_module(&mut self) {
        let Some(topic) = TOPICS.get(self.app.topic_index) else {
            return;
        };
        self.app.learning_module = self.app.modules.module_for(topic.file_key);
        self.app.module_topic = Some(topic);
        self.app.module_scroll = 0;
        self.app.view = AppView::LearningModule;
        log_debug(&format!("App: opened learning module for {}", topic.file_key));
    }

    fn continue_to_stages(&mut self) {
        let Some(topic) = self.app.module_topic else {
            Self::show_topics(self.app);
            return;
        };
        self.app.session.set_selected_topic(topic.file_key);
        self.app.stage_index = 0;
        self.app.status = None;
        self.app.view = AppView::StageSelect;
    }
}

/// Topic under the cursor on the topic list.
pub(crate) fn highlighted_topic(app: &App) -> Option<&'static Topic> {
    TOPICS.get(app.topic_index)
}

use super::{config_manager::ConfigManager, topic_manager::TopicManager};
use crate::{App, log_util::log_debug};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) const MENU_OPTIONS: [&str; 3] = [
    "1. Start learning",
    "2. Configure quiz timer",
    "3. Reset all progress",
];

const MAX_NAME_LEN: usize = 32;

pub(crate) struct MenuManager<'a> {
    app: &'a mut App,
}

impl<'a> MenuManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn handle_name_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => self.app.quit(),
            (_, KeyCode::Enter) => self.submit_name(),
            (_, KeyCode::Backspace) => {
                self.app.name_input.pop();
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => {
                if self.app.name_input.chars().count() < MAX_NAME_LEN {
                    self.app.name_input.push(ch);
                }
            }
            _ => {}
        }
    }

    fn submit_name(&mut self) {
        if !self.app.session.is_loaded() {
            self.app.status = Some("Still loading saved progress…".to_string());
            return;
        }
        let name = self.app.name_input.trim().to_string();
        if name.is_empty() {
            self.app.status = Some("Please enter your name to start.".to_string());
            return;
        }
        self.app.session.set_username(&name);
        self.app.name_input.clear();
        log_debug("App: username saved; opening home");
        self.app.return_to_home();
    }

    pub(crate) fn handle_home_key(&mut self, key: KeyEvent) {
        if self.app.confirm_reset {
            self.handle_reset_confirmation(key);
            return;
        }
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q')) => self.app.quit(),
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.menu_next(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.menu_previous(),
            (KeyModifiers::NONE, KeyCode::Enter) => self.activate_menu_option(),
            (KeyModifiers::NONE, KeyCode::Char('1')) => {
                self.app.menu_index = 0;
                self.activate_menu_option();
            }
            (KeyModifiers::NONE, KeyCode::Char('2')) => {
                self.app.menu_index = 1;
                self.activate_menu_option();
            }
            (KeyModifiers::NONE, KeyCode::Char('3')) => {
                self.app.menu_index = 2;
                self.activate_menu_option();
            }
            (KeyModifiers::NONE, KeyCode::Char('c') | KeyCode::Char('C')) => {
                ConfigManager::new(self.app).show_config()
            }
            _ => {}
        }
    }

    fn handle_reset_confirmation(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.app.reset_all(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.app.confirm_reset = false;
                self.app.status = Some("Reset cancelled.".to_string());
            }
            _ => {}
        }
    }

    fn menu_next(&mut self) {
        self.app.menu_index = (self.app.menu_index + 1) % MENU_OPTIONS.len();
    }

    fn menu_previous(&mut self) {
        if self.app.menu_index == 0 {
            self.app.menu_index = MENU_OPTIONS.len() - 1;
        } else {
            self.app.menu_index -= 1;
        }
    }

    fn activate_menu_option(&mut self) {
        match self.app.menu_index {
            0 => TopicManager::show_topics(self.app),
            1 => ConfigManager::new(self.app).show_config(),
            2 => {
                self.app.confirm_reset = true;
                self.app.status = None;
            }
            _ => {}
        }
    }
}

/// Whether the name entry view would accept its current input.
pub(crate) fn can_start(app: &App) -> bool {
    app.session.is_loaded() && !app.name_input.trim().is_empty()
}

use crate::{
    App, AppView,
    config::{self, ConfigForm},
    log_util::log_debug,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct ConfigManager<'a> {
    app: &'a mut App,
}

impl<'a> ConfigManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_config(&mut self) {
        self.app.config_form = ConfigForm::from_config(config::current());
        self.app
            .config_form
            .set_status("Use ←/→ to adjust values, s to save changes.");
        self.app.view = AppView::Config;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.app.config_form.select_next();
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.app.config_form.select_previous();
            }
            (KeyModifiers::NONE, KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-')) => {
                self.app.config_form.adjust_current(-1);
            }
            (
                KeyModifiers::NONE,
                KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') | KeyCode::Char('='),
            ) => {
                self.app.config_form.adjust_current(1);
            }
            (KeyModifiers::NONE, KeyCode::Char('s')) | (KeyModifiers::NONE, KeyCode::Enter) => {
                self.save_config_changes();
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => self.reset_config_form(),
            (_, KeyCode::Esc) | (KeyModifiers::NONE, KeyCode::Char('m')) => {
                self.app.return_to_home()
            }
            _ => {}
        }
    }

    fn save_config_changes(&mut self) {
        if !self.app.config_form.dirty {
            self.app
                .config_form
                .set_status("No pending changes to save.");
            return;
        }

        let target_seconds = self.app.config_form.question_seconds;
        let target_record = self.app.config_form.record_timeouts;

        match config::update(|config| {
            config.question_seconds = target_seconds;
            config.record_timeouts = target_record;
        }) {
            Ok(updated) => {
                self.app.config_form.apply_saved(updated);
                self.app.config_form.set_status(format!(
                    "Saved configuration to {}. Applies from the next stage.",
                    config::config_file_path().display()
                ));
                log_debug("App: configuration saved");
            }
            Err(err) => {
                App::push_error(
                    &mut self.app.error,
                    format!("Failed to save configuration: {}", err),
                );
                self.app
                    .config_form
                    .set_status("Failed to save configuration. Check error panel.");
                log_debug(&format!("App: failed to save configuration: {}", err));
            }
        }
    }

    fn reset_config_form(&mut self) {
        let current = config::current();
        self.app.config_form = ConfigForm::from_config(current);
        self.app
            .config_form
            .set_status("Reverted to saved configuration values.");
    }
}

#[cfg(test)]
mod tests {
    use crate::AppView;
    use crate::test_support::{loaded_app, press};
    use crossterm::event::KeyCode;

    #[test]
    fn edits_stay_pending_until_saved_and_revert_on_reset() {
        let mut app = loaded_app();
        app.view = AppView::Home;
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.view, AppView::Config);

        let before = app.config_form.question_seconds;
        press(&mut app, KeyCode::Right);
        assert!(app.config_form.dirty);
        assert_ne!(app.config_form.question_seconds, before);

        press(&mut app, KeyCode::Char('r'));
        assert!(!app.config_form.dirty);
        assert_eq!(app.config_form.question_seconds, before);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, AppView::Home);
    }
}

use crate::{App, AppView, game_session::AfterResult, log_util::log_debug, stage_batch::STAGE_COUNT};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) const RESULT_OPTIONS: [&str; 2] = ["Next", "Restart"];

/// Stage result and end-of-game views.
pub(crate) struct ResultManager<'a> {
    app: &'a mut App,
}

impl<'a> ResultManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn handle_result_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (
                KeyModifiers::NONE,
                KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Tab,
            ) => {
                self.app.result_index = (self.app.result_index + 1) % RESULT_OPTIONS.len();
            }
            (KeyModifiers::NONE, KeyCode::Enter) => match self.app.result_index {
                0 => self.next(),
                _ => self.app.reset_all(),
            },
            (KeyModifiers::NONE, KeyCode::Char('n')) => self.next(),
            (KeyModifiers::NONE, KeyCode::Char('r')) => self.app.reset_all(),
            _ => {}
        }
    }

    pub(crate) fn handle_congrats_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Enter | KeyCode::Char('r')) => self.app.reset_all(),
            (_, KeyCode::Esc | KeyCode::Char('q')) => self.app.quit(),
            _ => {}
        }
    }

    fn next(&mut self) {
        self.app.quiz = None;
        match self.app.session.after_result() {
            AfterResult::NextStage => {
                let finished = self.app.session.stage();
                self.app.stage_index = (finished as usize).min(STAGE_COUNT as usize - 1);
                self.app.view = AppView::StageSelect;
            }
            AfterResult::FinishGame => {
                log_debug(&format!(
                    "App: game finished with {} point(s)",
                    self.app.session.session_total()
                ));
                self.app.view = AppView::Congrats;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::AppView;
    use crate::test_support::{loaded_app, press};
    use crossterm::event::KeyCode;

    #[test]
    fn next_moves_cursor_to_following_stage() {
        let mut app = loaded_app();
        app.session.set_selected_topic("software");
        app.session.set_stage(2);
        app.session.record_correct_answer();
        app.view = AppView::Result;

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, AppView::StageSelect);
        assert_eq!(app.stage_index, 2);
        assert_eq!(app.session.score(), 0);
    }

    #[test]
    fn final_stage_leads_to_congrats_then_restart() {
        let mut app = loaded_app();
        app.session.set_username("ada");
        app.session.set_selected_topic("software");
        app.session.set_stage(5);
        app.view = AppView::Result;

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.view, AppView::Congrats);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, AppView::NameEntry);
        assert_eq!(app.session.username(), "");
        assert_eq!(app.session.store().get_username(), None);
    }

    #[test]
    fn restart_from_result_resets_everything() {
        let mut app = loaded_app();
        app.session.mark_stage_completed("software", 1);
        app.view = AppView::Result;

        press(&mut app, KeyCode::Right);
        assert_eq!(app.result_index, 1);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, AppView::NameEntry);
        assert!(app.session.store().get_all_progress().is_empty());
    }
}

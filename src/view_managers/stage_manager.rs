use super::{quiz_manager::QuizManager, topic_manager::TopicManager};
use crate::{
    App, AppView, game_session::StageEntry, log_util::log_debug, review::ReviewRecorder,
    stage_batch::STAGE_COUNT,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Stage list for the selected topic, and the review of completed stages.
pub(crate) struct StageManager<'a> {
    app: &'a mut App,
}

impl<'a> StageManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn handle_stage_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.select_next(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.select_previous(),
            (KeyModifiers::NONE, KeyCode::Enter) => self.activate_stage(),
            (KeyModifiers::NONE, KeyCode::Char(digit @ '1'..='5')) => {
                self.app.stage_index = digit as usize - '1' as usize;
                self.activate_stage();
            }
            (_, KeyCode::Esc) | (KeyModifiers::NONE, KeyCode::Char('b')) => {
                TopicManager::show_topics(self.app)
            }
            _ => {}
        }
    }

    pub(crate) fn handle_review_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.app.review_scroll = self.app.review_scroll.saturating_add(1);
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.app.review_scroll = self.app.review_scroll.saturating_sub(1);
            }
            (_, KeyCode::Esc) | (KeyModifiers::NONE, KeyCode::Char('b') | KeyCode::Enter) => {
                self.app.view = AppView::StageSelect;
            }
            _ => {}
        }
    }

    fn select_next(&mut self) {
        self.app.stage_index = (self.app.stage_index + 1) % STAGE_COUNT as usize;
    }

    fn select_previous(&mut self) {
        if self.app.stage_index == 0 {
            self.app.stage_index = STAGE_COUNT as usize - 1;
        } else {
            self.app.stage_index -= 1;
        }
    }

    fn selected_stage(&self) -> u8 {
        (self.app.stage_index.min(STAGE_COUNT as usize - 1) + 1) as u8
    }

    fn activate_stage(&mut self) {
        let stage = self.selected_stage();
        match self.app.session.choose_stage(stage) {
            StageEntry::Quiz => QuizManager::new(self.app).start(),
            StageEntry::Review => self.show_review(stage),
        }
    }

    fn show_review(&mut self, stage: u8) {
        let Some(topic) = self.app.session.selected_topic() else {
            return;
        };
        self.app.review_records = ReviewRecorder::load_answers(self.app.session.store(), topic);
        log_debug(&format!(
            "App: reviewing {} answer(s) for {} stage {}",
            self.app.review_records.len(),
            topic,
            stage
        ));
        self.app.review_stage = stage;
        self.app.review_scroll = 0;
        self.app.view = AppView::Review;
    }
}

#[cfg(test)]
mod tests {
    use crate::AppView;
    use crate::review::AnsweredRecord;
    use crate::test_support::{loaded_app, press};
    use crossterm::event::KeyCode;

    #[test]
    fn completed_stage_opens_review_without_touching_score() {
        let mut app = loaded_app();
        app.session.set_selected_topic("ai");
        app.session.mark_stage_completed("ai", 3);
        app.session.store().save_answers(
            "ai",
            &[AnsweredRecord {
                question: "What is a perceptron?".to_string(),
                options: vec!["A neuron model".to_string(), "A disk".to_string()],
                correct_answer: "A neuron model".to_string(),
                selected_answer: Some("A disk".to_string()),
            }],
        );
        app.session.record_correct_answer();
        app.view = AppView::StageSelect;

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.view, AppView::Review);
        assert_eq!(app.review_stage, 3);
        assert_eq!(app.review_records.len(), 1);
        assert_eq!(app.session.score(), 1);
        assert!(app.quiz.is_none());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, AppView::StageSelect);
    }

    #[test]
    fn open_stage_starts_a_quiz() {
        let mut app = loaded_app();
        app.session.set_selected_topic("software");
        app.view = AppView::StageSelect;

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, AppView::Quiz);
        assert_eq!(app.session.stage(), 2);
        assert_eq!(app.quiz.as_ref().map(|run| run.total()), Some(20));
    }

    #[test]
    fn stage_cursor_wraps() {
        let mut app = loaded_app();
        app.view = AppView::StageSelect;
        press(&mut app, KeyCode::Up);
        assert_eq!(app.stage_index, 4);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.stage_index, 0);
    }
}

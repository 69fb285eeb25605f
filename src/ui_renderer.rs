use crate::view_managers::{
    menu_manager::{MENU_OPTIONS, can_start},
    quiz_manager::OPTION_LETTERS,
    result_manager::RESULT_OPTIONS,
    topic_manager::highlighted_topic,
};
use crate::{
    App, AppView, LOADING_FRAMES, config,
    questions::{TOPICS, find_topic},
    quiz_run::{QuizRun, RunPhase},
    ratings::{self, GAME_TOTAL},
    review::ReviewSummary,
    stage_batch::{STAGE_COUNT, stage_label},
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{rc::Rc, time::Instant};

pub(crate) struct UiRenderer<'a> {
    app: &'a mut App,
}

impl<'a> UiRenderer<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn render(&mut self, frame: &mut Frame) {
        match self.app.view {
            AppView::NameEntry => self.render_name_entry(frame),
            AppView::Home => self.render_home(frame),
            AppView::TopicSelect => self.render_topics(frame),
            AppView::LearningModule => self.render_module(frame),
            AppView::StageSelect => self.render_stages(frame),
            AppView::Quiz => self.render_quiz(frame),
            AppView::Result => self.render_result(frame),
            AppView::Congrats => self.render_congrats(frame),
            AppView::Review => self.render_review(frame),
            AppView::Config => self.render_config(frame),
        }
    }

    fn render_name_entry(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 3);
        Self::render_header(frame, layout[0], "Stage Quiz", "Welcome! Who is playing today?");

        let body = if app.session.is_loaded() {
            format!("Your name: {}_", app.name_input)
        } else {
            let spinner = LOADING_FRAMES[app.loading_frame % LOADING_FRAMES.len()];
            format!("{} Loading saved progress…", spinner)
        };
        frame.render_widget(
            Paragraph::new(body)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Name"))),
            layout[1],
        );

        let mut status_lines = Self::common_status(app);
        if can_start(app) {
            status_lines.push("Press Enter to start.".to_string());
        } else {
            status_lines.push("Type your name to enable start.".to_string());
        }
        status_lines.push("Esc or Ctrl-C to quit.".to_string());
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_home(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 4);
        let completed: usize = app
            .session
            .stage_progress()
            .values()
            .map(|stages| stages.len())
            .sum();
        Self::render_header(
            frame,
            layout[0],
            &format!("Hello, {}!", app.session.username()),
            &format!("Stages completed across all topics: {}", completed),
        );

        let items: Vec<ListItem> = MENU_OPTIONS.iter().map(|label| ListItem::new(*label)).collect();
        let mut state = ListState::default();
        state.select(Some(app.menu_index));
        frame.render_stateful_widget(
            Self::selectable_list(items, "Menu"),
            layout[1],
            &mut state,
        );

        let mut status_lines = Self::common_status(app);
        if app.confirm_reset {
            status_lines.push(
                "Reset all progress? This clears your name and every completed stage. (y/n)"
                    .to_string(),
            );
        } else {
            status_lines.push("Use ↑/↓ or j/k to choose. Press Enter to select.".to_string());
            status_lines.push("Press 1, 2, or 3 for quick selection. Esc or q to quit.".to_string());
        }
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_topics(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 4);
        let description = highlighted_topic(app)
            .map(|topic| topic.description)
            .unwrap_or_default();
        Self::render_header(frame, layout[0], "Choose a topic", description);

        let items: Vec<ListItem> = TOPICS
            .iter()
            .map(|topic| {
                let done = app.session.completed_stages(topic.file_key).len();
                ListItem::new(format!(
                    "{:>2}. {:<28} {}/{} stages",
                    topic.id, topic.title, done, STAGE_COUNT
                ))
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(app.topic_index));
        frame.render_stateful_widget(
            Self::selectable_list(items, "Topics"),
            layout[1],
            &mut state,
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("Enter opens the learning module. Esc or b goes back home.".to_string());
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_module(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 3);
        let title = app.module_topic.map(|topic| topic.title).unwrap_or("Topic");
        Self::render_header(frame, layout[0], title, "Learning module");

        let body = match &app.learning_module {
            Some(module) => module.to_lines().join("\n"),
            None => "Module not found.".to_string(),
        };
        frame.render_widget(
            Paragraph::new(body)
                .wrap(Wrap { trim: false })
                .scroll((app.module_scroll, 0))
                .block(Block::bordered().title(Line::from("Study"))),
            layout[1],
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("↑/↓ or PgUp/PgDn scroll. Enter or c continues to the stages.".to_string());
        status_lines.push("Esc or b returns to the topic list.".to_string());
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_stages(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 4);
        let topic_key = app.session.selected_topic().unwrap_or_default();
        let title = find_topic(topic_key)
            .map(|topic| topic.title)
            .unwrap_or(topic_key);
        Self::render_header(frame, layout[0], title, "Pick a stage. Completed stages open a review.");

        let items: Vec<ListItem> = (1..=STAGE_COUNT)
            .map(|stage| {
                let marker = if app.session.is_stage_completed(topic_key, stage) {
                    "✓ completed (review)"
                } else {
                    "play"
                };
                ListItem::new(format!("Stage {} • {:<9} {}", stage, stage_label(stage), marker))
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(app.stage_index));
        frame.render_stateful_widget(
            Self::selectable_list(items, "Stages"),
            layout[1],
            &mut state,
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("↑/↓ choose, Enter or 1-5 to open. Esc or b back to topics.".to_string());
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_quiz(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let now = Instant::now();
        let layout = Self::screen_layout(frame, 3);

        let Some(run) = app.quiz.as_ref() else {
            Self::render_header(frame, layout[0], "Quiz", "No stage in progress.");
            return;
        };

        let header = format!(
            "Stage {} • {} | Score: {}",
            run.stage(),
            stage_label(run.stage()),
            app.session.score()
        );
        let progress = if run.total() == 0 {
            String::new()
        } else {
            let shown = run.index() + 1;
            format!(
                "Question {} / {} ({}%)",
                shown,
                run.total(),
                ratings::percentage(shown as u32, run.total() as u32)
            )
        };
        Self::render_header(frame, layout[0], &header, &progress);

        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(6)])
            .split(layout[1]);

        frame.render_widget(Self::countdown_gauge(run, now), body[0]);
        frame.render_widget(
            Paragraph::new(Self::question_text(run))
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Question"))),
            body[1],
        );

        let mut status_lines = Self::common_status(app);
        match run.phase() {
            RunPhase::Unavailable => {
                status_lines.push("Press Enter or Esc to go back to the stages.".to_string())
            }
            _ => status_lines.push("Press 1-4 or A-D to answer. Esc leaves the stage.".to_string()),
        }
        Self::render_status(frame, layout[2], status_lines);
    }

    fn countdown_gauge(run: &QuizRun, now: Instant) -> Gauge<'static> {
        let remaining = run.remaining(now);
        let ratio = run.countdown_ratio(now);
        let color = if ratio > 0.5 {
            Color::Green
        } else if ratio > 0.2 {
            Color::Yellow
        } else {
            Color::Red
        };
        Gauge::default()
            .block(Block::bordered().title(Line::from("Time")))
            .gauge_style(Style::default().fg(color))
            .ratio(ratio)
            .label(format!("{}s", remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)))
    }

    fn question_text(run: &QuizRun) -> String {
        if run.phase() == RunPhase::Unavailable {
            return "No questions are available for this stage yet.".to_string();
        }
        let Some(question) = run.current_question() else {
            return "Loading questions…".to_string();
        };

        let locked = run.phase() == RunPhase::Locked;
        let mut lines = vec![question.prompt.clone(), String::new()];
        for (index, option) in question.options.iter().enumerate() {
            let letter = OPTION_LETTERS.get(index).copied().unwrap_or('?');
            let marker = if locked && *option == question.correct_option {
                "[✓]"
            } else if locked && run.selected() == Some(option.as_str()) {
                "[✗]"
            } else {
                "[ ]"
            };
            lines.push(format!("{} {}. {}", marker, letter, option));
        }
        lines.join("\n")
    }

    fn render_result(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 4);
        let total = app.quiz.as_ref().map(QuizRun::total).unwrap_or_default() as u32;
        let score = app.session.score();
        let percent = ratings::percentage(score, total);
        Self::render_header(
            frame,
            layout[0],
            ratings::stage_rating(percent),
            &format!(
                "Stage {} • {}",
                app.session.stage(),
                stage_label(app.session.stage())
            ),
        );

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(3)])
            .split(layout[1]);
        frame.render_widget(
            Paragraph::new(format!("{} / {}\n{}% Correct", score, total, percent))
                .centered()
                .block(Block::bordered().title(Line::from("Score"))),
            sections[0],
        );

        let items: Vec<ListItem> = RESULT_OPTIONS.iter().map(|label| ListItem::new(*label)).collect();
        let mut state = ListState::default();
        state.select(Some(app.result_index));
        frame.render_stateful_widget(
            Self::selectable_list(items, "Continue"),
            sections[1],
            &mut state,
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("←/→ choose, Enter to confirm. n next stage, r restart.".to_string());
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_congrats(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 3);
        let total = app.session.session_total();
        let percent = ratings::percentage(total, GAME_TOTAL);
        Self::render_header(
            frame,
            layout[0],
            ratings::game_rating(percent),
            &format!("Congratulations, {}! Every stage is done.", app.session.username()),
        );

        frame.render_widget(
            Paragraph::new(format!(
                "Total score: {} / {}\n{}%",
                total, GAME_TOTAL, percent
            ))
            .centered()
            .block(Block::bordered().title(Line::from("Final Score"))),
            layout[1],
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("Press Enter or r to play again from the start. q to quit.".to_string());
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_review(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 4);
        let summary = ReviewSummary::from_records(&app.review_records);
        Self::render_header(
            frame,
            layout[0],
            &format!(
                "Review • Stage {} ({})",
                app.review_stage,
                stage_label(app.review_stage)
            ),
            &format!(
                "{} of {} correct, {} unanswered",
                summary.correct, summary.total, summary.unanswered
            ),
        );

        let body = if app.review_records.is_empty() {
            "No answers recorded for this topic yet.".to_string()
        } else {
            let mut lines = Vec::new();
            for (index, record) in app.review_records.iter().enumerate() {
                lines.push(format!(
                    "{}. {} - {}",
                    index + 1,
                    record.question,
                    if record.is_correct() { "Correct" } else { "Wrong" }
                ));
                for (option_index, option) in record.options.iter().enumerate() {
                    let letter = OPTION_LETTERS.get(option_index).copied().unwrap_or('?');
                    let mut tags = Vec::new();
                    if *option == record.correct_answer {
                        tags.push("correct answer");
                    }
                    if record.selected_answer.as_deref() == Some(option.as_str()) {
                        tags.push("your choice");
                    }
                    let suffix = if tags.is_empty() {
                        String::new()
                    } else {
                        format!("  ({})", tags.join(", "))
                    };
                    lines.push(format!("   {}. {}{}", letter, option, suffix));
                }
                if record.selected_answer.is_none() {
                    lines.push("   No answer before time ran out.".to_string());
                }
                lines.push(String::new());
            }
            lines.join("\n")
        };
        frame.render_widget(
            Paragraph::new(body)
                .wrap(Wrap { trim: false })
                .scroll((app.review_scroll, 0))
                .block(Block::bordered().title(Line::from("Answers"))),
            layout[1],
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("↑/↓ scroll. Esc, b, or Enter returns to the stages.".to_string());
        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_config(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame, 4);
        let config_path = config::config_file_path();
        Self::render_header(
            frame,
            layout[0],
            "Settings",
            &format!("Config file: {}", config_path.display()),
        );

        let items = vec![
            ListItem::new(format!(
                "Seconds per question: {}",
                app.config_form.question_seconds
            )),
            ListItem::new(format!(
                "Record unanswered questions for review: {}",
                if app.config_form.record_timeouts {
                    "Enabled"
                } else {
                    "Disabled"
                }
            )),
        ];

        let mut list_state = ListState::default();
        list_state.select(Some(app.config_form.selected_index()));
        frame.render_stateful_widget(
            Self::selectable_list(items, "Quiz"),
            layout[1],
            &mut list_state,
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("↑/↓ or j/k choose field. ←/→ or h/l adjust value.".to_string());
        status_lines.push("Press s to save, r to reset, m or Esc to return home.".to_string());
        if app.config_form.dirty {
            status_lines.push("Unsaved changes".to_string());
        }
        if let Some(config_status) = &app.config_form.status {
            status_lines.push(config_status.clone());
        }
        Self::render_status(frame, layout[2], status_lines);
    }

    fn screen_layout(frame: &Frame, status_height: u16) -> Rc<[Rect]> {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(6),
                Constraint::Length(status_height + 2),
            ])
            .split(frame.area())
    }

    fn render_header(frame: &mut Frame, area: Rect, title: &str, text: &str) {
        let header_title = Line::from(title.to_string()).bold().blue().centered();
        frame.render_widget(
            Paragraph::new(text.to_string())
                .wrap(Wrap { trim: true })
                .block(Block::bordered().title(header_title))
                .centered(),
            area,
        );
    }

    fn selectable_list<'b>(items: Vec<ListItem<'b>>, title: &'b str) -> List<'b> {
        List::new(items)
            .block(Block::bordered().title(Line::from(title)))
            .highlight_symbol("▶ ")
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    }

    fn common_status(app: &App) -> Vec<String> {
        let mut status_lines = Vec::new();
        if let Some(error) = &app.error {
            status_lines.push(format!("Error: {}", error));
        }
        if let Some(status) = &app.status {
            status_lines.push(status.clone());
        }
        status_lines
    }

    fn render_status(frame: &mut Frame, area: Rect, status_lines: Vec<String>) {
        frame.render_widget(
            Paragraph::new(status_lines.join("\n"))
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Status"))),
            area,
        );
    }
}

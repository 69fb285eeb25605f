pub mod config_manager;
pub mod menu_manager;
pub mod quiz_manager;
pub mod result_manager;
pub mod stage_manager;
pub mod topic_manager;

pub(crate) use config_manager::ConfigManager;
pub(crate) use menu_manager::MenuManager;
pub(crate) use quiz_manager::QuizManager;
pub(crate) use result_manager::ResultManager;
pub(crate) use stage_manager::StageManager;
pub(crate) use topic_manager::TopicManager;

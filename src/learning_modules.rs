use crate::log_util::log_debug;
use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningModule {
    pub title: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub sections: Vec<ModuleSection>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub study_tip: String,
    #[serde(default)]
    pub practical_examples: Vec<String>,
    #[serde(default)]
    pub common_mistakes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSection {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl LearningModule {
    /// Flatten the module into display lines for the reading view.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![self.title.clone(), String::new()];
        if !self.intro.trim().is_empty() {
            lines.push(self.intro.clone());
            lines.push(String::new());
        }
        for section in &self.sections {
            lines.push(format!("## {}", section.title));
            lines.extend(section.content.lines().map(str::to_string));
            lines.push(String::new());
        }
        push_list(&mut lines, "Key concepts", &self.key_concepts);
        push_list(&mut lines, "Practical examples", &self.practical_examples);
        push_list(&mut lines, "Common mistakes", &self.common_mistakes);
        if !self.study_tip.trim().is_empty() {
            lines.push(format!("Study tip: {}", self.study_tip));
        }
        lines
    }
}

fn push_list(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("## {heading}"));
    lines.extend(items.iter().map(|item| format!("• {item}")));
    lines.push(String::new());
}

/// Reads learning modules from `<content_dir>/modules/<file_key>.json`.
#[derive(Debug, Clone)]
pub struct ModuleLibrary {
    root: PathBuf,
}

impl ModuleLibrary {
    pub fn with_content_dir<P: AsRef<Path>>(content_dir: P) -> Self {
        Self {
            root: content_dir.as_ref().join("modules"),
        }
    }

    /// Missing or unreadable modules are logged and reported as `None`.
    pub fn module_for(&self, topic_key: &str) -> Option<LearningModule> {
        match self.read_module(topic_key) {
            Ok(Some(module)) => Some(module),
            Ok(None) => {
                log_debug(&format!("Modules: no learning module for topic {}", topic_key));
                None
            }
            Err(err) => {
                log_debug(&format!(
                    "Modules: failed to load module for topic {}: {:#}",
                    topic_key, err
                ));
                None
            }
        }
    }

    fn read_module(&self, topic_key: &str) -> Result<Option<LearningModule>> {
        if topic_key.is_empty() || topic_key.contains(['/', '\\', '.']) {
            return Ok(None);
        }
        let path = self.root.join(format!("{topic_key}.json"));
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .wrap_err_with(|| format!("failed to read module {}", path.display()));
            }
        };
        let module = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("failed to parse module {}", path.display()))?;
        Ok(Some(module))
    }
}

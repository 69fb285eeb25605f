use crate::config;
use std::{env, fs, path::PathBuf};

/// Resolves where runtime artifacts (the SQLite store and the debug log) live.
#[derive(Debug)]
pub struct OutputManager {
    root: PathBuf,
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::with_root(config::data_dir())
    }
}

impl OutputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn output_directory(&self) -> Result<PathBuf, String> {
        if self.root.is_absolute() {
            return Ok(self.root.clone());
        }

        match env::current_dir() {
            Ok(mut dir) => {
                dir.push(&self.root);
                Ok(dir)
            }
            Err(err) => Err(format!("failed to resolve current directory: {}", err)),
        }
    }

    /// Path of `filename` inside the output directory, creating the directory on demand.
    pub fn artifact_path(&self, filename: &str) -> Result<PathBuf, String> {
        let mut dir = self.output_directory()?;
        fs::create_dir_all(&dir).map_err(|err| format!("{}: {}", dir.display(), err))?;
        dir.push(filename);
        Ok(dir)
    }
}

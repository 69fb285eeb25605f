use crate::log_util::log_debug;
use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

/// A quiz subject shown on the topic list. `file_key` identifies its question bank,
/// learning module, and progress records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub file_key: &'static str,
}

pub const TOPICS: [Topic; 20] = [
    Topic {
        id: 1,
        title: "Software",
        description: "Covers general software principles, programs, and development concepts.",
        file_key: "software",
    },
    Topic {
        id: 2,
        title: "Hardware",
        description: "Covers computer components, devices, and physical computing fundamentals.",
        file_key: "hardware",
    },
    Topic {
        id: 3,
        title: "Networking",
        description: "Networking basics, protocols, and communication models.",
        file_key: "networking",
    },
    Topic {
        id: 4,
        title: "Programming",
        description: "Covers syntax, logic, algorithms, and programming concepts.",
        file_key: "programming",
    },
    Topic {
        id: 5,
        title: "Database",
        description: "Focuses on SQL, relational design, and database management systems.",
        file_key: "database",
    },
    Topic {
        id: 6,
        title: "AI & Machine Learning",
        description: "Artificial intelligence, data models, and learning algorithms.",
        file_key: "ai",
    },
    Topic {
        id: 7,
        title: "Cybersecurity",
        description: "Security, encryption, and safe computing practices.",
        file_key: "cybersecurity",
    },
    Topic {
        id: 8,
        title: "Cloud Computing",
        description: "Virtualization, cloud services, and distributed infrastructure.",
        file_key: "cloud",
    },
    Topic {
        id: 9,
        title: "Internet of Things (IoT)",
        description: "Smart devices, sensors, and connected environments.",
        file_key: "iot",
    },
    Topic {
        id: 10,
        title: "Data Science",
        description: "Data analysis, visualization, and machine learning fundamentals.",
        file_key: "dataScience",
    },
    Topic {
        id: 11,
        title: "Operating Systems",
        description: "OS concepts, scheduling, memory management, and system calls.",
        file_key: "osConcepts",
    },
    Topic {
        id: 12,
        title: "Web Development",
        description: "Frontend and backend web technologies and frameworks.",
        file_key: "webDev",
    },
    Topic {
        id: 13,
        title: "Mobile Development",
        description: "Building Android and iOS apps and understanding mobile architecture.",
        file_key: "mobileDev",
    },
    Topic {
        id: 14,
        title: "Digital Logic",
        description: "Logic gates, combinational circuits, and digital electronics.",
        file_key: "digitalLogic",
    },
    Topic {
        id: 15,
        title: "UI/UX Design",
        description: "Interface design principles, usability, and user experience.",
        file_key: "uiux",
    },
    Topic {
        id: 16,
        title: "E-Commerce",
        description: "Online business systems, digital payments, and marketplaces.",
        file_key: "ecommerce",
    },
    Topic {
        id: 17,
        title: "System Analysis",
        description: "Requirement gathering, modeling, and system evaluation.",
        file_key: "systemAnalysis",
    },
    Topic {
        id: 18,
        title: "IT Project Management",
        description: "Project life cycle, agile methodology, and delivery control.",
        file_key: "projectManagement",
    },
    Topic {
        id: 19,
        title: "IT Ethics",
        description: "Legal, ethical, and social issues in technology.",
        file_key: "itEthics",
    },
    Topic {
        id: 20,
        title: "IT History",
        description: "Evolution and milestones of computing and technology.",
        file_key: "itHistory",
    },
];

pub fn find_topic(file_key: &str) -> Option<&'static Topic> {
    TOPICS.iter().find(|topic| topic.file_key == file_key)
}

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// A multiple-choice question. `correct_option` must equal one of `options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "answer")]
    pub correct_option: String,
}

impl Question {
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTION_COUNT
            && self.options.iter().any(|option| *option == self.correct_option)
    }

    pub fn is_correct(&self, selected: &str) -> bool {
        selected == self.correct_option
    }
}

/// Looks up question banks by topic key. Banks are read from
/// `<content_dir>/questions/<file_key>.json` the first time they are requested.
#[derive(Debug, Default)]
pub struct QuestionProvider {
    root: Option<PathBuf>,
    banks: HashMap<String, Vec<Question>>,
}

impl QuestionProvider {
    pub fn with_content_dir<P: AsRef<Path>>(content_dir: P) -> Self {
        Self {
            root: Some(content_dir.as_ref().join("questions")),
            banks: HashMap::new(),
        }
    }

    /// Provider over an in-memory registry; nothing is read from disk.
    pub fn with_banks(banks: HashMap<String, Vec<Question>>) -> Self {
        Self { root: None, banks }
    }

    pub fn get_questions_by_topic(&mut self, topic_key: &str) -> Vec<Question> {
        if let Some(bank) = self.banks.get(topic_key) {
            return bank.clone();
        }

        let loaded = match self.root.as_deref() {
            Some(root) => match load_bank(root, topic_key) {
                Ok(bank) => bank,
                Err(err) => {
                    log_debug(&format!(
                        "Questions: failed to load bank for topic {}: {:#}",
                        topic_key, err
                    ));
                    None
                }
            },
            None => None,
        };

        match loaded {
            Some(bank) => {
                self.banks.insert(topic_key.to_string(), bank.clone());
                bank
            }
            None => {
                log_debug(&format!(
                    "Questions: no questions found for topic: {}",
                    topic_key
                ));
                Vec::new()
            }
        }
    }
}

fn load_bank(root: &Path, topic_key: &str) -> Result<Option<Vec<Question>>> {
    if topic_key.is_empty() || topic_key.contains(['/', '\\', '.']) {
        return Ok(None);
    }

    let path = root.join(format!("{topic_key}.json"));
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .wrap_err_with(|| format!("failed to read question bank {}", path.display()));
        }
    };

    let parsed: Vec<Question> = serde_json::from_str(&contents)
        .wrap_err_with(|| format!("failed to parse question bank {}", path.display()))?;
    let total = parsed.len();
    let bank: Vec<Question> = parsed
        .into_iter()
        .filter(Question::is_well_formed)
        .collect();
    if bank.len() < total {
        log_debug(&format!(
            "Questions: dropped {} malformed question(s) from {}",
            total - bank.len(),
            path.display()
        ));
    }
    Ok(Some(bank))
}

#[cfg(test)]
pub(crate) fn sample_questions(prefix: &str, count: usize) -> Vec<Question> {
    (0..count)
        .map(|index| Question {
            prompt: format!("{prefix} question {index}"),
            options: (0..4).map(|option| format!("{prefix} {index}-{option}")).collect(),
            correct_option: format!("{prefix} {index}-{}", index % 4),
        })
        .collect()
}

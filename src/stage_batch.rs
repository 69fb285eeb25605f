use rand::{Rng, seq::SliceRandom};

use crate::questions::{Question, QuestionProvider};

/// Questions served per stage.
pub const STAGE_SIZE: usize = 20;
/// Stages per topic; stage numbers run `1..=STAGE_COUNT`.
pub const STAGE_COUNT: u8 = 5;

pub fn stage_label(stage: u8) -> &'static str {
    match stage {
        1 => "Beginner",
        2 => "Easy",
        3 => "Medium",
        4 => "Hard",
        5 => "Expert",
        _ => "Unknown",
    }
}

/// Uniformly shuffled copy of `questions`; the input is left as is.
pub fn shuffle<R: Rng + ?Sized>(questions: &[Question], rng: &mut R) -> Vec<Question> {
    let mut shuffled = questions.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// The `[(stage - 1) * STAGE_SIZE, stage * STAGE_SIZE)` window of `shuffled`,
/// clipped to its length. Out-of-range stages yield an empty batch.
pub fn slice(shuffled: &[Question], stage: u8) -> Vec<Question> {
    let Some(index) = (stage as usize).checked_sub(1) else {
        return Vec::new();
    };
    let start = (index * STAGE_SIZE).min(shuffled.len());
    let end = (start + STAGE_SIZE).min(shuffled.len());
    shuffled[start..end].to_vec()
}

/// Shuffle the topic's bank and cut out the batch for `stage`.
pub fn build_batch<R: Rng + ?Sized>(
    provider: &mut QuestionProvider,
    topic_key: &str,
    stage: u8,
    rng: &mut R,
) -> Vec<Question> {
    let all = provider.get_questions_by_topic(topic_key);
    slice(&shuffle(&all, rng), stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::sample_questions;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    fn prompts(questions: &[Question]) -> Vec<String> {
        let mut prompts: Vec<String> = questions.iter().map(|q| q.prompt.clone()).collect();
        prompts.sort();
        prompts
    }

    #[test]
    fn shuffle_is_a_permutation_and_keeps_input() {
        let questions = sample_questions("software", 57);
        let original = questions.clone();
        let mut rng = StdRng::seed_from_u64(7);

        let shuffled = shuffle(&questions, &mut rng);

        assert_eq!(questions, original);
        assert_eq!(shuffled.len(), questions.len());
        assert_eq!(prompts(&shuffled), prompts(&questions));
        assert_ne!(shuffled, questions, "seeded shuffle of 57 items should reorder");
    }

    #[test]
    fn slice_windows_and_clips() {
        let questions = sample_questions("db", 45);

        let first = slice(&questions, 1);
        assert_eq!(first.len(), 20);
        assert_eq!(first[0].prompt, "db question 0");

        let third = slice(&questions, 3);
        assert_eq!(third.len(), 5);
        assert_eq!(third[0].prompt, "db question 40");

        assert!(slice(&questions, 4).is_empty());
        assert!(slice(&questions, 0).is_empty());
        assert!(slice(&[], 1).is_empty());
    }

    #[test]
    fn batches_never_exceed_stage_size() {
        let mut banks = HashMap::new();
        banks.insert("software".to_string(), sample_questions("software", 100));
        banks.insert("tiny".to_string(), sample_questions("tiny", 3));
        let mut provider = QuestionProvider::with_banks(banks);
        let mut rng = StdRng::seed_from_u64(42);

        for stage in 1..=STAGE_COUNT {
            let batch = build_batch(&mut provider, "software", stage, &mut rng);
            assert_eq!(batch.len(), STAGE_SIZE);
            assert!(build_batch(&mut provider, "tiny", stage, &mut rng).len() <= STAGE_SIZE);
            assert!(build_batch(&mut provider, "unknown", stage, &mut rng).is_empty());
        }
        assert_eq!(build_batch(&mut provider, "tiny", 1, &mut rng).len(), 3);
        assert!(build_batch(&mut provider, "tiny", 2, &mut rng).is_empty());
    }

    #[test]
    fn stage_labels_cover_every_stage() {
        let labels: Vec<&str> = (1..=STAGE_COUNT).map(stage_label).collect();
        assert_eq!(labels, ["Beginner", "Easy", "Medium", "Hard", "Expert"]);
    }
}

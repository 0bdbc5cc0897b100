use std::collections::HashMap;

use include_dir::{include_dir, Dir};
use log::debug;
use rand::{seq::SliceRandom, Rng};
use serde::Deserialize;
use thiserror::Error;

use crate::session::{Difficulty, Language, SessionConfig, TestMode};

static TEXT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

const CORPUS_FILE: &str = "samples.json";

/// Passage the caller starts with when the provider cannot deliver.
pub const FALLBACK_TEXT: &str = "La programmation est l'art de dire à un ordinateur ce qu'il doit faire. C'est un processus créatif qui combine logique et imagination.";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("text corpus file {0} not found")]
    MissingCorpus(String),
    #[error("text corpus is not valid utf-8")]
    Encoding,
    #[error("unable to parse text corpus: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no passages for {language}/{difficulty}")]
    NoPassages {
        language: Language,
        difficulty: Difficulty,
    },
    #[error("text provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRequest {
    pub language: Language,
    pub difficulty: Difficulty,
    pub mode: TestMode,
}

impl From<&SessionConfig> for TextRequest {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            language: cfg.language,
            difficulty: cfg.difficulty,
            mode: cfg.mode,
        }
    }
}

/// Source of reference text, used both for the first block of a session and
/// for extensions of a running timed one.
pub trait TextProvider: Send + Sync {
    fn fetch(&self, request: &TextRequest) -> Result<String, ProviderError>;
}

#[derive(Deserialize, Clone, Debug)]
struct Tiers {
    easy: Vec<String>,
    medium: Vec<String>,
    hard: Vec<String>,
}

impl Tiers {
    fn get(&self, difficulty: Difficulty) -> &[String] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Hard => &self.hard,
            Difficulty::Medium | Difficulty::Random => &self.medium,
        }
    }
}

/// Provider backed by the passages bundled into the binary.
#[derive(Debug, Clone)]
pub struct SampleTextProvider {
    corpus: HashMap<Language, Tiers>,
}

impl SampleTextProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let file = TEXT_DIR
            .get_file(CORPUS_FILE)
            .ok_or_else(|| ProviderError::MissingCorpus(CORPUS_FILE.to_string()))?;
        let contents = file.contents_utf8().ok_or(ProviderError::Encoding)?;
        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let corpus = serde_json::from_str(json)?;
        Ok(Self { corpus })
    }

    pub fn fetch_with_rng<R: Rng + ?Sized>(
        &self,
        request: &TextRequest,
        rng: &mut R,
    ) -> Result<String, ProviderError> {
        let difficulty = match request.difficulty {
            Difficulty::Random => *[Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
                .choose(rng)
                .unwrap_or(&Difficulty::Medium),
            tier => tier,
        };
        let passages = self.passages(request.language, difficulty)?;

        let text = match request.mode.target_text_len() {
            Some(target) => assemble(&passages, target, rng),
            None => passages.choose(rng).map(|p| p.to_string()).unwrap_or_default(),
        };
        debug!(
            "fetched {} chars of {}/{} text for {}",
            text.chars().count(),
            request.language,
            difficulty,
            request.mode
        );
        Ok(text)
    }

    /// Non-empty passages of a tier. Unknown languages fall back to French
    /// medium.
    fn passages(
        &self,
        language: Language,
        difficulty: Difficulty,
    ) -> Result<Vec<&str>, ProviderError> {
        let tier = match self.corpus.get(&language) {
            Some(tiers) => tiers.get(difficulty),
            None => self
                .corpus
                .get(&Language::Fr)
                .map(|tiers| tiers.get(Difficulty::Medium))
                .unwrap_or_default(),
        };
        let passages: Vec<&str> = tier
            .iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .collect();
        if passages.is_empty() {
            return Err(ProviderError::NoPassages {
                language,
                difficulty,
            });
        }
        Ok(passages)
    }
}

impl TextProvider for SampleTextProvider {
    fn fetch(&self, request: &TextRequest) -> Result<String, ProviderError> {
        self.fetch_with_rng(request, &mut rand::thread_rng())
    }
}

/// Shuffle `passages` and join them with spaces, cycling until `target` chars.
/// `passages` must not contain empty strings.
fn assemble<R: Rng + ?Sized>(passages: &[&str], target: usize, rng: &mut R) -> String {
    let mut order = passages.to_vec();
    order.shuffle(rng);

    let mut text = String::new();
    let mut len = 0;
    'fill: loop {
        for passage in &order {
            if !text.is_empty() {
                text.push(' ');
                len += 1;
            }
            text.push_str(passage);
            len += passage.chars().count();
            if len >= target {
                break 'fill;
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::{rngs::StdRng, SeedableRng};

    fn request(language: Language, difficulty: Difficulty, mode: TestMode) -> TextRequest {
        TextRequest {
            language,
            difficulty,
            mode,
        }
    }

    #[test]
    fn bundled_corpus_loads() {
        let provider = SampleTextProvider::new().unwrap();
        assert!(provider.corpus.contains_key(&Language::Fr));
        assert!(provider.corpus.contains_key(&Language::En));
    }

    #[test]
    fn word_mode_returns_single_passage() {
        let provider = SampleTextProvider::new().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let text = provider
            .fetch_with_rng(
                &request(Language::En, Difficulty::Easy, TestMode::Words),
                &mut rng,
            )
            .unwrap();
        assert!(provider.corpus[&Language::En].easy.contains(&text));
    }

    #[test]
    fn timed_modes_reach_target_length() {
        let provider = SampleTextProvider::new().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for (mode, target) in [
            (TestMode::OneMinute, 400),
            (TestMode::ThreeMinutes, 1200),
            (TestMode::FiveMinutes, 2000),
        ] {
            let text = provider
                .fetch_with_rng(&request(Language::Fr, Difficulty::Hard, mode), &mut rng)
                .unwrap();
            let len = text.chars().count();
            assert!(len >= target, "{mode}: {len} < {target}");
            assert!(!text.starts_with(' '));
            assert!(!text.contains("  "));
        }
    }

    #[test]
    fn random_difficulty_draws_from_every_tier() {
        let provider = SampleTextProvider::new().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let tiers = &provider.corpus[&Language::En];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let text = provider
                .fetch_with_rng(
                    &request(Language::En, Difficulty::Random, TestMode::Words),
                    &mut rng,
                )
                .unwrap();
            if tiers.easy.contains(&text) {
                seen[0] = true;
            } else if tiers.medium.contains(&text) {
                seen[1] = true;
            } else if tiers.hard.contains(&text) {
                seen[2] = true;
            }
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn missing_language_falls_back_to_french_medium() {
        let provider = SampleTextProvider::new().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let text = provider
            .fetch_with_rng(
                &request(Language::De, Difficulty::Easy, TestMode::Words),
                &mut rng,
            )
            .unwrap();
        assert!(provider.corpus[&Language::Fr].medium.contains(&text));
    }

    #[test]
    fn empty_tier_is_an_error() {
        let provider = SampleTextProvider::from_json(
            r#"{ "en": { "easy": [], "medium": ["m"], "hard": ["h"] } }"#,
        )
        .unwrap();
        let result = provider.fetch(&request(Language::En, Difficulty::Easy, TestMode::OneMinute));
        assert_matches!(result, Err(ProviderError::NoPassages { .. }));
    }

    #[test]
    fn tier_of_empty_passages_is_an_error() {
        let provider = SampleTextProvider::from_json(
            r#"{ "en": { "easy": ["", ""], "medium": ["m"], "hard": ["h"] } }"#,
        )
        .unwrap();
        for mode in [TestMode::OneMinute, TestMode::Words] {
            assert_matches!(
                provider.fetch(&request(Language::En, Difficulty::Easy, mode)),
                Err(ProviderError::NoPassages { .. })
            );
        }
    }

    #[test]
    fn empty_passages_are_skipped() {
        let provider = SampleTextProvider::from_json(
            r#"{ "en": { "easy": ["", "ok"], "medium": ["m"], "hard": ["h"] } }"#,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let text = provider
            .fetch_with_rng(
                &request(Language::En, Difficulty::Easy, TestMode::OneMinute),
                &mut rng,
            )
            .unwrap();
        assert!(text.chars().count() >= 400);
        assert!(text.split(' ').all(|word| word == "ok"));
    }

    #[test]
    fn malformed_corpus_is_rejected() {
        assert_matches!(
            SampleTextProvider::from_json("{ not json"),
            Err(ProviderError::Parse(_))
        );
    }
}

//! Integer-valued lexicon scorer with negation handling.
//!
//! Word valences run from -4 to +4. A negator within the previous three
//! tokens flips the sign of a word's valence ("not good" counts against).
//! The raw sum is squashed into `(-1.0, 1.0)` with `sum / sqrt(sum² + 15)`.

use async_trait::async_trait;

use super::{label_for_score, tokenize, SentimentScorer};
use crate::error::ScoreError;
use crate::trends::round4;
use crate::types::SentimentResult;

const NEGATION_WINDOW: usize = 3;
const NORMALIZATION_ALPHA: f64 = 15.0;

const VALENCES: &[(&str, i32)] = &[
    ("amazing", 4),
    ("awesome", 4),
    ("excellent", 3),
    ("love", 3),
    ("best", 3),
    ("great", 3),
    ("breakthrough", 3),
    ("success", 2),
    ("good", 2),
    ("win", 2),
    ("better", 2),
    ("improved", 2),
    ("impressive", 2),
    ("useful", 2),
    ("fast", 1),
    ("growth", 1),
    ("stable", 1),
    ("secure", 1),
    ("easy", 1),
    ("terrible", -3),
    ("awful", -3),
    ("worst", -3),
    ("hate", -3),
    ("breach", -3),
    ("scam", -4),
    ("hacked", -3),
    ("bad", -2),
    ("broken", -2),
    ("crash", -2),
    ("outage", -2),
    ("layoffs", -2),
    ("failure", -2),
    ("failed", -2),
    ("lawsuit", -2),
    ("slow", -1),
    ("bug", -1),
    ("problem", -1),
    ("concern", -1),
    ("decline", -1),
];

fn valence(word: &str) -> i32 {
    VALENCES
        .iter()
        .find(|(w, _)| *w == word)
        .map_or(0, |&(_, v)| v)
}

fn is_negator(token: &str) -> bool {
    matches!(
        token,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "without"
    )
}

/// Raw valence sum with negation applied, plus the token count.
pub(crate) fn negation_sum(text: &str) -> (i32, usize) {
    let tokens: Vec<String> = tokenize(text).collect();
    let mut sum = 0;
    for (i, token) in tokens.iter().enumerate() {
        let base = valence(token);
        if base == 0 {
            continue;
        }
        let negated = (1..=NEGATION_WINDOW).any(|k| i >= k && is_negator(&tokens[i - k]));
        sum += if negated { -base } else { base };
    }
    (sum, tokens.len())
}

/// Backend with scores in `(-1.0, 1.0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegationScorer;

#[async_trait]
impl SentimentScorer for NegationScorer {
    fn name(&self) -> &'static str {
        "negation"
    }

    async fn try_score(&self, text: &str) -> Result<SentimentResult, ScoreError> {
        let (sum, _tokens) = negation_sum(text);
        let sum = f64::from(sum);
        let score = round4(sum / (sum * sum + NORMALIZATION_ALPHA).sqrt());
        Ok(SentimentResult {
            label: label_for_score(score),
            score,
        })
    }
}

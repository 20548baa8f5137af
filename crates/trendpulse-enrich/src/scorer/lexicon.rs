//! Weighted word-lexicon scorer for tech and news headlines.

use async_trait::async_trait;

use super::{label_for_score, tokenize, SentimentScorer};
use crate::error::ScoreError;
use crate::trends::round4;
use crate::types::SentimentResult;

/// Word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("awesome", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("best", 0.5),
    ("better", 0.3),
    ("fast", 0.3),
    ("faster", 0.3),
    ("improved", 0.3),
    ("improves", 0.3),
    ("innovative", 0.4),
    ("breakthrough", 0.5),
    ("launch", 0.2),
    ("launches", 0.2),
    ("success", 0.5),
    ("successful", 0.5),
    ("growth", 0.3),
    ("growing", 0.3),
    ("win", 0.4),
    ("wins", 0.4),
    ("record", 0.3),
    ("secure", 0.3),
    ("stable", 0.3),
    ("easy", 0.3),
    ("useful", 0.3),
    ("recommend", 0.4),
    ("impressive", 0.4),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("worst", -0.6),
    ("hate", -0.5),
    ("slow", -0.3),
    ("broken", -0.5),
    ("bug", -0.3),
    ("bugs", -0.3),
    ("crash", -0.5),
    ("crashes", -0.5),
    ("outage", -0.6),
    ("breach", -0.7),
    ("hacked", -0.7),
    ("vulnerability", -0.5),
    ("exploit", -0.5),
    ("lawsuit", -0.5),
    ("layoffs", -0.6),
    ("fails", -0.4),
    ("failed", -0.4),
    ("failure", -0.4),
    ("problem", -0.3),
    ("concern", -0.3),
    ("warning", -0.4),
    ("decline", -0.4),
    ("loss", -0.4),
    ("losses", -0.4),
    ("scam", -0.7),
    ("ban", -0.5),
    ("banned", -0.5),
];

/// Score a text string using the lexicon.
///
/// Tokenizes into lowercase words, sums matching weights, and clamps the
/// result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f64 {
    let mut score = 0.0_f64;
    for word in tokenize(text) {
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == word) {
            score += weight;
        }
    }
    round4(score.clamp(-1.0, 1.0))
}

/// Backend wrapping [`lexicon_score`]. Scores lie in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

#[async_trait]
impl SentimentScorer for LexiconScorer {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    async fn try_score(&self, text: &str) -> Result<SentimentResult, ScoreError> {
        let score = lexicon_score(text);
        Ok(SentimentResult {
            label: label_for_score(score),
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentimentLabel;

    #[test]
    fn empty_string_returns_zero() {
        assert_eq!(lexicon_score(""), 0.0);
    }

    #[test]
    fn unknown_text_returns_zero() {
        assert_eq!(lexicon_score("the quick brown fox"), 0.0);
    }

    #[test]
    fn positive_keyword_returns_positive() {
        let score = lexicon_score("this release is great");
        assert!(score > 0.0, "expected positive score, got {score}");
    }

    #[test]
    fn negative_keyword_returns_negative() {
        let score = lexicon_score("major outage reported");
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn mixed_text_is_summed_and_rounded() {
        // great (+0.4) + crash (-0.5)
        assert_eq!(lexicon_score("great phone but the app crash"), -0.1);
    }

    #[test]
    fn score_clamps_to_bounds() {
        let text = "great excellent best love recommend amazing awesome success";
        assert_eq!(lexicon_score(text), 1.0);
        let text = "breach hacked scam outage layoffs terrible worst";
        assert_eq!(lexicon_score(text), -1.0);
    }

    #[test]
    fn punctuation_and_case_are_ignored() {
        assert!(lexicon_score("GREAT!") > 0.0);
    }

    #[tokio::test]
    async fn scorer_labels_from_score() {
        let result = LexiconScorer.score("an awesome launch").await;
        assert_eq!(result.label, SentimentLabel::Positive);
        assert_eq!(result.score, 0.7);

        let result = LexiconScorer.score("nothing to see here").await;
        assert_eq!(result, SentimentResult::neutral());
    }
}

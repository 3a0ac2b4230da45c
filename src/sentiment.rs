//! # Comment sentiment
//! Lexicon polarity per comment (VADER-style neg/neu/pos + compound), a
//! three-way label per comment, and the mean label as the post's signal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::watch::SentimentCfg;
use crate::feed::{Comment, FeedClient, FeedItem};
use crate::record::CommentSentiment;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+").expect("valid url regex"));

const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
const C_INCR: f64 = 0.733;
const N_SCALAR: f64 = -0.74;
const NORM_ALPHA: f64 = 15.0;

/// neg/neu/pos sum to 1; compound is in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

impl PolarityScores {
    pub fn neutral() -> Self {
        Self {
            neg: 0.0,
            neu: 1.0,
            pos: 0.0,
            compound: 0.0,
        }
    }
}

pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> PolarityScores;
}

/// Lexicon scorer with negation, boosters, caps emphasis, "but" shift and
/// punctuation emphasis.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_valence(&self, w: &str) -> Option<f64> {
        LEXICON.get(w).copied()
    }
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> PolarityScores {
        let cleaned = RE_URL.replace_all(text, " ");
        let raw: Vec<&str> = tokenize(&cleaned).collect();
        if raw.is_empty() {
            return PolarityScores::neutral();
        }
        let lower: Vec<String> = raw.iter().map(|t| t.to_lowercase()).collect();

        // Caps only count as emphasis when the text is not shouting throughout.
        let caps = raw.iter().filter(|t| is_all_caps(t)).count();
        let cap_diff = caps > 0 && caps < raw.len();

        let mut sentiments = Vec::with_capacity(raw.len());
        for i in 0..raw.len() {
            let w = lower[i].as_str();
            if booster(w).is_some() {
                sentiments.push(0.0);
                continue;
            }
            let Some(base) = self.word_valence(w) else {
                sentiments.push(0.0);
                continue;
            };

            let mut v = base;
            if cap_diff && is_all_caps(raw[i]) {
                v += C_INCR * v.signum();
            }

            // Boostery v posledních 1..=3 tokenech, slábnou se vzdáleností.
            for (k, damp) in [(1usize, 1.0), (2, 0.95), (3, 0.9)] {
                if i < k {
                    break;
                }
                if let Some(b) = booster(lower[i - k].as_str()) {
                    let mut scalar = b * v.signum();
                    if cap_diff && is_all_caps(raw[i - k]) {
                        scalar += C_INCR * v.signum();
                    }
                    v += scalar * damp;
                }
            }

            // Negace: negátor v posledních 1..=3 tokenech obrací a tlumí valenci.
            if (1..=3).any(|k| i >= k && is_negator(lower[i - k].as_str())) {
                v *= N_SCALAR;
            }
            sentiments.push(v);
        }

        // Contrast: "but" discounts what came before and stresses what follows.
        if let Some(bi) = lower.iter().position(|w| w == "but") {
            for (j, s) in sentiments.iter_mut().enumerate() {
                if j < bi {
                    *s *= 0.5;
                } else if j > bi {
                    *s *= 1.5;
                }
            }
        }

        let punct = punctuation_emphasis(text);
        let sum: f64 = sentiments.iter().sum();
        let compound = if sum == 0.0 {
            0.0
        } else {
            normalize(sum + punct * sum.signum())
        };

        let mut pos_sum = 0.0;
        let mut neg_sum = 0.0;
        let mut neu_count = 0.0;
        for &s in &sentiments {
            if s > 0.0 {
                pos_sum += s + 1.0;
            } else if s < 0.0 {
                neg_sum += s - 1.0;
            } else {
                neu_count += 1.0;
            }
        }
        if pos_sum > neg_sum.abs() {
            pos_sum += punct;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= punct;
        }
        let total = pos_sum + neg_sum.abs() + neu_count;
        if total == 0.0 {
            return PolarityScores::neutral();
        }

        PolarityScores {
            neg: neg_sum.abs() / total,
            neu: neu_count / total,
            pos: pos_sum / total,
            compound,
        }
    }
}

/// Word tokens with surrounding punctuation stripped; apostrophes kept for "don't".
fn tokenize(s: &str) -> impl Iterator<Item = &str> + '_ {
    s.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
}

fn is_all_caps(tok: &str) -> bool {
    tok.chars().any(|c| c.is_alphabetic())
        && tok.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "nor"
            | "neither"
            | "nothing"
            | "none"
            | "nobody"
            | "without"
            | "cannot"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "shouldn't"
            | "wouldn't"
            | "couldn't"
            | "ain't"
            | "dont"
            | "isnt"
            | "cant"
    ) || tok.ends_with("n't")
}

fn booster(tok: &str) -> Option<f64> {
    match tok {
        "very" | "really" | "extremely" | "super" | "so" | "totally" | "absolutely"
        | "incredibly" | "hugely" | "highly" | "fucking" | "insanely" | "most" | "more" => {
            Some(B_INCR)
        }
        "barely" | "hardly" | "slightly" | "somewhat" | "kinda" | "sorta" | "marginally"
        | "less" => Some(B_DECR),
        _ => None,
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let ep = text.matches('!').count().min(4) as f64 * 0.292;
    let qm = text.matches('?').count();
    let qm_amp = match qm {
        0 | 1 => 0.0,
        2 | 3 => qm as f64 * 0.18,
        _ => 0.96,
    };
    ep + qm_amp
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + NORM_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Compound-score cut-offs for the per-comment label. Both are strict:
/// exactly `positive` is still neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelThresholds {
    pub positive: f64,
    pub negative: f64,
}

impl Default for LabelThresholds {
    fn default() -> Self {
        Self {
            positive: 0.1,
            negative: -0.1,
        }
    }
}

impl From<&SentimentCfg> for LabelThresholds {
    fn from(cfg: &SentimentCfg) -> Self {
        Self {
            positive: cfg.positive_threshold,
            negative: cfg.negative_threshold,
        }
    }
}

impl LabelThresholds {
    pub fn label(&self, compound: f64) -> i8 {
        if compound > self.positive {
            1
        } else if compound < self.negative {
            -1
        } else {
            0
        }
    }
}

/// Turns a post's comments into one `CommentSentiment`.
#[derive(Clone)]
pub struct SentimentAggregator {
    scorer: Arc<dyn PolarityScorer>,
    thresholds: LabelThresholds,
    expand_limit: usize,
}

impl SentimentAggregator {
    pub fn new(
        scorer: Arc<dyn PolarityScorer>,
        thresholds: LabelThresholds,
        expand_limit: usize,
    ) -> Self {
        Self {
            scorer,
            thresholds,
            expand_limit,
        }
    }

    /// Lexicon scorer with default thresholds.
    pub fn lexicon(expand_limit: usize) -> Self {
        Self::new(
            Arc::new(LexiconScorer::new()),
            LabelThresholds::default(),
            expand_limit,
        )
    }

    pub fn thresholds(&self) -> LabelThresholds {
        self.thresholds
    }

    /// Mean label over all comments. Empty → `Unavailable`; any comment
    /// without a body → `Erroneous`.
    pub fn aggregate(&self, comments: &[Comment]) -> CommentSentiment {
        if comments.is_empty() {
            return CommentSentiment::Unavailable;
        }
        let mut bodies = Vec::with_capacity(comments.len());
        for c in comments {
            match c.body.as_deref() {
                Some(b) => bodies.push(b),
                None => return CommentSentiment::Erroneous,
            }
        }
        let total: i64 = bodies
            .iter()
            .map(|b| self.thresholds.label(self.scorer.polarity(b).compound) as i64)
            .sum();
        CommentSentiment::Score(total as f64 / bodies.len() as f64)
    }

    /// Fetch comments through the feed and aggregate. A failed fetch degrades
    /// to `Unavailable` rather than failing the record.
    pub async fn resolve(&self, feed: &dyn FeedClient, item: &FeedItem) -> CommentSentiment {
        match feed.comments(item, self.expand_limit).await {
            Ok(comments) => {
                let out = self.aggregate(&comments);
                if out == CommentSentiment::Erroneous {
                    tracing::warn!(url = %item.url, "malformed comment body");
                }
                out
            }
            Err(e) => {
                tracing::warn!(error = ?e, url = %item.url, "comment fetch failed");
                metrics::counter!("watch_feed_errors_total", "call" => "comments").increment(1);
                CommentSentiment::Unavailable
            }
        }
    }
}

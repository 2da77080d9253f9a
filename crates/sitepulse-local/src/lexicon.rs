//! English polarity lexicon.
//!
//! Rule-based estimator: look up word polarities, scale by a preceding intensifier, damp and
//! flip under a recent negation, then average. Pure function of the input text.

use sitepulse_core::PolarityEstimator;
use std::collections::HashMap;

/// Tokens a negation stays active for.
const NEGATION_WINDOW: usize = 3;

/// Negated polarity is flipped and halved ("not good" is mildly negative, not "bad").
const NEGATION_FACTOR: f64 = -0.5;

const POLARITIES: &[(&str, f64)] = &[
    // positive
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("outstanding", 0.9),
    ("superb", 1.0),
    ("awesome", 1.0),
    ("amazing", 0.6),
    ("wonderful", 1.0),
    ("fantastic", 0.4),
    ("brilliant", 0.9),
    ("perfect", 1.0),
    ("best", 1.0),
    ("better", 0.5),
    ("nice", 0.6),
    ("fine", 0.4),
    ("happy", 0.8),
    ("glad", 0.5),
    ("pleased", 0.5),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("like", 0.2),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("beautiful", 0.85),
    ("friendly", 0.4),
    ("helpful", 0.5),
    ("reliable", 0.5),
    ("fast", 0.2),
    ("easy", 0.4),
    ("clean", 0.4),
    ("comfortable", 0.4),
    ("affordable", 0.3),
    ("recommend", 0.4),
    ("recommended", 0.4),
    ("impressive", 1.0),
    ("innovative", 0.5),
    ("positive", 0.2),
    ("success", 0.3),
    ("successful", 0.75),
    ("satisfied", 0.5),
    ("trusted", 0.4),
    ("quality", 0.3),
    ("valuable", 0.5),
    ("exciting", 0.3),
    ("favorite", 0.5),
    ("fun", 0.3),
    ("smooth", 0.4),
    ("strong", 0.4),
    ("secure", 0.4),
    ("win", 0.8),
    ("thanks", 0.2),
    // negative
    ("bad", -0.7),
    ("poor", -0.4),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("worst", -1.0),
    ("worse", -0.4),
    ("disappointing", -0.6),
    ("disappointed", -0.75),
    ("hate", -0.8),
    ("hated", -0.8),
    ("ugly", -0.7),
    ("sad", -0.5),
    ("angry", -0.5),
    ("annoying", -0.8),
    ("useless", -0.5),
    ("broken", -0.4),
    ("slow", -0.3),
    ("wrong", -0.5),
    ("difficult", -0.5),
    ("hard", -0.3),
    ("expensive", -0.5),
    ("overpriced", -0.6),
    ("dirty", -0.6),
    ("rude", -0.3),
    ("unhelpful", -0.5),
    ("unreliable", -0.5),
    ("fail", -0.5),
    ("failed", -0.5),
    ("failure", -0.3),
    ("problem", -0.4),
    ("problems", -0.4),
    ("issue", -0.2),
    ("issues", -0.2),
    ("bug", -0.3),
    ("buggy", -0.5),
    ("scam", -0.9),
    ("fraud", -0.9),
    ("fake", -0.5),
    ("negative", -0.3),
    ("boring", -1.0),
    ("complaint", -0.4),
    ("complaints", -0.4),
    ("lost", -0.3),
    ("late", -0.3),
    ("crash", -0.6),
    ("risk", -0.3),
    ("dangerous", -0.6),
    ("unfortunately", -0.5),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("so", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("highly", 1.3),
    ("totally", 1.3),
    ("absolutely", 1.5),
    ("truly", 1.3),
    ("most", 1.3),
    ("quite", 1.1),
    ("pretty", 1.1),
    ("somewhat", 0.8),
    ("slightly", 0.7),
    ("barely", 0.5),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "neither", "nor", "cannot", "can't", "cant", "don't",
    "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't", "isnt", "aren't", "arent", "wasn't",
    "wasnt", "weren't", "werent", "won't", "wont", "wouldn't", "wouldnt", "shouldn't", "shouldnt",
    "couldn't", "couldnt", "without",
];

#[derive(Debug, Clone)]
pub struct PatternLexicon {
    words: HashMap<String, f64>,
    intensifiers: HashMap<String, f64>,
    negations: Vec<String>,
}

impl Default for PatternLexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternLexicon {
    pub fn new() -> Self {
        Self {
            words: POLARITIES
                .iter()
                .map(|(w, p)| (w.to_string(), *p))
                .collect(),
            intensifiers: INTENSIFIERS
                .iter()
                .map(|(w, m)| (w.to_string(), *m))
                .collect(),
            negations: NEGATIONS.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn is_negation(&self, word: &str) -> bool {
        self.negations.iter().any(|n| n == word)
    }

    /// Average polarity of the sentiment-bearing words in `text`, or 0.0 if there are none.
    pub fn score(&self, text: &str) -> f64 {
        let mut scores: Vec<f64> = Vec::new();
        let mut negation_left = 0usize;
        let mut intensity = 1.0f64;

        for raw in text.split(|c: char| !(c.is_alphanumeric() || c == '\'')) {
            let token = raw.trim_matches('\'').to_lowercase();
            if token.is_empty() {
                continue;
            }
            if self.is_negation(&token) {
                negation_left = NEGATION_WINDOW;
                continue;
            }
            if let Some(m) = self.intensifiers.get(&token) {
                intensity = *m;
                continue;
            }
            if let Some(p) = self.words.get(&token) {
                let mut s = p * intensity;
                if negation_left > 0 {
                    s *= NEGATION_FACTOR;
                }
                scores.push(s.clamp(-1.0, 1.0));
                negation_left = 0;
                intensity = 1.0;
                continue;
            }
            intensity = 1.0;
            negation_left = negation_left.saturating_sub(1);
        }

        if scores.is_empty() {
            return 0.0;
        }
        (scores.iter().sum::<f64>() / scores.len() as f64).clamp(-1.0, 1.0)
    }
}

impl PolarityEstimator for PatternLexicon {
    fn polarity(&self, text: &str) -> f64 {
        self.score(text)
    }
}

use serde::{Deserialize, Serialize};

/// Score bucket derived from a numeric lead score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreLabel {
    Hot,
    Warm,
    Cold,
}

impl ScoreLabel {
    /// Buckets a score into Hot (>= 70), Warm (40..70) or Cold (< 40).
    /// Every score-to-label conversion in the system goes through here;
    /// labels returned by the classifier itself are never trusted.
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            Self::Hot
        } else if score >= 40 {
            Self::Warm
        } else {
            Self::Cold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "Hot",
            Self::Warm => "Warm",
            Self::Cold => "Cold",
        }
    }

    /// Lenient parse for label strings coming back from the record store,
    /// which may carry decorative symbols around the bucket word.
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_lowercase();
        if lower.starts_with("hot") {
            Some(Self::Hot)
        } else if lower.starts_with("warm") {
            Some(Self::Warm)
        } else if lower.starts_with("cold") {
            Some(Self::Cold)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ScoreLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a candidate label against the record store's accepted vocabulary.
///
/// The store's select options may differ lexically from the canonical bucket
/// literals (extra symbols, whitespace). Matching order: exact, then with all
/// non-alphanumeric characters stripped and both sides lowercased. When the
/// vocabulary is empty or nothing matches, the bucket is inferred from the
/// cleaned string's leading token so the result is always a usable label.
pub fn reconcile_label(candidate: &str, vocabulary: &[String]) -> String {
    let cleaned: String = candidate
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect();
    let cleaned = cleaned.trim();

    if !vocabulary.is_empty() {
        if let Some(exact) = vocabulary.iter().find(|option| option.as_str() == cleaned) {
            return exact.clone();
        }
        let wanted = normalize(cleaned);
        if let Some(fuzzy) = vocabulary.iter().find(|option| normalize(option) == wanted) {
            return fuzzy.clone();
        }
        log::warn!("no score label option matches {cleaned:?}, falling back to bucket inference");
    }

    let bucket = ScoreLabel::parse(cleaned).unwrap_or(ScoreLabel::Cold);

    // The inferred bucket must itself resolve to the store's accepted string,
    // otherwise reconciling twice would give a different answer.
    let wanted = bucket.as_str().to_lowercase();
    if let Some(option) = vocabulary.iter().find(|option| normalize(option) == wanted) {
        return option.clone();
    }
    bucket.as_str().to_string()
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(ScoreLabel::from_score(100), ScoreLabel::Hot);
        assert_eq!(ScoreLabel::from_score(70), ScoreLabel::Hot);
        assert_eq!(ScoreLabel::from_score(69), ScoreLabel::Warm);
        assert_eq!(ScoreLabel::from_score(40), ScoreLabel::Warm);
        assert_eq!(ScoreLabel::from_score(39), ScoreLabel::Cold);
        assert_eq!(ScoreLabel::from_score(0), ScoreLabel::Cold);
    }

    #[test]
    fn bucket_is_total() {
        for score in 0..=100u8 {
            let label = ScoreLabel::from_score(score);
            match label {
                ScoreLabel::Hot => assert!(score >= 70),
                ScoreLabel::Warm => assert!((40..70).contains(&score)),
                ScoreLabel::Cold => assert!(score < 40),
            }
        }
    }

    #[test]
    fn reconcile_exact_match() {
        let vocab = vec!["Hot 🔥".to_string(), "Warm 🌡️".to_string(), "Cold ❄️".to_string()];
        assert_eq!(reconcile_label("Hot 🔥", &vocab), "Hot 🔥");
    }

    #[test]
    fn reconcile_fuzzy_match_ignores_decoration() {
        let vocab = vec!["Hot 🔥".to_string(), "Warm 🌡️".to_string(), "Cold ❄️".to_string()];
        assert_eq!(reconcile_label("Hot", &vocab), "Hot 🔥");
        assert_eq!(reconcile_label("\"Warm\"", &vocab), "Warm 🌡️");
        assert_eq!(reconcile_label("  cold ", &vocab), "Cold ❄️");
    }

    #[test]
    fn reconcile_falls_back_to_bucket_literal() {
        assert_eq!(reconcile_label("Hot 🔥", &[]), "Hot");
        assert_eq!(reconcile_label("warm-ish", &[]), "Warm");
        assert_eq!(reconcile_label("garbage", &[]), "Cold");
    }

    #[test]
    fn reconcile_is_idempotent() {
        let vocab = vec!["Hot 🔥".to_string(), "Warm 🌡️".to_string(), "Cold ❄️".to_string()];
        for candidate in ["Hot", "Hot 🔥", "'warm'", "Cold ❄️", "nonsense", "Warm"] {
            let once = reconcile_label(candidate, &vocab);
            assert_eq!(reconcile_label(&once, &vocab), once);
        }
        for candidate in ["Hot", "Warm", "Cold", "hotline"] {
            let once = reconcile_label(candidate, &[]);
            assert_eq!(reconcile_label(&once, &[]), once);
        }
    }

    #[test]
    fn reconcile_never_leaves_the_bucket_space() {
        for candidate in ["", "???", "HOT STUFF", "warmer", "colder than ice"] {
            let resolved = reconcile_label(candidate, &[]);
            assert!(ScoreLabel::parse(&resolved).is_some() || resolved == "Cold");
        }
    }
}

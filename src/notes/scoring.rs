//! Composite scoring for vector candidates.
//!
//! `composite = wR·similarity + wT·recency + wC·confidence + boost`, clamped to
//! `[0, 1]`. Similarity is min-max normalized over the candidate set with the
//! distance range floored at [`MIN_DISTANCE_RANGE`], so a single candidate or
//! a set of equal distances all score a similarity of 1.0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::ContentType;

/// Floor for `maxDistance − minDistance` when normalizing.
pub const MIN_DISTANCE_RANGE: f64 = 1.0;

/// Score given to every full-text fallback hit.
pub const FULL_TEXT_PLACEHOLDER_SCORE: f64 = 0.5;

/// Score given to every keyword fallback hit.
pub const KEYWORD_PLACEHOLDER_SCORE: f64 = 0.4;

/// Additive boost for decisions and handoffs.
pub const PRIVILEGED_TYPE_BOOST: f64 = 0.1;

/// Named weight sets for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Relevance-heavy, few results, high floor.
    Precise,
    #[default]
    Balanced,
    /// Leans on recency and confidence, many results, low floor.
    Broad,
}

/// Weights, result cap, and score floor for a [`Profile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileWeights {
    pub relevance: f64,
    pub recency: f64,
    pub confidence: f64,
    pub max_results: usize,
    pub min_score: f64,
}

impl Profile {
    pub fn weights(self) -> ProfileWeights {
        match self {
            Self::Precise => ProfileWeights {
                relevance: 0.8,
                recency: 0.1,
                confidence: 0.1,
                max_results: 5,
                min_score: 0.5,
            },
            Self::Balanced => ProfileWeights {
                relevance: 0.6,
                recency: 0.2,
                confidence: 0.2,
                max_results: 10,
                min_score: 0.3,
            },
            Self::Broad => ProfileWeights {
                relevance: 0.4,
                recency: 0.3,
                confidence: 0.3,
                max_results: 20,
                min_score: 0.1,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precise => "precise",
            Self::Balanced => "balanced",
            Self::Broad => "broad",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "precise" => Ok(Self::Precise),
            "balanced" => Ok(Self::Balanced),
            "broad" => Ok(Self::Broad),
            _ => Err(format!("unknown search profile: {s} (expected precise, balanced, or broad)")),
        }
    }
}

/// Min-max normalization bounds for one candidate set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRange {
    min: f64,
    range: f64,
}

impl DistanceRange {
    /// `None` for an empty candidate set.
    pub fn from_distances(distances: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut iter = distances.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self {
            min,
            range: (max - min).max(MIN_DISTANCE_RANGE),
        })
    }

    /// `1 − (d − min) / range`, in `[0, 1]` for any distance from the set.
    pub fn similarity(&self, distance: f64) -> f64 {
        (1.0 - (distance - self.min) / self.range).clamp(0.0, 1.0)
    }
}

/// Exponential decay on age: 1.0 when modified now (or in the future), 0.5
/// after one half-life. Unparseable timestamps score 0.
pub fn recency_score(modified: &str, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    let Ok(modified) = DateTime::parse_from_rfc3339(modified) else {
        return 0.0;
    };
    let age_days = (now - modified.with_timezone(&Utc)).num_seconds().max(0) as f64 / 86_400.0;
    if half_life_days <= 0.0 {
        return if age_days == 0.0 { 1.0 } else { 0.0 };
    }
    0.5f64.powf(age_days / half_life_days)
}

/// Boost for privileged content types; unknown types get none.
pub fn content_type_boost(content_type: &str) -> f64 {
    match content_type.parse::<ContentType>() {
        Ok(ct) if ct.is_privileged() => PRIVILEGED_TYPE_BOOST,
        _ => 0.0,
    }
}

/// The per-candidate inputs to [`composite`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub similarity: f64,
    pub recency: f64,
    pub confidence: f64,
    pub boost: f64,
}

pub fn composite(weights: &ProfileWeights, signals: &Signals) -> f64 {
    let score = weights.relevance * signals.similarity
        + weights.recency * signals.recency
        + weights.confidence * signals.confidence.clamp(0.0, 1.0)
        + signals.boost;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn profile_weights_sum_to_one() {
        for p in [Profile::Precise, Profile::Balanced, Profile::Broad] {
            let w = p.weights();
            assert!((w.relevance + w.recency + w.confidence - 1.0).abs() < 1e-9, "{p}");
            assert_eq!(p.as_str().parse::<Profile>().unwrap(), p);
        }
        assert!("loose".parse::<Profile>().is_err());
        assert_eq!(Profile::default(), Profile::Balanced);
    }

    #[test]
    fn similarity_normalizes_within_range() {
        let range = DistanceRange::from_distances([0.5, 1.5, 2.5]).unwrap();
        assert!((range.similarity(0.5) - 1.0).abs() < 1e-9);
        assert!((range.similarity(1.5) - 0.5).abs() < 1e-9);
        assert!(range.similarity(2.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_range_is_floored() {
        // all distances equal: no division by zero, everything is fully similar
        let equal = DistanceRange::from_distances([0.7, 0.7, 0.7]).unwrap();
        assert_eq!(equal.similarity(0.7), 1.0);

        // narrow spread keeps the 1.0 floor rather than stretching to [0, 1]
        let narrow = DistanceRange::from_distances([0.2, 0.4]).unwrap();
        assert!((narrow.similarity(0.4) - 0.8).abs() < 1e-9);

        let single = DistanceRange::from_distances([3.0]).unwrap();
        assert_eq!(single.similarity(3.0), 1.0);

        assert!(DistanceRange::from_distances(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn recency_is_monotonic_and_bounded() {
        let now = Utc::now();
        let today = recency_score(&now.to_rfc3339(), now, 30.0);
        let month = recency_score(&(now - Duration::days(30)).to_rfc3339(), now, 30.0);
        let year = recency_score(&(now - Duration::days(365)).to_rfc3339(), now, 30.0);
        let future = recency_score(&(now + Duration::days(3)).to_rfc3339(), now, 30.0);

        assert!((today - 1.0).abs() < 1e-9);
        assert!((month - 0.5).abs() < 1e-6);
        assert!(year < month && year > 0.0);
        assert_eq!(future, 1.0);
        assert_eq!(recency_score("not a date", now, 30.0), 0.0);
    }

    #[test]
    fn privileged_types_are_boosted() {
        assert_eq!(content_type_boost("decision"), PRIVILEGED_TYPE_BOOST);
        assert_eq!(content_type_boost("handoff"), PRIVILEGED_TYPE_BOOST);
        assert_eq!(content_type_boost("note"), 0.0);
        assert_eq!(content_type_boost("whatever"), 0.0);
    }

    #[test]
    fn composite_is_clamped() {
        let w = Profile::Balanced.weights();
        let max = Signals {
            similarity: 1.0,
            recency: 1.0,
            confidence: 1.0,
            boost: PRIVILEGED_TYPE_BOOST,
        };
        assert_eq!(composite(&w, &max), 1.0);

        let mid = Signals {
            similarity: 0.5,
            recency: 0.5,
            confidence: 0.5,
            boost: 0.0,
        };
        assert!((composite(&w, &mid) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn placeholder_scores_are_distinct() {
        assert_ne!(FULL_TEXT_PLACEHOLDER_SCORE, KEYWORD_PLACEHOLDER_SCORE);
        assert!((0.0..=1.0).contains(&FULL_TEXT_PLACEHOLDER_SCORE));
        assert!((0.0..=1.0).contains(&KEYWORD_PLACEHOLDER_SCORE));
    }
}

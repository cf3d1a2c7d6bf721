//! Score model: the 14 CMRA scores, their ranking and stage classification.
//!
//! The ranking is computed once when a [`ScoreSet`] is built. Stages are never
//! stored; they are derived from a percentage with [`Stage::classify`].

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Upper bound of the raw scale every domain and sub-domain score is reported on.
pub const RAW_SCALE_MAX: f64 = 25.0;

/// Width of one stage bucket, in percentage points.
const STAGE_BUCKET_WIDTH: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("percentage {0} is outside 0..=100")]
    PercentageOutOfRange(f64),
    #[error("raw score for '{key}' is {value}, expected 0..={max}", max = RAW_SCALE_MAX)]
    RawScoreOutOfRange { key: &'static str, value: f64 },
}

/// The 14 score keys, in the order the form reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKey {
    Discipleship,
    Education,
    Training,
    Sending,
    Sending1,
    Membercare,
    Support,
    Praying,
    Giving,
    Community,
    Structure,
    Organisation,
    Policies,
    Partnerships,
}

impl ScoreKey {
    pub const ALL: [ScoreKey; 14] = [
        ScoreKey::Discipleship,
        ScoreKey::Education,
        ScoreKey::Training,
        ScoreKey::Sending,
        ScoreKey::Sending1,
        ScoreKey::Membercare,
        ScoreKey::Support,
        ScoreKey::Praying,
        ScoreKey::Giving,
        ScoreKey::Community,
        ScoreKey::Structure,
        ScoreKey::Organisation,
        ScoreKey::Policies,
        ScoreKey::Partnerships,
    ];

    /// Key as it appears in the form's score variables.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreKey::Discipleship => "discipleship",
            ScoreKey::Education => "education",
            ScoreKey::Training => "training",
            ScoreKey::Sending => "sending",
            ScoreKey::Sending1 => "sending1",
            ScoreKey::Membercare => "membercare",
            ScoreKey::Support => "support",
            ScoreKey::Praying => "praying",
            ScoreKey::Giving => "giving",
            ScoreKey::Community => "community",
            ScoreKey::Structure => "structure",
            ScoreKey::Organisation => "organisation",
            ScoreKey::Policies => "policies",
            ScoreKey::Partnerships => "partnerships",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Human readable name used in the report.
    pub fn display_name(self) -> &'static str {
        match self {
            ScoreKey::Discipleship => "Discipleship",
            ScoreKey::Education => "Missions Education",
            ScoreKey::Training => "Missions Training",
            ScoreKey::Sending => "Sending",
            ScoreKey::Sending1 => "Sending Practice",
            ScoreKey::Membercare => "Member Care",
            ScoreKey::Support => "Support",
            ScoreKey::Praying => "Prayer",
            ScoreKey::Giving => "Giving",
            ScoreKey::Community => "Missions Community",
            ScoreKey::Structure => "Structure",
            ScoreKey::Organisation => "Leadership & Organisation",
            ScoreKey::Policies => "Policies",
            ScoreKey::Partnerships => "Partnerships",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (key, value) pair of the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedScore {
    pub key: ScoreKey,
    pub value: f64,
}

/// Sorts the pairs by value, highest first, keeping input order among equal
/// values. Returns `(top_3, bottom_3)` where `bottom_3` starts with the weakest.
pub fn rank(scores: &[(ScoreKey, f64)]) -> (Vec<RankedScore>, Vec<RankedScore>) {
    let ranking = ranking_of(scores);
    split_ranking(&ranking)
}

fn ranking_of(scores: &[(ScoreKey, f64)]) -> Vec<RankedScore> {
    let mut ranking: Vec<RankedScore> = scores
        .iter()
        .map(|&(key, value)| RankedScore { key, value })
        .collect();
    // sort_by is stable
    ranking.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranking
}

fn split_ranking(ranking: &[RankedScore]) -> (Vec<RankedScore>, Vec<RankedScore>) {
    let top = ranking.iter().take(3).copied().collect();
    let bottom = ranking.iter().rev().take(3).copied().collect();
    (top, bottom)
}

/// The 14 scores of one response plus the overall figures.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSet {
    values: [f64; 14],
    /// Overall raw score reported by the form.
    pub score: Option<f64>,
    /// Overall readiness percentage reported by the form.
    pub finalpercentage: Option<f64>,
    ranking: Vec<RankedScore>,
    top_3: Vec<RankedScore>,
    bottom_3: Vec<RankedScore>,
}

impl ScoreSet {
    pub fn new(values: [f64; 14], score: Option<f64>, finalpercentage: Option<f64>) -> Self {
        let pairs: Vec<(ScoreKey, f64)> = ScoreKey::ALL
            .iter()
            .map(|&key| (key, values[key.index()]))
            .collect();
        let ranking = ranking_of(&pairs);
        let (top_3, bottom_3) = split_ranking(&ranking);

        Self {
            values,
            score,
            finalpercentage,
            ranking,
            top_3,
            bottom_3,
        }
    }

    /// Builds the set from a key -> number lookup. Keys that are absent default
    /// to zero and are returned so the caller can report them.
    pub fn from_lookup(lookup: &HashMap<String, f64>) -> (Self, Vec<ScoreKey>) {
        let mut values = [0.0; 14];
        let mut missing = Vec::new();

        for key in ScoreKey::ALL {
            match lookup.get(key.as_str()) {
                Some(&value) => values[key.index()] = value,
                None => missing.push(key),
            }
        }

        let set = Self::new(
            values,
            lookup.get("score").copied(),
            lookup.get("finalpercentage").copied(),
        );
        (set, missing)
    }

    pub fn get(&self, key: ScoreKey) -> f64 {
        self.values[key.index()]
    }

    /// All 14 scores, strongest first.
    pub fn ranking(&self) -> &[RankedScore] {
        &self.ranking
    }

    pub fn top_3(&self) -> &[RankedScore] {
        &self.top_3
    }

    /// The three weakest scores, weakest first.
    pub fn bottom_3(&self) -> &[RankedScore] {
        &self.bottom_3
    }

    /// Percentage of the raw scale for `key`.
    pub fn percentage(&self, key: ScoreKey) -> Result<f64, ScoreError> {
        raw_to_percentage(key, self.get(key))
    }
}

/// Converts a raw 0..=25 score into a percentage.
pub fn raw_to_percentage(key: ScoreKey, raw: f64) -> Result<f64, ScoreError> {
    if !raw.is_finite() || !(0.0..=RAW_SCALE_MAX).contains(&raw) {
        return Err(ScoreError::RawScoreOutOfRange {
            key: key.as_str(),
            value: raw,
        });
    }
    Ok(raw * 100.0 / RAW_SCALE_MAX)
}

/// Maturity stage, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Stage(u8);

impl Stage {
    pub const MIN: Stage = Stage(1);
    pub const MAX: Stage = Stage(5);

    /// Classifies a percentage into 20-point buckets with inclusive upper
    /// bounds: 0..=20 is stage 1, (20, 40] is stage 2, up to (80, 100] as 5.
    pub fn classify(percentage: f64) -> Result<Stage, ScoreError> {
        if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
            return Err(ScoreError::PercentageOutOfRange(percentage));
        }

        // Report figures are shown with two decimals; classify what is shown.
        let shown = (percentage * 100.0).round() / 100.0;
        let bucket = (shown / STAGE_BUCKET_WIDTH).ceil() as u8;
        Ok(Stage(bucket.clamp(Self::MIN.0, Self::MAX.0)))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero based position, for indexing the content tables.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Unengaged",
            2 => "Aware",
            3 => "Emerging",
            4 => "Established",
            _ => "Multiplying",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage {} ({})", self.0, self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_values() -> [f64; 14] {
        [
            20.0, 18.0, 12.0, 10.0, 22.0, 5.0, 15.0, 25.0, 3.0, 9.0, 14.0, 7.0, 1.0, 16.0,
        ]
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(Stage::classify(0.0).unwrap().value(), 1);
        assert_eq!(Stage::classify(20.0).unwrap().value(), 1);
        assert_eq!(Stage::classify(21.0).unwrap().value(), 2);
        assert_eq!(Stage::classify(40.0).unwrap().value(), 2);
        assert_eq!(Stage::classify(60.0).unwrap().value(), 3);
        assert_eq!(Stage::classify(80.0).unwrap().value(), 4);
        assert_eq!(Stage::classify(80.5).unwrap().value(), 5);
        assert_eq!(Stage::classify(100.0).unwrap().value(), 5);
    }

    #[test]
    fn test_classify_inside_buckets() {
        // Every value strictly inside a bucket takes the bucket's upper stage
        assert_eq!(Stage::classify(30.0).unwrap().value(), 2);
        assert_eq!(Stage::classify(50.0).unwrap().value(), 3);
        assert_eq!(Stage::classify(20.004).unwrap().value(), 1);
        assert_eq!(Stage::classify(99.99).unwrap().value(), 5);
    }

    #[test]
    fn test_classify_rejects_out_of_range() {
        assert!(Stage::classify(-0.1).is_err());
        assert!(Stage::classify(100.01).is_err());
        assert!(Stage::classify(f64::NAN).is_err());
    }

    #[test]
    fn test_ranking_top_and_bottom() {
        let set = ScoreSet::new(sample_values(), Some(200.0), Some(57.0));

        let top: Vec<ScoreKey> = set.top_3().iter().map(|r| r.key).collect();
        assert_eq!(
            top,
            vec![ScoreKey::Praying, ScoreKey::Sending1, ScoreKey::Discipleship]
        );

        let bottom: Vec<ScoreKey> = set.bottom_3().iter().map(|r| r.key).collect();
        assert_eq!(
            bottom,
            vec![ScoreKey::Policies, ScoreKey::Giving, ScoreKey::Membercare]
        );
        assert_eq!(set.ranking().len(), 14);
    }

    #[test]
    fn test_ties_keep_enumeration_order() {
        let set = ScoreSet::new([10.0; 14], None, None);
        let order: Vec<ScoreKey> = set.ranking().iter().map(|r| r.key).collect();
        assert_eq!(order, ScoreKey::ALL.to_vec());

        let bottom: Vec<ScoreKey> = set.bottom_3().iter().map(|r| r.key).collect();
        assert_eq!(
            bottom,
            vec![ScoreKey::Partnerships, ScoreKey::Policies, ScoreKey::Organisation]
        );
    }

    #[test]
    fn test_from_lookup_defaults_missing_to_zero() {
        let mut lookup = HashMap::new();
        lookup.insert("discipleship".to_string(), 20.0);
        lookup.insert("finalpercentage".to_string(), 64.0);

        let (set, missing) = ScoreSet::from_lookup(&lookup);
        assert_eq!(set.get(ScoreKey::Discipleship), 20.0);
        assert_eq!(set.get(ScoreKey::Giving), 0.0);
        assert_eq!(set.finalpercentage, Some(64.0));
        assert_eq!(set.score, None);
        assert_eq!(missing.len(), 13);
        assert!(!missing.contains(&ScoreKey::Discipleship));
    }

    #[test]
    fn test_raw_to_percentage() {
        assert_eq!(raw_to_percentage(ScoreKey::Discipleship, 20.0).unwrap(), 80.0);
        assert_eq!(raw_to_percentage(ScoreKey::Giving, 15.0).unwrap(), 60.0);
        assert!(raw_to_percentage(ScoreKey::Giving, 26.0).is_err());
        assert!(raw_to_percentage(ScoreKey::Giving, -1.0).is_err());
    }

    #[test]
    fn test_key_round_trip() {
        for key in ScoreKey::ALL {
            assert_eq!(ScoreKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(ScoreKey::from_key("unknown"), None);
    }
}

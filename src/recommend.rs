//! Retention ranking: which copy of a duplicate group to keep.
//!
//! # Overview
//!
//! Given the live members of a duplicate group, the [`Recommender`] picks
//! exactly one file to keep using an ordered ladder of factors:
//!
//! 1. **Version** — highest parseable version wins; skipped entirely when
//!    no member carries one.
//! 2. **Path authority** — recognized install locations outrank transient
//!    locations (temp, downloads); unmatched paths are neutral.
//! 3. **Recency** — strictly newer modification time wins.
//! 4. **Size** — strictly larger wins; the weakest signal.
//!
//! Each factor only breaks ties left by the factors above it. A full tie
//! falls back to the first member in group order, never a random pick.
//! The confidence score reflects the factor that made the winner unique:
//! high for a version win, low for a size-only win, lowest for a tie.
//!
//! The output is a structured [`Recommendation`]; the rationale string is
//! explanation text only and must never be parsed for decisions.

use std::cmp::Ordering;
use std::fmt;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::scanner::{FileId, FileRecord, Hash};

/// Default patterns marking authoritative install locations.
pub const DEFAULT_OFFICIAL_PATTERNS: [&str; 6] = [
    r"(?i)program files",
    r"(?i)[\\/]usr[\\/](local[\\/])?(bin|lib|share)",
    r"(?i)(^|[\\/])opt[\\/]",
    r"(?i)[\\/]applications([\\/]|$)",
    r"(?i)[\\/]windows[\\/]system32",
    r"(?i)[\\/]usr[\\/]local([\\/]|$)",
];

/// Default patterns marking transient locations.
pub const DEFAULT_TRANSIENT_PATTERNS: [&str; 4] = [
    r"(?i)(^|[\\/])(tmp|temp)([\\/]|$)",
    r"(?i)(^|[\\/])downloads?([\\/]|$)",
    r"(?i)(^|[\\/])\.?cache([\\/]|$)",
    r"(?i)(^|[\\/])(\.trash|trash|\$?recycle\.bin)([\\/]|$)",
];

/// Confidence assigned to a recommendation decided by no factor at all.
const TIE_CONFIDENCE: f64 = 0.3;

/// The ranking factors, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Factor {
    /// Parseable version strings.
    Version,
    /// Official vs. transient path patterns.
    PathAuthority,
    /// Last-modified timestamp.
    Recency,
    /// File size.
    Size,
}

impl Factor {
    /// All factors in priority order.
    pub const LADDER: [Factor; 4] = [
        Factor::Version,
        Factor::PathAuthority,
        Factor::Recency,
        Factor::Size,
    ];

    /// Confidence when this factor made the winner unique.
    ///
    /// Monotone in priority: a version win is a much stronger signal than
    /// a size win.
    #[must_use]
    pub fn confidence(self) -> f64 {
        match self {
            Factor::Version => 0.9,
            Factor::PathAuthority => 0.75,
            Factor::Recency => 0.6,
            Factor::Size => 0.4,
        }
    }

    /// Short human-readable label for rationale text.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Factor::Version => "version",
            Factor::PathAuthority => "install path",
            Factor::Recency => "recency",
            Factor::Size => "size",
        }
    }
}

/// A parsed dotted version, compared numerically component by component.
///
/// Missing components count as zero, so `2` == `2.0` and `1.2` < `1.2.1`.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    raw: String,
}

impl Version {
    /// Parse a version string like `2.1` or `v1.0.3`.
    ///
    /// Returns `None` unless every dot-separated component is numeric.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        if digits.is_empty() {
            return None;
        }
        let components = digits
            .split('.')
            .map(|c| c.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            components,
            raw: trimmed.to_string(),
        })
    }

    /// The original string this version was parsed from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How authoritative a file's location looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathAuthority {
    /// Temp, download, cache, or trash locations.
    Transient,
    /// Neither pattern set matched.
    Neutral,
    /// Recognized install locations.
    Official,
}

/// The retention decision for one duplicate group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Hash of the group this recommendation belongs to.
    pub group_key: Hash,
    /// The member to keep.
    pub file_to_keep: FileId,
    /// Confidence in [0, 1]; low values signal genuine ambiguity.
    pub confidence: f64,
    /// Human-readable explanation naming the discriminating factors.
    /// Explanation only; never the source of truth for a state change.
    pub rationale: String,
    /// The factor that made the winner unique, `None` on a full tie.
    pub deciding_factor: Option<Factor>,
}

/// Errors from the recommender.
#[derive(thiserror::Error, Debug)]
pub enum RecommendError {
    /// Fewer than two live members were supplied.
    #[error("a recommendation requires at least 2 files, got {0}")]
    TooFewMembers(usize),
}

/// Deterministic multi-factor retention recommender.
pub struct Recommender {
    official: RegexSet,
    transient: RegexSet,
}

impl Default for Recommender {
    fn default() -> Self {
        Self::with_patterns(&DEFAULT_OFFICIAL_PATTERNS, &DEFAULT_TRANSIENT_PATTERNS)
            .expect("default patterns are valid")
    }
}

impl Recommender {
    /// Create a recommender with the default path pattern sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recommender with custom path pattern sets.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error if a pattern is invalid.
    pub fn with_patterns<S: AsRef<str>>(
        official: &[S],
        transient: &[S],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            official: RegexSet::new(official.iter().map(AsRef::as_ref))?,
            transient: RegexSet::new(transient.iter().map(AsRef::as_ref))?,
        })
    }

    /// Classify a path's authority.
    #[must_use]
    pub fn path_authority(&self, record: &FileRecord) -> PathAuthority {
        let path = record.path.to_string_lossy();
        if self.official.is_match(&path) {
            PathAuthority::Official
        } else if self.transient.is_match(&path) {
            PathAuthority::Transient
        } else {
            PathAuthority::Neutral
        }
    }

    /// Recommend which of the given live members to keep.
    ///
    /// `members` must be in group (discovery) order; ties all the way down
    /// the ladder fall back to the first entry.
    ///
    /// # Errors
    ///
    /// Returns [`RecommendError::TooFewMembers`] for fewer than two
    /// members. This is rejected before any ranking work starts.
    pub fn recommend(
        &self,
        group_key: Hash,
        members: &[&FileRecord],
    ) -> Result<Recommendation, RecommendError> {
        if members.len() < 2 {
            return Err(RecommendError::TooFewMembers(members.len()));
        }

        let mut survivors: Vec<&FileRecord> = members.to_vec();
        let mut narrowing: Vec<Factor> = Vec::new();

        for factor in Factor::LADDER {
            if survivors.len() == 1 {
                break;
            }
            let next = self.apply_factor(factor, &survivors);
            if next.len() < survivors.len() {
                narrowing.push(factor);
                survivors = next;
            }
        }

        let winner = survivors[0];
        let (confidence, deciding_factor) = if survivors.len() == 1 {
            let deciding = *narrowing.last().expect("a factor narrowed to one");
            (deciding.confidence(), Some(deciding))
        } else {
            (TIE_CONFIDENCE, None)
        };

        let rationale = self.rationale(winner, &narrowing, deciding_factor);
        log::debug!(
            "Recommendation for group {}: keep {} (confidence {confidence:.2})",
            crate::scanner::hash_to_hex(&group_key),
            winner.id
        );

        Ok(Recommendation {
            group_key,
            file_to_keep: winner.id,
            confidence,
            rationale,
            deciding_factor,
        })
    }

    /// Keep only the members that win under `factor`.
    ///
    /// Returns the input unchanged when the factor does not discriminate
    /// (all equal, or no member carries the signal).
    fn apply_factor<'a>(&self, factor: Factor, members: &[&'a FileRecord]) -> Vec<&'a FileRecord> {
        match factor {
            Factor::Version => {
                let versions: Vec<Option<Version>> = members
                    .iter()
                    .map(|m| m.version.as_deref().and_then(Version::parse))
                    .collect();
                let Some(best) = versions.iter().flatten().max().cloned() else {
                    // Nobody has a version: the factor is skipped entirely.
                    return members.to_vec();
                };
                members
                    .iter()
                    .zip(&versions)
                    .filter(|(_, v)| v.as_ref() == Some(&best))
                    .map(|(m, _)| *m)
                    .collect()
            }
            Factor::PathAuthority => {
                let best = members
                    .iter()
                    .map(|m| self.path_authority(m))
                    .max()
                    .unwrap_or(PathAuthority::Neutral);
                members
                    .iter()
                    .filter(|m| self.path_authority(m) == best)
                    .copied()
                    .collect()
            }
            Factor::Recency => {
                let best = members
                    .iter()
                    .map(|m| m.last_modified)
                    .max()
                    .expect("non-empty members");
                members
                    .iter()
                    .filter(|m| m.last_modified == best)
                    .copied()
                    .collect()
            }
            Factor::Size => {
                let best = members
                    .iter()
                    .map(|m| m.size)
                    .max()
                    .expect("non-empty members");
                members
                    .iter()
                    .filter(|m| m.size == best)
                    .copied()
                    .collect()
            }
        }
    }

    fn rationale(
        &self,
        winner: &FileRecord,
        narrowing: &[Factor],
        deciding: Option<Factor>,
    ) -> String {
        if deciding.is_none() {
            return format!(
                "No distinguishing signals between the copies; keeping \"{}\" as the first copy discovered.",
                winner.name
            );
        }

        let reasons: Vec<String> = narrowing
            .iter()
            .map(|factor| match factor {
                Factor::Version => {
                    let version = winner
                        .version
                        .as_deref()
                        .and_then(Version::parse)
                        .map_or_else(String::new, |v| format!(" ({v})"));
                    format!("highest version{version}")
                }
                Factor::PathAuthority => match self.path_authority(winner) {
                    PathAuthority::Official => "authoritative install path".to_string(),
                    _ => "least transient path".to_string(),
                },
                Factor::Recency => "most recently modified".to_string(),
                Factor::Size => "largest copy".to_string(),
            })
            .collect();

        format!(
            "Keep \"{}\" at {}: {}.",
            winner.name,
            winner.path.display(),
            reasons.join(", ")
        )
    }
}

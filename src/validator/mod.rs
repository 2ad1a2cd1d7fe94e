//! Decides whether a learner's edited code counts as the reference fix.
//!
//! Pure functions only; safe to call from any thread.

mod detectors;
mod normalize;
mod similarity;

pub use detectors::{check_key_fixes, KeyFixDetector, KeyFixOutcome, DETECTORS};
pub use normalize::{extract_core_fix, normalize, NormalizedCode};
pub use similarity::{levenshtein, similarity};

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Minimum similarity accepted by the fallback comparison.
pub const SIMILARITY_THRESHOLD: f64 = 0.90;

/// Which step of the cascade decided the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    CoreFix,
    Containment,
    KeyFix(&'static str),
    Similarity,
    /// The user code is still the broken snippet.
    Unchanged,
    /// A cascade match that sits nearer the broken snippet than the fix.
    CloserToBroken,
    None,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Exact => f.write_str("exact"),
            MatchStrategy::CoreFix => f.write_str("core-fix"),
            MatchStrategy::Containment => f.write_str("containment"),
            MatchStrategy::KeyFix(category) => write!(f, "key-fix: {category}"),
            MatchStrategy::Similarity => f.write_str("similarity"),
            MatchStrategy::Unchanged => f.write_str("unchanged"),
            MatchStrategy::CloserToBroken => f.write_str("closer-to-broken"),
            MatchStrategy::None => f.write_str("none"),
        }
    }
}

impl Serialize for MatchStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchVerdict {
    pub matched: bool,
    pub strategy: MatchStrategy,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_differing_line: Option<usize>,
}

impl MatchVerdict {
    fn accepted(strategy: MatchStrategy, similarity: f64) -> Self {
        Self {
            matched: true,
            strategy,
            similarity,
            first_differing_line: None,
        }
    }

    /// Feedback line for the learner.
    pub fn message(&self) -> String {
        if self.matched {
            return "Nice work – that's the fix!".to_string();
        }
        if self.strategy == MatchStrategy::Unchanged {
            return "You need to fix the bug first!".to_string();
        }
        match self.first_differing_line {
            Some(line) => format!(
                "Not quite there yet – something around line {line} looks off. \
                 Double-check the condition or return value."
            ),
            None => "Not quite there yet – double-check your code!".to_string(),
        }
    }
}

/// A validation request as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub user_code: String,
    pub reference_code: String,
    /// The snippet as handed to the learner, before any fix.
    #[serde(default)]
    pub broken_code: Option<String>,
}

/// Validate a full request. With `broken_code` present, unchanged code is
/// refused before the cascade runs, and a match is withdrawn when the user
/// code is more similar to the broken snippet than to the reference.
pub fn validate(request: &ValidationRequest) -> MatchVerdict {
    let Some(broken) = request.broken_code.as_deref() else {
        return codes_match(&request.user_code, &request.reference_code);
    };

    let user_norm = normalize(&request.user_code);
    let broken_norm = normalize(broken);
    let reference_norm = normalize(&request.reference_code);
    if user_norm == broken_norm {
        debug!("user code is unchanged");
        return MatchVerdict {
            matched: false,
            strategy: MatchStrategy::Unchanged,
            similarity: similarity(user_norm.as_str(), reference_norm.as_str()),
            first_differing_line: first_differing_line(&user_norm, &reference_norm),
        };
    }

    let verdict = codes_match(&request.user_code, &request.reference_code);
    if !verdict.matched {
        return verdict;
    }
    let to_broken = similarity(user_norm.as_str(), broken_norm.as_str());
    let to_fixed = similarity(user_norm.as_str(), reference_norm.as_str());
    if to_broken > to_fixed {
        debug!(to_broken, to_fixed, strategy = %verdict.strategy, "match withdrawn");
        return MatchVerdict {
            matched: false,
            strategy: MatchStrategy::CloserToBroken,
            similarity: to_fixed,
            first_differing_line: first_differing_line(&user_norm, &reference_norm),
        };
    }
    verdict
}

/// Compare user code with the reference, trying in order: exact
/// normalized match, core-fix match, containment, key-fix detectors, then
/// similarity of at least [`SIMILARITY_THRESHOLD`].
pub fn codes_match(user: &str, reference: &str) -> MatchVerdict {
    let user_norm = normalize(user);
    let reference_norm = normalize(reference);
    if user_norm == reference_norm {
        return MatchVerdict::accepted(MatchStrategy::Exact, 1.0);
    }

    let user_core = extract_core_fix(user);
    let reference_core = extract_core_fix(reference);
    if user_core == reference_core {
        return MatchVerdict::accepted(MatchStrategy::CoreFix, 1.0);
    }

    let score = similarity(user_norm.as_str(), reference_norm.as_str())
        .max(similarity(&user_core, &reference_core));

    // A user core inside the reference core must not drop a key fix.
    let key_fix = check_key_fixes(&user_core, &reference_core);
    if !user_core.is_empty() && !reference_core.is_empty() {
        let superset = user_core.contains(reference_core.as_str());
        let subset = reference_core.contains(user_core.as_str())
            && !matches!(key_fix, KeyFixOutcome::Rejected(_));
        if superset || subset {
            return MatchVerdict::accepted(MatchStrategy::Containment, score);
        }
    }

    let rejected = |strategy| MatchVerdict {
        matched: false,
        strategy,
        similarity: score,
        first_differing_line: first_differing_line(&user_norm, &reference_norm),
    };

    match key_fix {
        KeyFixOutcome::Accepted(category) => {
            return MatchVerdict::accepted(MatchStrategy::KeyFix(category), score);
        }
        KeyFixOutcome::Rejected(category) => {
            debug!(category, "key fix missing");
            return rejected(MatchStrategy::KeyFix(category));
        }
        KeyFixOutcome::NotApplicable => {}
    }

    if score >= SIMILARITY_THRESHOLD {
        return MatchVerdict::accepted(MatchStrategy::Similarity, score);
    }
    rejected(MatchStrategy::None)
}

/// 1-based index of the first normalized line that differs, if any.
pub fn first_differing_line(user: &NormalizedCode, reference: &NormalizedCode) -> Option<usize> {
    let user: Vec<&str> = user.lines().collect();
    let reference: Vec<&str> = reference.lines().collect();
    (0..user.len().max(reference.len()))
        .find(|&i| user.get(i) != reference.get(i))
        .map(|i| i + 1)
}

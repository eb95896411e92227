//! Mirror and per-source status reports.

use crate::{ProbeFailure, ProbeResult, SourceMode};

/// Pick the fastest available result.
///
/// Ties on latency prefer the primary URL, then the earlier index. Returns
/// `None` when nothing is available.
///
/// # Examples
/// ```
/// use landmark_core::{recommend, ProbeResult};
///
/// let results = vec![
///     ProbeResult::reachable("https://primary", true, 120, None),
///     ProbeResult::reachable("https://mirror", false, 40, None),
/// ];
/// assert_eq!(recommend(&results), Some(1));
/// ```
#[must_use]
pub fn recommend(results: &[ProbeResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .filter(|(_, result)| result.available)
        .min_by_key(|(index, result)| (result.latency_millis, !result.is_primary, *index))
        .map(|(index, _)| index)
}

/// Probe results for every URL of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MirrorReport {
    /// One entry per URL, in the source's URL order.
    pub results: Vec<ProbeResult>,
    /// Index into `results` of the recommended URL.
    pub recommended: Option<usize>,
}

impl MirrorReport {
    /// Wrap `results` and compute the recommendation.
    #[must_use]
    pub fn from_results(results: Vec<ProbeResult>) -> Self {
        let recommended = recommend(&results);
        Self {
            results,
            recommended,
        }
    }

    /// The recommended result, if any URL was available.
    #[must_use]
    pub fn best(&self) -> Option<&ProbeResult> {
        self.recommended.and_then(|index| self.results.get(index))
    }

    /// Return `true` when at least one URL answered.
    #[must_use]
    pub fn any_available(&self) -> bool {
        self.recommended.is_some()
    }

    /// Choose the result that represents the source as a whole.
    ///
    /// Falls back to the primary's result, then to a synthetic
    /// [`ProbeFailure::NoUrl`] result when the report is empty.
    #[must_use]
    pub fn representative(&self) -> ProbeResult {
        self.best()
            .or_else(|| self.results.iter().find(|result| result.is_primary))
            .or_else(|| self.results.first())
            .cloned()
            .unwrap_or_else(|| ProbeResult::unreachable("", true, ProbeFailure::NoUrl))
    }
}

/// Status of one configured source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceStatusReport {
    /// Source identifier.
    pub name: String,
    /// Distribution mode of the source.
    pub mode: SourceMode,
    /// Whether the source is enabled.
    pub enabled: bool,
    /// Result representing the source.
    pub best: ProbeResult,
    /// Per-URL breakdown for document sources that declare mirrors.
    pub mirrors: Option<MirrorReport>,
}

impl SourceStatusReport {
    /// Return `true` when the representative result is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.best.available
    }
}

/// Notification emitted as each source finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusProgress {
    /// Sources finished so far, including this one.
    pub completed: usize,
    /// Sources in the pass.
    pub total: usize,
    /// Report for the source that just finished.
    pub report: SourceStatusReport,
}

/// Final result of a status pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSummary {
    /// Number of sources whose representative result is available.
    pub available: usize,
    /// Number of sources checked.
    pub total: usize,
    /// One report per source, ordered by name.
    pub reports: Vec<SourceStatusReport>,
}

impl StatusSummary {
    /// Build a summary from reports in any order.
    #[must_use]
    pub fn from_reports(mut reports: Vec<SourceStatusReport>) -> Self {
        reports.sort_by(|left, right| left.name.cmp(&right.name));
        let available = reports.iter().filter(|report| report.is_available()).count();
        Self {
            available,
            total: reports.len(),
            reports,
        }
    }
}

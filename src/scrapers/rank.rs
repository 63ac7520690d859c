//! Candidate scoring, ordering and validation.

use std::cmp::Ordering;

use tracing::{debug, info};

use super::http_client::{MediaProbe, ProbeRequest};
use crate::models::{MediaCandidate, ProbeResult, ScoredCandidate};

/// Additive address heuristics, all case-insensitive substring tests.
const SCORE_RULES: &[(&[&str], f64)] = &[
    (&[".mp4", ".m3u8"], 100.0),
    (&["video.fsci"], 50.0),
    (&["fbcdn.net"], 30.0),
    (&["nc_ht=video"], 20.0),
    (&["bytestart=", "byteend="], -40.0),
];

/// Cap on the size bonus, reached at 50 MiB.
pub const MAX_SIZE_BONUS: f64 = 50.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Score from the address alone.
pub fn static_score(address: &str) -> f64 {
    let lower = address.to_ascii_lowercase();
    SCORE_RULES
        .iter()
        .filter(|(markers, _)| markers.iter().any(|m| lower.contains(m)))
        .map(|(_, points)| points)
        .sum()
}

/// One point per megabyte of declared size, capped.
pub fn size_bonus(content_length: Option<u64>) -> f64 {
    content_length
        .map(|bytes| (bytes as f64 / BYTES_PER_MB).min(MAX_SIZE_BONUS))
        .unwrap_or(0.0)
}

/// Higher score first, then the longer address, then lexical order.
pub fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.url().len().cmp(&a.url().len()))
        .then_with(|| a.url().cmp(b.url()))
}

/// Collapse exact duplicates, keeping the first and any headers seen later.
pub fn dedupe(candidates: Vec<MediaCandidate>) -> Vec<MediaCandidate> {
    let mut unique: Vec<MediaCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match unique.iter_mut().find(|c| c.url == candidate.url) {
            Some(existing) => {
                if existing.observed_headers.is_none() {
                    existing.observed_headers = candidate.observed_headers;
                }
            }
            None => unique.push(candidate),
        }
    }
    unique
}

/// Ranking result for one post.
#[derive(Debug, Clone, Default)]
pub struct RankOutcome {
    /// Every distinct candidate, best first.
    pub ranked: Vec<ScoredCandidate>,
    /// Validated winner, or the top candidate when nothing validated.
    pub selected: Option<ScoredCandidate>,
    /// Probe of the selected candidate.
    pub probe: Option<ProbeResult>,
    pub validated: bool,
}

/// Scores candidates, sizes them, and validates in rank order.
pub struct CandidateRanker<'a> {
    prober: &'a dyn MediaProbe,
}

impl<'a> CandidateRanker<'a> {
    pub fn new(prober: &'a dyn MediaProbe) -> Self {
        Self { prober }
    }

    /// Score and order candidates. Sizing failures add nothing.
    pub async fn score(
        &self,
        candidates: Vec<MediaCandidate>,
        request: &ProbeRequest<'_>,
    ) -> Vec<ScoredCandidate> {
        let mut ranked = Vec::new();
        for candidate in dedupe(candidates) {
            let sizing = request.with_extra_headers(candidate.observed_headers.as_ref());
            let declared = self.prober.content_length(&candidate.url, &sizing).await;
            let base = static_score(&candidate.url);
            let score = base + size_bonus(declared);
            debug!(
                "candidate {} [{}] base={} size={:?} score={:.2}",
                candidate.url, candidate.origin, base, declared, score
            );
            ranked.push(ScoredCandidate { candidate, score });
        }
        ranked.sort_by(compare_ranked);
        ranked
    }

    /// Probe in rank order and keep the first plausible media response,
    /// falling back to the best-scored candidate unvalidated.
    pub async fn rank(
        &self,
        candidates: Vec<MediaCandidate>,
        request: &ProbeRequest<'_>,
    ) -> RankOutcome {
        let ranked = self.score(candidates, request).await;
        let min_bytes = self.prober.min_media_bytes();

        let mut top_probe = None;
        for (index, scored) in ranked.iter().enumerate() {
            let validation = request.with_extra_headers(scored.candidate.observed_headers.as_ref());
            let probe = self.prober.probe(scored.url(), &validation).await;
            if probe.is_plausible_media(min_bytes) {
                info!("Validated {} (score {:.2})", scored.url(), scored.score);
                return RankOutcome {
                    selected: Some(scored.clone()),
                    probe: Some(probe),
                    validated: true,
                    ranked,
                };
            }
            debug!(
                "Rejected {}: status={:?} size={:?} error={:?}",
                scored.url(),
                probe.status,
                probe.observed_size(),
                probe.error
            );
            if index == 0 {
                top_probe = Some(probe);
            }
        }

        let selected = ranked.first().cloned();
        if let Some(best) = &selected {
            info!("No candidate validated, using best-scored {}", best.url());
        }
        RankOutcome {
            selected,
            probe: top_probe,
            validated: false,
            ranked,
        }
    }
}

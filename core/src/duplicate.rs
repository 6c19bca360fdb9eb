//! Semantic duplicate and hotspot detection.
//!
//! A new complaint is embedded and compared (cosine similarity) against
//! recent open originals. The best match at or above the similarity
//! threshold becomes its duplicate link. Similarity-qualifying
//! candidates within a small geographic tolerance form a hotspot when
//! enough of them cluster.
//!
//! The scan never surfaces an error: if the embedder fails, a
//! token-overlap fallback with a lower threshold runs instead, and if
//! that also fails the result degrades to "no duplicate found".

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::complaint::GeoPoint;
use crate::config::EngineConfig;
use crate::error::GrievanceResult;
use crate::store::GrievanceStore;
use crate::types::ComplaintId;

/// Dimension of the fallback embedding vector.
pub const EMBEDDING_DIM: usize = 384;

/// A text-embedding strategy. External services implement this; the
/// deterministic [`HashEmbedder`] guarantees availability without them.
pub trait Embedder: Send {
    fn name(&self) -> &'static str;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Deterministic token-hash embedding: tokenize on whitespace, hash
/// each token, accumulate counts into a fixed-size vector. Not
/// semantic, but total and dependency-free.
#[derive(Debug, Default)]
pub struct HashEmbedder;

impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "token-hash"
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        for token in text.to_lowercase().split_whitespace() {
            let hash: usize = token.chars().map(|c| c as usize).sum();
            vector[hash % EMBEDDING_DIM] += 1.0;
        }
        Ok(vector)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Lowercase, strip punctuation to spaces, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity over normalized token sets.
pub fn token_overlap(a: &str, b: &str) -> f32 {
    let set_a: HashSet<&str> = a.split(' ').filter(|t| !t.is_empty()).collect();
    let set_b: HashSet<&str> = b.split(' ').filter(|t| !t.is_empty()).collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }
    let common = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count().max(1);
    common as f32 / union as f32
}

/// Candidate row loaded for the scan: just enough to score and to flag
/// hotspots, not the full complaint.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub complaint_id: ComplaintId,
    pub title: String,
    pub description: String,
    pub location: Option<GeoPoint>,
    pub hotspot_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    pub complaint_id: ComplaintId,
    pub score: f32,
}

/// Result of a duplicate/hotspot scan for one new complaint.
#[derive(Debug, Clone, Default)]
pub struct DuplicateScan {
    pub duplicate: Option<DuplicateMatch>,
    /// Set when the new complaint joins a geographic cluster of similar
    /// complaints; carries the cluster size including the new one.
    pub hotspot_count: Option<u32>,
}

pub struct DuplicateDetector {
    embedder: Box<dyn Embedder>,
}

impl DuplicateDetector {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Detector backed by the local deterministic embedder.
    pub fn local() -> Self {
        Self::new(Box::new(HashEmbedder))
    }

    /// Scan recent complaints for a duplicate of (`title`, `description`)
    /// and for a geographic hotspot around `location`.
    ///
    /// Qualifying hotspot neighbours are flagged in the store as a side
    /// effect (last-write-wins on the count is tolerated). Never fails:
    /// provider and store errors degrade to an empty scan.
    pub fn scan(
        &self,
        store: &GrievanceStore,
        title: &str,
        description: &str,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> DuplicateScan {
        match self.scan_by_embedding(store, title, description, location, now, config) {
            Ok(scan) => scan,
            Err(e) => {
                log::warn!(
                    "embedding scan via '{}' failed, falling back to token overlap: {e}",
                    self.embedder.name()
                );
                match self.scan_by_token_overlap(store, title, description, config) {
                    Ok(scan) => scan,
                    Err(e) => {
                        log::warn!("token-overlap fallback failed, treating as no duplicate: {e}");
                        DuplicateScan::default()
                    }
                }
            }
        }
    }

    fn scan_by_embedding(
        &self,
        store: &GrievanceStore,
        title: &str,
        description: &str,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> GrievanceResult<DuplicateScan> {
        let query = self.embedder.embed(&format!("{title}. {description}"))?;
        let since = now - chrono::Duration::days(config.candidate_window_days);
        let candidates = store.recent_candidates(since, config.candidate_limit)?;

        let mut best: Option<DuplicateMatch> = None;
        let mut hotspot_neighbours: Vec<&CandidateRow> = Vec::new();

        for candidate in &candidates {
            let text = format!("{}. {}", candidate.title, candidate.description);
            let embedding = self.embedder.embed(&text)?;
            let score = cosine_similarity(&query, &embedding);
            if score < config.similarity_threshold {
                continue;
            }

            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(DuplicateMatch {
                    complaint_id: candidate.complaint_id.clone(),
                    score,
                });
            }

            if let (Some(here), Some(there)) = (location, candidate.location) {
                let nearby = (here.lat - there.lat).abs() < config.hotspot_geo_delta
                    && (here.lng - there.lng).abs() < config.hotspot_geo_delta;
                if nearby {
                    hotspot_neighbours.push(candidate);
                }
            }
        }

        let mut scan = DuplicateScan {
            duplicate: best,
            hotspot_count: None,
        };

        if hotspot_neighbours.len() >= config.hotspot_min_neighbors {
            let cluster_size = (hotspot_neighbours.len() + 1) as u32;
            for neighbour in &hotspot_neighbours {
                store.mark_hotspot(&neighbour.complaint_id, cluster_size)?;
            }
            scan.hotspot_count = Some(cluster_size);
            log::info!(
                "hotspot detected: {} similar complaints in the same area",
                cluster_size
            );
        }

        Ok(scan)
    }

    /// Fallback path: Jaccard token overlap over a smaller recent
    /// sample with a lower threshold. No hotspot signal.
    fn scan_by_token_overlap(
        &self,
        store: &GrievanceStore,
        title: &str,
        description: &str,
        config: &EngineConfig,
    ) -> GrievanceResult<DuplicateScan> {
        let query = normalize_text(&format!("{title} {description}"));
        let candidates = store.latest_candidates(config.fallback_candidate_limit)?;

        let mut best: Option<DuplicateMatch> = None;
        for candidate in &candidates {
            let text = normalize_text(&format!("{} {}", candidate.title, candidate.description));
            let score = token_overlap(&query, &text);
            if score >= config.fallback_threshold
                && best.as_ref().map_or(true, |b| score > b.score)
            {
                best = Some(DuplicateMatch {
                    complaint_id: candidate.complaint_id.clone(),
                    score,
                });
            }
        }

        Ok(DuplicateScan {
            duplicate: best,
            hotspot_count: None,
        })
    }
}

use std::collections::HashSet;

use crate::models::Recommendation;

/// Weight of the preference overlap in the premium blend
const MATCH_WEIGHT: f64 = 0.7;
/// Weight of the normalized trend score in the premium blend
const TREND_WEIGHT: f64 = 0.3;

/// How candidates are personalized for a user
///
/// Selected once per request from the user's subscription, then handed to [`rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingPolicy {
    /// Keep candidates sharing at least one tag with the preferences, in original order
    Free,
    /// Score every candidate and sort by descending score
    Premium,
}

impl RankingPolicy {
    pub fn for_premium(is_premium: bool) -> Self {
        if is_premium {
            RankingPolicy::Premium
        } else {
            RankingPolicy::Free
        }
    }
}

/// Personalizes `candidates` for a set of vibe preferences
///
/// With no preferences the candidates come back untouched. Never fails: the free
/// policy may return an empty list, and falling back from it is up to the caller.
pub fn rank(
    policy: RankingPolicy,
    preferences: &[String],
    candidates: Vec<Recommendation>,
) -> Vec<Recommendation> {
    let preferences: HashSet<&str> = preferences.iter().map(String::as_str).collect();
    if preferences.is_empty() {
        return candidates;
    }

    match policy {
        RankingPolicy::Free => candidates
            .into_iter()
            .filter(|c| c.vibe_tags.iter().any(|t| preferences.contains(t.as_str())))
            .collect(),
        RankingPolicy::Premium => {
            let mut scored: Vec<Recommendation> = candidates
                .into_iter()
                .map(|mut c| {
                    c.match_score = Some(final_score(&preferences, &c));
                    c
                })
                .collect();

            // Stable, so ties keep their original order
            scored.sort_by(|a, b| {
                let a = a.match_score.unwrap_or_default();
                let b = b.match_score.unwrap_or_default();
                b.total_cmp(&a)
            });
            scored
        }
    }
}

/// `0.7 * overlap + 0.3 * trend`, where overlap is the share of preferences the
/// candidate's tags cover
fn final_score(preferences: &HashSet<&str>, candidate: &Recommendation) -> f64 {
    let tags: HashSet<&str> = candidate.vibe_tags.iter().map(String::as_str).collect();
    let overlap = preferences.intersection(&tags).count();
    let match_score = overlap as f64 / preferences.len().max(1) as f64;
    let trend = f64::from(candidate.trend_score) / 100.0;

    MATCH_WEIGHT * match_score + TREND_WEIGHT * trend
}

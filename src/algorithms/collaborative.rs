use crate::models::{
    RecommendationScore, SimilarityMethod, SimilarityScore, Strategy, UserInteraction,
};
use crate::utils::sort_scores;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How interaction records are folded into matrix weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum WeightingMode {
    /// Sum of interaction-type weights per (user, concert) pair.
    TypeWeight,
    /// Type weights decayed by age relative to the newest interaction in
    /// the batch, halving every `half_life_hours`.
    Recency { half_life_hours: f64 },
}

impl Default for WeightingMode {
    fn default() -> Self {
        WeightingMode::TypeWeight
    }
}

/// Diagnostic view of a built matrix; not on the recommendation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixStats {
    pub users: usize,
    pub items: usize,
    pub nonzero_entries: usize,
    pub density: f64,
    pub avg_interactions_per_user: f64,
}

/// Sparse user-item interaction matrix.
///
/// Row and column indices are assigned from the sorted set of distinct ids
/// observed in the input, so index assignment and iteration order are
/// deterministic for a given batch. Instances are never mutated after
/// construction; new data means a new matrix.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    users: Vec<String>,
    items: Vec<String>,
    user_index: BTreeMap<String, usize>,
    item_index: BTreeMap<String, usize>,
    rows: Vec<BTreeMap<usize, f64>>,
    cols: Vec<BTreeMap<usize, f64>>,
}

impl InteractionMatrix {
    pub fn from_interactions(interactions: &[UserInteraction], mode: &WeightingMode) -> Self {
        let user_ids: BTreeSet<&str> = interactions.iter().map(|i| i.user_id.as_str()).collect();
        let item_ids: BTreeSet<&str> = interactions.iter().map(|i| i.concert_id.as_str()).collect();

        let users: Vec<String> = user_ids.into_iter().map(String::from).collect();
        let items: Vec<String> = item_ids.into_iter().map(String::from).collect();
        let user_index: BTreeMap<String, usize> = users
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let item_index: BTreeMap<String, usize> = items
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        // Decay ages are measured against the newest record so the build
        // is a pure function of its input.
        let newest = interactions.iter().map(|i| i.timestamp).max();

        let mut rows: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); users.len()];
        let mut cols: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); items.len()];

        for interaction in interactions {
            let u = user_index[&interaction.user_id];
            let i = item_index[&interaction.concert_id];
            let mut weight = interaction.interaction.weight();

            if let (WeightingMode::Recency { half_life_hours }, Some(newest)) = (mode, newest) {
                let age_hours = (newest - interaction.timestamp).num_seconds() as f64 / 3600.0;
                if *half_life_hours > 0.0 {
                    weight *= 0.5_f64.powf(age_hours / half_life_hours);
                }
            }

            *rows[u].entry(i).or_insert(0.0) += weight;
            *cols[i].entry(u).or_insert(0.0) += weight;
        }

        Self {
            users,
            items,
            user_index,
            item_index,
            rows,
            cols,
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn user_row(&self, user_id: &str) -> Option<&BTreeMap<usize, f64>> {
        self.user_index.get(user_id).map(|&u| &self.rows[u])
    }

    pub fn item_id(&self, index: usize) -> &str {
        &self.items[index]
    }

    pub fn user_id(&self, index: usize) -> &str {
        &self.users[index]
    }

    pub fn stats(&self) -> MatrixStats {
        let nonzero: usize = self.rows.iter().map(|r| r.len()).sum();
        let cells = self.users.len() * self.items.len();
        MatrixStats {
            users: self.users.len(),
            items: self.items.len(),
            nonzero_entries: nonzero,
            density: if cells == 0 {
                0.0
            } else {
                nonzero as f64 / cells as f64
            },
            avg_interactions_per_user: if self.users.is_empty() {
                0.0
            } else {
                nonzero as f64 / self.users.len() as f64
            },
        }
    }
}

/// Cosine over sparse weight maps; dot product runs over the key
/// intersection only, so dense user×item arrays are never materialized.
fn sparse_cosine(a: &BTreeMap<usize, f64>, b: &BTreeMap<usize, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// The `neighbor_count` most similar users to `user_id`, positive
/// similarity only, ordered by (similarity desc, user id asc).
pub fn similar_users(
    matrix: &InteractionMatrix,
    user_id: &str,
    neighbor_count: usize,
) -> Vec<SimilarityScore> {
    let row = match matrix.user_row(user_id) {
        Some(row) if !row.is_empty() => row,
        _ => return Vec::new(),
    };

    let mut neighbors: Vec<(usize, f64)> = (0..matrix.user_count())
        .filter(|&u| matrix.user_id(u) != user_id)
        .filter_map(|u| {
            let sim = sparse_cosine(row, &matrix.rows[u]);
            (sim > 0.0).then_some((u, sim))
        })
        .collect();

    // Index order is sorted-id order, so the index tiebreak is an id
    // tiebreak.
    neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    neighbors.truncate(neighbor_count);

    neighbors
        .into_iter()
        .map(|(u, sim)| SimilarityScore {
            entity_a: user_id.to_string(),
            entity_b: matrix.user_id(u).to_string(),
            score: sim,
            method: SimilarityMethod::Cosine,
        })
        .collect()
}

/// The most similar items to `concert_id` by column cosine.
pub fn similar_items(
    matrix: &InteractionMatrix,
    concert_id: &str,
    top_k: usize,
) -> Vec<SimilarityScore> {
    let i = match matrix.item_index.get(concert_id) {
        Some(&i) => i,
        None => return Vec::new(),
    };
    let col = &matrix.cols[i];

    let mut scored: Vec<(usize, f64)> = (0..matrix.item_count())
        .filter(|&j| j != i)
        .filter_map(|j| {
            let sim = sparse_cosine(col, &matrix.cols[j]);
            (sim > 0.0).then_some((j, sim))
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(j, sim)| SimilarityScore {
            entity_a: concert_id.to_string(),
            entity_b: matrix.item_id(j).to_string(),
            score: sim,
            method: SimilarityMethod::Cosine,
        })
        .collect()
}

/// User-based recommendation: aggregate the concerts of the target user's
/// nearest neighbors, weighted by neighbor similarity, excluding concerts
/// the user already engaged with.
///
/// A user with no interactions gets an empty list; cold start is expected,
/// not exceptional.
pub fn user_based_recommendations(
    matrix: &InteractionMatrix,
    user_id: &str,
    neighbor_count: usize,
    top_k: usize,
) -> Vec<RecommendationScore> {
    let row = match matrix.user_row(user_id) {
        Some(row) if !row.is_empty() => row,
        _ => return Vec::new(),
    };

    let neighbors = similar_users(matrix, user_id, neighbor_count);
    if neighbors.is_empty() {
        return Vec::new();
    }

    struct Vote {
        score: f64,
        similarity_sum: f64,
        supporters: usize,
    }
    let mut votes: BTreeMap<usize, Vote> = BTreeMap::new();

    for neighbor in &neighbors {
        let n = matrix.user_index[&neighbor.entity_b];
        for (&item, &weight) in &matrix.rows[n] {
            if row.contains_key(&item) {
                continue;
            }
            let vote = votes.entry(item).or_insert(Vote {
                score: 0.0,
                similarity_sum: 0.0,
                supporters: 0,
            });
            vote.score += neighbor.score * weight;
            vote.similarity_sum += neighbor.score;
            vote.supporters += 1;
        }
    }

    let neighbor_total = neighbors.len();
    let mut scores: Vec<RecommendationScore> = votes
        .into_iter()
        .map(|(item, vote)| RecommendationScore {
            target_id: matrix.item_id(item).to_string(),
            score: vote.score,
            confidence: (vote.similarity_sum / vote.supporters as f64).clamp(0.0, 1.0),
            reasoning: format!(
                "{} of your {} most similar users engaged with this concert",
                vote.supporters, neighbor_total
            ),
            source: Strategy::CollaborativeUser,
        })
        .collect();

    sort_scores(&mut scores);
    scores.truncate(top_k);
    scores
}

/// Item-based recommendation: for each concert in the user's history, find
/// similar concerts by column cosine and accumulate votes weighted by the
/// user's own interaction weight on the seed.
pub fn item_based_recommendations(
    matrix: &InteractionMatrix,
    user_id: &str,
    top_k: usize,
) -> Vec<RecommendationScore> {
    let row = match matrix.user_row(user_id) {
        Some(row) if !row.is_empty() => row,
        _ => return Vec::new(),
    };

    struct Vote {
        score: f64,
        similarity_sum: f64,
        seeds: usize,
        best_seed: usize,
        best_similarity: f64,
    }
    let mut votes: BTreeMap<usize, Vote> = BTreeMap::new();

    for (&seed, &seed_weight) in row {
        let seed_col = &matrix.cols[seed];
        for candidate in 0..matrix.item_count() {
            if candidate == seed || row.contains_key(&candidate) {
                continue;
            }
            let sim = sparse_cosine(seed_col, &matrix.cols[candidate]);
            if sim <= 0.0 {
                continue;
            }
            let vote = votes.entry(candidate).or_insert(Vote {
                score: 0.0,
                similarity_sum: 0.0,
                seeds: 0,
                best_seed: seed,
                best_similarity: 0.0,
            });
            vote.score += sim * seed_weight;
            vote.similarity_sum += sim;
            vote.seeds += 1;
            if sim > vote.best_similarity {
                vote.best_similarity = sim;
                vote.best_seed = seed;
            }
        }
    }

    let mut scores: Vec<RecommendationScore> = votes
        .into_iter()
        .map(|(item, vote)| RecommendationScore {
            target_id: matrix.item_id(item).to_string(),
            score: vote.score,
            confidence: (vote.similarity_sum / vote.seeds as f64).clamp(0.0, 1.0),
            reasoning: format!(
                "Audience overlap with {} in your history (similarity {:.2})",
                matrix.item_id(vote.best_seed),
                vote.best_similarity
            ),
            source: Strategy::CollaborativeItem,
        })
        .collect();

    sort_scores(&mut scores);
    scores.truncate(top_k);
    scores
}

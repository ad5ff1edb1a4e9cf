// ============================================
// Synthetic datasets
// ============================================
//
// Full user x item grid. Every user rates every item exactly once, items in
// a shuffled order per user. Ratings are drawn as 1-5 stars and binarized
// (4 and 5 stars are a success); the raw stars stay in the row's extra
// columns. Each rating carries a random "known" flag for the known-only
// reward mapping. Keys start at 1.

use crate::models::{CatalogEntry, RatingRow};
use rand::seq::SliceRandom;
use rand::Rng;

/// Relevance threshold used with binary ratings
pub const BINARY_RELEVANCE_THRESHOLD: f64 = 0.5;
/// Antirelevance threshold used with binary ratings
pub const BINARY_ANTIRELEVANCE_THRESHOLD: f64 = 0.5;
/// Star ratings strictly above this become 1
pub const STAR_SUCCESS_THRESHOLD: f64 = 3.0;

pub fn synthetic_ratings<R: Rng + ?Sized>(n_users: usize, n_items: usize, rng: &mut R) -> Vec<RatingRow> {
    let mut rows = Vec::with_capacity(n_users * n_items);
    let mut items: Vec<i64> = (1..=n_items as i64).collect();

    for user in 1..=n_users as i64 {
        items.shuffle(rng);
        for &item in &items {
            let stars = rng.gen_range(1..=5u8);
            let rating = binarize(f64::from(stars), STAR_SUCCESS_THRESHOLD);
            rows.push(
                RatingRow::new(user, item, rating)
                    .with_known(rng.gen_bool(0.5))
                    .with_extra("stars", stars),
            );
        }
    }

    rows
}

/// Item catalog matching [`synthetic_ratings`], keys 1..=n_items
pub fn synthetic_items(n_items: usize) -> Vec<CatalogEntry> {
    (1..=n_items as i64)
        .map(|key| CatalogEntry::new(key).with_attribute("title", format!("item-{}", key)))
        .collect()
}

/// Maps a graded rating to {0, 1} around `threshold` (strictly above is 1)
pub fn binarize(rating: f64, threshold: f64) -> f64 {
    if rating > threshold {
        1.0
    } else {
        0.0
    }
}

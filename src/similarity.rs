/**
 * ItemSim
 * Copyright (C) 2026 ItemSim contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use types::Rating;

/// Similarity measures for a pair of item rating vectors, selected at
/// configuration time and dispatched per pair during the sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimilarityMeasure {
    /// Cosine over ratings centered on each item's average rating. Removes
    /// per-item rating-scale bias and is the default measure.
    AdjustedCosine,
    /// Plain cosine over the raw ratings of the common raters.
    RawCosine,
}

impl SimilarityMeasure {

    pub fn from_name(name: &str) -> Option<SimilarityMeasure> {
        match name {
            "adjusted-cosine" => Some(SimilarityMeasure::AdjustedCosine),
            "raw-cosine" => Some(SimilarityMeasure::RawCosine),
            _ => None,
        }
    }

    /// Scores one unordered item pair over the users present in both rating
    /// vectors. Both vectors must be sorted ascending by user so that the
    /// common raters can be found with a single merge pass.
    ///
    /// Degenerate pairs resolve to 0: fewer than two common raters, and a
    /// zero denominator (no variance left on one side).
    pub fn score(
        &self,
        vector1: &[Rating], average1: f32,
        vector2: &[Rating], average2: f32,
    ) -> f32 {

        let mut x = 0;
        let mut y = 0;

        let mut common_raters = 0_usize;
        let mut numerator = 0.0_f64;
        let mut sum_of_squares1 = 0.0_f64;
        let mut sum_of_squares2 = 0.0_f64;

        while x < vector1.len() && y < vector2.len() {
            let rating1 = vector1[x];
            let rating2 = vector2[y];

            if rating1.user < rating2.user {
                x += 1;
            } else if rating1.user > rating2.user {
                y += 1;
            } else {
                let (s1, s2) = match *self {
                    SimilarityMeasure::AdjustedCosine => (
                        (rating1.rating - average1) as f64,
                        (rating2.rating - average2) as f64,
                    ),
                    SimilarityMeasure::RawCosine => (
                        rating1.rating as f64,
                        rating2.rating as f64,
                    ),
                };

                numerator += s1 * s2;
                sum_of_squares1 += s1 * s1;
                sum_of_squares2 += s2 * s2;
                common_raters += 1;

                x += 1;
                y += 1;
            }
        }

        if common_raters <= 1 {
            return 0.0;
        }

        let denominator = sum_of_squares1.sqrt() * sum_of_squares2.sqrt();
        if denominator == 0.0 {
            return 0.0;
        }

        (numerator / denominator) as f32
    }
}

#[cfg(test)]
mod tests {

    use types::Rating;
    use super::SimilarityMeasure;

    fn vector(entries: &[(u32, f32)]) -> Vec<Rating> {
        entries.iter().map(|&(user, rating)| Rating { user, rating }).collect()
    }

    fn within_epsilon(value: f32, expected: f32) -> bool {
        (value - expected).abs() < 1e-6
    }

    #[test]
    fn too_few_common_raters_scores_zero() {

        let v1 = vector(&[(0, 5.0), (1, 4.0), (2, 1.0)]);
        let disjoint = vector(&[(5, 3.0), (6, 4.0)]);
        let one_common = vector(&[(1, 3.0), (6, 4.0)]);

        let measure = SimilarityMeasure::AdjustedCosine;

        assert_eq!(measure.score(&v1, 3.0, &disjoint, 3.5), 0.0);
        assert_eq!(measure.score(&v1, 3.0, &one_common, 3.5), 0.0);
    }

    #[test]
    fn identical_mean_centered_vectors_score_one() {

        // both center to (1, -1) over the common raters
        let v1 = vector(&[(0, 5.0), (1, 3.0)]);
        let v2 = vector(&[(0, 4.0), (1, 2.0)]);

        let score = SimilarityMeasure::AdjustedCosine.score(&v1, 4.0, &v2, 3.0);

        assert!(within_epsilon(score, 1.0));
    }

    #[test]
    fn zero_variance_side_scores_zero() {

        // every centered rating of v1 is zero
        let v1 = vector(&[(0, 3.0), (1, 3.0)]);
        let v2 = vector(&[(0, 5.0), (1, 1.0)]);

        let score = SimilarityMeasure::AdjustedCosine.score(&v1, 3.0, &v2, 3.0);

        assert_eq!(score, 0.0);
    }

    #[test]
    fn raw_cosine_skips_mean_centering() {

        let v1 = vector(&[(0, 5.0), (1, 4.0)]);
        let v2 = vector(&[(0, 5.0), (1, 4.0)]);

        // raw ratings are parallel vectors no matter the averages
        let score = SimilarityMeasure::RawCosine.score(&v1, 4.5, &v2, 1.0);

        assert!(within_epsilon(score, 1.0));
    }

    #[test]
    fn score_is_symmetric_in_its_arguments() {

        let v1 = vector(&[(0, 5.0), (1, 4.0), (2, 1.0)]);
        let v2 = vector(&[(0, 3.0), (1, 4.0)]);

        let forward = SimilarityMeasure::AdjustedCosine.score(&v1, 10.0 / 3.0, &v2, 3.5);
        let backward = SimilarityMeasure::AdjustedCosine.score(&v2, 3.5, &v1, 10.0 / 3.0);

        assert_eq!(forward, backward);
        assert!(forward >= -1.0 && forward <= 1.0);
    }

    #[test]
    fn measures_are_selected_by_name() {
        assert_eq!(
            SimilarityMeasure::from_name("adjusted-cosine"),
            Some(SimilarityMeasure::AdjustedCosine)
        );
        assert_eq!(
            SimilarityMeasure::from_name("raw-cosine"),
            Some(SimilarityMeasure::RawCosine)
        );
        assert_eq!(SimilarityMeasure::from_name("pearson"), None);
    }
}

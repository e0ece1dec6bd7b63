use std::cmp::Ordering;
use std::fs;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use scoped_pool::Pool;

use mtx::Mtx;
use store::{similarity_matrix_path, RatingsStore};
use types::UNSET_SIMILARITY;
use utils;

pub struct PredictionParams {
    pub top_k_neighbours: usize,
    pub similarity_cutoff: f32,
    pub num_recommendations: usize,
}

#[derive(Debug, PartialEq)]
pub struct Neighbour {
    pub item: u32,
    pub similarity: f32,
}

/// A recommended item, already decoded to its external id.
#[derive(Debug, PartialEq)]
pub struct Recommendation {
    pub item_id: u32,
    pub predicted_rating: f32,
}

/// Consumer of a finished pipeline run: ranks neighbours from the persisted
/// similarity matrix, predicts ratings, and writes per-user recommendation
/// files. All heavy lifting happened upstream, this side only reads.
pub struct Predictor {
    store: RatingsStore,
    similarities: Mtx,
    params: PredictionParams,
}

impl Predictor {

    pub fn open(sandbox: &Path, params: PredictionParams) -> io::Result<Predictor> {

        let store = RatingsStore::open(sandbox)?;
        let similarities = Mtx::read(&similarity_matrix_path(sandbox))?;

        if similarities.rows() != store.num_items() || similarities.cols() != store.num_items() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "similarity matrix is {}x{} but the sandbox indexes {} items",
                    similarities.rows(),
                    similarities.cols(),
                    store.num_items(),
                ),
            ));
        }

        Ok(Predictor { store, similarities, params })
    }

    /// All items more similar to `item` than the configured cutoff, most
    /// similar first, truncated to the top-K. Unset matrix cells (the
    /// diagonal and anything never computed) are skipped.
    pub fn neighbours(&self, item: u32) -> Vec<Neighbour> {

        let row = self.similarities.row(item as usize);

        let mut neighbours: Vec<Neighbour> = row.iter()
            .enumerate()
            .filter(|&(other, &similarity)| {
                other as u32 != item
                    && similarity != UNSET_SIMILARITY
                    && similarity > self.params.similarity_cutoff
            })
            .map(|(other, &similarity)| Neighbour { item: other as u32, similarity })
            .collect();

        neighbours.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal)
        });
        neighbours.truncate(self.params.top_k_neighbours);

        neighbours
    }

    /// Similarity-weighted average of the user's ratings over the item's
    /// neighbourhood. `None` if the user rated no neighbour (or the weights
    /// cancel out), there is nothing to extrapolate from in that case.
    pub fn predict(&self, user: u32, item: u32) -> io::Result<Option<f32>> {

        let mut numerator = 0.0_f64;
        let mut denominator = 0.0_f64;

        for neighbour in self.neighbours(item) {
            if let Some(rating) = self.store.rating_of(user, neighbour.item)? {
                numerator += neighbour.similarity as f64 * rating as f64;
                denominator += neighbour.similarity as f64;
            }
        }

        if denominator == 0.0 {
            Ok(None)
        } else {
            Ok(Some((numerator / denominator) as f32))
        }
    }

    /// Ranks every item the user has not rated yet by predicted rating,
    /// highest first, keeping the configured number of recommendations.
    pub fn recommend(&self, user: u32) -> io::Result<Vec<Recommendation>> {

        let mut recommendations = Vec::new();

        for item in 0..self.store.num_items() as u32 {

            if self.store.rating_of(user, item)?.is_some() {
                continue;
            }

            if let Some(predicted_rating) = self.predict(user, item)? {
                recommendations.push(Recommendation {
                    item_id: self.store.external_item_id(item),
                    predicted_rating,
                });
            }
        }

        recommendations.sort_by(|a, b| {
            b.predicted_rating.partial_cmp(&a.predicted_rating).unwrap_or(Ordering::Equal)
        });
        recommendations.truncate(self.params.num_recommendations);

        Ok(recommendations)
    }

    fn write_recommendations(
        &self,
        user: u32,
        recommendations: &[Recommendation],
        directory: &Path,
    ) -> io::Result<()> {

        let file_name = format!("{}_{}.reco.txt", self.store.external_user_id(user), user);
        let file = File::create(directory.join(file_name))?;
        let mut out = BufWriter::new(file);

        for recommendation in recommendations {
            write!(out, "{}\n", recommendation.item_id)?;
        }

        Ok(())
    }

    /// Writes one recommendation file per user, the user range partitioned
    /// across `num_threads` workers. Every user is owned by exactly one
    /// worker, so the output files never contend.
    pub fn recommend_all(&self, directory: &Path, num_threads: usize) -> io::Result<()> {

        let num_users = self.store.num_users();

        if num_threads < 1 || num_threads > num_users {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "worker thread count {} must lie between 1 and the user count {}",
                    num_threads, num_users
                ),
            ));
        }

        fs::create_dir_all(directory)?;
        self.store.load_all()?;

        println!(
            "Computing recommendations for {} users with {} worker threads",
            num_users, num_threads,
        );

        let start = Instant::now();

        let mut failures: Vec<Option<io::Error>> = (0..num_threads).map(|_| None).collect();

        let pool = Pool::new(num_threads);

        pool.scoped(|scope| {

            let mut failures_left: &mut [Option<io::Error>] = &mut failures;

            for range in utils::contiguous_ranges(num_users, num_threads) {

                let (failure_slot, rest) = failures_left.split_at_mut(1);
                failures_left = rest;

                scope.execute(move || {
                    for user in range {
                        let user = user as u32;

                        let outcome = self.recommend(user).and_then(|recommendations| {
                            self.write_recommendations(user, &recommendations, directory)
                        });

                        if let Err(failure) = outcome {
                            failure_slot[0] = Some(failure);
                            return;
                        }
                    }
                });
            }
        });

        for failure in failures {
            if let Some(failure) = failure {
                return Err(failure);
            }
        }

        println!(
            "Wrote recommendation files for {} users in {}ms",
            num_users,
            utils::to_millis(start.elapsed()),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use std::fs;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use tempfile::TempDir;

    use mtx::Mtx;
    use store::{similarity_matrix_path, RatingsStore};
    use types::UNSET_SIMILARITY;
    use super::{PredictionParams, Predictor};

    /// Three users (1, 2, 3), three items (10, 20, 30), with a handcrafted
    /// similarity matrix: sim(0,1) = 0.9, sim(0,2) = 0.5, sim(1,2) = -0.2.
    fn sandbox_fixture(dir: &TempDir) -> ::std::path::PathBuf {
        let source = dir.path().join("ratings");
        File::create(&source).unwrap()
            .write_all(b"1 10 5\n1 20 4\n2 10 4\n2 20 5\n3 30 3\n2 30 2\n")
            .unwrap();

        let sandbox = dir.path().join("sandbox");
        RatingsStore::build(&source, &sandbox, 1).unwrap();

        let mut similarities = Mtx::filled(3, 3, UNSET_SIMILARITY);
        similarities.set(0, 1, 0.9);
        similarities.set(1, 0, 0.9);
        similarities.set(0, 2, 0.5);
        similarities.set(2, 0, 0.5);
        similarities.set(1, 2, -0.2);
        similarities.set(2, 1, -0.2);
        similarities.write(&similarity_matrix_path(&sandbox)).unwrap();

        sandbox
    }

    fn open_fixture(sandbox: &Path, top_k: usize, cutoff: f32) -> Predictor {
        let params = PredictionParams {
            top_k_neighbours: top_k,
            similarity_cutoff: cutoff,
            num_recommendations: 5,
        };
        Predictor::open(sandbox, params).unwrap()
    }

    #[test]
    fn neighbours_are_ranked_and_cut_off() {
        let dir = TempDir::new().unwrap();
        let sandbox = sandbox_fixture(&dir);

        let predictor = open_fixture(&sandbox, 10, 0.0);

        let neighbours = predictor.neighbours(0);
        assert_eq!(neighbours.len(), 2);
        assert_eq!(neighbours[0].item, 1);
        assert_eq!(neighbours[1].item, 2);

        // the negative similarity falls below the cutoff
        let neighbours = predictor.neighbours(1);
        assert_eq!(neighbours.len(), 1);
        assert_eq!(neighbours[0].item, 0);
    }

    #[test]
    fn top_k_truncates_the_neighbourhood() {
        let dir = TempDir::new().unwrap();
        let sandbox = sandbox_fixture(&dir);

        let predictor = open_fixture(&sandbox, 1, 0.0);

        let neighbours = predictor.neighbours(0);
        assert_eq!(neighbours.len(), 1);
        assert_eq!(neighbours[0].item, 1);
    }

    #[test]
    fn prediction_weights_ratings_by_similarity() {
        let dir = TempDir::new().unwrap();
        let sandbox = sandbox_fixture(&dir);

        let predictor = open_fixture(&sandbox, 10, -1.0);

        // user 0 rated item 0 with 5 and item 1 with 4:
        // (0.5 * 5 + -0.2 * 4) / (0.5 + -0.2)
        let predicted = predictor.predict(0, 2).unwrap().unwrap();
        assert!((predicted - 1.7 / 0.3).abs() < 1e-4);
    }

    #[test]
    fn prediction_without_rated_neighbours_is_invalid() {
        let dir = TempDir::new().unwrap();
        let sandbox = sandbox_fixture(&dir);

        let predictor = open_fixture(&sandbox, 10, 0.0);

        // user 2 only rated item 2, which is no neighbour of item 1
        assert_eq!(predictor.predict(2, 1).unwrap(), None);
    }

    #[test]
    fn recommendation_files_carry_external_ids() {
        let dir = TempDir::new().unwrap();
        let sandbox = sandbox_fixture(&dir);

        let predictor = open_fixture(&sandbox, 10, 0.0);

        let recos_dir = dir.path().join("recos");
        predictor.recommend_all(&recos_dir, 2).unwrap();

        // user 3 (internal 2) has not rated items 10 and 20; only item 10
        // gets a valid prediction through its rated neighbour 30
        let recos = fs::read_to_string(recos_dir.join("3_2.reco.txt")).unwrap();
        assert_eq!(recos, "10\n");

        assert!(recos_dir.join("1_0.reco.txt").exists());
        assert!(recos_dir.join("2_1.reco.txt").exists());
    }

    #[test]
    fn mismatched_matrix_dimensions_are_fatal() {
        let dir = TempDir::new().unwrap();
        let sandbox = sandbox_fixture(&dir);

        Mtx::filled(2, 2, 0.0).write(&similarity_matrix_path(&sandbox)).unwrap();

        let params = PredictionParams {
            top_k_neighbours: 10,
            similarity_cutoff: 0.0,
            num_recommendations: 5,
        };
        assert!(Predictor::open(&sandbox, params).is_err());
    }
}

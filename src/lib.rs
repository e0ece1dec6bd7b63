extern crate byteorder;
extern crate fnv;
extern crate rand;
extern crate scoped_pool;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;

#[cfg(test)]
extern crate tempfile;

use std::io::{Error, ErrorKind};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use scoped_pool::Pool;

pub mod factors;
pub mod io;
pub mod mtx;
pub mod predict;
pub mod request;
pub mod similarity;
pub mod stats;
pub mod store;
pub mod types;
pub mod utils;


use mtx::Mtx;
use similarity::SimilarityMeasure;
use store::RatingsStore;
use types::{ItemPair, UNSET_SIMILARITY};

/// Enumerates the upper triangle of the similarity matrix as a single ordered
/// work sequence of `num_items * (num_items - 1) / 2` pairs.
pub fn item_pairs(num_items: usize) -> Vec<ItemPair> {

    let mut pairs = Vec::with_capacity(num_items * num_items.saturating_sub(1) / 2);

    for item1 in 0..num_items {
        for item2 in (item1 + 1)..num_items {
            pairs.push(ItemPair { item1: item1 as u32, item2: item2 as u32 });
        }
    }

    pairs
}

/// Scores every unordered item pair and fills the similarity matrix.
///
/// The pair sequence is split into contiguous, near-equal ranges, one per
/// worker thread. Workers write into disjoint slices of a shared score
/// buffer, so the compute phase needs no synchronization beyond the cache
/// inside the store; the scores are scattered symmetrically into the matrix
/// after all workers have joined. The diagonal keeps the unset marker.
pub fn similarity_matrix(
    store: &RatingsStore,
    measure: SimilarityMeasure,
    num_threads: usize,
) -> ::std::io::Result<Mtx> {

    let num_items = store.num_items();

    if num_threads < 1 || num_threads > num_items {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "worker thread count {} must lie between 1 and the item count {}",
                num_threads, num_items
            ),
        ));
    }

    let pairs = item_pairs(num_items);

    println!(
        "Scoring {} item pairs over {} items with {} worker threads",
        pairs.len(),
        num_items,
        num_threads,
    );

    let sweep_start = Instant::now();

    let mut scores = vec![0.0_f32; pairs.len()];
    let pairs_scored = AtomicUsize::new(0);

    let pool = Pool::new(num_threads);

    pool.scoped(|scope| {

        let mut scores_left: &mut [f32] = &mut scores;

        for range in utils::contiguous_ranges(pairs.len(), num_threads) {

            let (score_chunk, rest) = scores_left.split_at_mut(range.len());
            scores_left = rest;

            let pair_chunk = &pairs[range];
            let pairs_scored = &pairs_scored;
            let num_pairs = pairs.len();

            scope.execute(move || {
                for (pair, slot) in pair_chunk.iter().zip(score_chunk.iter_mut()) {

                    let vector1 = store.vector(pair.item1)
                        .expect("item vector resident during sweep");
                    let vector2 = store.vector(pair.item2)
                        .expect("item vector resident during sweep");

                    *slot = measure.score(
                        &vector1, store.average_rating(pair.item1),
                        &vector2, store.average_rating(pair.item2),
                    );

                    let scored = pairs_scored.fetch_add(1, Ordering::Relaxed) + 1;
                    if scored % 200_000 == 0 {
                        println!("Scored {}/{} item pairs", scored, num_pairs);
                    }
                }
            });
        }
    });

    let mut matrix = Mtx::filled(num_items, num_items, UNSET_SIMILARITY);

    for (pair, &score) in pairs.iter().zip(scores.iter()) {
        matrix.set(pair.item1 as usize, pair.item2 as usize, score);
        matrix.set(pair.item2 as usize, pair.item1 as usize, score);
    }

    println!(
        "Scored {} item pairs in {}ms",
        pairs.len(),
        utils::to_millis(sweep_start.elapsed()),
    );

    Ok(matrix)
}

/// Pipeline phase one: index a rating source into a sandbox directory.
pub fn build_index(
    source: &Path,
    sandbox: &Path,
    num_threads: usize,
) -> ::std::io::Result<RatingsStore> {
    RatingsStore::build(source, sandbox, num_threads)
}

/// Pipeline phase two: score all item pairs of a previously indexed sandbox
/// and persist the similarity matrix there. The cache is warmed up front so
/// the parallel sweep runs against resident vectors, and the written matrix
/// is immediately reread and compared against the in-memory one.
pub fn compute_similarity(
    sandbox: &Path,
    measure: SimilarityMeasure,
    num_threads: usize,
) -> ::std::io::Result<Mtx> {

    let store = RatingsStore::open(sandbox)?;
    store.load_all()?;

    let matrix = similarity_matrix(&store, measure, num_threads)?;

    let path = store::similarity_matrix_path(sandbox);
    matrix.write(&path)?;

    let reread = Mtx::read(&path)?;
    if !matrix.compare(&reread) {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("similarity matrix failed round trip verification at {}", path.display()),
        ));
    }

    println!("Wrote similarity matrix to {}", path.display());

    Ok(matrix)
}

use std::fs;
use std::fs::File;
use std::io;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fnv::FnvHashMap;
use scoped_pool::Pool;

use io::{read_average_ratings, read_index_file, triple_scanner, write_average_ratings,
    write_index_file};
use stats::{DataDictionary, Renaming};
use types::{Rating, RatingVector};
use utils;

pub fn index_dir(sandbox: &Path) -> PathBuf {
    sandbox.join("idx")
}

pub fn item_vectors_dir(sandbox: &Path) -> PathBuf {
    sandbox.join("item-vectors")
}

pub fn user_index_path(sandbox: &Path) -> PathBuf {
    index_dir(sandbox).join("usr.idx")
}

pub fn item_index_path(sandbox: &Path) -> PathBuf {
    index_dir(sandbox).join("itm.idx")
}

pub fn average_ratings_path(sandbox: &Path) -> PathBuf {
    index_dir(sandbox).join("avg-ratings")
}

pub fn similarity_matrix_path(sandbox: &Path) -> PathBuf {
    sandbox.join("similarity.mtx")
}

fn item_vector_path(sandbox: &Path, item: u32) -> PathBuf {
    item_vectors_dir(sandbox).join(item.to_string())
}

/// Disk-backed store of the per-item rating vectors, keyed by internal item
/// index. Built once per run from a full rating snapshot, reopened later by
/// the similarity and prediction phases. Vectors are loaded from disk on
/// first access and cached for the remainder of the run; the cache is shared
/// across all worker threads.
pub struct RatingsStore {
    sandbox: PathBuf,
    renaming: Renaming,
    average_ratings: Vec<f32>,
    cache: Mutex<FnvHashMap<u32, Arc<RatingVector>>>,
}

impl RatingsStore {

    /// Builds the store from a rating source: runs the two dictionary passes,
    /// writes one vector file per item (partitioned over `num_threads` writer
    /// threads), and persists the identifier tables and average ratings.
    /// Replaces the contents of the sandbox directory wholesale.
    pub fn build(source: &Path, sandbox: &Path, num_threads: usize) -> io::Result<RatingsStore> {

        println!("Reading {} to build identifier dictionaries (pass 1/2)", source.display());

        let data_dict = DataDictionary::from_triples(triple_scanner(source)?);

        let num_items = data_dict.num_items();

        if data_dict.num_users() == 0 || num_items == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("rating source {} contains no ratings", source.display()),
            ));
        }

        if num_threads < 1 || num_threads > num_items {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "writer thread count {} must lie between 1 and the item count {}",
                    num_threads, num_items
                ),
            ));
        }

        println!(
            "Found {} ratings from {} users over {} items.",
            data_dict.num_ratings(),
            data_dict.num_users(),
            num_items,
        );

        if sandbox.exists() {
            fs::remove_dir_all(sandbox)?;
        }
        fs::create_dir_all(&index_dir(sandbox))?;
        fs::create_dir_all(&item_vectors_dir(sandbox))?;

        println!("Reading {} to populate item rating vectors (pass 2/2)", source.display());

        let mut vectors: Vec<RatingVector> = vec![Vec::new(); num_items];

        for (user, item, rating) in triple_scanner(source)? {
            let user = data_dict.user_index(user);
            let item = data_dict.item_index(item);
            vectors[item as usize].push(Rating { user, rating });
        }

        let write_start = Instant::now();

        let mut average_ratings = vec![0.0_f32; num_items];
        let mut failures: Vec<Option<io::Error>> = (0..num_threads).map(|_| None).collect();

        let pool = Pool::new(num_threads);

        pool.scoped(|scope| {

            let ranges = utils::contiguous_ranges(num_items, num_threads);

            let mut vectors_left: &mut [RatingVector] = &mut vectors;
            let mut averages_left: &mut [f32] = &mut average_ratings;
            let mut failures_left: &mut [Option<io::Error>] = &mut failures;

            for range in ranges {

                let (vector_chunk, rest) = vectors_left.split_at_mut(range.len());
                vectors_left = rest;
                let (average_chunk, rest) = averages_left.split_at_mut(range.len());
                averages_left = rest;
                let (failure_slot, rest) = failures_left.split_at_mut(1);
                failures_left = rest;

                let first_item = range.start as u32;
                let sandbox = sandbox.to_path_buf();

                scope.execute(move || {
                    for (offset, vector) in vector_chunk.iter_mut().enumerate() {
                        let item = first_item + offset as u32;
                        let path = item_vector_path(&sandbox, item);

                        match write_item_vector(vector, &path) {
                            Ok(average) => average_chunk[offset] = average,
                            Err(failure) => {
                                failure_slot[0] = Some(failure);
                                return;
                            },
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

        write_index_file(data_dict.user_ids(), &user_index_path(sandbox))?;
        write_index_file(data_dict.item_ids(), &item_index_path(sandbox))?;
        write_average_ratings(&average_ratings, &average_ratings_path(sandbox))?;

        println!(
            "Wrote {} item vector files in {}ms",
            num_items,
            utils::to_millis(write_start.elapsed()),
        );

        Ok(RatingsStore {
            sandbox: sandbox.to_path_buf(),
            renaming: data_dict.into(),
            average_ratings,
            cache: Mutex::new(FnvHashMap::default()),
        })
    }

    /// Opens a previously built sandbox: loads the identifier tables and the
    /// average ratings. Item vectors stay on disk until first access.
    pub fn open(sandbox: &Path) -> io::Result<RatingsStore> {

        let user_ids = read_index_file(&user_index_path(sandbox))?;
        let item_ids = read_index_file(&item_index_path(sandbox))?;
        let average_ratings = read_average_ratings(&average_ratings_path(sandbox))?;

        if average_ratings.len() != item_ids.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "average ratings table holds {} entries for {} items in {}",
                    average_ratings.len(),
                    item_ids.len(),
                    sandbox.display(),
                ),
            ));
        }

        Ok(RatingsStore {
            sandbox: sandbox.to_path_buf(),
            renaming: Renaming::new(user_ids, item_ids),
            average_ratings,
            cache: Mutex::new(FnvHashMap::default()),
        })
    }

    pub fn num_users(&self) -> usize {
        self.renaming.num_users()
    }

    pub fn num_items(&self) -> usize {
        self.renaming.num_items()
    }

    pub fn external_user_id(&self, user: u32) -> u32 {
        self.renaming.user_id(user)
    }

    pub fn external_item_id(&self, item: u32) -> u32 {
        self.renaming.item_id(item)
    }

    pub fn average_rating(&self, item: u32) -> f32 {
        self.average_ratings[item as usize]
    }

    /// Get-or-load access to one item's rating vector. The mutex guards only
    /// the check/insert step; the disk load happens outside of it. Two
    /// threads racing for an unloaded item may both read the file, but only
    /// the first insert wins and the loser's copy is discarded, so every
    /// caller observes the same cached vector.
    pub fn vector(&self, item: u32) -> io::Result<Arc<RatingVector>> {

        {
            let cache = self.cache.lock().unwrap();
            if let Some(vector) = cache.get(&item) {
                return Ok(Arc::clone(vector));
            }
        }

        let loaded = Arc::new(self.load_vector(item)?);

        let mut cache = self.cache.lock().unwrap();
        let vector = cache.entry(item).or_insert(loaded);

        Ok(Arc::clone(vector))
    }

    /// Looks up the rating `user` gave to `item`, `None` if the user never
    /// rated it. The vector is sorted by user, so a binary search suffices.
    pub fn rating_of(&self, user: u32, item: u32) -> io::Result<Option<f32>> {
        let vector = self.vector(item)?;

        let rating = vector
            .binary_search_by_key(&user, |rating| rating.user)
            .ok()
            .map(|position| vector[position].rating);

        Ok(rating)
    }

    /// Eagerly populates the whole cache. Run before a similarity sweep so
    /// the compute-heavy phase never touches the cache lock for a load.
    pub fn load_all(&self) -> io::Result<()> {
        let start = Instant::now();

        for item in 0..self.num_items() {
            self.vector(item as u32)?;
        }

        println!(
            "Loaded {} item vectors into the cache in {}ms",
            self.num_items(),
            utils::to_millis(start.elapsed()),
        );

        Ok(())
    }

    fn load_vector(&self, item: u32) -> io::Result<RatingVector> {
        let path = item_vector_path(&self.sandbox, item);

        let file = File::open(&path).map_err(|error| io::Error::new(
            error.kind(),
            format!("unable to open item vector file {}: {}", path.display(), error),
        ))?;
        let mut input = BufReader::new(file);

        let count = input.read_u32::<LittleEndian>()?;

        let mut vector = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let user = input.read_u32::<LittleEndian>().map_err(|error| io::Error::new(
                error.kind(),
                format!("corrupt item vector file {}: {}", path.display(), error),
            ))?;
            let rating = input.read_f32::<LittleEndian>().map_err(|error| io::Error::new(
                error.kind(),
                format!("corrupt item vector file {}: {}", path.display(), error),
            ))?;
            vector.push(Rating { user, rating });
        }

        Ok(vector)
    }
}

/// Sorts the vector by user, writes it as a 4-byte entry count followed by
/// `(user, rating)` records, and returns the average rating of the item.
fn write_item_vector(vector: &mut RatingVector, path: &Path) -> io::Result<f32> {

    vector.sort_by_key(|rating| rating.user);

    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    out.write_u32::<LittleEndian>(vector.len() as u32)?;

    let mut sum = 0.0_f32;
    for rating in vector.iter() {
        out.write_u32::<LittleEndian>(rating.user)?;
        out.write_f32::<LittleEndian>(rating.rating)?;
        sum += rating.rating;
    }

    Ok(sum / vector.len() as f32)
}

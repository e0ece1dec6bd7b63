use std::io;
use std::path::Path;
use std::time::Instant;

use rand::Rng;

use io::{triple_scanner, write_index_file};
use mtx::Mtx;
use stats::DataDictionary;
use utils;

pub struct FactorizationParams {
    pub num_factors: usize,
    pub initial_value: f32,
    pub learning_rate_p: f32,
    pub learning_rate_q: f32,
    pub regularization_p: f32,
    pub regularization_q: f32,
    pub training_fraction: f32,
    pub num_iterations: usize,
}

pub struct FactorizationOutcome {
    /// User factors, `users x factors`.
    pub p: Mtx,
    /// Item factors, `factors x items`.
    pub q: Mtx,
    pub validation_rmse: f32,
    pub iterations_run: usize,
}

/// Learns the rating matrix factorization `R ~ P * Q` by stochastic gradient
/// descent. A single-threaded numeric loop: it shares the identifier
/// dictionaries and the matrix codec with the similarity pipeline but has no
/// cache or concurrency of its own. The best-RMSE snapshots of `P` and `Q`
/// are written to the output directory alongside the index tables.
pub fn train(
    source: &Path,
    output_dir: &Path,
    params: &FactorizationParams,
) -> io::Result<FactorizationOutcome> {

    validate(params)?;

    println!("Reading {} to build identifier dictionaries (pass 1/2)", source.display());

    let data_dict = DataDictionary::from_triples(triple_scanner(source)?);

    if data_dict.num_users() == 0 || data_dict.num_items() == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("rating source {} contains no ratings", source.display()),
        ));
    }

    println!("Reading {} to collect training triples (pass 2/2)", source.display());

    let triples: Vec<(u32, u32, f32)> = triple_scanner(source)?
        .map(|(user, item, rating)| {
            (data_dict.user_index(user), data_dict.item_index(item), rating)
        })
        .collect();

    ::std::fs::create_dir_all(output_dir)?;
    write_index_file(data_dict.user_ids(), &output_dir.join("usr.idx"))?;
    write_index_file(data_dict.item_ids(), &output_dir.join("itm.idx"))?;

    let mut order: Vec<usize> = (0..triples.len()).collect();
    rand::thread_rng().shuffle(&mut order);

    let train_end = (triples.len() as f32 * params.training_fraction) as usize;
    if train_end == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "training split is empty, raise the training fraction",
        ));
    }

    let num_users = data_dict.num_users();
    let num_items = data_dict.num_items();
    let num_factors = params.num_factors;

    let mut p = Mtx::filled(num_users, num_factors, params.initial_value);
    let mut q = Mtx::filled(num_factors, num_items, params.initial_value);

    println!(
        "Factorizing {} ratings ({} training, {} validation) into {} factors",
        triples.len(),
        train_end,
        triples.len() - train_end,
        num_factors,
    );

    let training_start = Instant::now();

    let mut best: Option<(Mtx, Mtx, f32)> = None;
    let mut iterations_run = 0;

    for iteration in 0..params.num_iterations {

        for &index in &order[..train_end] {
            let (user, item, rating) = triples[index];
            let user = user as usize;
            let item = item as usize;

            let error = rating - predicted_rating(&p, &q, user, item);

            // simultaneous update, both sides see the pre-update factors
            for factor in 0..num_factors {
                let p_uf = p.get(user, factor);
                let q_fi = q.get(factor, item);

                p.set(user, factor, p_uf
                    + params.learning_rate_p * (error * q_fi - params.regularization_p * p_uf));
                q.set(factor, item, q_fi
                    + params.learning_rate_q * (error * p_uf - params.regularization_q * q_fi));
            }
        }

        let validation = if train_end < order.len() {
            &order[train_end..]
        } else {
            &order[..train_end]
        };
        let rmse = root_mean_squared_error(&p, &q, &triples, validation);

        println!("Iteration {}: validation RMSE {:.4}", iteration, rmse);

        iterations_run += 1;

        let improved = match best {
            Some((_, _, best_rmse)) => rmse < best_rmse,
            None => true,
        };
        if improved {
            best = Some((p.clone(), q.clone(), rmse));
        }
    }

    let (p, q, validation_rmse) = best.unwrap();

    p.write(&output_dir.join("P.mtx"))?;
    q.write(&output_dir.join("Q.mtx"))?;

    println!(
        "Trained for {} iterations in {}ms, final validation RMSE {:.4}",
        iterations_run,
        utils::to_millis(training_start.elapsed()),
        validation_rmse,
    );

    Ok(FactorizationOutcome { p, q, validation_rmse, iterations_run })
}

fn validate(params: &FactorizationParams) -> io::Result<()> {

    if params.num_factors < 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "at least one factor is required",
        ));
    }

    if params.training_fraction <= 0.0 || params.training_fraction > 1.0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("training fraction {} must lie in (0, 1]", params.training_fraction),
        ));
    }

    if params.num_iterations < 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "at least one training iteration is required",
        ));
    }

    Ok(())
}

fn predicted_rating(p: &Mtx, q: &Mtx, user: usize, item: usize) -> f32 {
    let mut rating = 0.0;
    for factor in 0..p.cols() {
        rating += p.get(user, factor) * q.get(factor, item);
    }
    rating
}

fn root_mean_squared_error(
    p: &Mtx,
    q: &Mtx,
    triples: &[(u32, u32, f32)],
    sample: &[usize],
) -> f32 {

    let mut sum_of_squares = 0.0_f64;

    for &index in sample {
        let (user, item, rating) = triples[index];
        let error = rating - predicted_rating(p, q, user as usize, item as usize);
        sum_of_squares += (error as f64) * (error as f64);
    }

    (sum_of_squares / sample.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {

    use std::fs::File;
    use std::io::Write;

    use tempfile::TempDir;

    use mtx::Mtx;
    use super::{train, FactorizationParams};

    fn params() -> FactorizationParams {
        FactorizationParams {
            num_factors: 2,
            initial_value: 1.0,
            learning_rate_p: 0.1,
            learning_rate_q: 0.1,
            regularization_p: 0.0,
            regularization_q: 0.0,
            training_fraction: 1.0,
            num_iterations: 50,
        }
    }

    #[test]
    fn factorization_fits_a_constant_rating_matrix() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("ratings");
        File::create(&source).unwrap()
            .write_all(b"1 10 4\n1 20 4\n2 10 4\n2 20 4\n")
            .unwrap();

        let output_dir = dir.path().join("factors");
        let outcome = train(&source, &output_dir, &params()).unwrap();

        assert_eq!(outcome.p.rows(), 2);
        assert_eq!(outcome.p.cols(), 2);
        assert_eq!(outcome.q.rows(), 2);
        assert_eq!(outcome.q.cols(), 2);
        assert_eq!(outcome.iterations_run, 50);
        assert!(outcome.validation_rmse < 0.1);

        // the persisted parameter matrices round trip through the codec
        assert!(outcome.p.compare(&Mtx::read(&output_dir.join("P.mtx")).unwrap()));
        assert!(outcome.q.compare(&Mtx::read(&output_dir.join("Q.mtx")).unwrap()));
    }

    #[test]
    fn degenerate_parameters_are_rejected() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("ratings");
        File::create(&source).unwrap().write_all(b"1 10 4\n").unwrap();

        let mut no_factors = params();
        no_factors.num_factors = 0;
        assert!(train(&source, &dir.path().join("out"), &no_factors).is_err());

        let mut no_training_data = params();
        no_training_data.training_fraction = 1.5;
        assert!(train(&source, &dir.path().join("out"), &no_training_data).is_err());
    }
}

extern crate getopts;
extern crate itemsim;
extern crate num_cpus;

use std::env;
use std::error::Error;
use std::path::Path;
use std::process;

use getopts::Options;

use itemsim::predict::{PredictionParams, Predictor};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("s", "sandbox-dir", "Sandbox directory of a finished similarity run \
        (required).", "PATH");
    opts.optopt("o", "recos-dir", "Directory to write the per-user recommendation files \
        into (required).", "PATH");
    opts.optopt("k", "top-K-neighbours", "Number of neighbours to predict from (optional, \
        defaults to 10).", "NUMBER");
    opts.optopt("c", "similarity-cutoff-value", "Consider neighbours only above this \
        similarity (optional, defaults to 0).", "NUMBER");
    opts.optopt("n", "num-recommendations", "Number of recommendations to keep per user \
        (optional, defaults to 20).", "NUMBER");
    opts.optopt("t", "max-threads-count", "Number of worker threads (optional, defaults to \
        the number of cpus).", "NUMBER");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    if matches.opt_present("h") {
        let brief = format!("Usage: {} [options]", program);
        eprint!("{}", opts.usage(&brief));
        return;
    }

    let sandbox_dir = match matches.opt_str("s") {
        Some(sandbox_dir) => sandbox_dir,
        None => {
            return print_usage_and_exit(
                &program,
                opts,
                Some("Please specify a sandbox directory via --sandbox-dir."),
            );
        },
    };

    let recos_dir = match matches.opt_str("o") {
        Some(recos_dir) => recos_dir,
        None => {
            return print_usage_and_exit(
                &program,
                opts,
                Some("Please specify an output directory via --recos-dir."),
            );
        },
    };

    let top_k_neighbours = match matches.opt_get_default("k", 10) {
        Ok(top_k_neighbours) => top_k_neighbours,
        Err(failure) => {
            let hint = format!("Problem with option 'k': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    let similarity_cutoff = match matches.opt_get_default("c", 0.0_f32) {
        Ok(similarity_cutoff) => similarity_cutoff,
        Err(failure) => {
            let hint = format!("Problem with option 'c': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    let num_recommendations = match matches.opt_get_default("n", 20) {
        Ok(num_recommendations) => num_recommendations,
        Err(failure) => {
            let hint = format!("Problem with option 'n': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    let num_threads = match matches.opt_get_default("t", num_cpus::get()) {
        Ok(num_threads) => num_threads,
        Err(failure) => {
            let hint = format!("Problem with option 't': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    let params = PredictionParams { top_k_neighbours, similarity_cutoff, num_recommendations };

    if let Err(failure) = run(&sandbox_dir, &recos_dir, params, num_threads) {
        eprintln!("Batch prediction failed: {}", failure);
        process::exit(1);
    }
}

fn print_usage_and_exit(program: &str, opts: Options, hint: Option<&str>) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
    process::exit(2);
}

fn run(
    sandbox_dir: &str,
    recos_dir: &str,
    params: PredictionParams,
    num_threads: usize,
) -> Result<(), Box<dyn Error>> {

    let predictor = Predictor::open(Path::new(sandbox_dir), params)?;
    predictor.recommend_all(Path::new(recos_dir), num_threads)?;

    Ok(())
}

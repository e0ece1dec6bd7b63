extern crate getopts;
extern crate itemsim;

use std::env;
use std::error::Error;
use std::path::Path;
use std::process;

use getopts::Options;

use itemsim::factors;
use itemsim::factors::FactorizationParams;

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Rating source to factorize (required). The input must \
        contain a whitespace-separated 'user item rating' triple per line.", "PATH");
    opts.optopt("o", "output-dir", "Directory to write the parameter matrices and index \
        tables into (required).", "PATH");
    opts.optopt("f", "num-factors", "Number of hidden factors (optional, defaults to 5).",
        "NUMBER");
    opts.optopt("", "initial-value", "Initial value of every factor (optional, defaults to \
        0.1).", "NUMBER");
    opts.optopt("", "learning-rate-p", "Learning rate for the user factors (optional, \
        defaults to 0.002).", "NUMBER");
    opts.optopt("", "learning-rate-q", "Learning rate for the item factors (optional, \
        defaults to 0.002).", "NUMBER");
    opts.optopt("", "regularization-p", "Regularization for the user factors (optional, \
        defaults to 0.04).", "NUMBER");
    opts.optopt("", "regularization-q", "Regularization for the item factors (optional, \
        defaults to 0.04).", "NUMBER");
    opts.optopt("", "training-fraction", "Fraction of the ratings used for training, the \
        rest validates (optional, defaults to 0.7).", "NUMBER");
    opts.optopt("", "iterations", "Number of gradient descent iterations (optional, \
        defaults to 30).", "NUMBER");
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

    let inputfile = match matches.opt_str("i") {
        Some(inputfile) => inputfile,
        None => {
            return print_usage_and_exit(
                &program,
                opts,
                Some("Please specify an inputfile via --inputfile."),
            );
        },
    };

    let output_dir = match matches.opt_str("o") {
        Some(output_dir) => output_dir,
        None => {
            return print_usage_and_exit(
                &program,
                opts,
                Some("Please specify an output directory via --output-dir."),
            );
        },
    };

    let params = FactorizationParams {
        num_factors: numeric_option(&matches, "num-factors", 5, &program, &opts),
        initial_value: numeric_option(&matches, "initial-value", 0.1, &program, &opts),
        learning_rate_p: numeric_option(&matches, "learning-rate-p", 0.002, &program, &opts),
        learning_rate_q: numeric_option(&matches, "learning-rate-q", 0.002, &program, &opts),
        regularization_p: numeric_option(&matches, "regularization-p", 0.04, &program, &opts),
        regularization_q: numeric_option(&matches, "regularization-q", 0.04, &program, &opts),
        training_fraction: numeric_option(&matches, "training-fraction", 0.7, &program, &opts),
        num_iterations: numeric_option(&matches, "iterations", 30, &program, &opts),
    };

    if let Err(failure) = run(&inputfile, &output_dir, &params) {
        eprintln!("Factorization failed: {}", failure);
        process::exit(1);
    }
}

fn numeric_option<T>(
    matches: &getopts::Matches,
    option: &str,
    default: T,
    program: &str,
    opts: &Options,
) -> T
    where T: ::std::str::FromStr, T::Err: ::std::fmt::Display {

    match matches.opt_get_default(option, default) {
        Ok(value) => value,
        Err(failure) => {
            eprintln!("\nProblem with option '{}': {}\n", option, failure);
            let brief = format!("Usage: {} [options]", program);
            eprint!("{}", opts.usage(&brief));
            process::exit(2);
        },
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
    inputfile: &str,
    output_dir: &str,
    params: &FactorizationParams,
) -> Result<(), Box<dyn Error>> {

    let outcome = factors::train(Path::new(inputfile), Path::new(output_dir), params)?;

    println!(
        "Learned {} user factors and {} item factors, validation RMSE {:.4}",
        outcome.p.rows(),
        outcome.q.cols(),
        outcome.validation_rmse,
    );

    Ok(())
}

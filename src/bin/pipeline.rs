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

extern crate getopts;
extern crate itemsim;
extern crate num_cpus;

use std::env;
use std::error::Error;
use std::path::Path;
use std::process;

use getopts::Options;

use itemsim::request::{PipelineRequest, RequestType};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("r", "request", "Path of a JSON request file describing the pipeline run. \
        When given, the remaining options are ignored.", "PATH");
    opts.optopt("m", "mode", "Pipeline mode, either 'build-index' or 'compute-similarity'.",
        "MODE");
    opts.optopt("i", "inputfile", "Rating source to index (build-index mode only). The input \
        must contain a whitespace-separated 'user item rating' triple per line.", "PATH");
    opts.optopt("s", "sandbox-dir", "Directory holding all persisted artifacts of one \
        pipeline instance.", "PATH");
    opts.optopt("t", "max-threads-count", "Number of worker threads (optional, defaults to \
        the number of cpus).", "NUMBER");
    opts.optopt("e", "similarity-measure", "Similarity measure to use, 'adjusted-cosine' \
        (default) or 'raw-cosine'.", "NAME");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    if matches.opt_present("h") {
        print_usage(&program, opts);
        return;
    }

    let request = if let Some(request_path) = matches.opt_str("r") {
        match PipelineRequest::from_file(Path::new(&request_path)) {
            Ok(request) => request,
            Err(failure) => {
                let hint = failure.to_string();
                return print_usage_and_exit(&program, opts, Some(&hint));
            },
        }
    } else {

        let req_type = match matches.opt_str("m").as_ref().map(|mode| mode.as_str()) {
            Some("build-index") => RequestType::BuildIndex,
            Some("compute-similarity") => RequestType::ComputeSimilarity,
            Some(other) => {
                let hint = format!("Unknown mode '{}'.", other);
                return print_usage_and_exit(&program, opts, Some(&hint));
            },
            None => {
                return print_usage_and_exit(
                    &program,
                    opts,
                    Some("Please specify a mode via --mode, or a request file via --request."),
                );
            },
        };

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

        let ratings_path = matches.opt_str("i");
        if req_type == RequestType::BuildIndex && ratings_path.is_none() {
            return print_usage_and_exit(
                &program,
                opts,
                Some("Please specify an inputfile via --inputfile."),
            );
        }

        let num_threads = match matches.opt_get_default("t", num_cpus::get()) {
            Ok(num_threads) => num_threads,
            Err(failure) => {
                let hint = format!("Problem with option 't': {}", failure);
                return print_usage_and_exit(&program, opts, Some(&hint));
            },
        };

        PipelineRequest {
            req_type,
            req_id: None,
            sandbox_dir,
            ratings_path,
            num_threads,
            similarity_measure: matches.opt_str("e"),
        }
    };

    if let Err(failure) = run(&request) {
        eprintln!("Pipeline run failed: {}", failure);
        process::exit(1);
    }
}

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn print_usage_and_exit(program: &str, opts: Options, hint: Option<&str>) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    print_usage(program, opts);
    process::exit(2);
}

fn run(request: &PipelineRequest) -> Result<(), Box<dyn Error>> {

    let sandbox = Path::new(&request.sandbox_dir);

    match request.req_type {

        RequestType::BuildIndex => {
            let ratings_path = request.ratings_path.as_ref()
                .ok_or("build-index requests must name a rating source")?;

            itemsim::build_index(Path::new(ratings_path), sandbox, request.num_threads)?;
        },

        RequestType::ComputeSimilarity => {
            itemsim::compute_similarity(sandbox, request.measure()?, request.num_threads)?;
        },
    }

    Ok(())
}

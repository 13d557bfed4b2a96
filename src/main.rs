//! This crate simulates the BER-versus-SNR and BLER-versus-SNR performance of the GSM, GPRS,
//! WiMAX and LTE convolutional codes and of the LTE turbo code over a BPSK-AWGN channel, and
//! measures decoder throughput. Parameters are specified on the command line, and results are
//! saved to a JSON file. Log output goes to stderr and is filtered with `RUST_LOG`.
//!
//! Build the executable with `cargo build --release` and then run `./target/release/trellis-fec
//! -h` for help on the command-line interface.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use anyhow::{anyhow, Result};
use clap::parser::ValueSource;
use clap::{crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use trellis_fec::{codes, sim, ConvCodec, DecodingAlgo, TurboCode, TurboCodec};

/// Command-line name of the LTE turbo code
const TURBO_CODE_NAME: &str = "lte-turbo";

/// Main function
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let timer = Instant::now();
    let matches = command_line_parser().get_matches();
    if matches.get_flag("list") {
        print_code_list();
        return Ok(());
    }
    let code_name = code_name_from_matches(&matches);
    let json_filename = &json_filename_from_matches(&matches);
    if let Some(num_blocks) = num_bench_blocks_from_matches(&matches) {
        let num_threads = num_threads_from_matches(&matches);
        let results = if code_name == TURBO_CODE_NAME {
            let codec = TurboCodec::new(
                Arc::new(TurboCode::lte()?),
                block_len_from_matches(&matches),
                decoding_algo_from_matches(&matches),
            )?;
            sim::run_benchmark(&codec, "LTE turbo", num_blocks, num_threads)?
        } else {
            let named = codes::by_name(&code_name)
                .ok_or_else(|| anyhow!("Unknown code name {code_name} (use -l to list codes)"))?;
            let codec = ConvCodec::new(named.code)?;
            sim::run_benchmark(&codec, named.name, num_blocks, num_threads)?
        };
        sim::save_results(&[results], json_filename)?;
    } else {
        let all_params = all_sim_params(&matches);
        let all_results = if code_name == TURBO_CODE_NAME {
            sim::run_turbo_sim(
                block_len_from_matches(&matches),
                decoding_algo_from_matches(&matches),
                &all_params,
            )?
        } else {
            sim::run_conv_sim(&code_name, &all_params)?
        };
        sim::save_results(&all_results, json_filename)?;
    }
    eprintln!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Prints the keys and names of all available codes.
fn print_code_list() {
    for named in codes::CODES {
        println!(
            "{:<12} {:<20} {:<16} {}",
            named.key, named.name, named.standard, named.code
        );
    }
    println!("{TURBO_CODE_NAME:<12} {:<20} 3GPP TS 36.212", "LTE turbo");
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Evaluates convolutional and turbo codes over a BPSK-AWGN channel")
        .arg(code_name())
        .arg(list())
        .arg(block_len())
        .arg(decoding_algo_name())
        .arg(num_turbo_iter())
        .arg(es_over_n0_first_db())
        .arg(es_over_n0_step_db())
        .arg(num_sweep_points())
        .arg(llr_clip())
        .arg(num_block_errors_min())
        .arg(num_blocks_per_run())
        .arg(num_runs_min())
        .arg(num_runs_max())
        .arg(num_threads())
        .arg(num_bench_blocks())
        .arg(json_filename())
}

/// Returns argument for code name.
fn code_name() -> Arg {
    Arg::new("code_name")
        .short('c')
        .default_value(TURBO_CODE_NAME)
        .help("Code key or name (see -l)")
}

/// Returns argument for listing available codes.
fn list() -> Arg {
    Arg::new("list")
        .short('l')
        .long("list")
        .action(ArgAction::SetTrue)
        .help("List available codes and exit")
}

/// Returns argument for number of information bits per turbo code block.
fn block_len() -> Arg {
    Arg::new("block_len")
        .short('i')
        .value_parser(value_parser!(usize))
        .default_value("40")
        .help("Number of information bits per block (turbo code only)")
}

/// Returns argument for decoding algorithm name.
fn decoding_algo_name() -> Arg {
    Arg::new("decoding_algo_name")
        .short('a')
        .value_parser(["LogMAP", "MaxLogMAP", "LinearLogMAP"])
        .default_value("LogMAP")
        .help("Turbo decoding algorithm name")
}

/// Returns argument for number of turbo iterations.
fn num_turbo_iter() -> Arg {
    Arg::new("num_turbo_iter")
        .short('t')
        .value_parser(value_parser!(u32))
        .default_value("8")
        .help("Number of turbo iterations")
}

/// Returns argument for Es/N0 (dB) of the first point of the sweep.
fn es_over_n0_first_db() -> Arg {
    Arg::new("es_over_n0_first_db")
        .short('r')
        .long("es-n0-first")
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("0.0")
        .help("Es/N0 (dB) per transmitted code bit at the first sweep point")
}

/// Returns argument for Es/N0 increment (dB) between sweep points.
fn es_over_n0_step_db() -> Arg {
    Arg::new("es_over_n0_step_db")
        .short('p')
        .long("es-n0-step")
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("1.0")
        .help("Es/N0 increment (dB) between sweep points")
}

/// Returns argument for number of sweep points.
fn num_sweep_points() -> Arg {
    Arg::new("num_sweep_points")
        .short('s')
        .long("points")
        .value_parser(value_parser!(u32))
        .default_value("6")
        .help("Number of Es/N0 sweep points")
}

/// Returns argument for LLR clipping level.
fn llr_clip() -> Arg {
    Arg::new("llr_clip")
        .short('k')
        .value_parser(value_parser!(f64))
        .help("Maximum magnitude of channel LLR values (no clipping if absent)")
}

/// Returns argument for block-error target of a sweep point.
fn num_block_errors_min() -> Arg {
    Arg::new("num_block_errors_min")
        .short('e')
        .long("min-block-errors")
        .value_parser(value_parser!(u32))
        .default_value("500")
        .help("Block errors after which a sweep point may stop (once -n runs are done)")
}

/// Returns argument for number of blocks per run.
fn num_blocks_per_run() -> Arg {
    Arg::new("num_blocks_per_run")
        .short('b')
        .long("blocks-per-run")
        .value_parser(value_parser!(u32))
        .default_value("1000")
        .help("Blocks per run, shared among the worker threads")
}

/// Returns argument for number of runs before the block-error target is checked.
fn num_runs_min() -> Arg {
    Arg::new("num_runs_min")
        .short('n')
        .long("min-runs")
        .value_parser(value_parser!(u32))
        .default_value("10")
        .help("Runs at each sweep point before the block-error target is checked")
}

/// Returns argument for number of runs after which a sweep point stops.
fn num_runs_max() -> Arg {
    Arg::new("num_runs_max")
        .short('x')
        .long("max-runs")
        .value_parser(value_parser!(u32))
        .default_value("100")
        .help("Runs after which a sweep point stops, whatever the block-error count")
}

/// Returns argument for number of worker threads.
fn num_threads() -> Arg {
    Arg::new("num_threads")
        .short('j')
        .value_parser(value_parser!(usize))
        .default_value("0")
        .help("Number of worker threads (0 for one per core)")
}

/// Returns argument for number of blocks to decode in a throughput benchmark.
fn num_bench_blocks() -> Arg {
    Arg::new("num_bench_blocks")
        .long("bench")
        .value_parser(value_parser!(u32))
        .help("Measure decoder throughput on given number of blocks instead of simulating")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value("results.json")
        .help("Name of JSON file to which results must be saved")
}

/// Returns simulation parameters for every point of the Es/N0 sweep.
///
/// When only one of `-n` and `-x` is given and it conflicts with the other's default, the default
/// yields to it.
fn all_sim_params(matches: &ArgMatches) -> Vec<sim::SimParams> {
    let mut num_runs_min = u32_from_matches(matches, "num_runs_min");
    let mut num_runs_max = u32_from_matches(matches, "num_runs_max");
    if num_runs_min > num_runs_max {
        if let Some(ValueSource::DefaultValue) = matches.value_source("num_runs_min") {
            num_runs_min = num_runs_max;
        }
        if let Some(ValueSource::DefaultValue) = matches.value_source("num_runs_max") {
            num_runs_max = num_runs_min;
        }
    }
    let llr_clip = matches.get_one::<f64>("llr_clip").copied();
    let num_block_errors_min = u32_from_matches(matches, "num_block_errors_min");
    let num_blocks_per_run = u32_from_matches(matches, "num_blocks_per_run");
    let num_threads = num_threads_from_matches(matches);
    sweep_from_matches(matches)
        .map(|es_over_n0_db| sim::SimParams {
            es_over_n0_db,
            llr_clip,
            num_block_errors_min,
            num_blocks_per_run,
            num_runs_min,
            num_runs_max,
            num_threads,
        })
        .collect()
}

// OK to unwrap in the functions below: the arguments concerned have default values, so they are
// always present, and their value parsers have already checked their types.

/// Returns code name.
fn code_name_from_matches(matches: &ArgMatches) -> String {
    matches.get_one::<String>("code_name").unwrap().to_string()
}

/// Returns number of information bits per turbo code block.
fn block_len_from_matches(matches: &ArgMatches) -> usize {
    *matches.get_one("block_len").unwrap()
}

/// Returns turbo decoding algorithm.
fn decoding_algo_from_matches(matches: &ArgMatches) -> DecodingAlgo {
    let num_turbo_iter = *matches.get_one("num_turbo_iter").unwrap();
    match matches
        .get_one::<String>("decoding_algo_name")
        .unwrap()
        .as_str()
    {
        "MaxLogMAP" => DecodingAlgo::MaxLogMAP(num_turbo_iter),
        "LinearLogMAP" => DecodingAlgo::LinearLogMAP(num_turbo_iter),
        _ => DecodingAlgo::LogMAP(num_turbo_iter),
    }
}

/// Returns the Es/N0 (dB) values of the sweep.
fn sweep_from_matches(matches: &ArgMatches) -> impl Iterator<Item = f64> {
    let first: f64 = *matches.get_one("es_over_n0_first_db").unwrap();
    let step: f64 = *matches.get_one("es_over_n0_step_db").unwrap();
    let num_points = u32_from_matches(matches, "num_sweep_points");
    (0 .. num_points).map(move |n| first + step * f64::from(n))
}

/// Returns value of a `u32` argument with a default.
fn u32_from_matches(matches: &ArgMatches, id: &str) -> u32 {
    *matches.get_one(id).unwrap()
}

/// Returns number of worker threads.
fn num_threads_from_matches(matches: &ArgMatches) -> usize {
    *matches.get_one("num_threads").unwrap()
}

/// Returns number of blocks for a throughput benchmark, if one was requested.
fn num_bench_blocks_from_matches(matches: &ArgMatches) -> Option<u32> {
    matches.get_one::<u32>("num_bench_blocks").copied()
}

/// Returns name of JSON file to which results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("json_filename")
        .unwrap()
        .to_string()
}

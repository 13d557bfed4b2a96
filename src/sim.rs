//! # Simulation and benchmark driver
//!
//! Evaluates the BER and block error rate of any [`Codec`] over a BPSK-AWGN channel
//! ([`run_sim`], with the [`run_conv_sim`] and [`run_turbo_sim`] wrappers for the registered
//! convolutional codes and the LTE turbo code), and measures decoder throughput
//! ([`run_benchmark`]). Blocks within a run are processed on a `rayon` thread pool, each worker
//! thread owning its own decoder workspace. Results can be saved to a JSON file with
//! [`save_results`].
//!
//! # Examples
//!
//! ```
//! use trellis_fec::sim::{self, SimParams};
//! use trellis_fec::DecodingAlgo;
//!
//! let params = SimParams {
//!     es_over_n0_db: 4.0,
//!     llr_clip: None,
//!     num_block_errors_min: 1,
//!     num_blocks_per_run: 4,
//!     num_runs_min: 1,
//!     num_runs_max: 2,
//!     num_threads: 2,
//! };
//! let all_results = sim::run_turbo_sim(40, DecodingAlgo::LinearLogMAP(4), &[params])?;
//! assert_eq!(all_results[0].block_len, 40);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{codes, utils, Codec, ConvCodec, DecodingAlgo, Error, TurboCode, TurboCodec};

/// Parameters for a simulation over the BPSK-AWGN channel at one SNR
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimParams {
    /// Ratio (dB) of symbol energy to noise power spectral density at BPSK-AWGN channel output
    pub es_over_n0_db: f64,
    /// Maximum magnitude of channel LLR values fed to the decoder (no clipping if `None`)
    pub llr_clip: Option<f64>,
    /// Desired minimum number of block errors
    pub num_block_errors_min: u32,
    /// Number of blocks to be transmitted per run
    pub num_blocks_per_run: u32,
    /// Minimum number of runs of blocks to be simulated
    pub num_runs_min: u32,
    /// Maximum number of runs of blocks to be simulated
    pub num_runs_max: u32,
    /// Number of worker threads (`0` lets `rayon` choose)
    pub num_threads: usize,
}

/// Results from a simulation over the BPSK-AWGN channel at one SNR
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SimResults {
    /// Name of the code
    pub code_name: String,
    /// Number of information bits per block
    pub block_len: usize,
    /// Number of code bits per block
    pub encoded_len: usize,
    /// Turbo decoding algorithm (`None` for Viterbi decoding)
    pub decoding_algo: Option<DecodingAlgo>,
    /// Simulation parameters
    pub params: SimParams,
    /// Number of blocks transmitted
    pub num_blocks: u32,
    /// Number of information bits transmitted
    pub num_info_bits: u64,
    /// Number of blocks in error
    pub num_block_errors: u32,
    /// Number of information bits in error
    pub num_info_bit_errors: u64,
}

impl SimResults {
    /// Returns initialized simulation results.
    fn new(
        code_name: &str,
        codec: &impl Codec,
        decoding_algo: Option<DecodingAlgo>,
        params: &SimParams,
    ) -> Self {
        Self {
            code_name: code_name.to_string(),
            block_len: codec.block_len(),
            encoded_len: codec.encoded_len(),
            decoding_algo,
            params: *params,
            num_blocks: 0,
            num_info_bits: 0,
            num_block_errors: 0,
            num_info_bit_errors: 0,
        }
    }

    /// Returns block error rate.
    #[must_use]
    pub fn block_error_rate(&self) -> f64 {
        if self.num_blocks > 0 {
            f64::from(self.num_block_errors) / f64::from(self.num_blocks)
        } else {
            0.0
        }
    }

    /// Returns information bit error rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn info_bit_error_rate(&self) -> f64 {
        if self.num_info_bits > 0 {
            self.num_info_bit_errors as f64 / self.num_info_bits as f64
        } else {
            0.0
        }
    }

    /// Returns `true` iff the desired number of block errors or runs has been reached.
    fn run_complete(&self) -> bool {
        let num_runs = self.num_blocks / self.params.num_blocks_per_run;
        (num_runs >= self.params.num_runs_min
            && self.num_block_errors >= self.params.num_block_errors_min)
            || num_runs >= self.params.num_runs_max
    }

    /// Updates results with the number of information bit errors in each block of a run.
    fn update_after_run(&mut self, all_num_info_bit_errors: &[usize]) {
        for &num_info_bit_errors in all_num_info_bit_errors {
            self.num_blocks += 1;
            self.num_info_bits += self.block_len as u64;
            if num_info_bit_errors > 0 {
                self.num_block_errors += 1;
                self.num_info_bit_errors += num_info_bit_errors as u64;
            }
        }
    }
}

/// Results from a decoder throughput measurement
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BenchResults {
    /// Name of the code
    pub code_name: String,
    /// Number of information bits per block
    pub block_len: usize,
    /// Number of worker threads used
    pub num_threads: usize,
    /// Number of blocks decoded
    pub num_blocks: u32,
    /// Wall-clock decoding time (s)
    pub elapsed_secs: f64,
    /// Blocks decoded per second
    pub blocks_per_sec: f64,
    /// Information bits decoded per second (Mbit/s)
    pub info_mbps: f64,
}

/// Runs simulations of a codec over the BPSK-AWGN channel, one per element of `all_params`.
///
/// # Errors
///
/// Returns an error if any of the simulation parameters is invalid, if the thread pool cannot be
/// built, or if the codec reports an error.
pub fn run_sim<C>(
    codec: &C,
    code_name: &str,
    decoding_algo: Option<DecodingAlgo>,
    all_params: &[SimParams],
) -> Result<Vec<SimResults>, Error>
where
    C: Codec + Sync,
    C::Workspace: Send,
{
    let mut all_results = Vec::with_capacity(all_params.len());
    for params in all_params {
        check_sim_params(params)?;
        let pool = thread_pool(params.num_threads)?;
        let mut results = SimResults::new(code_name, codec, decoding_algo, params);
        while !results.run_complete() {
            let all_num_info_bit_errors = pool.install(|| {
                (0 .. params.num_blocks_per_run)
                    .into_par_iter()
                    .map_init(
                        || codec.new_workspace(),
                        |workspace, _| simulate_block(codec, workspace, params),
                    )
                    .collect::<Result<Vec<usize>, Error>>()
            })?;
            results.update_after_run(&all_num_info_bit_errors);
            debug!(
                "{code_name} at Es/N0 {} dB: {} block errors in {} blocks",
                params.es_over_n0_db, results.num_block_errors, results.num_blocks
            );
        }
        info!(
            "{code_name} at Es/N0 {} dB: BER {:.3e}, BLER {:.3e} ({} blocks)",
            params.es_over_n0_db,
            results.info_bit_error_rate(),
            results.block_error_rate(),
            results.num_blocks
        );
        all_results.push(results);
    }
    Ok(all_results)
}

/// Runs simulations of a registered convolutional code over the BPSK-AWGN channel.
///
/// # Errors
///
/// Returns an error if `code_name` is not in the registry, or if [`run_sim`] fails.
pub fn run_conv_sim(code_name: &str, all_params: &[SimParams]) -> Result<Vec<SimResults>, Error> {
    let named = codes::by_name(code_name)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown code name {code_name}")))?;
    let codec = ConvCodec::new(named.code)?;
    run_sim(&codec, named.name, None, all_params)
}

/// Runs simulations of the LTE turbo code over the BPSK-AWGN channel.
///
/// # Errors
///
/// Returns an error if `block_len` is not an LTE block length, or if [`run_sim`] fails.
pub fn run_turbo_sim(
    block_len: usize,
    decoding_algo: DecodingAlgo,
    all_params: &[SimParams],
) -> Result<Vec<SimResults>, Error> {
    let codec = TurboCodec::new(Arc::new(TurboCode::lte()?), block_len, decoding_algo)?;
    run_sim(&codec, "LTE turbo", Some(decoding_algo), all_params)
}

/// Measures the throughput of the decoder of a codec on `num_blocks` noiseless blocks.
///
/// # Errors
///
/// Returns an error if `num_blocks` is zero, if the thread pool cannot be built, or if the codec
/// reports an error.
pub fn run_benchmark<C>(
    codec: &C,
    code_name: &str,
    num_blocks: u32,
    num_threads: usize,
) -> Result<BenchResults, Error>
where
    C: Codec + Sync,
    C::Workspace: Send,
{
    if num_blocks == 0 {
        return Err(Error::InvalidInput(
            "Number of blocks cannot be zero".to_string(),
        ));
    }
    let info_bits = utils::random_bits(codec.block_len());
    let code_bits_llr = utils::bpsk_llr(&codec.encode(&info_bits)?, 4.0);
    let pool = thread_pool(num_threads)?;
    let timer = Instant::now();
    pool.install(|| {
        (0 .. num_blocks)
            .into_par_iter()
            .map_init(
                || codec.new_workspace(),
                |workspace, _| codec.decode(&code_bits_llr, workspace).map(|_| ()),
            )
            .collect::<Result<(), Error>>()
    })?;
    let elapsed_secs = timer.elapsed().as_secs_f64();
    let blocks_per_sec = f64::from(num_blocks) / elapsed_secs;
    #[allow(clippy::cast_precision_loss)]
    let info_mbps = blocks_per_sec * codec.block_len() as f64 * 1e-6;
    let results = BenchResults {
        code_name: code_name.to_string(),
        block_len: codec.block_len(),
        num_threads: pool.current_num_threads(),
        num_blocks,
        elapsed_secs,
        blocks_per_sec,
        info_mbps,
    };
    info!(
        "{code_name}: {num_blocks} blocks in {elapsed_secs:.3} s on {} threads \
        ({info_mbps:.3} Mbit/s)",
        results.num_threads
    );
    Ok(results)
}

/// Saves results to a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_results<T: Serialize>(all_results: &[T], json_filename: &str) -> Result<(), Error> {
    let writer = BufWriter::new(File::create(json_filename)?);
    serde_json::to_writer_pretty(writer, all_results)?;
    info!("saved {} results to {json_filename}", all_results.len());
    Ok(())
}

/// Returns the number of information bit errors in one block sent over the BPSK-AWGN channel.
fn simulate_block<C: Codec>(
    codec: &C,
    workspace: &mut C::Workspace,
    params: &SimParams,
) -> Result<usize, Error> {
    let info_bits = utils::random_bits(codec.block_len());
    let code_bits = codec.encode(&info_bits)?;
    let mut code_bits_llr = utils::bpsk_awgn_channel(&code_bits, params.es_over_n0_db);
    if let Some(max_abs) = params.llr_clip {
        utils::clip_llr(&mut code_bits_llr, max_abs);
    }
    let info_bits_hat = codec.decode(&code_bits_llr, workspace)?;
    Ok(utils::error_count(&info_bits_hat, &info_bits))
}

/// Returns thread pool with given number of threads.
fn thread_pool(num_threads: usize) -> Result<rayon::ThreadPool, Error> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| Error::InvalidInput(format!("Cannot build thread pool: {e}")))
}

/// Checks validity of simulation parameters.
fn check_sim_params(params: &SimParams) -> Result<(), Error> {
    if params.num_blocks_per_run == 0 {
        return Err(Error::InvalidInput(
            "Number of blocks per run cannot be zero".to_string(),
        ));
    }
    if params.num_runs_min > params.num_runs_max {
        return Err(Error::InvalidInput(format!(
            "Minimum number of runs ({}) exceeds maximum number of runs ({})",
            params.num_runs_min, params.num_runs_max
        )));
    }
    if params.num_runs_max == 0 {
        return Err(Error::InvalidInput(
            "Maximum number of runs cannot be zero".to_string(),
        ));
    }
    if params.llr_clip.is_some_and(|max_abs| max_abs.is_nan() || max_abs <= 0.0) {
        return Err(Error::InvalidInput(
            "LLR clipping level must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests_of_sim {
    use super::*;

    fn params_for_test() -> SimParams {
        SimParams {
            es_over_n0_db: 10.0,
            llr_clip: Some(64.0),
            num_block_errors_min: 10,
            num_blocks_per_run: 4,
            num_runs_min: 2,
            num_runs_max: 3,
            num_threads: 2,
        }
    }

    #[test]
    fn test_check_sim_params() {
        assert!(check_sim_params(&params_for_test()).is_ok());
        let params = SimParams {
            num_blocks_per_run: 0,
            ..params_for_test()
        };
        assert!(check_sim_params(&params).is_err());
        let params = SimParams {
            num_runs_min: 4,
            ..params_for_test()
        };
        assert!(check_sim_params(&params).is_err());
        let params = SimParams {
            num_runs_min: 0,
            num_runs_max: 0,
            ..params_for_test()
        };
        assert!(check_sim_params(&params).is_err());
        let params = SimParams {
            llr_clip: Some(0.0),
            ..params_for_test()
        };
        assert!(check_sim_params(&params).is_err());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_sim_results() {
        let codec = ConvCodec::new(codes::GSM_RACH).unwrap();
        let mut results = SimResults::new("GSM RACH", &codec, None, &params_for_test());
        assert!(!results.run_complete());
        assert_eq!(results.block_error_rate(), 0.0);
        results.update_after_run(&[0, 2, 0, 1]);
        assert_eq!(results.num_blocks, 4);
        assert_eq!(results.num_info_bits, 56);
        assert_eq!(results.num_block_errors, 2);
        assert_eq!(results.num_info_bit_errors, 3);
        assert_eq!(results.block_error_rate(), 0.5);
        assert!(!results.run_complete());
        results.update_after_run(&[0, 0, 0, 0]);
        assert!(!results.run_complete());
        results.update_after_run(&[0, 0, 0, 0]);
        assert!(results.run_complete());
    }

    #[test]
    fn test_run_conv_sim() {
        assert!(run_conv_sim("no-such-code", &[params_for_test()]).is_err());
        let all_results = run_conv_sim("xcch", &[params_for_test()]).unwrap();
        assert_eq!(all_results.len(), 1);
        let results = &all_results[0];
        assert_eq!(results.code_name, "GSM xCCH");
        assert_eq!(results.block_len, 224);
        assert_eq!(results.encoded_len, 456);
        assert_eq!(results.num_blocks, 12);
        assert_eq!(results.num_block_errors, 0);
    }

    #[test]
    fn test_run_turbo_sim() {
        assert!(run_turbo_sim(41, DecodingAlgo::LogMAP(4), &[params_for_test()]).is_err());
        let all_results =
            run_turbo_sim(40, DecodingAlgo::MaxLogMAP(4), &[params_for_test()]).unwrap();
        let results = &all_results[0];
        assert_eq!(results.decoding_algo, Some(DecodingAlgo::MaxLogMAP(4)));
        assert_eq!(results.encoded_len, 132);
        assert_eq!(results.num_info_bit_errors, 0);
    }

    #[test]
    fn test_run_benchmark() {
        let codec = ConvCodec::new(codes::WIMAX_FCH).unwrap();
        assert!(run_benchmark(&codec, "WiMAX FCH", 0, 1).is_err());
        let results = run_benchmark(&codec, "WiMAX FCH", 8, 2).unwrap();
        assert_eq!(results.num_blocks, 8);
        assert_eq!(results.num_threads, 2);
        assert!(results.blocks_per_sec > 0.0);
    }

    #[test]
    fn test_save_results() {
        let path = std::env::temp_dir().join("trellis_fec_test_save_results.json");
        let json_filename = path.to_str().unwrap();
        let codec = ConvCodec::new(codes::GSM_SCH).unwrap();
        let mut results = SimResults::new("GSM SCH", &codec, None, &params_for_test());
        results.update_after_run(&[0, 1, 0, 0]);
        save_results(&[results.clone()], json_filename).unwrap();
        let loaded: Vec<SimResults> =
            serde_json::from_reader(File::open(json_filename).unwrap()).unwrap();
        assert_eq!(loaded, [results]);
        std::fs::remove_file(json_filename).unwrap();
        assert!(save_results(&[0u8], "/nonexistent-dir/results.json").is_err());
    }
}

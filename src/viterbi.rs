//! # Viterbi decoder
//!
//! The [`decode`] function returns maximum-likelihood decisions on the information bits of a
//! convolutional code, given LLR values for its transmitted code bits. Punctured positions are
//! treated as erasures. Flushed codes are traced back from the zero state; tail-biting codes run
//! the forward recursion [`TAIL_BITING_PASSES`] times around the circular trellis and are traced
//! back from the best final state.
//!
//! All scratch memory lives in a [`ViterbiWorkspace`], which may be reused across calls and codes
//! as long as it is large enough.

use bitvec::prelude::*;

use crate::{conv, Bit, CodeDescriptor, Error, Termination, Trellis};

/// Number of forward passes over a tail-biting trellis
pub const TAIL_BITING_PASSES: usize = 2;

const INF: f64 = 1e100;

/// Workspace for Viterbi decoder
#[derive(Clone, Debug)]
pub struct ViterbiWorkspace {
    /// Largest number of states supported
    num_states: usize,
    /// Largest number of output bits per step supported
    num_outputs: usize,
    /// Largest number of trellis steps supported
    max_steps: usize,
    /// Path metrics for all states at current step
    path_metric: Vec<f64>,
    /// Path metrics for all states at next step
    path_metric_next: Vec<f64>,
    /// Survivor decisions (odd predecessor chosen) for all steps and states
    decisions: BitVec,
    /// Depunctured LLR values for all raw outputs
    raw_llr: Vec<f64>,
    /// Metrics for all output symbols at current step
    symbol_metric: Vec<f64>,
}

impl ViterbiWorkspace {
    /// Returns workspace for codes with at most `num_states` states, `num_outputs` output bits
    /// per input bit, and `max_steps` trellis steps per block (including flush steps).
    #[must_use]
    pub fn new(num_states: usize, num_outputs: usize, max_steps: usize) -> Self {
        Self {
            num_states,
            num_outputs,
            max_steps,
            path_metric: vec![0.0; num_states],
            path_metric_next: vec![0.0; num_states],
            decisions: bitvec![0; max_steps * num_states],
            raw_llr: vec![0.0; max_steps * num_outputs],
            symbol_metric: vec![0.0; 1 << num_outputs],
        }
    }

    /// Returns workspace that is just large enough for given code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is outside the supported bounds.
    pub fn for_code(code: &CodeDescriptor) -> Result<Self, Error> {
        code.validate()?;
        Ok(Self::new(code.num_states(), code.n, code.num_steps()))
    }

    /// Checks that the workspace can hold a block of given code.
    fn check_capacity(&self, code: &CodeDescriptor) -> Result<(), Error> {
        for (what, requested, capacity) in [
            ("states", code.num_states(), self.num_states),
            ("outputs per step", code.n, self.num_outputs),
            ("trellis steps", code.num_steps(), self.max_steps),
        ] {
            if requested > capacity {
                return Err(Error::WorkspaceTooSmall {
                    what,
                    requested,
                    capacity,
                });
            }
        }
        Ok(())
    }
}

/// Returns decisions on the information bits for given code bit LLR values.
///
/// # Parameters
///
/// - `code`: Code descriptor.
///
/// - `trellis`: Trellis built from `code`.
///
/// - `workspace`: Workspace large enough for `code`.
///
/// - `code_bits_llr`: LLR values for the transmitted code bits, with positive values indicating
///   that `Zero` is more likely.
///
/// # Errors
///
/// Returns an error if `code_bits_llr.len()` is not equal to `code.encoded_len()`, if `trellis`
/// was not built from a code with the dimensions of `code`, or if the workspace is too small.
///
/// # Examples
///
/// ```
/// use trellis_fec::{codes, conv, utils, viterbi, Trellis, ViterbiWorkspace};
///
/// let code = codes::GSM_XCCH;
/// let trellis = Trellis::new(&code)?;
/// let info_bits = utils::random_bits(code.len);
/// let code_bits = conv::encode(&code, &trellis, &info_bits)?;
/// let mut code_bits_llr = utils::bpsk_llr(&code_bits, 1.0);
/// code_bits_llr[10] = -code_bits_llr[10];
/// let mut workspace = ViterbiWorkspace::for_code(&code)?;
/// let info_bits_hat = viterbi::decode(&code, &trellis, &mut workspace, &code_bits_llr)?;
/// assert_eq!(info_bits_hat, info_bits);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode(
    code: &CodeDescriptor,
    trellis: &Trellis,
    workspace: &mut ViterbiWorkspace,
    code_bits_llr: &[f64],
) -> Result<Vec<Bit>, Error> {
    conv::check_trellis(code, trellis)?;
    if code_bits_llr.len() != code.encoded_len() {
        return Err(Error::LengthMismatch {
            what: "code bit LLR values",
            expected: code.encoded_len(),
            found: code_bits_llr.len(),
        });
    }
    workspace.check_capacity(code)?;
    let num_states = code.num_states();
    let num_steps = code.num_steps();
    conv::depuncture(
        code,
        code_bits_llr,
        &mut workspace.raw_llr[.. num_steps * code.n],
    );
    let num_passes = match code.termination {
        Termination::Flushed => {
            init_path_metrics(&mut workspace.path_metric[.. num_states], Some(0));
            1
        }
        Termination::TailBiting => {
            init_path_metrics(&mut workspace.path_metric[.. num_states], None);
            TAIL_BITING_PASSES
        }
    };
    for _ in 0 .. num_passes {
        run_forward_pass(code, trellis, workspace);
    }
    let final_state = match code.termination {
        Termination::Flushed => 0,
        Termination::TailBiting => best_state(&workspace.path_metric[.. num_states]),
    };
    Ok(traceback(code, trellis, &workspace.decisions, final_state))
}

/// Initializes path metrics, favoring a known start state if there is one.
fn init_path_metrics(path_metric: &mut [f64], start_state: Option<usize>) {
    match start_state {
        Some(start) => {
            path_metric.fill(-INF);
            path_metric[start] = 0.0;
        }
        None => path_metric.fill(0.0),
    }
}

/// Runs add-compare-select over all trellis steps, starting from the path metrics in the
/// workspace and leaving the final path metrics there.
fn run_forward_pass(code: &CodeDescriptor, trellis: &Trellis, workspace: &mut ViterbiWorkspace) {
    let num_states = code.num_states();
    let ViterbiWorkspace {
        path_metric,
        path_metric_next,
        decisions,
        raw_llr,
        symbol_metric,
        ..
    } = workspace;
    let symbol_metric = &mut symbol_metric[.. 1 << code.n];
    for (step, step_llr) in raw_llr[.. code.num_steps() * code.n]
        .chunks_exact(code.n)
        .enumerate()
    {
        compute_symbol_metrics(step_llr, symbol_metric);
        let step_decisions = &mut decisions[step * num_states .. (step + 1) * num_states];
        for state in 0 .. num_states {
            let [even, odd] = trellis.predecessors(state);
            let metric_even = path_metric[even.from] + symbol_metric[even.output as usize];
            let metric_odd = path_metric[odd.from] + symbol_metric[odd.output as usize];
            // Even predecessor survives ties
            let odd_survives = metric_odd > metric_even;
            path_metric_next[state] = if odd_survives { metric_odd } else { metric_even };
            step_decisions.set(state, odd_survives);
        }
        renormalize(&mut path_metric_next[.. num_states]);
        std::mem::swap(path_metric, path_metric_next);
    }
}

/// Computes the correlation metric of every output symbol with given LLR values.
fn compute_symbol_metrics(step_llr: &[f64], symbol_metric: &mut [f64]) {
    for (sym, metric) in symbol_metric.iter_mut().enumerate() {
        *metric = step_llr
            .iter()
            .enumerate()
            .map(|(i, &llr)| if (sym >> i) & 1 == 0 { llr } else { -llr })
            .sum();
    }
}

/// Subtracts the largest path metric from all path metrics.
fn renormalize(path_metric: &mut [f64]) {
    let max_metric = path_metric.iter().copied().fold(-INF, f64::max);
    path_metric.iter_mut().for_each(|x| *x -= max_metric);
}

/// Returns the state with the largest path metric (the lowest such state on ties).
fn best_state(path_metric: &[f64]) -> usize {
    path_metric
        .iter()
        .enumerate()
        .fold((0, -INF), |(best, best_metric), (state, &metric)| {
            if metric > best_metric {
                (state, metric)
            } else {
                (best, best_metric)
            }
        })
        .0
}

/// Returns information bits along the survivor path ending in given state.
fn traceback(
    code: &CodeDescriptor,
    trellis: &Trellis,
    decisions: &BitSlice,
    final_state: usize,
) -> Vec<Bit> {
    let num_states = code.num_states();
    let mut info_bits = vec![Bit::Zero; code.len];
    let mut state = final_state;
    for step in (0 .. code.num_steps()).rev() {
        let branch = trellis.predecessors(state)[usize::from(decisions[step * num_states + state])];
        if step < code.len {
            info_bits[step] = branch.input;
        }
        state = branch.from;
    }
    info_bits
}

#[cfg(test)]
mod tests_of_viterbi {
    use super::*;
    use crate::{codes, utils};
    use Bit::Zero;

    /// Returns decoder output for noiseless LLR values, along with the information bits.
    fn noiseless_round_trip(code: &CodeDescriptor) -> (Vec<Bit>, Vec<Bit>) {
        let trellis = Trellis::new(code).unwrap();
        let info_bits = utils::random_bits(code.len);
        let code_bits = conv::encode(code, &trellis, &info_bits).unwrap();
        let mut workspace = ViterbiWorkspace::for_code(code).unwrap();
        let info_bits_hat = decode(
            code,
            &trellis,
            &mut workspace,
            &utils::bpsk_llr(&code_bits, 1.0),
        )
        .unwrap();
        (info_bits_hat, info_bits)
    }

    #[test]
    fn test_new() {
        let workspace = ViterbiWorkspace::new(16, 2, 228);
        assert_eq!(workspace.path_metric.len(), 16);
        assert_eq!(workspace.path_metric_next.len(), 16);
        assert_eq!(workspace.decisions.len(), 3648);
        assert_eq!(workspace.raw_llr.len(), 456);
        assert_eq!(workspace.symbol_metric.len(), 4);
        let workspace = ViterbiWorkspace::for_code(&codes::LTE_PBCH).unwrap();
        assert_eq!(workspace.num_states, 64);
        assert_eq!(workspace.num_outputs, 3);
        assert_eq!(workspace.max_steps, 512);
    }

    #[test]
    fn test_for_code_rejects_invalid_codes() {
        let no_memory = CodeDescriptor { k: 0, ..codes::GSM_XCCH };
        assert!(matches!(
            ViterbiWorkspace::for_code(&no_memory),
            Err(Error::UnsupportedDescriptor(_))
        ));
        let huge_memory = CodeDescriptor { k: 64, ..codes::GSM_XCCH };
        assert!(matches!(
            ViterbiWorkspace::for_code(&huge_memory),
            Err(Error::UnsupportedDescriptor(_))
        ));
    }

    #[test]
    fn test_decode_noiseless() {
        for named in codes::CODES {
            let (info_bits_hat, info_bits) = noiseless_round_trip(&named.code);
            assert_eq!(info_bits_hat, info_bits, "{}", named.name);
        }
    }

    #[test]
    fn test_decode_corrects_errors() {
        let code = codes::GSM_XCCH;
        let trellis = Trellis::new(&code).unwrap();
        let info_bits = utils::random_bits(code.len);
        let code_bits = conv::encode(&code, &trellis, &info_bits).unwrap();
        let mut code_bits_llr = utils::bpsk_llr(&code_bits, 1.0);
        for index in [40, 300] {
            code_bits_llr[index] = -code_bits_llr[index];
        }
        let mut workspace = ViterbiWorkspace::for_code(&code).unwrap();
        let info_bits_hat = decode(&code, &trellis, &mut workspace, &code_bits_llr).unwrap();
        assert_eq!(info_bits_hat, info_bits);
    }

    #[test]
    fn test_decode_erasures() {
        for code in [codes::GSM_XCCH, codes::GSM_TCH_AFS_7_95] {
            let trellis = Trellis::new(&code).unwrap();
            let mut workspace = ViterbiWorkspace::for_code(&code).unwrap();
            let code_bits_llr = vec![0.0; code.encoded_len()];
            let info_bits_hat = decode(&code, &trellis, &mut workspace, &code_bits_llr).unwrap();
            assert!(info_bits_hat.iter().all(|&b| b == Zero));
        }
    }

    #[test]
    fn test_decode_renormalizes() {
        let code = codes::GPRS_CS3;
        let trellis = Trellis::new(&code).unwrap();
        let mut workspace = ViterbiWorkspace::for_code(&code).unwrap();
        let code_bits_llr = vec![1e6; code.encoded_len()];
        decode(&code, &trellis, &mut workspace, &code_bits_llr).unwrap();
        let max_metric = workspace.path_metric.iter().copied().fold(-INF, f64::max);
        assert!(max_metric == 0.0);
        assert!(workspace.path_metric.iter().all(|&x| x <= 0.0));
    }

    #[test]
    fn test_decode_reuses_workspace() {
        let mut workspace = ViterbiWorkspace::for_code(&codes::LTE_PBCH).unwrap();
        for code in [codes::LTE_PBCH, codes::GSM_XCCH, codes::WIMAX_FCH] {
            let trellis = Trellis::new(&code).unwrap();
            let info_bits = utils::random_bits(code.len);
            let code_bits = conv::encode(&code, &trellis, &info_bits).unwrap();
            let code_bits_llr = utils::bpsk_llr(&code_bits, 2.0);
            let info_bits_hat = decode(&code, &trellis, &mut workspace, &code_bits_llr).unwrap();
            assert_eq!(info_bits_hat, info_bits);
        }
    }

    #[test]
    fn test_decode_errors() {
        let code = codes::GSM_XCCH;
        let trellis = Trellis::new(&code).unwrap();
        let mut workspace = ViterbiWorkspace::for_code(&code).unwrap();
        assert!(matches!(
            decode(&code, &trellis, &mut workspace, &[0.0; 455]),
            Err(Error::LengthMismatch { expected: 456, found: 455, .. })
        ));
        let mut workspace = ViterbiWorkspace::new(16, 2, 100);
        assert!(matches!(
            decode(&code, &trellis, &mut workspace, &[0.0; 456]),
            Err(Error::WorkspaceTooSmall {
                what: "trellis steps",
                requested: 228,
                capacity: 100
            })
        ));
        let mut workspace = ViterbiWorkspace::new(8, 2, 228);
        assert!(matches!(
            decode(&code, &trellis, &mut workspace, &[0.0; 456]),
            Err(Error::WorkspaceTooSmall { what: "states", .. })
        ));
    }

    #[test]
    fn test_decode_coding_gain() {
        let code = codes::GSM_XCCH;
        let trellis = Trellis::new(&code).unwrap();
        let mut workspace = ViterbiWorkspace::for_code(&code).unwrap();
        let es_over_n0_db = 0.0;
        let (mut num_channel_errors, mut num_decoder_errors) = (0, 0);
        for _ in 0 .. 50 {
            let info_bits = utils::random_bits(code.len);
            let code_bits = conv::encode(&code, &trellis, &info_bits).unwrap();
            let code_bits_llr = utils::bpsk_awgn_channel(&code_bits, es_over_n0_db);
            num_channel_errors +=
                utils::error_count(&utils::bpsk_slicer(&code_bits_llr), &code_bits);
            let info_bits_hat = decode(&code, &trellis, &mut workspace, &code_bits_llr).unwrap();
            num_decoder_errors += utils::error_count(&info_bits_hat, &info_bits);
        }
        // Error rates per 224 information bits and per 456 code bits
        assert!(num_decoder_errors * 456 < num_channel_errors * 224);
    }

    #[test]
    fn test_compute_symbol_metrics() {
        let mut symbol_metric = [0.0; 4];
        compute_symbol_metrics(&[1.5, -0.5], &mut symbol_metric);
        assert_eq!(symbol_metric, [1.0, -2.0, 2.0, -1.0]);
    }

    #[test]
    fn test_renormalize() {
        let mut path_metric = [-3.0, 2.5, -INF, 1.0];
        renormalize(&mut path_metric);
        assert_eq!(path_metric[.. 2], [-5.5, 0.0]);
        assert_eq!(path_metric[3], -1.5);
        assert!(path_metric[2] < -1e99);
    }

    #[test]
    fn test_best_state() {
        assert_eq!(best_state(&[-3.0, 0.0, -1.0, 0.0]), 1);
        assert_eq!(best_state(&[0.0; 8]), 0);
    }
}

//! BCJR soft-input/soft-output decoder for the constituent codes of a turbo code

use itertools::izip;
use tracing::debug;

use crate::{Bit, DecodingAlgo, Trellis};

const INF: f64 = 1e100;

/// Scratch memory for a single BCJR run
#[derive(Clone, Debug)]
pub(crate) struct BcjrScratch {
    /// Number of encoder states
    num_states: usize,
    /// Beta values for all states at all time instants
    all_beta_val: Vec<f64>,
    /// Alpha values for all states before current information bit
    alpha_val: Vec<f64>,
    /// Alpha values for all states at next time instant
    alpha_val_next: Vec<f64>,
    /// Branch metrics for all output symbols at all time instants
    branch_metric: Vec<[f64; 4]>,
}

impl BcjrScratch {
    /// Returns scratch memory for given number of states and trellis steps.
    fn new(num_states: usize, max_steps: usize) -> Self {
        Self {
            num_states,
            all_beta_val: vec![0.0; (max_steps + 1) * num_states],
            alpha_val: vec![0.0; num_states],
            alpha_val_next: vec![0.0; num_states],
            branch_metric: vec![[0.0; 4]; max_steps],
        }
    }
}

/// Workspace for turbo decoder
///
/// Holds the constituent LLR buffers, the extrinsic information exchanged between the two
/// constituent decoders, and the BCJR scratch memory. It is sized for a maximum block length at
/// construction (see [`crate::TurboCode::allocate_workspace`]) and reused across calls.
#[derive(Clone, Debug)]
pub struct TurboWorkspace {
    /// Number of encoder states
    pub(crate) num_states: usize,
    /// Memory length of the constituent encoders
    pub(crate) memory_len: usize,
    /// Largest supported number of information bits
    pub(crate) max_block_len: usize,
    /// BCJR scratch memory
    pub(crate) scratch: BcjrScratch,
    /// Systematic LLR values for each constituent decoder, including tail
    pub(crate) sys_llr: [Vec<f64>; 2],
    /// Parity LLR values for each constituent decoder, including tail
    pub(crate) par_llr: [Vec<f64>; 2],
    /// Prior LLR values for the information bits
    pub(crate) prior: Vec<f64>,
    /// Extrinsic information from each constituent decoder
    pub(crate) extrinsic: [Vec<f64>; 2],
    /// Posterior LLR values for the information bits
    pub(crate) posterior: Vec<f64>,
}

impl TurboWorkspace {
    /// Returns workspace for constituent codes with given number of states and memory length.
    pub(crate) fn new(num_states: usize, memory_len: usize, max_block_len: usize) -> Self {
        let max_steps = max_block_len + memory_len;
        debug!("allocating turbo workspace for {max_block_len} information bits");
        Self {
            num_states,
            memory_len,
            max_block_len,
            scratch: BcjrScratch::new(num_states, max_steps),
            sys_llr: [vec![0.0; max_steps], vec![0.0; max_steps]],
            par_llr: [vec![0.0; max_steps], vec![0.0; max_steps]],
            prior: vec![0.0; max_block_len],
            extrinsic: [vec![0.0; max_block_len], vec![0.0; max_block_len]],
            posterior: vec![0.0; max_block_len],
        }
    }

    /// Returns the largest supported number of information bits.
    #[must_use]
    pub fn max_block_len(&self) -> usize {
        self.max_block_len
    }
}

/// Computes extrinsic information and posterior LLR values for the information bits of a
/// terminated rate-1/2 recursive systematic code.
///
/// `sys_llr` and `par_llr` cover the `L` information steps followed by the `K - 1` tail steps,
/// where `L = prior.len()`; `extrinsic` and `posterior` have length `L`. Output bit 0 of the
/// trellis must be the systematic bit.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_bcjr(
    trellis: &Trellis,
    sys_llr: &[f64],
    par_llr: &[f64],
    prior: &[f64],
    decoding_algo: DecodingAlgo,
    scratch: &mut BcjrScratch,
    extrinsic: &mut [f64],
    posterior: &mut [f64],
) {
    let num_info_bits = prior.len();
    let num_steps = sys_llr.len();
    compute_branch_metrics(sys_llr, par_llr, prior, &mut scratch.branch_metric[.. num_steps]);
    run_bcjr_backward_pass(trellis, num_steps, decoding_algo, scratch);
    run_bcjr_forward_pass(
        trellis,
        par_llr,
        decoding_algo,
        scratch,
        &mut extrinsic[.. num_info_bits],
    );
    for (post, &ext, &sys, &pri) in izip!(
        posterior[.. num_info_bits].iter_mut(),
        extrinsic.iter(),
        sys_llr,
        prior
    ) {
        *post = sys + pri + ext;
    }
}

/// Computes branch metrics for all output symbols (systematic bit in bit 0, parity bit in bit 1).
fn compute_branch_metrics(
    sys_llr: &[f64],
    par_llr: &[f64],
    prior: &[f64],
    branch_metric: &mut [[f64; 4]],
) {
    for (step, metrics) in branch_metric.iter_mut().enumerate() {
        let sys = sys_llr[step] + prior.get(step).copied().unwrap_or(0.0);
        let par = par_llr[step];
        for (sym, metric) in metrics.iter_mut().enumerate() {
            *metric = bit_metric_from_llr(bit_from_index(sym & 1), sys)
                + bit_metric_from_llr(bit_from_index(sym >> 1), par);
        }
    }
}

/// Runs backward pass through the trellis, saving beta values at all time instants.
fn run_bcjr_backward_pass(
    trellis: &Trellis,
    num_steps: usize,
    decoding_algo: DecodingAlgo,
    scratch: &mut BcjrScratch,
) {
    let num_states = scratch.num_states;
    let all_beta_val = &mut scratch.all_beta_val[.. (num_steps + 1) * num_states];
    let (_, beta_val_end) = all_beta_val.split_at_mut(num_steps * num_states);
    beta_val_end.fill(-INF);
    beta_val_end[0] = 0.0;
    for step in (0 .. num_steps).rev() {
        let (head, tail) = all_beta_val.split_at_mut((step + 1) * num_states);
        let beta_val = &mut head[step * num_states ..];
        let beta_val_next = &tail[.. num_states];
        let metrics = &scratch.branch_metric[step];
        for (state, beta) in beta_val.iter_mut().enumerate() {
            *beta = -INF;
            for input in [Bit::Zero, Bit::One] {
                *beta = maxstar(
                    *beta,
                    metrics[trellis.output(state, input) as usize]
                        + beta_val_next[trellis.next_state(state, input)],
                    decoding_algo,
                );
            }
        }
        recenter(beta_val);
    }
}

/// Runs forward pass through the trellis, computing extrinsic information for each information
/// bit from the alpha values before it and the beta values after it.
fn run_bcjr_forward_pass(
    trellis: &Trellis,
    par_llr: &[f64],
    decoding_algo: DecodingAlgo,
    scratch: &mut BcjrScratch,
    extrinsic: &mut [f64],
) {
    let num_states = scratch.num_states;
    scratch.alpha_val.fill(-INF);
    scratch.alpha_val[0] = 0.0;
    for (step, ext) in extrinsic.iter_mut().enumerate() {
        let metrics = &scratch.branch_metric[step];
        let beta_val_next =
            &scratch.all_beta_val[(step + 1) * num_states .. (step + 2) * num_states];
        let mut metric_for_bit = [-INF; 2];
        scratch.alpha_val_next.fill(-INF);
        for state in 0 .. num_states {
            let alpha = scratch.alpha_val[state];
            for input in [Bit::Zero, Bit::One] {
                let sym = trellis.output(state, input);
                let next_state = trellis.next_state(state, input);
                scratch.alpha_val_next[next_state] = maxstar(
                    scratch.alpha_val_next[next_state],
                    alpha + metrics[sym as usize],
                    decoding_algo,
                );
                let cand_metric = alpha
                    + bit_metric_from_llr(bit_from_index((sym >> 1) as usize), par_llr[step])
                    + beta_val_next[next_state];
                metric_for_bit[input as usize] =
                    maxstar(metric_for_bit[input as usize], cand_metric, decoding_algo);
            }
        }
        *ext = metric_for_bit[0] - metric_for_bit[1];
        recenter(&mut scratch.alpha_val_next);
        std::mem::swap(&mut scratch.alpha_val, &mut scratch.alpha_val_next);
    }
}

/// Subtracts the value for state 0 from the values for all states.
fn recenter(values: &mut [f64]) {
    let value0 = values[0];
    values.iter_mut().for_each(|x| *x -= value0);
}

/// Returns bit corresponding to given index.
fn bit_from_index(bit_index: usize) -> Bit {
    match bit_index {
        0 => Bit::Zero,
        _ => Bit::One,
    }
}

/// Returns metric for given bit corresponding to given LLR value.
fn bit_metric_from_llr(bit: Bit, llr_val: f64) -> f64 {
    match bit {
        Bit::Zero => llr_val / 2.0,
        Bit::One => -llr_val / 2.0,
    }
}

/// Returns the maxstar of two numbers for given decoding algorithm.
fn maxstar(x: f64, y: f64, decoding_algo: DecodingAlgo) -> f64 {
    x.max(y)
        + match decoding_algo {
            DecodingAlgo::MaxLogMAP(_) => 0.0,
            DecodingAlgo::LinearLogMAP(_) => linear_log_map_correction_term((x - y).abs()),
            DecodingAlgo::LogMAP(_) => log_map_correction_term((x - y).abs()),
        }
}

/// Returns the correction term for Linear-Log-MAP decoding algorithm (Valenti & Sun, 2001).
fn linear_log_map_correction_term(abs_diff: f64) -> f64 {
    let thresh = 2.506_816_400_220_01;
    if abs_diff > thresh {
        0.0
    } else {
        let slope = -0.249_041_818_917_1;
        slope * (abs_diff - thresh)
    }
}

/// Returns the correction term for Log-MAP decoding algorithm.
fn log_map_correction_term(abs_diff: f64) -> f64 {
    (-abs_diff).exp().ln_1p()
}

#[cfg(test)]
mod tests_of_bcjr {
    use super::*;
    use crate::{turbo, CodeDescriptor};
    use float_eq::assert_float_eq;

    const CODE: CodeDescriptor = turbo::LTE_CONSTITUENT;

    const SYS_LLR: [f64; 7] = [1.3, -0.4, 2.2, -1.7, 0.6, -0.9, 1.1];
    const PAR_LLR: [f64; 7] = [-0.8, 1.5, 0.3, -2.1, 0.9, 1.4, -0.5];
    const PRIOR: [f64; 4] = [0.5, -1.2, 0.0, 0.7];

    /// Returns exact posterior LLR values by enumerating all information sequences.
    fn brute_force_posterior(trellis: &Trellis) -> Vec<f64> {
        let num_info_bits = PRIOR.len();
        let mut log_sum = vec![[f64::NEG_INFINITY; 2]; num_info_bits];
        for word in 0 .. 1 << num_info_bits {
            let info_bits: Vec<Bit> = (0 .. num_info_bits)
                .map(|i| bit_from_index((word >> i) & 1))
                .collect();
            let mut state = 0;
            let mut path_metric = 0.0;
            for step in 0 .. SYS_LLR.len() {
                let input = info_bits
                    .get(step)
                    .copied()
                    .unwrap_or_else(|| trellis.flush_input(state));
                let sym = trellis.output(state, input) as usize;
                let prior = PRIOR.get(step).copied().unwrap_or(0.0);
                path_metric += bit_metric_from_llr(bit_from_index(sym & 1), SYS_LLR[step] + prior)
                    + bit_metric_from_llr(bit_from_index(sym >> 1), PAR_LLR[step]);
                state = trellis.next_state(state, input);
            }
            assert_eq!(state, 0);
            for (sums, &b) in log_sum.iter_mut().zip(&info_bits) {
                let sum = &mut sums[b as usize];
                *sum = if sum.is_finite() {
                    sum.max(path_metric) + (-(*sum - path_metric).abs()).exp().ln_1p()
                } else {
                    path_metric
                };
            }
        }
        log_sum.iter().map(|sums| sums[0] - sums[1]).collect()
    }

    #[test]
    fn test_run_bcjr_log_map() {
        let trellis = Trellis::new(&CODE).unwrap();
        let mut scratch = BcjrScratch::new(8, 7);
        let mut extrinsic = [0.0; 4];
        let mut posterior = [0.0; 4];
        run_bcjr(
            &trellis,
            &SYS_LLR,
            &PAR_LLR,
            &PRIOR,
            DecodingAlgo::LogMAP(1),
            &mut scratch,
            &mut extrinsic,
            &mut posterior,
        );
        let correct_posterior = brute_force_posterior(&trellis);
        for i in 0 .. 4 {
            assert_float_eq!(posterior[i], correct_posterior[i], abs <= 1e-8);
            assert_float_eq!(
                extrinsic[i],
                posterior[i] - SYS_LLR[i] - PRIOR[i],
                abs <= 1e-8
            );
        }
    }

    #[test]
    fn test_run_bcjr_max_log_map_erasures() {
        let trellis = Trellis::new(&CODE).unwrap();
        let mut scratch = BcjrScratch::new(8, 43);
        let mut extrinsic = [1.0; 40];
        let mut posterior = [1.0; 40];
        run_bcjr(
            &trellis,
            &[0.0; 43],
            &[0.0; 43],
            &[0.0; 40],
            DecodingAlgo::MaxLogMAP(1),
            &mut scratch,
            &mut extrinsic,
            &mut posterior,
        );
        for i in 0 .. 40 {
            assert_float_eq!(extrinsic[i], 0.0, abs <= 1e-8);
            assert_float_eq!(posterior[i], 0.0, abs <= 1e-8);
        }
    }

    #[test]
    fn test_run_bcjr_recenters() {
        let trellis = Trellis::new(&CODE).unwrap();
        let mut scratch = BcjrScratch::new(8, 7);
        let mut extrinsic = [0.0; 4];
        let mut posterior = [0.0; 4];
        run_bcjr(
            &trellis,
            &SYS_LLR,
            &PAR_LLR,
            &PRIOR,
            DecodingAlgo::LinearLogMAP(1),
            &mut scratch,
            &mut extrinsic,
            &mut posterior,
        );
        for step in 0 .. 8 {
            assert_float_eq!(scratch.all_beta_val[step * 8], 0.0, abs <= 1e-12);
        }
        assert_float_eq!(scratch.alpha_val[0], 0.0, abs <= 1e-12);
    }

    #[test]
    fn test_compute_branch_metrics() {
        let mut branch_metric = [[0.0; 4]; 2];
        compute_branch_metrics(&[1.0, -2.0], &[0.5, 3.0], &[0.2], &mut branch_metric);
        assert_float_eq!(
            branch_metric[0].to_vec(),
            vec![0.85, -0.35, 0.35, -0.85],
            abs_all <= 1e-8
        );
        assert_float_eq!(
            branch_metric[1].to_vec(),
            vec![0.5, 2.5, -2.5, -0.5],
            abs_all <= 1e-8
        );
    }

    #[test]
    fn test_new_workspace() {
        let workspace = TurboWorkspace::new(8, 3, 40);
        assert_eq!(workspace.max_block_len(), 40);
        assert_eq!(workspace.sys_llr[1].len(), 43);
        assert_eq!(workspace.par_llr[0].len(), 43);
        assert_eq!(workspace.extrinsic[0].len(), 40);
        assert_eq!(workspace.scratch.all_beta_val.len(), 352);
        assert_eq!(workspace.scratch.branch_metric.len(), 43);
    }

    #[test]
    fn test_bit_from_index() {
        assert_eq!(bit_from_index(0), Bit::Zero);
        assert_eq!(bit_from_index(1), Bit::One);
    }

    #[test]
    fn test_bit_metric_from_llr() {
        assert_float_eq!(bit_metric_from_llr(Bit::Zero, 1.5), 0.75, abs <= 1e-8);
        assert_float_eq!(bit_metric_from_llr(Bit::One, 1.5), -0.75, abs <= 1e-8);
    }

    #[test]
    fn test_maxstar() {
        assert_float_eq!(
            maxstar(1.2, 1.3, DecodingAlgo::MaxLogMAP(0)),
            1.3,
            abs <= 1e-8
        );
        assert_float_eq!(
            maxstar(-1.2, -1.3, DecodingAlgo::MaxLogMAP(0)),
            -1.2,
            abs <= 1e-8
        );
        assert_float_eq!(
            maxstar(1.3, -1.3, DecodingAlgo::LinearLogMAP(0)),
            1.3,
            abs <= 1e-8
        );
        assert_float_eq!(
            maxstar(-1.2, 1.2, DecodingAlgo::LinearLogMAP(0)),
            1.226_601_750_600_968_3,
            abs <= 1e-8
        );
        assert_float_eq!(
            maxstar(1.2, 1.3, DecodingAlgo::LogMAP(0)),
            1.944_396_660_073_571,
            abs <= 1e-8
        );
        assert_float_eq!(
            maxstar(-1.2, -1.3, DecodingAlgo::LogMAP(0)),
            -0.555_603_339_926_429_1,
            abs <= 1e-8
        );
    }

    #[test]
    fn test_linear_log_map_correction_term() {
        assert_float_eq!(linear_log_map_correction_term(2.6), 0.0, abs <= 1e-8);
        assert_float_eq!(
            linear_log_map_correction_term(2.4),
            0.026_601_750_600_968_28,
            abs <= 1e-8
        );
    }

    #[test]
    fn test_log_map_correction_term() {
        assert_float_eq!(
            log_map_correction_term(2.6),
            0.071_644_691_967_669_72,
            abs <= 1e-8
        );
        assert_float_eq!(
            log_map_correction_term(2.4),
            0.086_836_152_153_949_63,
            abs <= 1e-8
        );
    }
}

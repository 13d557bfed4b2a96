//! # Bit and channel utilities for exercising the codecs
//!
//! Test-side helpers: [`random_bits`] draws information bits, [`bpsk_awgn_channel`] turns code
//! bits into noisy channel LLR values ([`bpsk_llr`] without noise), [`clip_llr`] bounds LLR
//! magnitudes, [`bpsk_slicer`] and [`error_count`] score decisions, and [`pack_bits`] /
//! [`unpack_bits`] convert between bits and MSB-first bytes for test vectors.
//!
//! # Examples
//!
//! ```
//! use trellis_fec::utils;
//!
//! let code_bits = utils::random_bits(96);
//! let mut code_bits_llr = utils::bpsk_awgn_channel(&code_bits, 15.0);
//! utils::clip_llr(&mut code_bits_llr, 64.0);
//! let hard_bits = utils::bpsk_slicer(&code_bits_llr);
//! assert!(utils::error_count(&hard_bits, &code_bits) < 5);
//! assert_eq!(utils::unpack_bits(&utils::pack_bits(&code_bits), 96), code_bits);
//! ```

use rand::Rng;
use rand_distr::StandardNormal;

use crate::Bit;

/// Returns `num_bits` independent, equiprobable bits.
#[must_use]
pub fn random_bits(num_bits: usize) -> Vec<Bit> {
    let mut rng = rand::rng();
    (0 .. num_bits)
        .map(|_| Bit::from_lsb(rng.random::<u32>()))
        .collect()
}

/// Sends bits over a BPSK-AWGN channel and returns the channel LLR values.
///
/// `Zero` is sent as `+1.0` and `One` as `-1.0`. The noise has variance
/// `sigma^2 = 1 / (2 * Es/N0)`, and each received sample `y` is scaled to the LLR value
/// `2 * y / sigma^2`, so positive values favour `Zero`.
#[must_use]
pub fn bpsk_awgn_channel(bits: &[Bit], es_over_n0_db: f64) -> Vec<f64> {
    let mut rng = rand::rng();
    let es_over_n0 = 10f64.powf(es_over_n0_db / 10.0);
    let sigma = (2.0 * es_over_n0).recip().sqrt();
    let llr_scale = 4.0 * es_over_n0;
    bits.iter()
        .map(|&b| {
            let noise: f64 = rng.sample(StandardNormal);
            llr_scale * (bpsk_symbol(b) + sigma * noise)
        })
        .collect()
}

/// Returns noiseless LLR values of given magnitude for given bits (`Zero` maps to `+magnitude`).
#[must_use]
pub fn bpsk_llr(bits: &[Bit], magnitude: f64) -> Vec<f64> {
    bits.iter().map(|&b| magnitude * bpsk_symbol(b)).collect()
}

/// Limits the magnitude of each LLR value to `max_abs`, as a fixed-point front end would.
pub fn clip_llr(bits_llr: &mut [f64], max_abs: f64) {
    bits_llr
        .iter_mut()
        .for_each(|x| *x = x.clamp(-max_abs, max_abs));
}

/// Returns hard decisions on LLR values (`Zero` for values `>= 0.0`, `One` otherwise).
#[must_use]
pub fn bpsk_slicer(bits_llr: &[f64]) -> Vec<Bit> {
    bits_llr
        .iter()
        .map(|&llr| if llr < 0.0 { Bit::One } else { Bit::Zero })
        .collect()
}

/// Returns the number of positions at which `seq` differs from `ref_seq`, over their common
/// length.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    seq.iter().zip(ref_seq).filter(|(x, y)| x != y).count()
}

/// Returns bytes holding given bits, first bit in the MSB of the first byte.
///
/// The last byte is padded with `0` bits.
#[must_use]
pub fn pack_bits(bits: &[Bit]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &b)| byte | ((b as u8) << (7 - i)))
        })
        .collect()
}

/// Returns the first `num_bits` bits held in given bytes, MSB of the first byte first.
///
/// Missing bytes are read as `0`.
#[must_use]
pub fn unpack_bits(bytes: &[u8], num_bits: usize) -> Vec<Bit> {
    (0 .. num_bits)
        .map(|i| {
            let byte = bytes.get(i / 8).copied().unwrap_or(0);
            Bit::from_lsb(u32::from(byte >> (7 - i % 8)))
        })
        .collect()
}

/// Returns BPSK symbol for given bit.
fn bpsk_symbol(bit: Bit) -> f64 {
    match bit {
        Bit::Zero => 1.0,
        Bit::One => -1.0,
    }
}

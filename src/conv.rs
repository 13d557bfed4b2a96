//! # Convolutional encoder
//!
//! The [`encode`] function returns the code bits of a [`CodeDescriptor`] for given information
//! bits, walking the [`Trellis`] of the code. Flushed codes append `K - 1` flush steps; tail-biting
//! codes preload the encoder with the last `K - 1` information bits; puncturing removes raw outputs
//! in the order they are generated.
//!
//! [`ConvCodec`] bundles a descriptor with its trellis and implements [`Codec`] with Viterbi
//! decoding.
//!
//! # Examples
//!
//! ```
//! use trellis_fec::{codes, conv, Bit, Trellis};
//!
//! let code = codes::WIMAX_FCH;
//! let trellis = Trellis::new(&code)?;
//! let info_bits = vec![Bit::One; code.len];
//! let code_bits = conv::encode(&code, &trellis, &info_bits)?;
//! assert_eq!(code_bits.len(), 96);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use crate::{
    viterbi, Bit, Codec, CodeDescriptor, Error, Puncture, Termination, Trellis, ViterbiWorkspace,
};

/// Returns code bits for given information bits.
///
/// # Errors
///
/// Returns an error if the code is outside the supported bounds, if `info_bits.len()` is not
/// equal to `code.len`, or if `trellis` was not built from a code with the dimensions of `code`.
pub fn encode(
    code: &CodeDescriptor,
    trellis: &Trellis,
    info_bits: &[Bit],
) -> Result<Vec<Bit>, Error> {
    code.validate()?;
    let mut code_bits = vec![Bit::Zero; code.encoded_len()];
    encode_into(code, trellis, info_bits, &mut code_bits)?;
    Ok(code_bits)
}

/// Writes code bits for given information bits to a caller-supplied buffer.
///
/// # Errors
///
/// Returns an error if `info_bits.len()` is not equal to `code.len`, if `code_bits.len()` is not
/// equal to `code.encoded_len()`, or if `trellis` was not built from a code with the dimensions
/// of `code`.
pub fn encode_into(
    code: &CodeDescriptor,
    trellis: &Trellis,
    info_bits: &[Bit],
    code_bits: &mut [Bit],
) -> Result<(), Error> {
    check_trellis(code, trellis)?;
    if info_bits.len() != code.len {
        return Err(Error::LengthMismatch {
            what: "information bits",
            expected: code.len,
            found: info_bits.len(),
        });
    }
    if code_bits.len() != code.encoded_len() {
        return Err(Error::LengthMismatch {
            what: "code bits",
            expected: code.encoded_len(),
            found: code_bits.len(),
        });
    }
    let mut state = match code.termination {
        Termination::Flushed => 0,
        Termination::TailBiting => info_bits[code.len - code.memory_len() ..]
            .iter()
            .fold(0, |state, &b| trellis.next_state(state, b)),
    };
    let mut keep_flags = KeepFlags::new(code.puncture);
    let mut out_index = 0;
    for step in 0 .. code.num_steps() {
        let input = match info_bits.get(step) {
            Some(&b) => b,
            None => trellis.flush_input(state),
        };
        let sym = trellis.output(state, input);
        for i in 0 .. code.n {
            if keep_flags.next_flag() {
                code_bits[out_index] = Bit::from_lsb(sym >> i);
                out_index += 1;
            }
        }
        state = trellis.next_state(state, input);
    }
    Ok(())
}

/// Checks that a code is supported and that a trellis has its dimensions.
pub(crate) fn check_trellis(code: &CodeDescriptor, trellis: &Trellis) -> Result<(), Error> {
    code.validate()?;
    if trellis.num_states() != code.num_states() {
        return Err(Error::LengthMismatch {
            what: "trellis states",
            expected: code.num_states(),
            found: trellis.num_states(),
        });
    }
    if trellis.num_outputs() != code.n {
        return Err(Error::LengthMismatch {
            what: "trellis outputs",
            expected: code.n,
            found: trellis.num_outputs(),
        });
    }
    Ok(())
}

/// Writes the raw output LLR values for given transmitted LLR values, with erasures (`0.0`) at
/// punctured positions.
///
/// `code_bits_llr.len()` must equal `code.encoded_len()` and `raw_llr.len()` must equal
/// `code.raw_len()`.
pub(crate) fn depuncture(code: &CodeDescriptor, code_bits_llr: &[f64], raw_llr: &mut [f64]) {
    let mut keep_flags = KeepFlags::new(code.puncture);
    let mut code_bits_llr_iter = code_bits_llr.iter();
    for raw in raw_llr.iter_mut() {
        *raw = if keep_flags.next_flag() {
            code_bits_llr_iter.next().copied().unwrap_or(0.0)
        } else {
            0.0
        };
    }
}

/// Generator of transmit flags for the raw outputs of an encoder, in generation order
#[derive(Debug)]
struct KeepFlags {
    /// Puncturing in effect
    puncture: Option<Puncture>,
    /// Index of next raw output
    raw_index: usize,
    /// Index of next punctured position (for position lists)
    next_position: usize,
}

impl KeepFlags {
    /// Returns generator for given puncturing.
    fn new(puncture: Option<Puncture>) -> Self {
        Self {
            puncture,
            raw_index: 0,
            next_position: 0,
        }
    }

    /// Returns `true` if the next raw output is transmitted.
    fn next_flag(&mut self) -> bool {
        let keep = match self.puncture {
            None => true,
            Some(Puncture::Periodic(mask)) => mask[self.raw_index % mask.len()],
            Some(Puncture::Positions(positions)) => {
                if positions.get(self.next_position) == Some(&self.raw_index) {
                    self.next_position += 1;
                    false
                } else {
                    true
                }
            }
        };
        self.raw_index += 1;
        keep
    }
}

/// Convolutional code with Viterbi decoding
///
/// The trellis is built once and shared by clones of the codec.
///
/// # Examples
///
/// ```
/// use trellis_fec::{codes, utils, Codec, ConvCodec};
///
/// let codec = ConvCodec::new(codes::GSM_TCH_AFS_7_95)?;
/// let info_bits = utils::random_bits(codec.block_len());
/// let code_bits = codec.encode(&info_bits)?;
/// assert_eq!(code_bits.len(), 448);
/// let mut workspace = codec.new_workspace();
/// let info_bits_hat = codec.decode(&utils::bpsk_llr(&code_bits, 1.0), &mut workspace)?;
/// assert_eq!(info_bits_hat, info_bits);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct ConvCodec {
    /// Code descriptor
    code: CodeDescriptor,
    /// Trellis of the code
    trellis: Arc<Trellis>,
}

impl ConvCodec {
    /// Returns codec for given code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is outside the supported bounds.
    pub fn new(code: CodeDescriptor) -> Result<Self, Error> {
        let trellis = Arc::new(Trellis::new(&code)?);
        Ok(Self { code, trellis })
    }

    /// Returns the code descriptor.
    #[must_use]
    pub fn code(&self) -> &CodeDescriptor {
        &self.code
    }

    /// Returns the trellis of the code.
    #[must_use]
    pub fn trellis(&self) -> &Trellis {
        &self.trellis
    }
}

impl Codec for ConvCodec {
    type Workspace = ViterbiWorkspace;

    fn block_len(&self) -> usize {
        self.code.len
    }

    fn encoded_len(&self) -> usize {
        self.code.encoded_len()
    }

    fn new_workspace(&self) -> ViterbiWorkspace {
        ViterbiWorkspace::new(self.code.num_states(), self.code.n, self.code.num_steps())
    }

    fn encode(&self, info_bits: &[Bit]) -> Result<Vec<Bit>, Error> {
        encode(&self.code, &self.trellis, info_bits)
    }

    fn decode(
        &self,
        code_bits_llr: &[f64],
        workspace: &mut ViterbiWorkspace,
    ) -> Result<Vec<Bit>, Error> {
        viterbi::decode(&self.code, &self.trellis, workspace, code_bits_llr)
    }
}

#[cfg(test)]
mod tests_of_conv {
    use super::*;
    use crate::{codes, utils};
    use Bit::{One, Zero};

    const XCCH_INFO: [u8; 28] = [
        0xf3, 0x1d, 0xb4, 0x0c, 0x4d, 0x1d, 0x9d, 0xae, 0xc0, 0x0a, 0x42, 0x57, 0x13, 0x60, 0x80,
        0x96, 0xef, 0x23, 0x7e, 0x4c, 0x1d, 0x96, 0x24, 0x19, 0x17, 0xf2, 0x44, 0x99,
    ];

    const XCCH_CODED: [u8; 57] = [
        0xe9, 0x4d, 0x70, 0xab, 0xa2, 0x87, 0xf0, 0xe7, 0x04, 0x14, 0x7c, 0xab, 0xaf, 0x6b, 0xa1,
        0x16, 0xeb, 0x30, 0x00, 0xde, 0xc8, 0xfd, 0x0b, 0x85, 0x80, 0x41, 0x4a, 0xcc, 0xd3, 0xc0,
        0xd0, 0xb6, 0x26, 0xe5, 0x4e, 0x32, 0x49, 0x69, 0x38, 0x17, 0x33, 0xab, 0xaf, 0xb6, 0xc1,
        0x08, 0xf3, 0x9f, 0x8c, 0x75, 0x6a, 0x4e, 0x08, 0xc4, 0x20, 0x5f, 0x8f,
    ];

    const AFS_7_95_INFO: [u8; 21] = [
        0x87, 0x66, 0xc3, 0x58, 0x09, 0xd4, 0x06, 0x59, 0x10, 0xbf, 0x6b, 0x7f, 0xc8, 0xed, 0x72,
        0xaa, 0xc1, 0x3d, 0xf3, 0x1e, 0xb0,
    ];

    const AFS_7_95_CODED: [u8; 56] = [
        0x92, 0xbc, 0xde, 0xa0, 0xde, 0xbe, 0x01, 0x2f, 0xbe, 0xe4, 0x61, 0x32, 0x4d, 0x4f, 0xdc,
        0x41, 0x43, 0x0d, 0x15, 0xe0, 0x23, 0xdd, 0x18, 0x91, 0xe5, 0x36, 0x2d, 0xb7, 0xd9, 0x78,
        0xb8, 0xb1, 0xb7, 0xcb, 0x2f, 0xc0, 0x52, 0x8f, 0xe2, 0x8c, 0x6f, 0xa6, 0x79, 0x88, 0xed,
        0x0c, 0x2e, 0x9e, 0xa1, 0x5f, 0x45, 0x4a, 0xfb, 0xe6, 0x5a, 0x9c,
    ];

    /// Returns the encoder output for given code and information bits.
    fn encode_with_code(code: &CodeDescriptor, info_bits: &[Bit]) -> Result<Vec<Bit>, Error> {
        encode(code, &Trellis::new(code)?, info_bits)
    }

    #[test]
    fn test_encode_xcch_vector() {
        let info_bits = utils::unpack_bits(&XCCH_INFO, 224);
        let code_bits = encode_with_code(&codes::GSM_XCCH, &info_bits).unwrap();
        assert_eq!(code_bits, utils::unpack_bits(&XCCH_CODED, 456));
    }

    #[test]
    fn test_encode_afs_7_95_vector() {
        let info_bits = utils::unpack_bits(&AFS_7_95_INFO, 165);
        let code_bits = encode_with_code(&codes::GSM_TCH_AFS_7_95, &info_bits).unwrap();
        assert_eq!(code_bits, utils::unpack_bits(&AFS_7_95_CODED, 448));
    }

    #[test]
    fn test_encoded_lengths() {
        for named in codes::CODES {
            let info_bits = utils::random_bits(named.code.len);
            let code_bits = encode_with_code(&named.code, &info_bits).unwrap();
            assert_eq!(code_bits.len(), named.code.encoded_len(), "{}", named.name);
        }
        assert_eq!(codes::GSM_XCCH.encoded_len(), 456);
        assert_eq!(codes::GPRS_CS2.encoded_len(), 588);
        assert_eq!(codes::GPRS_CS3.encoded_len(), 676);
        assert_eq!(codes::GSM_RACH.encoded_len(), 36);
        assert_eq!(codes::GSM_SCH.encoded_len(), 78);
        assert_eq!(codes::GSM_TCH_FR.encoded_len(), 378);
        assert_eq!(codes::GSM_TCH_AFS_12_2.encoded_len(), 448);
        assert_eq!(codes::GSM_TCH_AFS_7_95.encoded_len(), 448);
        assert_eq!(codes::GSM_TCH_AFS_6_7.encoded_len(), 448);
        assert_eq!(codes::GSM_TCH_AHS_4_75.encoded_len(), 212);
        assert_eq!(codes::WIMAX_FCH.encoded_len(), 96);
        assert_eq!(codes::LTE_PBCH.encoded_len(), 1536);
        assert_eq!(codes::IEEE_802_11_R34.encoded_len(), 296);
    }

    #[test]
    fn test_encode_flushed() {
        // Single `One` through the xCCH encoder traces out both generators
        let code = CodeDescriptor { len: 1, ..codes::GSM_XCCH };
        let code_bits = encode_with_code(&code, &[One]).unwrap();
        // Pairs of G0 = 1 + D^3 + D^4 and G1 = 1 + D + D^3 + D^4 coefficients, D^0 first
        assert_eq!(
            code_bits,
            [One, One, Zero, One, Zero, Zero, One, One, One, One]
        );
    }

    #[test]
    fn test_encode_tail_biting() {
        // Tail-biting output is a cyclic shift invariant: rotating the input by one bit rotates
        // the output by one symbol
        let code = codes::WIMAX_FCH;
        let info_bits = utils::random_bits(code.len);
        let code_bits = encode_with_code(&code, &info_bits).unwrap();
        let mut rotated_info_bits = info_bits.clone();
        rotated_info_bits.rotate_left(1);
        let mut rotated_code_bits = code_bits.clone();
        rotated_code_bits.rotate_left(code.n);
        assert_eq!(
            encode_with_code(&code, &rotated_info_bits).unwrap(),
            rotated_code_bits
        );
    }

    #[test]
    fn test_encode_periodic_puncturing() {
        let code = codes::IEEE_802_11_R34;
        let unpunctured = CodeDescriptor { puncture: None, ..code };
        let info_bits = utils::random_bits(code.len);
        let raw_bits = encode_with_code(&unpunctured, &info_bits).unwrap();
        let code_bits = encode_with_code(&code, &info_bits).unwrap();
        let expected: Vec<Bit> = raw_bits
            .chunks(6)
            .flat_map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[5]])
            .collect();
        assert_eq!(code_bits, expected);
    }

    #[test]
    fn test_encode_errors() {
        let code = codes::GSM_XCCH;
        let trellis = Trellis::new(&code).unwrap();
        assert!(matches!(
            encode(&code, &trellis, &[Zero; 223]),
            Err(Error::LengthMismatch { expected: 224, found: 223, .. })
        ));
        let mut code_bits = [Zero; 455];
        assert!(matches!(
            encode_into(&code, &trellis, &[Zero; 224], &mut code_bits),
            Err(Error::LengthMismatch { expected: 456, found: 455, .. })
        ));
        let other_trellis = Trellis::new(&codes::LTE_PBCH).unwrap();
        assert!(matches!(
            encode(&code, &other_trellis, &[Zero; 224]),
            Err(Error::LengthMismatch { what: "trellis states", .. })
        ));
    }

    #[test]
    fn test_encode_rejects_invalid_codes() {
        let trellis = Trellis::new(&codes::GSM_XCCH).unwrap();
        let no_memory = CodeDescriptor { k: 0, ..codes::GSM_XCCH };
        assert!(matches!(
            encode(&no_memory, &trellis, &[Zero; 224]),
            Err(Error::UnsupportedDescriptor(_))
        ));
        // 12 punctured positions against 10 raw outputs
        let over_punctured = CodeDescriptor {
            len: 1,
            puncture: Some(Puncture::Positions(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11])),
            ..codes::GSM_XCCH
        };
        assert!(matches!(
            encode(&over_punctured, &trellis, &[Zero]),
            Err(Error::UnsupportedDescriptor(_))
        ));
        let too_many_outputs = CodeDescriptor {
            n: 5,
            generators: &[0o23, 0o33, 0o25, 0o37, 0o31],
            ..codes::GSM_XCCH
        };
        let mut code_bits = vec![Zero; too_many_outputs.encoded_len()];
        assert!(matches!(
            encode_into(&too_many_outputs, &trellis, &[Zero; 224], &mut code_bits),
            Err(Error::UnsupportedDescriptor(_))
        ));
        let huge_block = CodeDescriptor { len: usize::MAX, ..codes::GSM_XCCH };
        assert!(matches!(
            encode(&huge_block, &trellis, &[]),
            Err(Error::UnsupportedDescriptor(_))
        ));
    }

    #[test]
    fn test_rate_quarter_round_trip() {
        for code in [codes::GSM_TCH_AFS_6_7, codes::GSM_TCH_AFS_5_9] {
            assert_eq!(code.n, 4);
            let codec = ConvCodec::new(code).unwrap();
            assert_eq!(codec.encoded_len(), 448);
            let info_bits = utils::random_bits(codec.block_len());
            let code_bits = codec.encode(&info_bits).unwrap();
            let unpunctured = CodeDescriptor { puncture: None, ..code };
            let raw_bits = encode_with_code(&unpunctured, &info_bits).unwrap();
            assert_eq!(raw_bits.len(), 4 * code.num_steps());
            // Outputs 2 and 3 of each step are both the systematic bit
            for (step, chunk) in raw_bits.chunks(4).take(code.len).enumerate() {
                assert_eq!(chunk[2], info_bits[step]);
                assert_eq!(chunk[3], info_bits[step]);
            }
            let mut workspace = codec.new_workspace();
            let info_bits_hat = codec
                .decode(&utils::bpsk_awgn_channel(&code_bits, 10.0), &mut workspace)
                .unwrap();
            assert_eq!(info_bits_hat, info_bits);
        }
    }

    #[test]
    fn test_depuncture() {
        let code = CodeDescriptor {
            len: 2,
            puncture: Some(Puncture::Positions(&[1, 4, 11])),
            ..codes::GSM_XCCH
        };
        assert_eq!(code.encoded_len(), 9);
        let code_bits_llr = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let mut raw_llr = [f64::NAN; 12];
        depuncture(&code, &code_bits_llr, &mut raw_llr);
        assert_eq!(
            raw_llr,
            [1.0, 0.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 0.0]
        );
    }

    #[test]
    fn test_keep_flags() {
        let mut keep_flags = KeepFlags::new(Some(Puncture::Periodic(&[true, false, true])));
        let flags: Vec<bool> = (0 .. 7).map(|_| keep_flags.next_flag()).collect();
        assert_eq!(flags, [true, false, true, true, false, true, true]);
        let mut keep_flags = KeepFlags::new(Some(Puncture::Positions(&[0, 3])));
        let flags: Vec<bool> = (0 .. 5).map(|_| keep_flags.next_flag()).collect();
        assert_eq!(flags, [false, true, true, false, true]);
    }

    #[test]
    fn test_conv_codec() {
        let codec = ConvCodec::new(codes::LTE_PBCH).unwrap();
        assert_eq!(codec.block_len(), 512);
        assert_eq!(codec.encoded_len(), 1536);
        assert_eq!(codec.trellis().num_states(), 64);
        assert_eq!(codec.code(), &codes::LTE_PBCH);
        let info_bits = utils::random_bits(codec.block_len());
        let code_bits = codec.encode(&info_bits).unwrap();
        let mut workspace = codec.new_workspace();
        let info_bits_hat = codec
            .decode(&utils::bpsk_llr(&code_bits, 1.0), &mut workspace)
            .unwrap();
        assert_eq!(info_bits_hat, info_bits);
        assert!(ConvCodec::new(CodeDescriptor { n: 7, ..codes::LTE_PBCH }).is_err());
    }
}

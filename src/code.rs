//! Descriptor of a convolutional code

use std::fmt;

use crate::Error;

/// Largest supported number of output bits per input bit
pub const MAX_NUM_OUTPUTS: usize = 4;

/// Largest supported constraint length (256 states)
pub const MAX_CONSTRAINT_LEN: usize = 9;

/// Largest supported number of information bits per block
pub const MAX_BLOCK_LEN: usize = 1 << 15;

/// Termination of the encoder state at the end of a block
#[derive(Clone, Eq, PartialEq, Hash, Debug, Copy)]
pub enum Termination {
    /// Encoder starts in the zero state and is driven back to it by `K - 1` flush steps, whose
    /// outputs are transmitted
    Flushed,
    /// Encoder starts in the state given by the last `K - 1` information bits, so that it ends in
    /// the state it started from; no flush steps
    TailBiting,
}

/// Puncturing applied to the raw encoder output
#[derive(Clone, Eq, PartialEq, Hash, Debug, Copy)]
pub enum Puncture {
    /// Keep-mask repeated over the raw output stream (`true` means transmitted)
    Periodic(&'static [bool]),
    /// Strictly increasing indices of raw outputs that are not transmitted
    Positions(&'static [usize]),
}

impl Puncture {
    /// Returns number of raw outputs removed from a stream of given length.
    fn num_punctured(&self, raw_len: usize) -> usize {
        match self {
            Puncture::Periodic(mask) if mask.is_empty() => 0,
            Puncture::Periodic(mask) => {
                let num_dropped_per_period = mask.iter().filter(|&&keep| !keep).count();
                let num_dropped_in_remainder = mask[.. raw_len % mask.len()]
                    .iter()
                    .filter(|&&keep| !keep)
                    .count();
                raw_len / mask.len() * num_dropped_per_period + num_dropped_in_remainder
            }
            Puncture::Positions(positions) => positions.len(),
        }
    }

    /// Checks that the puncturing is usable on a raw stream of given length.
    fn validate(&self, raw_len: usize) -> Result<(), Error> {
        match self {
            Puncture::Periodic(mask) => {
                if !mask.iter().any(|&keep| keep) {
                    return Err(Error::UnsupportedDescriptor(
                        "Puncture mask must keep at least one output".to_string(),
                    ));
                }
            }
            Puncture::Positions(positions) => {
                if positions.windows(2).any(|pair| pair[0] >= pair[1]) {
                    return Err(Error::UnsupportedDescriptor(
                        "Puncture positions must be strictly increasing".to_string(),
                    ));
                }
                if positions.last().is_some_and(|&last| last >= raw_len) {
                    return Err(Error::UnsupportedDescriptor(format!(
                        "Puncture positions must be less than the raw output length {raw_len}"
                    )));
                }
            }
        }
        if self.num_punctured(raw_len) >= raw_len {
            return Err(Error::UnsupportedDescriptor(
                "Puncturing removes every output bit".to_string(),
            ));
        }
        Ok(())
    }
}

/// Descriptor of a convolutional code
///
/// Generator and feedback polynomials are `K`-bit integers whose MSB is the tap on the current
/// register input and whose LSB is the tap on the oldest register bit. For example, the GSM xCCH
/// code with `G0 = 1 + D^3 + D^4` and `G1 = 1 + D + D^3 + D^4` has generators `[0o23, 0o33]`.
///
/// For a recursive code, the bit shifted into the register is the input bit XOR the feedback
/// taps over the current state. A generator equal to the feedback polynomial therefore yields
/// the systematic output.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Copy)]
pub struct CodeDescriptor {
    /// Number of output bits per input bit (`N`)
    pub n: usize,
    /// Constraint length (`K`)
    pub k: usize,
    /// Number of information bits per block (`L`)
    pub len: usize,
    /// Generator polynomials, one per output bit
    pub generators: &'static [u32],
    /// Feedback polynomial of a recursive code
    pub feedback: Option<u32>,
    /// Termination mode
    pub termination: Termination,
    /// Optional puncturing of the raw output
    pub puncture: Option<Puncture>,
}

impl CodeDescriptor {
    /// Returns the memory length `K - 1` (`0` for `K = 0`).
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.k.saturating_sub(1)
    }

    /// Returns the number of encoder states `2^(K-1)`, saturating at `usize::MAX`.
    #[must_use]
    pub fn num_states(&self) -> usize {
        u32::try_from(self.memory_len())
            .ok()
            .and_then(|memory_len| 1_usize.checked_shl(memory_len))
            .unwrap_or(usize::MAX)
    }

    /// Returns `true` for a recursive code.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        self.feedback.is_some()
    }

    /// Returns the number of trellis steps per block (including flush steps).
    #[must_use]
    pub fn num_steps(&self) -> usize {
        match self.termination {
            Termination::Flushed => self.len.saturating_add(self.memory_len()),
            Termination::TailBiting => self.len,
        }
    }

    /// Returns the number of encoder outputs per block before puncturing.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.num_steps().saturating_mul(self.n)
    }

    /// Returns the number of transmitted code bits per block.
    ///
    /// Sizes derived from a descriptor that fails [`validate`](Self::validate) saturate instead
    /// of overflowing; they are not meaningful.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_fec::codes;
    ///
    /// assert_eq!(codes::GSM_XCCH.encoded_len(), 456);
    /// assert_eq!(codes::WIMAX_FCH.encoded_len(), 96);
    /// assert_eq!(codes::GSM_TCH_AFS_7_95.encoded_len(), 448);
    /// ```
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let raw_len = self.raw_len();
        raw_len.saturating_sub(self.puncture.map_or(0, |p| p.num_punctured(raw_len)))
    }

    /// Checks that the code is within the supported bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if `N` is not in `[2, 4]`, if `K` is not in `[2, 9]`, if the block
    /// length is `0` or exceeds [`MAX_BLOCK_LEN`], if a polynomial is out of range, if a
    /// recursive code is tail-biting, if a tail-biting block is shorter than `K - 1` bits, or if
    /// the puncturing does not fit the raw output.
    pub fn validate(&self) -> Result<(), Error> {
        if !(2 ..= MAX_NUM_OUTPUTS).contains(&self.n) {
            return Err(Error::UnsupportedDescriptor(format!(
                "Number of outputs per input bit must be in [2, {MAX_NUM_OUTPUTS}] (found {})",
                self.n
            )));
        }
        if !(2 ..= MAX_CONSTRAINT_LEN).contains(&self.k) {
            return Err(Error::UnsupportedDescriptor(format!(
                "Constraint length must be in [2, {MAX_CONSTRAINT_LEN}] (found {})",
                self.k
            )));
        }
        if self.len == 0 || self.len > MAX_BLOCK_LEN {
            return Err(Error::UnsupportedDescriptor(format!(
                "Block length must be in [1, {MAX_BLOCK_LEN}] (found {})",
                self.len
            )));
        }
        if self.generators.len() != self.n {
            return Err(Error::UnsupportedDescriptor(format!(
                "Expected {} generator polynomials (found {})",
                self.n,
                self.generators.len()
            )));
        }
        let two_pow_k = 1 << self.k;
        if self.generators.iter().any(|&g| g == 0 || g >= two_pow_k) {
            return Err(Error::UnsupportedDescriptor(format!(
                "For constraint length of {}, each generator polynomial must be in the range \
                [1, {two_pow_k})",
                self.k
            )));
        }
        if let Some(feedback) = self.feedback {
            if feedback < two_pow_k / 2 || feedback >= two_pow_k || feedback.is_power_of_two() {
                return Err(Error::UnsupportedDescriptor(format!(
                    "For constraint length of {}, the feedback polynomial must be in the range \
                    ({}, {two_pow_k}) and cannot be a power of 2",
                    self.k,
                    two_pow_k / 2
                )));
            }
            if self.termination == Termination::TailBiting {
                return Err(Error::UnsupportedDescriptor(
                    "Tail-biting termination is not supported for recursive codes".to_string(),
                ));
            }
        }
        if self.termination == Termination::TailBiting && self.len < self.memory_len() {
            return Err(Error::UnsupportedDescriptor(format!(
                "Tail-biting block must hold at least {} bits (found {})",
                self.memory_len(),
                self.len
            )));
        }
        if let Some(puncture) = self.puncture {
            puncture.validate(self.raw_len())?;
        }
        Ok(())
    }
}

impl fmt::Display for CodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(N={}, K={}, {}, {}, {})",
            self.n,
            self.k,
            if self.is_recursive() { "recursive" } else { "non-recursive" },
            match self.termination {
                Termination::Flushed => "flushed",
                Termination::TailBiting => "tail-biting",
            },
            if self.puncture.is_some() { "punctured" } else { "not punctured" }
        )
    }
}

//! This crate implements the forward-error-correction building blocks of the GSM, GPRS, WiMAX and
//! LTE physical layers: convolutional encoding with Viterbi decoding, and turbo encoding with
//! iterative BCJR decoding.
//!
//! A convolutional code is described by an immutable [`CodeDescriptor`] (generator polynomials,
//! constraint length, optional feedback polynomial, termination mode and puncturing). A
//! [`Trellis`] is derived from the descriptor once and shared read-only by any number of
//! [`conv::encode`] and [`viterbi::decode`] calls. Flushed, tail-biting and punctured codes are
//! supported; the codes used by the air interfaces above are collected in [`codes`].
//!
//! A turbo code ([`TurboCode`]) is the parallel concatenation of two identical recursive
//! systematic convolutional (RSC) encoders, separated by an internal interleaver (the systematic
//! bits from the second encoder are discarded). The decoder iterates between two
//! soft-input/soft-output BCJR decoders, exchanging extrinsic information through the
//! interleaver and deinterleaver.
//!
//! Decoders need scratch memory that is reused from call to call. It is held in an explicit
//! workspace ([`ViterbiWorkspace`], [`TurboWorkspace`]) owned by a single caller at a time, so
//! that concurrent decoders on different threads each bring their own.
//!
//! # Examples
//!
//! ```
//! use trellis_fec::{codes, utils, Codec, ConvCodec};
//!
//! let codec = ConvCodec::new(codes::GSM_XCCH)?;
//! let info_bits = utils::random_bits(codec.block_len());
//! let code_bits = codec.encode(&info_bits)?;
//! assert_eq!(code_bits.len(), 456);
//! let code_bits_llr = utils::bpsk_awgn_channel(&code_bits, 10.0);
//! let mut workspace = codec.new_workspace();
//! let info_bits_hat = codec.decode(&code_bits_llr, &mut workspace)?;
//! assert_eq!(info_bits_hat, info_bits);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

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

use serde::{Deserialize, Serialize};

mod bcjr;
mod code;
pub mod codes;
pub mod conv;
mod interleaver;
pub mod sim;
mod trellis;
pub mod turbo;
pub mod utils;
pub mod viterbi;

pub use bcjr::TurboWorkspace;
pub use code::{CodeDescriptor, Puncture, Termination};
pub use conv::ConvCodec;
pub use interleaver::Interleaver;
pub use trellis::{Branch, Trellis};
pub use turbo::{TurboCode, TurboCodec, TurboStreams};
pub use viterbi::ViterbiWorkspace;

/// Enumeration of binary symbol values
#[derive(Clone, Eq, PartialEq, Hash, Debug, Copy)]
pub enum Bit {
    /// Binary symbol `0`
    Zero = 0,
    /// Binary symbol `1`
    One = 1,
}

impl Bit {
    /// Returns bit corresponding to the least significant bit of given integer.
    #[must_use]
    pub fn from_lsb(num: u32) -> Self {
        match num & 1 {
            0 => Bit::Zero,
            _ => Bit::One,
        }
    }
}

/// Custom error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Buffer length does not match the length implied by the code
    #[error("Expected {expected} {what} (found {found})")]
    LengthMismatch {
        /// Description of the offending buffer
        what: &'static str,
        /// Length implied by the code
        expected: usize,
        /// Length actually supplied
        found: usize,
    },
    /// Code parameters outside the supported bounds
    #[error("{0}")]
    UnsupportedDescriptor(String),
    /// Decoder workspace cannot hold the requested block
    #[error("Workspace holds at most {capacity} {what} (requested {requested})")]
    WorkspaceTooSmall {
        /// Dimension that is too small
        what: &'static str,
        /// Size needed by the decode call
        requested: usize,
        /// Size the workspace was allocated with
        capacity: usize,
    },
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
}

/// Enumeration of turbo decoding algorithms
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum DecodingAlgo {
    /// Log-MAP decoding with given number of turbo iterations
    LogMAP(u32),
    /// Max-Log-MAP decoding with given number of turbo iterations
    MaxLogMAP(u32),
    /// Linear-Log-MAP decoding (Valenti & Sun, 2001) with given number of turbo iterations
    LinearLogMAP(u32),
}

impl DecodingAlgo {
    /// Returns the name of the variant.
    fn name(&self) -> &str {
        match self {
            DecodingAlgo::LogMAP(_) => "Log-MAP",
            DecodingAlgo::MaxLogMAP(_) => "Max-Log-MAP",
            DecodingAlgo::LinearLogMAP(_) => "Linear-Log-MAP",
        }
    }

    /// Returns the number of turbo iterations held in the variant.
    #[must_use]
    pub fn num_iter(self) -> u32 {
        match self {
            DecodingAlgo::LogMAP(n)
            | DecodingAlgo::MaxLogMAP(n)
            | DecodingAlgo::LinearLogMAP(n) => n,
        }
    }

    /// Returns the same algorithm with a different number of turbo iterations.
    #[must_use]
    pub fn with_num_iter(self, num_iter: u32) -> Self {
        match self {
            DecodingAlgo::LogMAP(_) => DecodingAlgo::LogMAP(num_iter),
            DecodingAlgo::MaxLogMAP(_) => DecodingAlgo::MaxLogMAP(num_iter),
            DecodingAlgo::LinearLogMAP(_) => DecodingAlgo::LinearLogMAP(num_iter),
        }
    }
}

impl std::fmt::Display for DecodingAlgo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} decoding, {} turbo iterations",
            self.name(),
            self.num_iter()
        )
    }
}

/// Encoder/decoder pair for a code with a fixed block length
///
/// Implemented by [`ConvCodec`] and [`TurboCodec`], so that callers such as the simulation
/// driver in [`sim`] can be written once for both code families.
pub trait Codec {
    /// Scratch memory needed by the decoder
    type Workspace;

    /// Returns the number of information bits per block.
    fn block_len(&self) -> usize;

    /// Returns the number of code bits per block.
    fn encoded_len(&self) -> usize;

    /// Returns a decoder workspace large enough for one block of this code.
    fn new_workspace(&self) -> Self::Workspace;

    /// Returns code bits for given information bits.
    ///
    /// # Errors
    ///
    /// Returns an error if `info_bits.len()` is not equal to `self.block_len()`.
    fn encode(&self, info_bits: &[Bit]) -> Result<Vec<Bit>, Error>;

    /// Returns decisions on the information bits for given code bit LLR values (positive values
    /// indicating that `Zero` is more likely).
    ///
    /// # Errors
    ///
    /// Returns an error if `code_bits_llr.len()` is not equal to `self.encoded_len()` or if the
    /// workspace is too small for this code.
    fn decode(
        &self,
        code_bits_llr: &[f64],
        workspace: &mut Self::Workspace,
    ) -> Result<Vec<Bit>, Error>;
}

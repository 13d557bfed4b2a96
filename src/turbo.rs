//! # Turbo encoder and decoder
//!
//! A [`TurboCode`] is the parallel concatenation of two rate-1/2 recursive systematic
//! convolutional (RSC) codes through an internal interleaver. The [`encode`] function returns the
//! systematic stream and the two parity streams (the systematic bits of the second RSC encoder are
//! discarded), with the tail bits of both encoders spread over the three streams as in
//! 3GPP TS 36.212. The [`decode`] function runs a fixed number of turbo iterations, each of which
//! runs a BCJR decoder on each constituent code and exchanges extrinsic information between them.
//!
//! [`TurboCodec`] implements [`Codec`] for a fixed block length, with the three streams
//! concatenated.
//!
//! # Examples
//!
//! ```
//! use trellis_fec::{turbo, utils, DecodingAlgo, TurboCode};
//!
//! let code = TurboCode::lte()?;
//! let block_len = 1024;
//! let info_bits = utils::random_bits(block_len);
//! let streams = turbo::encode(&code, &info_bits)?;
//! assert_eq!(streams.sys.len(), 1028);
//! let mut workspace = code.allocate_workspace(block_len);
//! let info_bits_hat = turbo::decode(
//!     &code,
//!     &mut workspace,
//!     block_len,
//!     DecodingAlgo::LinearLogMAP(4),
//!     &utils::bpsk_awgn_channel(&streams.sys, 3.0),
//!     &utils::bpsk_awgn_channel(&streams.par1, 3.0),
//!     &utils::bpsk_awgn_channel(&streams.par2, 3.0),
//! )?;
//! assert_eq!(info_bits_hat, info_bits);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    bcjr::{self, TurboWorkspace},
    code::MAX_BLOCK_LEN,
    utils, Bit, Codec, CodeDescriptor, DecodingAlgo, Error, Interleaver, Termination, Trellis,
};

/// Largest LTE turbo block length
pub const LTE_MAX_BLOCK_LEN: usize = 6144;

/// Constituent RSC code of the LTE turbo code (`K = 4`, feedback `1 + D^2 + D^3`, parity
/// `1 + D + D^3`)
pub const LTE_CONSTITUENT: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 4,
    len: LTE_MAX_BLOCK_LEN,
    generators: &[0o13, 0o15],
    feedback: Some(0o13),
    termination: Termination::Flushed,
    puncture: None,
};

/// Generator of the internal interleaver for a given block length
pub type InterleaverGen = fn(usize) -> Result<Interleaver, Error>;

/// Descriptor of a turbo code
///
/// Interleavers are generated on first use for each block length and cached for the lifetime of
/// the descriptor, which may be shared between threads.
#[derive(Debug)]
pub struct TurboCode {
    /// Constituent codes (the `len` field of each is ignored)
    constituents: [CodeDescriptor; 2],
    /// Trellises of the constituent codes
    trellises: [Trellis; 2],
    /// Largest supported number of information bits
    max_block_len: usize,
    /// Generator of the internal interleaver
    interleaver_gen: InterleaverGen,
    /// Interleavers generated so far, by block length
    interleavers: RwLock<HashMap<usize, Arc<Interleaver>>>,
}

impl TurboCode {
    /// Returns turbo code with given constituent codes, maximum block length and interleaver
    /// generator.
    ///
    /// # Errors
    ///
    /// Returns an error if a constituent code is not a flushed, unpunctured, rate-1/2 recursive
    /// code with the systematic output first, if the two memory lengths differ, if four times the
    /// memory length is not a multiple of `3`, or if `max_block_len` is `0` or too large.
    pub fn new(
        constituents: [CodeDescriptor; 2],
        max_block_len: usize,
        interleaver_gen: InterleaverGen,
    ) -> Result<Self, Error> {
        if max_block_len == 0 || max_block_len > MAX_BLOCK_LEN {
            return Err(Error::UnsupportedDescriptor(format!(
                "Maximum turbo block length must be in [1, {MAX_BLOCK_LEN}] (found {max_block_len})"
            )));
        }
        for code in &constituents {
            check_constituent(code)?;
        }
        let memory_len = constituents[0].memory_len();
        if constituents[1].memory_len() != memory_len {
            return Err(Error::UnsupportedDescriptor(
                "Constituent codes must have the same constraint length".to_string(),
            ));
        }
        if (4 * memory_len) % 3 != 0 {
            return Err(Error::UnsupportedDescriptor(format!(
                "Cannot spread {} tail bits evenly over three streams",
                4 * memory_len
            )));
        }
        let trellises = [
            Trellis::new(&constituents[0])?,
            Trellis::new(&constituents[1])?,
        ];
        Ok(Self {
            constituents,
            trellises,
            max_block_len,
            interleaver_gen,
            interleavers: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the LTE turbo code (3GPP TS 36.212) with QPP interleavers.
    ///
    /// # Errors
    ///
    /// Returns an error if [`LTE_CONSTITUENT`] fails the constituent checks of [`TurboCode::new`]
    /// or if [`LTE_MAX_BLOCK_LEN`] exceeds the largest supported block length.
    pub fn lte() -> Result<Self, Error> {
        Self::new(
            [LTE_CONSTITUENT, LTE_CONSTITUENT],
            LTE_MAX_BLOCK_LEN,
            Interleaver::qpp,
        )
    }

    /// Returns the constituent codes.
    #[must_use]
    pub fn constituents(&self) -> &[CodeDescriptor; 2] {
        &self.constituents
    }

    /// Returns the largest supported number of information bits.
    #[must_use]
    pub fn max_block_len(&self) -> usize {
        self.max_block_len
    }

    /// Returns the memory length of the constituent codes.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.trellises[0].memory_len()
    }

    /// Returns the number of tail bits at the end of each stream.
    #[must_use]
    pub fn tail_len(&self) -> usize {
        4 * self.memory_len() / 3
    }

    /// Returns the length of each stream for given number of information bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_fec::TurboCode;
    ///
    /// let code = TurboCode::lte()?;
    /// assert_eq!(code.stream_len(6144), 6148);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn stream_len(&self, block_len: usize) -> usize {
        block_len + self.tail_len()
    }

    /// Returns the internal interleaver for given number of information bits.
    ///
    /// # Errors
    ///
    /// Returns an error if `block_len` is `0` or exceeds the maximum block length, or if the
    /// generator has no interleaver of that length.
    pub fn interleaver(&self, block_len: usize) -> Result<Arc<Interleaver>, Error> {
        if block_len == 0 || block_len > self.max_block_len {
            return Err(Error::UnsupportedDescriptor(format!(
                "Turbo block length must be in [1, {}] (found {block_len})",
                self.max_block_len
            )));
        }
        if let Some(interleaver) = self.interleavers.read().get(&block_len) {
            return Ok(Arc::clone(interleaver));
        }
        let interleaver = (self.interleaver_gen)(block_len)?;
        if interleaver.len() != block_len {
            return Err(Error::UnsupportedDescriptor(format!(
                "Interleaver generator returned {} indices for block length {block_len}",
                interleaver.len()
            )));
        }
        debug!("caching interleaver for block length {block_len}");
        Ok(Arc::clone(
            self.interleavers
                .write()
                .entry(block_len)
                .or_insert_with(|| Arc::new(interleaver)),
        ))
    }

    /// Returns decoder workspace for blocks of up to `max_block_len` information bits.
    #[must_use]
    pub fn allocate_workspace(&self, max_block_len: usize) -> TurboWorkspace {
        TurboWorkspace::new(
            self.trellises[0].num_states(),
            self.memory_len(),
            max_block_len,
        )
    }
}

/// Checks that a code can be a constituent of a turbo code.
fn check_constituent(code: &CodeDescriptor) -> Result<(), Error> {
    code.validate()?;
    let is_suitable = code.n == 2
        && code.termination == Termination::Flushed
        && code.puncture.is_none()
        && code.feedback.is_some_and(|feedback| code.generators[0] == feedback);
    if is_suitable {
        Ok(())
    } else {
        Err(Error::UnsupportedDescriptor(format!(
            "Turbo constituent must be a flushed, unpunctured, rate-1/2 recursive systematic \
            code (found {code})"
        )))
    }
}

/// Systematic and parity streams of a turbo code
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TurboStreams {
    /// Systematic bits, followed by tail bits
    pub sys: Vec<Bit>,
    /// Parity bits from the first RSC encoder, followed by tail bits
    pub par1: Vec<Bit>,
    /// Parity bits from the second RSC encoder, followed by tail bits
    pub par2: Vec<Bit>,
}

/// Returns the three streams of a turbo code for given information bits.
///
/// # Errors
///
/// Returns an error if no interleaver is available for `info_bits.len()` (see
/// [`TurboCode::interleaver`]).
///
/// # Examples
///
/// ```
/// use trellis_fec::{turbo, Bit, TurboCode};
///
/// let code = TurboCode::lte()?;
/// let streams = turbo::encode(&code, &[Bit::Zero; 6144])?;
/// assert_eq!(streams.sys.len() + streams.par1.len() + streams.par2.len(), 18444);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn encode(code: &TurboCode, info_bits: &[Bit]) -> Result<TurboStreams, Error> {
    let block_len = info_bits.len();
    let interleaver = code.interleaver(block_len)?;
    let mut interleaved_info_bits = vec![Bit::Zero; block_len];
    interleaver.interleave(info_bits, &mut interleaved_info_bits)?;
    let stream_len = code.stream_len(block_len);
    let mut streams = TurboStreams {
        sys: Vec::with_capacity(stream_len),
        par1: Vec::with_capacity(stream_len),
        par2: Vec::with_capacity(stream_len),
    };
    streams.sys.extend_from_slice(info_bits);
    let mut tail_bits = Vec::with_capacity(4 * code.memory_len());
    encode_constituent(
        &code.trellises[0],
        info_bits,
        &mut streams.par1,
        &mut tail_bits,
    );
    encode_constituent(
        &code.trellises[1],
        &interleaved_info_bits,
        &mut streams.par2,
        &mut tail_bits,
    );
    let mut all_streams = [&mut streams.sys, &mut streams.par1, &mut streams.par2];
    for (i, &b) in tail_bits.iter().enumerate() {
        all_streams[i % 3].push(b);
    }
    Ok(streams)
}

/// Appends parity bits from an RSC encoder to `parity_bits`, and its systematic and parity tail
/// bits (alternately) to `tail_bits`.
fn encode_constituent(
    trellis: &Trellis,
    info_bits: &[Bit],
    parity_bits: &mut Vec<Bit>,
    tail_bits: &mut Vec<Bit>,
) {
    let mut state = 0;
    for &info_bit in info_bits {
        parity_bits.push(Bit::from_lsb(trellis.output(state, info_bit) >> 1));
        state = trellis.next_state(state, info_bit);
    }
    for _ in 0 .. trellis.memory_len() {
        let input = trellis.flush_input(state);
        let sym = trellis.output(state, input);
        tail_bits.push(Bit::from_lsb(sym));
        tail_bits.push(Bit::from_lsb(sym >> 1));
        state = trellis.next_state(state, input);
    }
}

/// Returns information bit decisions from turbo decoder for given stream LLR values.
///
/// # Parameters
///
/// - `code`: Turbo code.
///
/// - `workspace`: Workspace allocated by `code` for at least `block_len` information bits.
///
/// - `block_len`: Number of information bits.
///
/// - `decoding_algo`: Decoding algorithm to use, and associated number of turbo iterations.
///
/// - `sys_llr`, `par1_llr`, `par2_llr`: LLR values for the three streams, with positive values
///   indicating that `Zero` is more likely.
///
/// # Errors
///
/// Returns an error if `block_len` exceeds the workspace capacity, if no interleaver is available
/// for `block_len`, if a stream does not have `code.stream_len(block_len)` values, or if the
/// workspace was allocated for a code with different constituents.
#[allow(clippy::too_many_arguments)]
pub fn decode(
    code: &TurboCode,
    workspace: &mut TurboWorkspace,
    block_len: usize,
    decoding_algo: DecodingAlgo,
    sys_llr: &[f64],
    par1_llr: &[f64],
    par2_llr: &[f64],
) -> Result<Vec<Bit>, Error> {
    if block_len > workspace.max_block_len {
        return Err(Error::WorkspaceTooSmall {
            what: "information bits",
            requested: block_len,
            capacity: workspace.max_block_len,
        });
    }
    let interleaver = code.interleaver(block_len)?;
    let stream_len = code.stream_len(block_len);
    for (what, stream) in [
        ("systematic LLR values", sys_llr),
        ("first parity LLR values", par1_llr),
        ("second parity LLR values", par2_llr),
    ] {
        if stream.len() != stream_len {
            return Err(Error::LengthMismatch {
                what,
                expected: stream_len,
                found: stream.len(),
            });
        }
    }
    if workspace.num_states != code.trellises[0].num_states()
        || workspace.memory_len != code.memory_len()
    {
        return Err(Error::LengthMismatch {
            what: "workspace states",
            expected: code.trellises[0].num_states(),
            found: workspace.num_states,
        });
    }
    if decoding_algo.num_iter() == 0 {
        return Ok(vec![Bit::Zero; block_len]);
    }
    demultiplex(
        workspace,
        &interleaver,
        block_len,
        [sys_llr, par1_llr, par2_llr],
    )?;
    let num_steps = block_len + code.memory_len();
    let ws = workspace;
    ws.prior[.. block_len].fill(0.0);
    for _ in 0 .. decoding_algo.num_iter() {
        bcjr::run_bcjr(
            &code.trellises[0],
            &ws.sys_llr[0][.. num_steps],
            &ws.par_llr[0][.. num_steps],
            &ws.prior[.. block_len],
            decoding_algo,
            &mut ws.scratch,
            &mut ws.extrinsic[0][.. block_len],
            &mut ws.posterior[.. block_len],
        );
        interleaver.interleave(&ws.extrinsic[0][.. block_len], &mut ws.prior[.. block_len])?;
        bcjr::run_bcjr(
            &code.trellises[1],
            &ws.sys_llr[1][.. num_steps],
            &ws.par_llr[1][.. num_steps],
            &ws.prior[.. block_len],
            decoding_algo,
            &mut ws.scratch,
            &mut ws.extrinsic[1][.. block_len],
            &mut ws.posterior[.. block_len],
        );
        interleaver.deinterleave(&ws.extrinsic[1][.. block_len], &mut ws.prior[.. block_len])?;
    }
    interleaver.deinterleave(&ws.posterior[.. block_len], &mut ws.prior[.. block_len])?;
    Ok(utils::bpsk_slicer(&ws.prior[.. block_len]))
}

/// Writes the systematic and parity LLR values of each constituent decoder to the workspace,
/// undoing the interleaving of the second decoder's systematic input and the spreading of the
/// tail bits.
fn demultiplex(
    workspace: &mut TurboWorkspace,
    interleaver: &Interleaver,
    block_len: usize,
    streams: [&[f64]; 3],
) -> Result<(), Error> {
    let [sys_llr, par1_llr, par2_llr] = streams;
    workspace.sys_llr[0][.. block_len].copy_from_slice(&sys_llr[.. block_len]);
    workspace.par_llr[0][.. block_len].copy_from_slice(&par1_llr[.. block_len]);
    interleaver.interleave(
        &sys_llr[.. block_len],
        &mut workspace.sys_llr[1][.. block_len],
    )?;
    workspace.par_llr[1][.. block_len].copy_from_slice(&par2_llr[.. block_len]);
    let memory_len = workspace.memory_len;
    for i in 0 .. 4 * memory_len {
        let llr = streams[i % 3][block_len + i / 3];
        let (decoder, offset) = (i / (2 * memory_len), i % (2 * memory_len));
        let step = block_len + offset / 2;
        if offset % 2 == 0 {
            workspace.sys_llr[decoder][step] = llr;
        } else {
            workspace.par_llr[decoder][step] = llr;
        }
    }
    Ok(())
}

/// Turbo code with a fixed block length and decoding algorithm
///
/// The code bits are the systematic stream followed by the two parity streams.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use trellis_fec::{utils, Codec, DecodingAlgo, TurboCode, TurboCodec};
///
/// let codec = TurboCodec::new(Arc::new(TurboCode::lte()?), 40, DecodingAlgo::LogMAP(8))?;
/// assert_eq!(codec.encoded_len(), 132);
/// let info_bits = utils::random_bits(codec.block_len());
/// let code_bits = codec.encode(&info_bits)?;
/// let mut workspace = codec.new_workspace();
/// let info_bits_hat = codec.decode(&utils::bpsk_llr(&code_bits, 1.0), &mut workspace)?;
/// assert_eq!(info_bits_hat, info_bits);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct TurboCodec {
    /// Turbo code
    code: Arc<TurboCode>,
    /// Number of information bits
    block_len: usize,
    /// Decoding algorithm and number of turbo iterations
    decoding_algo: DecodingAlgo,
}

impl TurboCodec {
    /// Returns codec for given turbo code, block length and decoding algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if no interleaver is available for `block_len`.
    pub fn new(
        code: Arc<TurboCode>,
        block_len: usize,
        decoding_algo: DecodingAlgo,
    ) -> Result<Self, Error> {
        code.interleaver(block_len)?;
        Ok(Self {
            code,
            block_len,
            decoding_algo,
        })
    }

    /// Returns the turbo code.
    #[must_use]
    pub fn code(&self) -> &TurboCode {
        &self.code
    }

    /// Returns the decoding algorithm.
    #[must_use]
    pub fn decoding_algo(&self) -> DecodingAlgo {
        self.decoding_algo
    }
}

impl Codec for TurboCodec {
    type Workspace = TurboWorkspace;

    fn block_len(&self) -> usize {
        self.block_len
    }

    fn encoded_len(&self) -> usize {
        3 * self.code.stream_len(self.block_len)
    }

    fn new_workspace(&self) -> TurboWorkspace {
        self.code.allocate_workspace(self.block_len)
    }

    fn encode(&self, info_bits: &[Bit]) -> Result<Vec<Bit>, Error> {
        if info_bits.len() != self.block_len {
            return Err(Error::LengthMismatch {
                what: "information bits",
                expected: self.block_len,
                found: info_bits.len(),
            });
        }
        let streams = encode(&self.code, info_bits)?;
        Ok([streams.sys, streams.par1, streams.par2].concat())
    }

    fn decode(
        &self,
        code_bits_llr: &[f64],
        workspace: &mut TurboWorkspace,
    ) -> Result<Vec<Bit>, Error> {
        if code_bits_llr.len() != self.encoded_len() {
            return Err(Error::LengthMismatch {
                what: "code bit LLR values",
                expected: self.encoded_len(),
                found: code_bits_llr.len(),
            });
        }
        let stream_len = self.code.stream_len(self.block_len);
        let (sys_llr, par_llr) = code_bits_llr.split_at(stream_len);
        let (par1_llr, par2_llr) = par_llr.split_at(stream_len);
        decode(
            &self.code,
            workspace,
            self.block_len,
            self.decoding_algo,
            sys_llr,
            par1_llr,
            par2_llr,
        )
    }
}

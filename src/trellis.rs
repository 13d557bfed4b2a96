//! Trellis of a convolutional code

use tracing::debug;

use crate::{Bit, CodeDescriptor, Error};

/// Transition into a state of the trellis
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub struct Branch {
    /// State the transition starts from
    pub from: usize,
    /// Input bit driving the transition
    pub input: Bit,
    /// Output symbol, with output bit `i` in bit position `i`
    pub output: u32,
}

/// State-transition and output tables derived from a [`CodeDescriptor`]
///
/// A state holds the `K - 1` most recent register bits, with the newest bit as the MSB. Every
/// state has exactly two outgoing and two incoming transitions. The two incoming transitions of
/// a state `s` start from `(2 * s) mod 2^(K-1)` and `(2 * s + 1) mod 2^(K-1)`, and are stored
/// in that order.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Trellis {
    /// Number of output bits per transition
    num_outputs: usize,
    /// Memory length
    memory_len: usize,
    /// Next state for each state and input bit
    next_state: Vec<[usize; 2]>,
    /// Output symbol for each state and input bit
    output: Vec<[u32; 2]>,
    /// Incoming transitions for each state
    predecessors: Vec<[Branch; 2]>,
}

impl Trellis {
    /// Returns trellis of given code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is outside the supported bounds (see
    /// [`CodeDescriptor::validate`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_fec::{codes, Bit, Trellis};
    ///
    /// let trellis = Trellis::new(&codes::GSM_XCCH)?;
    /// assert_eq!(trellis.num_states(), 16);
    /// assert_eq!(trellis.next_state(0, Bit::One), 8);
    /// assert_eq!(trellis.output(0, Bit::One), 0b11);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(code: &CodeDescriptor) -> Result<Self, Error> {
        code.validate()?;
        let memory_len = code.memory_len();
        let num_states = code.num_states();
        let mut next_state = Vec::with_capacity(num_states);
        let mut output = Vec::with_capacity(num_states);
        let placeholder = Branch {
            from: 0,
            input: Bit::Zero,
            output: 0,
        };
        let mut predecessors = vec![[placeholder; 2]; num_states];
        for state in 0 .. num_states {
            let mut state_next = [0; 2];
            let mut state_output = [0; 2];
            for input in [Bit::Zero, Bit::One] {
                let register = register_contents(code, state, input);
                let sym = output_symbol(code.generators, register);
                let next = register >> 1;
                state_next[input as usize] = next;
                state_output[input as usize] = sym;
                predecessors[next][state & 1] = Branch {
                    from: state,
                    input,
                    output: sym,
                };
            }
            next_state.push(state_next);
            output.push(state_output);
        }
        debug!(
            n = code.n,
            k = code.k,
            recursive = code.is_recursive(),
            "built trellis with {num_states} states"
        );
        Ok(Self {
            num_outputs: code.n,
            memory_len,
            next_state,
            output,
            predecessors,
        })
    }

    /// Returns number of states.
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.next_state.len()
    }

    /// Returns number of output bits per transition.
    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Returns memory length.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory_len
    }

    /// Returns next state for given state and input bit.
    #[must_use]
    pub fn next_state(&self, state: usize, input: Bit) -> usize {
        self.next_state[state][input as usize]
    }

    /// Returns output symbol for given state and input bit (output bit `i` in bit position `i`).
    #[must_use]
    pub fn output(&self, state: usize, input: Bit) -> u32 {
        self.output[state][input as usize]
    }

    /// Returns the two transitions into given state.
    #[must_use]
    pub fn predecessors(&self, state: usize) -> &[Branch; 2] {
        &self.predecessors[state]
    }

    /// Returns the input bit that shifts a zero into the register from given state.
    ///
    /// This is `Zero` for a feedforward code, and the feedback parity for a recursive code.
    /// Applying it `K - 1` times drives any state to the zero state.
    #[must_use]
    pub fn flush_input(&self, state: usize) -> Bit {
        if self.next_state(state, Bit::Zero) < self.num_states() / 2 {
            Bit::Zero
        } else {
            Bit::One
        }
    }
}

/// Returns the `K`-bit register contents after shifting in the bit derived from given input.
fn register_contents(code: &CodeDescriptor, state: usize, input: Bit) -> usize {
    let shift_in = match code.feedback {
        Some(feedback) => input as usize ^ parity(feedback as usize & state),
        None => input as usize,
    };
    (shift_in << code.memory_len()) | state
}

/// Returns output symbol for given register contents.
fn output_symbol(generators: &[u32], register: usize) -> u32 {
    generators
        .iter()
        .enumerate()
        .map(|(i, &g)| (parity(g as usize & register) as u32) << i)
        .sum()
}

/// Returns XOR of bits in the binary representation of given integer.
fn parity(num: usize) -> usize {
    (num.count_ones() % 2) as usize
}

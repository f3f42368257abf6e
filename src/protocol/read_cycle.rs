//! Two-phase read cycle for the raw transport.
//!
//! The raw socket carries a continuous stream of frames with no chunk
//! markers, so the reader alternates between two phases:
//! - `Header`: exactly 3 bytes of length prefix
//! - `Payload`: exactly N bytes, N from the decoded prefix
//!
//! Each phase tolerates short reads: the driver reads into [`window`]
//! (the bytes still owed) and reports how many arrived via [`advance`],
//! repeating until the phase is satisfied. Keeping the state machine free
//! of I/O makes the owed-bytes invariant testable in isolation.
//!
//! [`window`]: ReadCycle::window
//! [`advance`]: ReadCycle::advance

use bytes::Bytes;

use super::wire_format::{decode_length, LENGTH_SIZE};

/// Outcome of feeding bytes into the cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// The current phase still owes bytes; read into `window()` again.
    Continue,
    /// A frame completed; the cycle has re-armed for the next header.
    Message(Bytes),
    /// The decoded length was zero or negative. The cycle is dead: no
    /// further read is scheduled and no error is raised.
    Abandon,
}

#[derive(Debug)]
enum Phase {
    Header { buf: [u8; LENGTH_SIZE], filled: usize },
    Payload { buf: Vec<u8>, filled: usize },
}

/// Self-resuming header/payload state machine.
#[derive(Debug)]
pub struct ReadCycle {
    phase: Phase,
}

impl ReadCycle {
    /// Create a cycle armed for its first header read.
    pub fn new() -> Self {
        Self {
            phase: Phase::Header { buf: [0; LENGTH_SIZE], filled: 0 },
        }
    }

    /// True when the cycle sits at a frame boundary (header phase, nothing
    /// read yet). The driver checks the session state here before arming
    /// the next read.
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Header { filled: 0, .. })
    }

    /// The slice still owed to the current phase. Never empty.
    pub fn window(&mut self) -> &mut [u8] {
        match &mut self.phase {
            Phase::Header { buf, filled } => &mut buf[*filled..],
            Phase::Payload { buf, filled } => &mut buf[*filled..],
        }
    }

    /// Record that `n` bytes arrived into the window.
    pub fn advance(&mut self, n: usize) -> Step {
        match &mut self.phase {
            Phase::Header { buf, filled } => {
                *filled += n;
                if *filled < LENGTH_SIZE {
                    return Step::Continue;
                }

                let length = decode_length(buf);
                if length <= 0 {
                    return Step::Abandon;
                }

                self.phase = Phase::Payload {
                    buf: vec![0; length as usize],
                    filled: 0,
                };
                Step::Continue
            }
            Phase::Payload { buf, filled } => {
                *filled += n;
                if *filled < buf.len() {
                    return Step::Continue;
                }

                let payload = Bytes::from(std::mem::take(buf));
                self.phase = Phase::Header { buf: [0; LENGTH_SIZE], filled: 0 };
                Step::Message(payload)
            }
        }
    }
}

impl Default for ReadCycle {
    fn default() -> Self {
        Self::new()
    }
}

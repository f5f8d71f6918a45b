//! Sliding-window sequence-number bookkeeping for outstanding I-frames.
//!
//! This is the "k-buffer": a bounded, ordered record of I-frames this endpoint has
//! sent but which the peer has not yet acknowledged. Acknowledgement arrives as the
//! `N_R` field piggybacked on any I-frame or carried by an S-frame.

use std::time::Instant;

const SEQ_MODULUS: i32 = 32768;

/// One sent-but-unacknowledged I-frame.
#[derive(Debug, Clone, Copy)]
struct SentRecord {
    seq_no: u16,
    sent_at: Instant,
}

/// Outcome of checking a received `N_R` against the k-buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// `N_R` acknowledged zero or more outstanding frames; the buffer has been
    /// updated accordingly (or nothing happened, for the no-op re-acknowledge case).
    Accepted,
    /// `N_R` does not correspond to anything this endpoint could plausibly have sent;
    /// the connection must be closed.
    OutOfRange,
}

/// Fixed-capacity, FIFO record of outstanding I-frames, keyed by send sequence number.
///
/// Backed by a `VecDeque` rather than a hand-rolled ring with explicit head/tail
/// indices: the deque's own emptiness already encodes what the wire-level spec
/// calls the `oldest = -1` sentinel, so there is no separate sentinel to maintain.
#[derive(Debug)]
pub struct KBuffer {
    capacity: usize,
    records: std::collections::VecDeque<SentRecord>,
}

impl KBuffer {
    /// Create an empty buffer with the given capacity (the APCI `k` parameter).
    pub fn new(capacity: u16) -> Self {
        Self {
            capacity: capacity as usize,
            records: std::collections::VecDeque::with_capacity(capacity as usize),
        }
    }

    /// True if no further I-frame may be sent without first receiving an acknowledgement.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Number of outstanding unacknowledged I-frames.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no I-frame is currently outstanding.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record that an I-frame carrying `seq_no` was just sent at `now`.
    ///
    /// Callers must check [`KBuffer::is_full`] first; this never evicts to make room.
    pub fn append(&mut self, seq_no: u16, now: Instant) {
        self.records.push_back(SentRecord { seq_no, sent_at: now });
    }

    /// Time the oldest outstanding I-frame was sent, if any are outstanding.
    pub fn oldest_sent_time(&self) -> Option<Instant> {
        self.records.front().map(|r| r.sent_at)
    }

    /// Apply a received `N_R`, given the endpoint's current send counter.
    ///
    /// On [`SeqCheck::Accepted`], every outstanding record up to and including
    /// `n_r` has been removed from the buffer.
    pub fn confirm(&mut self, n_r: u16, send_count: u16) -> SeqCheck {
        let Some(oldest_seq) = self.records.front().map(|r| r.seq_no) else {
            return if n_r == send_count { SeqCheck::Accepted } else { SeqCheck::OutOfRange };
        };
        let newest_seq = self.records.back().expect("non-empty").seq_no;

        // The sequence number immediately preceding the oldest outstanding frame:
        // re-acknowledging it is a no-op, not an error (the peer may repeat an ack).
        let oldest_valid = mod_sub_one(oldest_seq);
        if n_r == oldest_valid {
            return SeqCheck::Accepted;
        }

        let span = mod_diff(newest_seq, oldest_seq);
        let offset = mod_diff(n_r, oldest_seq);
        if offset > span {
            return SeqCheck::OutOfRange;
        }

        while let Some(front) = self.records.pop_front() {
            if front.seq_no == n_r {
                break;
            }
        }
        SeqCheck::Accepted
    }
}

fn mod_diff(a: u16, b: u16) -> u16 {
    (((a as i32) - (b as i32)).rem_euclid(SEQ_MODULUS)) as u16
}

fn mod_sub_one(seq: u16) -> u16 {
    if seq == 0 {
        32767
    } else {
        seq - 1
    }
}

/// Advance a 15-bit sequence counter by one, wrapping at 32768.
pub fn seq_next(seq: u16) -> u16 {
    (seq + 1) % 32768
}

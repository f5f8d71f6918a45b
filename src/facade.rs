//! Master-Connection façade: the handle passed to every installed handler.
//!
//! The façade holds a non-owning relation to the connection's shared state — it is
//! cheap to clone and safe to retain across an `await` inside a handler, since the
//! connection worker joins all in-flight handler invocations before tearing down.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::{Sink, SinkExt};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::{ApciParameters, AppLayerParameters};
use crate::error::{Iec104Error, Result};
use crate::link::{KBuffer, SeqCheck};
use crate::types::{Asdu, Cot, UFunction};
use crate::{codec::Apdu, link};

pub(crate) struct SharedState {
    pub(crate) send_count: u16,
    pub(crate) receive_count: u16,
    pub(crate) unconfirmed_rx: u16,
    pub(crate) t2_triggered: bool,
    pub(crate) waiting_for_testfr_con: bool,
    pub(crate) k_buffer: KBuffer,
    pub(crate) apci: ApciParameters,
    pub(crate) app_layer: AppLayerParameters,
    pub(crate) t3_deadline: Instant,
    pub(crate) testfr_con_deadline: Option<Instant>,
    pub(crate) last_confirmation_time: Instant,
    sink: Pin<Box<dyn Sink<Apdu, Error = Iec104Error> + Send>>,
}

impl SharedState {
    pub(crate) fn new(
        apci: ApciParameters,
        app_layer: AppLayerParameters,
        sink: Pin<Box<dyn Sink<Apdu, Error = Iec104Error> + Send>>,
    ) -> Self {
        let now = Instant::now();
        Self {
            send_count: 0,
            receive_count: 0,
            unconfirmed_rx: 0,
            t2_triggered: false,
            waiting_for_testfr_con: false,
            k_buffer: KBuffer::new(apci.k),
            t3_deadline: now + apci.t3_duration(),
            testfr_con_deadline: None,
            last_confirmation_time: now,
            apci,
            app_layer,
            sink,
        }
    }

    pub(crate) async fn write_apdu(&mut self, apdu: Apdu) -> Result<()> {
        self.sink.send(apdu).await
    }

    /// Reset t3 relative to `now`. Built on `Instant`, which is monotonic, so the
    /// wall-clock-jump guard the standard describes for a real-time clock has no
    /// counterpart to re-implement here.
    fn reset_t3(&mut self, now: Instant) {
        self.t3_deadline = now + self.apci.t3_duration();
    }

    fn flush_pending_ack(&mut self, now: Instant) {
        self.unconfirmed_rx = 0;
        self.t2_triggered = false;
        self.last_confirmation_time = now;
    }
}

/// The outward surface through which handlers interact with the connection:
/// sending ASDUs, building confirmations, and querying the peer.
///
/// Cloning a `MasterConnection` is cheap; every clone refers to the same
/// underlying connection.
#[derive(Clone)]
pub struct MasterConnection {
    pub(crate) shared: Arc<AsyncMutex<SharedState>>,
    pub(crate) closed: Arc<AtomicBool>,
    pub(crate) peer_addr: SocketAddr,
}

impl MasterConnection {
    pub(crate) fn new(shared: Arc<AsyncMutex<SharedState>>, closed: Arc<AtomicBool>, peer_addr: SocketAddr) -> Self {
        Self { shared, closed, peer_addr }
    }

    /// True if another I-frame may be sent without exceeding the `k` window.
    pub async fn is_ready(&self) -> bool {
        !self.shared.lock().await.k_buffer.is_full()
    }

    /// Send an ASDU as an I-frame. Returns `false` if the outstanding-frame
    /// window is full (the caller should retry later); never blocks waiting
    /// for room.
    pub async fn send_asdu(&self, asdu: &Asdu) -> Result<bool> {
        let mut state = self.shared.lock().await;
        if state.k_buffer.is_full() {
            return Ok(false);
        }
        let send_seq = state.send_count;
        let recv_seq = state.receive_count;
        let apdu = Apdu::i_frame(send_seq, recv_seq, asdu.clone());
        state.write_apdu(apdu).await?;

        // Store the sequence number actually stamped on the wire (pre-increment),
        // not the counter's post-increment value.
        state.k_buffer.append(send_seq, Instant::now());
        state.send_count = link::seq_next(send_seq);
        state.unconfirmed_rx = 0;
        state.t2_triggered = false;
        Ok(true)
    }

    /// Send `asdu` with its cause of transmission overridden to
    /// `ACTIVATION_CONFIRM` and the negative flag set as given.
    pub async fn send_act_con(&self, mut asdu: Asdu, negative: bool) -> Result<bool> {
        asdu.header.cot = Cot::ActivationConfirm;
        asdu.header.negative = negative;
        self.send_asdu(&asdu).await
    }

    /// Send `asdu` with its cause of transmission overridden to
    /// `ACTIVATION_TERMINATION`.
    pub async fn send_act_term(&self, mut asdu: Asdu) -> Result<bool> {
        asdu.header.cot = Cot::ActivationTermination;
        asdu.header.negative = false;
        self.send_asdu(&asdu).await
    }

    /// Request that the connection worker tear the link down at its next iteration.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// The address of the connected peer.
    pub fn peer_address(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The application-layer field widths negotiated for this connection.
    pub async fn application_layer_parameters(&self) -> AppLayerParameters {
        self.shared.lock().await.app_layer
    }

    /// The APCI parameters (k, w, timers) governing this connection.
    pub async fn apci_parameters(&self) -> ApciParameters {
        self.shared.lock().await.apci
    }

    /// Process a received I-frame's sequence numbers, dispatch being the caller's
    /// responsibility once this returns `Ok`.
    pub(crate) async fn on_i_frame(&self, send_seq: u16, recv_seq: u16) -> Result<()> {
        let now = Instant::now();
        let mut state = self.shared.lock().await;
        if send_seq != state.receive_count {
            return Err(Iec104Error::SequenceMismatch { expected: state.receive_count, actual: send_seq });
        }
        let send_count = state.send_count;
        if state.k_buffer.confirm(recv_seq, send_count) == SeqCheck::OutOfRange {
            return Err(Iec104Error::SequenceMismatch { expected: send_count, actual: recv_seq });
        }
        if !state.t2_triggered {
            state.t2_triggered = true;
            state.last_confirmation_time = now;
        }
        state.receive_count = link::seq_next(state.receive_count);
        state.unconfirmed_rx += 1;
        state.reset_t3(now);
        Ok(())
    }

    /// Process a received S-frame's acknowledgement.
    pub(crate) async fn on_s_frame(&self, recv_seq: u16) -> Result<()> {
        let now = Instant::now();
        let mut state = self.shared.lock().await;
        let send_count = state.send_count;
        if state.k_buffer.confirm(recv_seq, send_count) == SeqCheck::OutOfRange {
            return Err(Iec104Error::SequenceMismatch { expected: send_count, actual: recv_seq });
        }
        state.reset_t3(now);
        Ok(())
    }

    /// Answer a received TESTFR_ACT with TESTFR_CON.
    pub(crate) async fn on_testfr_act(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.shared.lock().await;
        state.write_apdu(Apdu::u_frame(UFunction::TestFrCon)).await?;
        state.reset_t3(now);
        Ok(())
    }

    /// Answer a received STARTDT_ACT with STARTDT_CON. This connection never
    /// originates STARTDT itself; it only ever answers the peer's.
    pub(crate) async fn on_startdt_act(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.shared.lock().await;
        state.write_apdu(Apdu::u_frame(UFunction::StartDtCon)).await?;
        state.reset_t3(now);
        Ok(())
    }

    /// Answer a received STOPDT_ACT: flush any pending acknowledgement, then
    /// confirm. Idempotent — repeated STOPDT_ACT frames are each answered in turn.
    pub(crate) async fn on_stopdt_act(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.shared.lock().await;
        if state.unconfirmed_rx > 0 {
            let recv_seq = state.receive_count;
            state.write_apdu(Apdu::s_frame(recv_seq)).await?;
        }
        state.flush_pending_ack(now);
        state.write_apdu(Apdu::u_frame(UFunction::StopDtCon)).await?;
        state.reset_t3(now);
        Ok(())
    }

    /// Ignore an unrecognized U-frame control pattern, resetting t3 as if a
    /// valid frame had been received.
    pub(crate) async fn on_unknown_uframe(&self) {
        let now = Instant::now();
        let mut state = self.shared.lock().await;
        state.reset_t3(now);
    }

    /// Clear the "waiting for TESTFR_CON" flag on receiving it.
    pub(crate) async fn on_testfr_con(&self) {
        let now = Instant::now();
        let mut state = self.shared.lock().await;
        state.waiting_for_testfr_con = false;
        state.testfr_con_deadline = None;
        state.reset_t3(now);
    }

    /// Evaluate t1/t2/t3/w timer policy. Returns `Err` when t1 has expired, which
    /// is fatal and means the caller must close the connection.
    pub(crate) async fn check_timers(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.shared.lock().await;

        if state.waiting_for_testfr_con {
            if let Some(deadline) = state.testfr_con_deadline {
                if now >= deadline {
                    return Err(Iec104Error::T1Timeout);
                }
            }
        } else if now >= state.t3_deadline {
            state.write_apdu(Apdu::u_frame(UFunction::TestFrAct)).await?;
            state.waiting_for_testfr_con = true;
            state.testfr_con_deadline = Some(now + state.apci.t1_duration());
        }

        if let Some(oldest) = state.k_buffer.oldest_sent_time() {
            if now.duration_since(oldest) >= state.apci.t1_duration() {
                return Err(Iec104Error::T1Timeout);
            }
        }

        let ack_due_by_t2 = state.t2_triggered && now.duration_since(state.last_confirmation_time) >= state.apci.t2_duration();
        let ack_due_by_w = state.unconfirmed_rx >= state.apci.w;
        if ack_due_by_t2 || ack_due_by_w {
            let recv_seq = state.receive_count;
            state.write_apdu(Apdu::s_frame(recv_seq)).await?;
            state.flush_pending_ack(now);
        }

        Ok(())
    }
}

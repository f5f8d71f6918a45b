//! ASDU dispatch: routes an inbound application message to the handler installed
//! for its (TypeID, COT) pair and synthesizes the negative/confirmation replies
//! the standard requires when no handler claims the message.

use crate::error::{Iec104Error, Result};
use crate::facade::MasterConnection;
use crate::types::{Asdu, Cot, Cp56Time2a, Ioa, TypeId};

/// Direction of a raw byte block passed to the raw-message observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes written to the peer.
    Sent,
    /// Bytes read from the peer.
    Received,
}

type InterrogationHandler = dyn Fn(&MasterConnection, u8) -> bool + Send + Sync;
type CounterInterrogationHandler = dyn Fn(&MasterConnection, u8) -> bool + Send + Sync;
type ReadHandler = dyn Fn(&MasterConnection, Ioa) -> bool + Send + Sync;
type ClockSyncHandler = dyn Fn(&MasterConnection, Cp56Time2a) -> bool + Send + Sync;
type ResetProcessHandler = dyn Fn(&MasterConnection, u8) -> bool + Send + Sync;
type DelayAcquisitionHandler = dyn Fn(&MasterConnection, u16) -> bool + Send + Sync;
type AsduHandler = dyn Fn(&MasterConnection, &Asdu) -> bool + Send + Sync;
type RawMessageHandler = dyn Fn(Direction, &[u8]) + Send + Sync;

/// The full set of callbacks a proxy-slave connection may have installed.
///
/// Every slot is optional; an uninstalled handler behaves as if it declined the
/// message (see [`dispatch`]).
#[derive(Default)]
pub struct HandlerTable {
    interrogation: Option<Box<InterrogationHandler>>,
    counter_interrogation: Option<Box<CounterInterrogationHandler>>,
    read: Option<Box<ReadHandler>>,
    clock_sync: Option<Box<ClockSyncHandler>>,
    reset_process: Option<Box<ResetProcessHandler>>,
    delay_acquisition: Option<Box<DelayAcquisitionHandler>>,
    asdu: Option<Box<AsduHandler>>,
    raw_message: Option<Box<RawMessageHandler>>,
}

impl HandlerTable {
    /// Create an empty handler table; every ASDU will be answered negatively
    /// until handlers are installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the interrogation (C_IC_NA_1) handler.
    pub fn with_interrogation(
        mut self,
        handler: impl Fn(&MasterConnection, u8) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.interrogation = Some(Box::new(handler));
        self
    }

    /// Install the counter-interrogation (C_CI_NA_1) handler.
    pub fn with_counter_interrogation(
        mut self,
        handler: impl Fn(&MasterConnection, u8) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.counter_interrogation = Some(Box::new(handler));
        self
    }

    /// Install the read (C_RD_NA_1) handler.
    pub fn with_read(
        mut self,
        handler: impl Fn(&MasterConnection, Ioa) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.read = Some(Box::new(handler));
        self
    }

    /// Install the clock-synchronization (C_CS_NA_1) handler. Returning `true`
    /// causes the dispatcher to echo the time back with a positive confirmation.
    pub fn with_clock_sync(
        mut self,
        handler: impl Fn(&MasterConnection, Cp56Time2a) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.clock_sync = Some(Box::new(handler));
        self
    }

    /// Install the reset-process (C_RP_NA_1) handler.
    pub fn with_reset_process(
        mut self,
        handler: impl Fn(&MasterConnection, u8) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.reset_process = Some(Box::new(handler));
        self
    }

    /// Install the delay-acquisition (C_CD_NA_1) handler.
    pub fn with_delay_acquisition(
        mut self,
        handler: impl Fn(&MasterConnection, u16) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.delay_acquisition = Some(Box::new(handler));
        self
    }

    /// Install the catch-all ASDU handler, invoked for any type ID not covered
    /// by one of the specific handlers above.
    pub fn with_asdu_handler(
        mut self,
        handler: impl Fn(&MasterConnection, &Asdu) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.asdu = Some(Box::new(handler));
        self
    }

    /// Install a raw-message observer, called for every byte block sent or received.
    pub fn with_raw_message_observer(
        mut self,
        handler: impl Fn(Direction, &[u8]) + Send + Sync + 'static,
    ) -> Self {
        self.raw_message = Some(Box::new(handler));
        self
    }

    pub(crate) fn observe_raw(&self, direction: Direction, bytes: &[u8]) {
        if let Some(observer) = &self.raw_message {
            observer(direction, bytes);
        }
    }
}

/// Dispatch a received ASDU, returning a reply ASDU when the protocol requires one
/// to be sent back immediately (negative responses and the built-in test/clock-sync
/// echoes). Handlers that own a multi-step exchange (interrogation, counter
/// interrogation) are expected to send their own ACT_CON / ACT_TERM through the
/// façade and therefore produce no direct reply here.
///
/// Returns `Err` when a mandatory information object can't be extracted from the
/// payload (corrupt frame) — this is connection-fatal, not a per-ASDU rejection,
/// and the caller must close the connection rather than send a reply.
pub fn dispatch(asdu: &Asdu, handlers: &HandlerTable, conn: &MasterConnection) -> Result<Option<Asdu>> {
    let cot = asdu.header.cot;
    match asdu.header.type_id {
        TypeId::InterrogationCommand => {
            if !matches!(cot, Cot::Activation | Cot::Deactivation) {
                return Ok(Some(negative_response(asdu, Cot::UnknownCot)));
            }
            let qoi = extract_byte(asdu, "QOI")?;
            Ok(match &handlers.interrogation {
                Some(h) if h(conn, qoi) => None,
                _ => Some(negative_response(asdu, Cot::UnknownCot)),
            })
        }
        TypeId::CounterInterrogation => {
            if !matches!(cot, Cot::Activation | Cot::Deactivation) {
                return Ok(Some(negative_response(asdu, Cot::UnknownCot)));
            }
            let qcc = extract_byte(asdu, "QCC")?;
            Ok(match &handlers.counter_interrogation {
                Some(h) if h(conn, qcc) => None,
                _ => Some(negative_response(asdu, Cot::UnknownCot)),
            })
        }
        TypeId::ReadCommand => {
            if cot != Cot::Request {
                return Ok(Some(negative_response(asdu, Cot::UnknownCot)));
            }
            let ioa = Ioa::try_from_slice(&asdu.raw_data)
                .ok_or_else(|| Iec104Error::decode_static("read command missing IOA"))?;
            Ok(match &handlers.read {
                Some(h) if h(conn, ioa) => None,
                _ => Some(negative_response(asdu, Cot::UnknownCot)),
            })
        }
        TypeId::ClockSync => {
            if cot != Cot::Activation {
                return Ok(Some(negative_response(asdu, Cot::UnknownCot)));
            }
            // Information object is IOA (3 bytes) followed by CP56Time2a (7 bytes).
            let time = asdu
                .raw_data
                .get(3..10)
                .ok_or_else(|| Iec104Error::decode_static("clock sync missing CP56Time2a"))?;
            let time = Cp56Time2a::from_bytes(time)
                .map_err(|_| Iec104Error::decode_static("clock sync has malformed CP56Time2a"))?;
            Ok(match &handlers.clock_sync {
                Some(h) if h(conn, time) => Some(confirm_response(asdu, Cot::ActivationConfirm, false)),
                Some(_) => Some(confirm_response(asdu, Cot::ActivationConfirm, true)),
                None => Some(negative_response(asdu, Cot::UnknownCot)),
            })
        }
        TypeId::TestCommand | TypeId::TestCommandTime56 => {
            if cot != Cot::Activation {
                return Ok(Some(negative_response(asdu, Cot::UnknownCot)));
            }
            Ok(Some(confirm_response(asdu, Cot::ActivationConfirm, false)))
        }
        TypeId::ResetProcess => {
            if cot != Cot::Activation {
                return Ok(Some(negative_response(asdu, Cot::UnknownCot)));
            }
            let qrp = extract_byte(asdu, "QRP")?;
            Ok(match &handlers.reset_process {
                Some(h) if h(conn, qrp) => None,
                _ => Some(negative_response(asdu, Cot::UnknownCot)),
            })
        }
        TypeId::DelayAcquisition => {
            if !matches!(cot, Cot::Activation | Cot::Spontaneous) {
                return Ok(Some(negative_response(asdu, Cot::UnknownCot)));
            }
            let delay = asdu
                .raw_data
                .get(0..2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .ok_or_else(|| Iec104Error::decode_static("delay acquisition missing delay value"))?;
            Ok(match &handlers.delay_acquisition {
                Some(h) if h(conn, delay) => None,
                _ => Some(negative_response(asdu, Cot::UnknownCot)),
            })
        }
        _ => Ok(match &handlers.asdu {
            Some(h) if h(conn, asdu) => None,
            _ => Some(negative_response(asdu, Cot::UnknownTypeId)),
        }),
    }
}

fn extract_byte(asdu: &Asdu, field: &'static str) -> Result<u8> {
    asdu.raw_data
        .first()
        .copied()
        .ok_or_else(|| Iec104Error::decode(format!("missing mandatory {field} byte")))
}

fn negative_response(original: &Asdu, cot: Cot) -> Asdu {
    let mut header = original.header.clone();
    header.cot = cot;
    header.negative = true;
    Asdu {
        header,
        objects: original.objects.clone(),
        raw_data: original.raw_data.clone(),
    }
}

fn confirm_response(original: &Asdu, cot: Cot, negative: bool) -> Asdu {
    let mut header = original.header.clone();
    header.cot = cot;
    header.negative = negative;
    Asdu {
        header,
        objects: original.objects.clone(),
        raw_data: original.raw_data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AsduHeader;
    use bytes::Bytes;

    fn asdu(type_id: TypeId, cot: Cot, raw: &[u8]) -> Asdu {
        Asdu {
            header: AsduHeader::new(type_id, 1, cot, 1),
            objects: Vec::new(),
            raw_data: Bytes::copy_from_slice(raw),
        }
    }

    #[test]
    fn test_interrogation_without_handler_is_negative() {
        let handlers = HandlerTable::new();
        let a = asdu(TypeId::InterrogationCommand, Cot::Activation, &[20]);
        let conn = MasterConnection::for_test();
        let reply = dispatch(&a, &handlers, &conn)
            .unwrap()
            .expect("negative reply expected");
        assert_eq!(reply.header.cot, Cot::UnknownCot);
        assert!(reply.header.negative);
    }

    #[test]
    fn test_interrogation_with_handler_claims_and_sends_nothing_directly() {
        let handlers = HandlerTable::new().with_interrogation(|_conn, qoi| {
            assert_eq!(qoi, 20);
            true
        });
        let a = asdu(TypeId::InterrogationCommand, Cot::Activation, &[20]);
        let conn = MasterConnection::for_test();
        assert!(dispatch(&a, &handlers, &conn).unwrap().is_none());
    }

    #[test]
    fn test_interrogation_bad_cot_is_negative() {
        let handlers = HandlerTable::new().with_interrogation(|_, _| true);
        let a = asdu(TypeId::InterrogationCommand, Cot::Spontaneous, &[20]);
        let conn = MasterConnection::for_test();
        let reply = dispatch(&a, &handlers, &conn).unwrap().unwrap();
        assert_eq!(reply.header.cot, Cot::UnknownCot);
    }

    #[test]
    fn test_interrogation_missing_qoi_byte_is_fatal_decode_error() {
        let handlers = HandlerTable::new().with_interrogation(|_, _| true);
        let a = asdu(TypeId::InterrogationCommand, Cot::Activation, &[]);
        let conn = MasterConnection::for_test();
        assert!(matches!(
            dispatch(&a, &handlers, &conn),
            Err(Iec104Error::DecodeError(_))
        ));
    }

    #[test]
    fn test_test_command_echoes_activation_confirm() {
        let handlers = HandlerTable::new();
        let a = asdu(TypeId::TestCommand, Cot::Activation, &[0xAA, 0x55]);
        let conn = MasterConnection::for_test();
        let reply = dispatch(&a, &handlers, &conn).unwrap().unwrap();
        assert_eq!(reply.header.cot, Cot::ActivationConfirm);
        assert!(!reply.header.negative);
        assert_eq!(reply.raw_data.as_ref(), &[0xAA, 0x55]);
    }

    #[test]
    fn test_clock_sync_accepted() {
        let handlers = HandlerTable::new().with_clock_sync(|_conn, _time| true);
        let time = Cp56Time2a {
            milliseconds: 0,
            minutes: 30,
            hours: 12,
            day: 1,
            day_of_week: 1,
            month: 1,
            year: 26,
            invalid: false,
            summer_time: false,
        };
        let mut raw = Ioa::new(0).to_bytes().to_vec();
        raw.extend_from_slice(&time.to_bytes());
        let a = asdu(TypeId::ClockSync, Cot::Activation, &raw);
        let conn = MasterConnection::for_test();
        let reply = dispatch(&a, &handlers, &conn).unwrap().unwrap();
        assert_eq!(reply.header.cot, Cot::ActivationConfirm);
        assert!(!reply.header.negative);
    }

    #[test]
    fn test_clock_sync_declined_is_negative_confirm() {
        let handlers = HandlerTable::new().with_clock_sync(|_, _| false);
        let time = Cp56Time2a {
            milliseconds: 0,
            minutes: 0,
            hours: 0,
            day: 1,
            day_of_week: 1,
            month: 1,
            year: 26,
            invalid: false,
            summer_time: false,
        };
        let mut raw = Ioa::new(0).to_bytes().to_vec();
        raw.extend_from_slice(&time.to_bytes());
        let a = asdu(TypeId::ClockSync, Cot::Activation, &raw);
        let conn = MasterConnection::for_test();
        let reply = dispatch(&a, &handlers, &conn).unwrap().unwrap();
        assert_eq!(reply.header.cot, Cot::ActivationConfirm);
        assert!(reply.header.negative);
    }

    #[test]
    fn test_clock_sync_missing_time_is_fatal_decode_error() {
        let handlers = HandlerTable::new().with_clock_sync(|_, _| true);
        let a = asdu(TypeId::ClockSync, Cot::Activation, &Ioa::new(0).to_bytes());
        let conn = MasterConnection::for_test();
        assert!(matches!(
            dispatch(&a, &handlers, &conn),
            Err(Iec104Error::DecodeError(_))
        ));
    }

    #[test]
    fn test_unknown_type_without_catch_all_is_unknown_type_id() {
        let handlers = HandlerTable::new();
        let a = asdu(TypeId::SinglePoint, Cot::Spontaneous, &[]);
        let conn = MasterConnection::for_test();
        let reply = dispatch(&a, &handlers, &conn).unwrap().unwrap();
        assert_eq!(reply.header.cot, Cot::UnknownTypeId);
        assert!(reply.header.negative);
    }

    #[test]
    fn test_catch_all_handler_claims_unknown_type() {
        let handlers = HandlerTable::new().with_asdu_handler(|_, _| true);
        let a = asdu(TypeId::SinglePoint, Cot::Spontaneous, &[]);
        let conn = MasterConnection::for_test();
        assert!(dispatch(&a, &handlers, &conn).unwrap().is_none());
    }

    #[test]
    fn test_delay_acquisition_claims_and_decodes_delay() {
        let handlers = HandlerTable::new().with_delay_acquisition(|_conn, delay| {
            assert_eq!(delay, 500);
            true
        });
        let a = asdu(TypeId::DelayAcquisition, Cot::Activation, &500u16.to_le_bytes());
        let conn = MasterConnection::for_test();
        assert!(dispatch(&a, &handlers, &conn).unwrap().is_none());
    }

    #[test]
    fn test_read_command_missing_ioa_is_fatal_decode_error() {
        let handlers = HandlerTable::new().with_read(|_, _| true);
        let a = asdu(TypeId::ReadCommand, Cot::Request, &[]);
        let conn = MasterConnection::for_test();
        assert!(matches!(
            dispatch(&a, &handlers, &conn),
            Err(Iec104Error::DecodeError(_))
        ));
    }

    #[test]
    fn test_delay_acquisition_missing_value_is_fatal_decode_error() {
        let handlers = HandlerTable::new().with_delay_acquisition(|_, _| true);
        let a = asdu(TypeId::DelayAcquisition, Cot::Activation, &[0x01]);
        let conn = MasterConnection::for_test();
        assert!(matches!(
            dispatch(&a, &handlers, &conn),
            Err(Iec104Error::DecodeError(_))
        ));
    }
}

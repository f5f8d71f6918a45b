//! # iec104_proxy
//!
//! IEC 60870-5-104 proxy-slave protocol engine for Rust.
//!
//! This crate dials out to a peer over TCP (optionally TLS) and then behaves as
//! the *controlled station* side of the protocol dialogue: it answers STARTDT/
//! STOPDT/TESTFR, maintains the sliding-window sequence-number accounting, and
//! dispatches inbound commands (interrogation, clock sync, read, reset process,
//! delay acquisition, ...) to callbacks the application installs. It never
//! originates STARTDT or STOPDT itself.
//!
//! ## Features
//!
//! - **Proxy-slave dialogue**: answers the controlling station's link requests
//! - **Sliding-window accounting**: bounded k-buffer of unacknowledged I-frames
//! - **Handler table**: one callback per command type, plus a raw-message observer
//! - **Standard timeouts**: T0, T1, T2, T3, K, W parameters
//! - **Type safe**: strong typing for TypeID, COT, IOA
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use iec104_proxy::{HandlerTable, ProxyConfig, ProxyConnection};
//!
//! #[tokio::main]
//! async fn main() -> iec104_proxy::Result<()> {
//!     let handlers = HandlerTable::new()
//!         .with_interrogation(|conn, _qoi| {
//!             let conn = conn.clone();
//!             tokio::spawn(async move {
//!                 // send one or more spontaneous ASDUs, then ACT_TERM
//!             });
//!             true
//!         })
//!         .with_clock_sync(|_conn, _time| true);
//!
//!     let (connection, mut events) = ProxyConnection::connect(
//!         ProxyConfig::insecure("192.168.1.100"),
//!         handlers,
//!     )
//!     .await?;
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("event: {:?}", event);
//!         }
//!     });
//!
//!     connection.run().await
//! }
//! ```
//!
//! ## Protocol Overview
//!
//! IEC 60870-5-104 uses TCP/IP for communication (default port 2404).
//! The protocol defines three frame types:
//!
//! - **I-frame**: Information transfer (contains ASDU)
//! - **S-frame**: Supervisory (acknowledgment)
//! - **U-frame**: Unnumbered (control: STARTDT, STOPDT, TESTFR)
//!
//! ### APDU Structure
//!
//! ```text
//! APCI (6 bytes):
//! +--------+--------+--------+--------+--------+--------+
//! | 0x68   | Length | Control Field (4 bytes)           |
//! +--------+--------+--------+--------+--------+--------+
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod link;
#[cfg(feature = "tls")]
#[cfg_attr(docsrs, doc(cfg(feature = "tls")))]
pub mod tls;
pub mod types;

// Re-export the proxy-slave API surface.
pub use config::{ApciParameters, AppLayerParameters, ProxyConfig, TlsConfig};
pub use connection::{ByteStream, ProxyConnection, ProxyEvent};
pub use dispatcher::{Direction, HandlerTable};
pub use error::{Iec104Error, Result};
pub use facade::MasterConnection;

pub use codec::{Apdu, Iec104Codec};
pub use types::*;

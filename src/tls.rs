//! TLS transport, behind the `tls` feature.
//!
//! The link state machine never sees this module: [`connection::dial`] wraps a
//! [`TcpStream`] here and then erases the concrete type behind
//! `Box<dyn ByteStream>` before handing it to the codec.

use tokio::net::TcpStream;
use tokio_native_tls::{native_tls, TlsStream};

use crate::config::TlsConfig;
use crate::error::{Iec104Error, Result};

/// Perform the TLS handshake over an already-connected `tcp` socket, validating
/// the peer against `config.ca_certificate` and presenting a client certificate
/// when one is configured (mutual TLS).
pub async fn connect(tcp: TcpStream, config: &TlsConfig, hostname: &str) -> Result<TlsStream<TcpStream>> {
    let mut builder = native_tls::TlsConnector::builder();

    let ca_cert = native_tls::Certificate::from_pem(&config.ca_certificate)
        .map_err(|e| Iec104Error::protocol(format!("invalid CA certificate: {e}")))?;
    builder.add_root_certificate(ca_cert);

    if let (Some(cert), Some(key)) = (&config.client_certificate, &config.client_key) {
        let identity = native_tls::Identity::from_pkcs8(cert, key)
            .map_err(|e| Iec104Error::protocol(format!("invalid client identity: {e}")))?;
        builder.identity(identity);
    }

    let connector = builder
        .build()
        .map_err(|e| Iec104Error::protocol(format!("failed to build TLS connector: {e}")))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    connector
        .connect(hostname, tcp)
        .await
        .map_err(|e| Iec104Error::protocol(format!("TLS handshake failed: {e}")))
}

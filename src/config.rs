//! Connection parameters and proxy configuration.
//!
//! `ApciParameters` and `AppLayerParameters` mirror the two parameter blocks of the
//! IEC 60870-5-104 standard; `ProxyConfig` bundles them with the transport-level
//! settings needed to dial out to a peer.

use std::time::Duration;

/// APCI-layer parameters: window sizes and timer durations.
///
/// Defaults match the values recommended by the standard for TCP/IP profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApciParameters {
    /// Maximum number of outstanding (unacknowledged) I-frames.
    pub k: u16,
    /// Latest-acknowledge threshold: an S-frame is sent after this many
    /// unconfirmed received I-frames, without waiting for t2.
    pub w: u16,
    /// Connect timeout, in seconds.
    pub t0: u16,
    /// Send / test acknowledge timeout, in seconds.
    pub t1: u16,
    /// Acknowledge timeout for received I-frames with no outgoing traffic, in seconds.
    pub t2: u16,
    /// Idle connection test timeout, in seconds.
    pub t3: u16,
}

impl ApciParameters {
    /// Construct parameters, validating the relationships the standard requires
    /// between the timers and window sizes.
    pub fn new(k: u16, w: u16, t0: u16, t1: u16, t2: u16, t3: u16) -> Self {
        Self { k, w, t0, t1, t2, t3 }
    }

    /// `t1` expressed as a [`Duration`].
    pub fn t1_duration(&self) -> Duration {
        Duration::from_secs(self.t1 as u64)
    }

    /// `t2` expressed as a [`Duration`].
    pub fn t2_duration(&self) -> Duration {
        Duration::from_secs(self.t2 as u64)
    }

    /// `t3` expressed as a [`Duration`].
    pub fn t3_duration(&self) -> Duration {
        Duration::from_secs(self.t3 as u64)
    }

    /// `t0` expressed as a [`Duration`].
    pub fn t0_duration(&self) -> Duration {
        Duration::from_secs(self.t0 as u64)
    }
}

impl Default for ApciParameters {
    fn default() -> Self {
        Self { k: 12, w: 8, t0: 10, t1: 15, t2: 10, t3: 20 }
    }
}

/// Application-layer field widths, as negotiated out-of-band between peers.
///
/// The wire codec and ASDU layer both assume these defaults; the struct exists so
/// callers can document a non-default profile, not because this crate's codec
/// currently interprets anything but the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayerParameters {
    /// Size of the type identification field, in bytes. Always 1.
    pub size_of_type_id: u8,
    /// Size of the variable structure qualifier, in bytes. Always 1.
    pub size_of_vsq: u8,
    /// Size of the cause-of-transmission field, in bytes (1 or 2).
    pub size_of_cot: u8,
    /// Originator address used when none is specified by a handler.
    pub originator_address: u8,
    /// Size of the common address field, in bytes (1 or 2).
    pub size_of_ca: u8,
    /// Size of the information object address, in bytes (1, 2 or 3).
    pub size_of_ioa: u8,
    /// Maximum ASDU size, in bytes.
    pub max_size_of_asdu: u8,
}

impl Default for AppLayerParameters {
    fn default() -> Self {
        Self {
            size_of_type_id: 1,
            size_of_vsq: 1,
            size_of_cot: 2,
            originator_address: 0,
            size_of_ca: 2,
            size_of_ioa: 3,
            max_size_of_asdu: 249,
        }
    }
}

/// TLS settings for the outbound connection. Opaque to the protocol core: the
/// link state machine only ever sees a byte stream, never a TLS session.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// PEM-encoded root certificate used to validate the peer.
    pub ca_certificate: Vec<u8>,
    /// PEM-encoded client certificate, for mutual TLS.
    pub client_certificate: Option<Vec<u8>>,
    /// PEM-encoded private key matching `client_certificate`.
    pub client_key: Option<Vec<u8>>,
}

/// Configuration for a proxy-slave connection: where to dial, and with which
/// protocol parameters.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub(crate) hostname: String,
    pub(crate) port: u16,
    pub(crate) tls: Option<TlsConfig>,
    pub(crate) apci: ApciParameters,
    pub(crate) app_layer: AppLayerParameters,
    pub(crate) connect_timeout: Duration,
}

impl ProxyConfig {
    /// Create a configuration dialing `hostname:port` with default parameters.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            tls: None,
            apci: ApciParameters::default(),
            app_layer: AppLayerParameters::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Create a configuration for the standard insecure port (2404).
    pub fn insecure(hostname: impl Into<String>) -> Self {
        Self::new(hostname, 2404)
    }

    /// Create a configuration for the standard TLS port (19998), with the given
    /// TLS settings.
    pub fn secure(hostname: impl Into<String>, tls: TlsConfig) -> Self {
        Self::new(hostname, 19998).with_tls(tls)
    }

    /// Override the APCI parameters.
    pub fn with_apci(mut self, apci: ApciParameters) -> Self {
        self.apci = apci;
        self
    }

    /// Override the application-layer parameters.
    pub fn with_app_layer(mut self, app_layer: AppLayerParameters) -> Self {
        self.app_layer = app_layer;
        self
    }

    /// Enable TLS with the given settings.
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Override the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The configured APCI parameters.
    pub fn apci_parameters(&self) -> ApciParameters {
        self.apci
    }

    /// The configured application-layer parameters.
    pub fn app_layer_parameters(&self) -> AppLayerParameters {
        self.app_layer
    }

    /// The dial target as a `host:port` string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

//! Read-only handshake configuration (spec §9 design note: "a read-only
//! configuration reference passed into the state machine; the state
//! machine itself should not mutate configuration"). Loading this from
//! whatever format an embedder prefers is explicitly out of scope (spec
//! §1); this module only defines the shape the state machine consumes.

use alloc::string::String;
use alloc::vec::Vec;

use crate::msgs::enums::{CipherSuite, NamedGroup, ProtocolVersion, PskKeyExchangeMode, SignatureScheme};

/// Everything the handshake core needs to know to build a ClientHello
/// and judge a ServerHello, gathered up front and never mutated for the
/// lifetime of one connection (spec §3 ownership: the state machine owns
/// ephemeral keys and transcript, but configuration is borrowed).
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Offered ciphersuites, in preference order.
    pub cipher_suites: Vec<CipherSuite>,
    /// Offered (EC)DHE groups, in preference order; the first is the one
    /// a key share is proactively generated for.
    pub supported_groups: Vec<NamedGroup>,
    /// Offered signature algorithms, in preference order.
    pub signature_schemes: Vec<SignatureScheme>,
    /// Lowest protocol version the client is willing to fall back to.
    /// TLS 1.3 is always offered regardless of this floor; this only
    /// controls whether `supported_versions` also lists 1.2 (spec §4.2).
    pub minimum_version: ProtocolVersion,
    /// PSK key-exchange modes to advertise, if any PSK is available.
    pub psk_modes: Vec<PskKeyExchangeMode>,
    /// Server name to send in `server_name` and to validate the peer
    /// certificate against.
    pub server_name: Option<String>,
    /// ALPN protocols to offer, in preference order.
    pub alpn_protocols: Vec<Vec<u8>>,
    /// `max_fragment_length` code point to request, if any (spec §4.5:
    /// echoed back verbatim or the handshake is illegal_parameter).
    pub max_fragment_length: Option<u8>,
    /// Whether to emit the legacy `[CCS_*]` padding records for
    /// middlebox compatibility (spec §4.1).
    pub middlebox_compat_mode: bool,
    /// Whether to offer 0-RTT early data when a PSK is available.
    pub enable_early_data: bool,
    /// Early application data to send if 0-RTT is offered and accepted.
    pub early_data: Vec<u8>,
    /// DER-encoded client certificate chain (leaf first), used only when
    /// the server sends a `CertificateRequest`. Empty means the client
    /// responds with an empty `Certificate` regardless of the request
    /// (spec §4.1 `CLIENT_CERTIFICATE`: "empty if not requested" also
    /// covers "requested but none configured").
    pub client_certificate_chain: Vec<pki_types::CertificateDer<'static>>,
}

impl HandshakeConfig {
    /// A config requesting TLS 1.3 with a single ECDHE group and no PSK,
    /// compat-mode on — the common case for a fresh (non-resuming)
    /// connection.
    pub fn new_ephemeral_only(
        cipher_suites: Vec<CipherSuite>,
        supported_groups: Vec<NamedGroup>,
        signature_schemes: Vec<SignatureScheme>,
    ) -> Self {
        Self {
            cipher_suites,
            supported_groups,
            signature_schemes,
            minimum_version: ProtocolVersion::TLSv1_3,
            psk_modes: Vec::new(),
            server_name: None,
            alpn_protocols: Vec::new(),
            max_fragment_length: None,
            middlebox_compat_mode: true,
            enable_early_data: false,
            early_data: Vec::new(),
            client_certificate_chain: Vec::new(),
        }
    }

    /// The first configured group that supports ECDHE, used to size the
    /// initial `key_share` (spec §4.2: "the first configured
    /// ECDHE-compatible group").
    pub fn first_ecdhe_group(&self) -> Option<NamedGroup> {
        self.supported_groups.iter().copied().find(|g| g.is_ecdhe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ecdhe_group_skips_non_ecdhe_entries() {
        let cfg = HandshakeConfig::new_ephemeral_only(
            alloc::vec![CipherSuite::Aes128GcmSha256],
            alloc::vec![NamedGroup::Ffdhe2048, NamedGroup::X25519],
            alloc::vec![SignatureScheme::Ed25519],
        );
        assert_eq!(cfg.first_ecdhe_group(), Some(NamedGroup::X25519));
    }
}

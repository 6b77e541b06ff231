//! The "Session negotiation" and "Ticket / PSK offer" data-model entities
//! (spec §3). These are plain records the state machine fills in as the
//! handshake progresses; they carry no behavior of their own beyond small
//! accessors.

use alloc::string::String;
use alloc::vec::Vec;

use crate::msgs::enums::{CipherSuite, NamedGroup, ProtocolVersion};

/// Whether the client's offered 0-RTT data was accepted, rejected, or
/// never offered (spec §4.2, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyDataStatus {
    NotOffered,
    /// Offered; primed to this until the server's EncryptedExtensions
    /// either echoes `early_data` (-> `Accepted`) or doesn't.
    Rejected,
    Accepted,
}

/// A PSK offered in, or established from, a handshake (spec §3 "Ticket /
/// PSK offer" entity).
#[derive(Debug, Clone)]
pub struct PskOffer {
    pub identity: Vec<u8>,
    pub secret: Vec<u8>,
    pub obfuscated_ticket_age_base: u32,
    pub received_at: Option<u64>,
    pub lifetime_seconds: u32,
    /// The ciphersuite this PSK is bound to (spec §3 "associated
    /// ciphersuite hash" — carried as the full suite since both the
    /// binder's hash algorithm and any 0-RTT AEAD key/IV lengths need more
    /// than just the hash width).
    pub cipher_suite: CipherSuite,
    /// `max_early_data_size` from the originating ticket's `early_data`
    /// extension; `None` if the ticket never permitted 0-RTT (spec §4.9,
    /// testable property 9).
    pub max_early_data_size: Option<u32>,
    pub is_external: bool,
}

impl PskOffer {
    /// A ticket is treated as expired, and not offered, past 7 days
    /// (spec §4.2 "Ticket age math").
    pub const MAX_TICKET_AGE_SECONDS: u64 = 7 * 24 * 60 * 60;

    /// `obfuscated_ticket_age = (now - ticket_received) + ticket_age_add`,
    /// truncated to 32 bits; zero if wall-clock is unavailable (spec
    /// §4.2). Returns `None` if the ticket has aged out.
    pub fn obfuscated_ticket_age(&self, now: Option<u64>) -> Option<u32> {
        let Some(received_at) = self.received_at else {
            return Some(0);
        };
        let Some(now) = now else {
            return Some(0);
        };
        let age = now.saturating_sub(received_at);
        if age > Self::MAX_TICKET_AGE_SECONDS {
            return None;
        }
        let age_ms = age.saturating_mul(1000) as u32;
        Some(age_ms.wrapping_add(self.obfuscated_ticket_age_base))
    }
}

/// Everything negotiated about the session so far, promoted to a
/// completed "session" once the handshake reaches `HANDSHAKE_OVER` (spec
/// §3 "Session negotiation" entity).
#[derive(Debug, Clone, Default)]
pub struct SessionNegotiation {
    pub negotiated_ciphersuite: Option<CipherSuite>,
    pub negotiated_version: Option<ProtocolVersion>,
    pub client_session_id_echo: Vec<u8>,
    pub selected_group: Option<NamedGroup>,
    pub peer_certificate_chain: Vec<pki_types::CertificateDer<'static>>,
    pub client_random: [u8; 32],
    pub server_random: [u8; 32],
    pub resumption_master_secret: Option<Vec<u8>>,
    pub server_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_older_than_seven_days_is_not_offered() {
        let psk = PskOffer {
            identity: alloc::vec![1, 2, 3],
            secret: alloc::vec![0u8; 32],
            obfuscated_ticket_age_base: 0,
            received_at: Some(0),
            lifetime_seconds: 3600,
            cipher_suite: CipherSuite::Aes128GcmSha256,
            max_early_data_size: None,
            is_external: false,
        };
        let eight_days = 8 * 24 * 60 * 60;
        assert_eq!(psk.obfuscated_ticket_age(Some(eight_days)), None);
    }

    #[test]
    fn missing_clock_yields_zero_age() {
        let psk = PskOffer {
            identity: alloc::vec![1, 2, 3],
            secret: alloc::vec![0u8; 32],
            obfuscated_ticket_age_base: 77,
            received_at: Some(0),
            lifetime_seconds: 3600,
            cipher_suite: CipherSuite::Aes128GcmSha256,
            max_early_data_size: None,
            is_external: false,
        };
        assert_eq!(psk.obfuscated_ticket_age(None), Some(0));
    }
}

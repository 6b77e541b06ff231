//! Post-handshake NewSessionTicket ingester (spec §4.9). Parsing the
//! message itself lives in [`crate::msgs::handshake::NewSessionTicketPayload`];
//! this module turns a parsed ticket into a [`PskOffer`] ready for a
//! future connection, deriving the resumption PSK via the key schedule's
//! `"resumption"` label.

use alloc::vec::Vec;

use crate::io::{Clock, HkdfOps};
use crate::key_schedule::KeySchedule;
use crate::msgs::enums::CipherSuite;
use crate::msgs::handshake::NewSessionTicketPayload;
use crate::session::PskOffer;

/// Turn one `NewSessionTicket` into a storable PSK offer. `cipher_suite`
/// is the ciphersuite negotiated on the connection the ticket arrived on,
/// needed because the resumption PSK (and any later 0-RTT keys derived
/// from it) are sized to its hash/AEAD, not to the nonce.
///
/// An older ticket is freed on replacement (spec §4.9): this function is
/// a pure conversion, so "freeing" is simply the caller dropping whatever
/// `PskOffer` it previously stored once this one replaces it.
pub fn ingest<H: HkdfOps>(
    ticket: &NewSessionTicketPayload,
    key_schedule: &KeySchedule<H>,
    clock: &impl Clock,
    cipher_suite: CipherSuite,
) -> PskOffer {
    let secret = key_schedule.resumption_psk(&ticket.nonce);
    PskOffer {
        identity: ticket.ticket.clone(),
        secret,
        obfuscated_ticket_age_base: ticket.age_add,
        received_at: clock.now(),
        lifetime_seconds: ticket.lifetime_seconds,
        cipher_suite,
        max_early_data_size: ticket.max_early_data_size(),
        is_external: false,
    }
}

/// `true` if this ticket carries a `max_early_data_size` extension,
/// which flips the stored offer's 0-RTT eligibility (spec §4.9, testable
/// property 9).
pub fn permits_early_data(ticket: &NewSessionTicketPayload) -> bool {
    ticket.max_early_data_size().is_some()
}

//! External collaborator interfaces (spec §6). Everything in this module
//! is a trait boundary, not an implementation: the record-layer codec,
//! the cryptographic primitives, X.509 validation, the PSK store, and the
//! wall clock all live outside this crate. The handshake core is generic
//! over them so it never links a concrete AEAD, curve, or certificate
//! parser.

use alloc::vec::Vec;

use crate::error::Error;
use crate::msgs::enums::{AlertDescription, HandshakeType, NamedGroup};
use crate::transform::{Epoch, Transform, TransformDirection};

/// Outcome of asking the record layer for the next handshake message.
pub enum FetchOutcome<'a> {
    /// A complete handshake message, tagged with its actual type (several
    /// states accept more than one possible next message — e.g.
    /// `CertificateRequest` is optional before `Certificate`, spec §4.1 —
    /// so the coordinator dispatches on what actually arrived).
    Message(HandshakeType, &'a [u8]),
    /// Nothing available yet; the caller should surface `want-read` and
    /// be re-driven once more data has arrived.
    WantRead,
}

/// The record-layer interface the driver consumes to move handshake
/// bytes: framing, fragmentation reassembly, and encryption under the
/// currently installed transform are all the record layer's problem, not
/// this crate's (spec §1, §6).
pub trait RecordLayer {
    /// Retrieve the next complete handshake message, or signal
    /// `want-read`. `acceptable` lists the handshake types legal in the
    /// caller's current state; the record layer returns
    /// `Err(UnexpectedMessage)` if the next message's type isn't among
    /// them, so the one lookahead this crate needs (is the optional
    /// `CertificateRequest` present?) doesn't require a separate peek
    /// interface.
    fn fetch_handshake(&mut self, acceptable: &[HandshakeType]) -> Result<FetchOutcome<'_>, Error>;

    /// Begin composing an outbound handshake message of the given type;
    /// the returned buffer is where the message body (not the handshake
    /// header) should be written.
    fn start_handshake(&mut self, ty: HandshakeType) -> &mut Vec<u8>;

    /// Finalize and transmit the message started by `start_handshake`,
    /// folding it into the transcript is the caller's responsibility, not
    /// the record layer's.
    fn finish_handshake(&mut self) -> Result<(), Error>;

    /// Send opaque application data (used for 0-RTT early data).
    fn write_application(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Emit the legacy single-byte ChangeCipherSpec record for
    /// middlebox-compatibility mode. Not transcripted (spec §6).
    fn write_ccs(&mut self) -> Result<(), Error>;

    /// Register a newly derived transform and return the epoch it was
    /// assigned. Ownership of `transform` passes to the record layer.
    fn add_key_material(&mut self, direction: TransformDirection, transform: Transform) -> Epoch;

    /// Switch the active inbound transform to the given epoch.
    fn install_inbound_transform(&mut self, epoch: Epoch);

    /// Switch the active outbound transform to the given epoch.
    fn install_outbound_transform(&mut self, epoch: Epoch);

    /// Queue a fatal alert for delivery under whichever transform is
    /// currently active outbound, best-effort (spec §7: "queues a fatal
    /// alert (if deliverable)" — a failure here must never mask the
    /// original [`Error`] that triggered it).
    fn queue_alert(&mut self, alert: AlertDescription);
}

/// An incremental hash context over one supported algorithm, used by
/// [`crate::transcript::TranscriptContext`]. A concrete implementation
/// wraps whatever hash crate the embedder has chosen; this crate never
/// names one.
pub trait TranscriptHasher: Clone {
    fn new() -> Self;
    fn update(&mut self, bytes: &[u8]);
    /// The digest over everything seen so far, without consuming the
    /// running state (the transcript keeps growing after Finished is
    /// computed, up through the post-handshake tickets).
    fn clone_finalize(&self) -> Vec<u8>;
}

/// HKDF-Extract and the TLS 1.3 HKDF-Expand-Label construction (RFC 8446
/// §7.1), and the bare hash-of-bytes primitive the key schedule needs for
/// `Derive-Secret` over an empty message transcript.
pub trait HkdfOps {
    fn hkdf_extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8>;
    fn hkdf_expand_label(&self, secret: &[u8], label: &str, context: &[u8], len: usize) -> Vec<u8>;
    fn hash_empty(&self) -> Vec<u8>;
    fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8>;
    fn hash_len(&self) -> usize;
}

/// One ECDHE group's key-generation and shared-secret derivation.
/// Distinct from [`HkdfOps`] because a deployment may support ECDHE
/// groups the embedder's HKDF crate knows nothing about (or vice versa).
pub trait EcdheOps {
    /// Generate an ephemeral key pair for `group`, returning an opaque
    /// private-key handle and the public bytes to place in `key_share`.
    fn generate(&self, group: NamedGroup) -> Result<(Vec<u8>, Vec<u8>), Error>;
    /// Compute the shared secret from our private key handle and the
    /// peer's public bytes.
    fn derive(&self, group: NamedGroup, private: &[u8], peer_public: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Signature verification (CertificateVerify, spec §4.6) and signing
/// (client CertificateVerify under post-handshake client auth, spec §4.1
/// `CLIENT_CERTIFICATE_VERIFY`). Both directions are narrow functional
/// interfaces per spec §6's `sign`/`verify` crypto primitives.
pub trait SignatureOps {
    fn verify(
        &self,
        scheme: crate::msgs::enums::SignatureScheme,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Error>;

    /// Sign `message` with the client's configured identity, if one is
    /// available. `None` means no client certificate is configured; the
    /// state machine sends an empty Certificate message in that case.
    fn sign(
        &self,
        scheme: crate::msgs::enums::SignatureScheme,
        message: &[u8],
    ) -> Result<Option<Vec<u8>>, Error>;
}

/// Cryptographically secure randomness, used for `ClientHello.random`,
/// the legacy session id, and PSK binder padding when compat mode wants
/// a non-empty echo.
pub trait Rng {
    fn fill(&self, buf: &mut [u8]);
}

/// Flags describing why a certificate chain failed validation, returned
/// by [`CertVerifier::verify_with_profile`]. Bits, not a single verdict,
/// because a chain can be simultaneously expired and signed by an
/// unknown CA; the state machine picks the most specific applicable
/// alert (spec §4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CertVerifyFlags {
    pub access_denied: bool,
    pub bad_certificate: bool,
    pub unsupported_certificate: bool,
    pub certificate_expired: bool,
    pub certificate_revoked: bool,
    pub unknown_ca: bool,
    pub certificate_unknown: bool,
}

impl CertVerifyFlags {
    pub fn is_ok(self) -> bool {
        self == CertVerifyFlags::default()
    }
}

/// X.509 parsing and chain validation (spec §6). This crate never parses
/// DER itself; it hands the raw `CertificateEntry` bytes across this
/// boundary and receives back an opaque chain handle plus, later, a
/// flags word.
pub trait CertVerifier {
    type Chain;

    fn parse_der(&self, entries: &[pki_types::CertificateDer<'static>]) -> Result<Self::Chain, Error>;

    fn verify_with_profile(
        &self,
        chain: &Self::Chain,
        server_name: &str,
    ) -> Result<CertVerifyFlags, Error>;

    /// The leaf's public key, for signature verification against
    /// CertificateVerify.
    fn leaf_public_key<'a>(&self, chain: &'a Self::Chain) -> &'a [u8];
}

/// A single offered or stored PSK (spec §6 PSK provider, §3 Ticket/PSK
/// offer entity).
#[derive(Debug, Clone)]
pub struct PskEntry {
    pub identity: Vec<u8>,
    pub secret: Vec<u8>,
    pub obfuscated_ticket_age_base: u32,
    pub received_at: Option<u64>,
    pub lifetime_seconds: u32,
    /// The ciphersuite this PSK is bound to — fixes both the transcript
    /// hash algorithm used for its binder and the AEAD key/IV lengths for
    /// any 0-RTT early-traffic keys derived from it.
    pub cipher_suite: crate::msgs::enums::CipherSuite,
    /// `max_early_data_size` from the ticket's `early_data` extension, if
    /// present; `None` means the ticket does not permit 0-RTT (spec §4.9,
    /// testable property 9).
    pub max_early_data_size: Option<u32>,
    /// Whether this PSK was provisioned out-of-band (`ext binder`) rather
    /// than derived from a `NewSessionTicket` (`res binder`) — the two
    /// binder key derivations use different labels (RFC 8446 §7.1,
    /// §4.2.11) and the client must remember which one applies to the PSK
    /// it is offering.
    pub is_external: bool,
}

/// The PSK store the client consults when building ClientHello and
/// updates when a NewSessionTicket arrives.
pub trait PskProvider {
    /// The PSK to offer in this handshake, if any.
    fn get_psk_to_offer(&self) -> Option<PskEntry>;
    /// Install a resumption PSK derived from a NewSessionTicket, or from
    /// the negotiated connection at 0-RTT-less resumption setup.
    fn set_handshake_psk(&mut self, psk: PskEntry);
    /// Drop whichever PSK is currently tracked for this connection
    /// (e.g. after a failed PSK-mode handshake, spec §4.3 mode table).
    fn remove_handshake_psk(&mut self);
}

/// The optional wall clock (spec §6: "absent ⇒ ticket_age = 0"). Seconds
/// since the Unix epoch; deliberately coarser than the embedder's native
/// time type so this crate stays independent of any particular clock
/// crate.
pub trait Clock {
    fn now(&self) -> Option<u64>;
}

/// No clock available; every ticket age comes out as zero (spec §4.2
/// "Ticket age math").
pub struct NoClock;

impl Clock for NoClock {
    fn now(&self) -> Option<u64> {
        None
    }
}

/// Bundles one concrete choice of every external collaborator (spec §6)
/// so [`crate::state::HandshakeMachine`] only ever takes a single type
/// parameter. Mirrors the crypto-provider pattern the teacher stack uses
/// for swapping primitive backends without touching the state machine.
pub trait Collaborators {
    type Record: RecordLayer;
    type Hkdf: HkdfOps;
    type Ecdhe: EcdheOps;
    type Sign: SignatureOps;
    type Cert: CertVerifier;
    type Psk: PskProvider;
    type Clock: Clock;
    type Rng: Rng;
    type Hasher: TranscriptHasher;
}

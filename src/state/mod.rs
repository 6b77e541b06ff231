//! Handshake state machine (spec §4.1): a finite set of states with an
//! explicit transition table. Each state's handler lives in its own
//! submodule (grouped by the message it produces or consumes, mirroring
//! how a single handshake driver dispatches to per-message functions
//! rather than per-message types); [`HandshakeMachine::step`] is the sole
//! entry point a driver calls.

mod certificate;
mod client_hello;
mod encrypted_extensions;
mod finished;
mod server_hello;

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::HandshakeConfig;
use crate::error::Error;
use crate::io::{Collaborators, RecordLayer};
use crate::key_schedule::KeySchedule;
use crate::msgs::enums::{CipherSuite, HandshakeType, NamedGroup, SignatureScheme};
use crate::session::{EarlyDataStatus, SessionNegotiation};
use crate::transcript::TranscriptContext;
use crate::transform::Epoch;

/// The finite set of handshake states (spec §4.1). `[CCS_*]` padding
/// states are folded into the state *before* them rather than kept as
/// separate enum variants: they emit a legacy ChangeCipherSpec byte when
/// compat mode is on and otherwise do nothing observable, so there is no
/// behavior a separate state would need to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    HelloRequest,
    ClientHello,
    EarlyAppData,
    ServerHello,
    EncryptedExtensions,
    CertificateRequest,
    ServerCertificate,
    CertificateVerify,
    ServerFinished,
    EndOfEarlyData,
    ClientCertificate,
    ClientCertificateVerify,
    ClientFinished,
    HandshakeWrapup,
    HandshakeOver,
}

/// The key-exchange mode negotiated from ServerHello's extensions-present
/// bitmask (spec §4.3 mode table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeMode {
    PskOnly,
    Ephemeral,
    PskEphemeral,
}

/// Outcome of one `step()` call (spec §4.1 driver contract).
pub enum StepResult {
    /// Made progress; call `step()` again.
    OkContinue,
    /// The record layer needs more input before this state can proceed.
    WantRead,
    /// The record layer could not yet accept the next outbound message.
    WantWrite,
    /// A post-handshake NewSessionTicket arrived; here is the resumption
    /// PSK offer derived from it (spec §4.9).
    NewSessionTicket(crate::session::PskOffer),
    /// The handshake is complete; nothing further to do.
    Done,
    /// A fatal error occurred; the driver must stop calling `step()`.
    Error(Error),
}

/// Everything the handshake state machine owns for the duration of one
/// connection (spec §3 "Handshake state" entity), parameterized over one
/// concrete bundle of external collaborators.
pub struct HandshakeMachine<C: Collaborators> {
    pub(crate) state: State,
    pub(crate) config: Arc<HandshakeConfig>,

    pub(crate) record: C::Record,
    pub(crate) ecdhe: C::Ecdhe,
    pub(crate) sign: C::Sign,
    pub(crate) cert: C::Cert,
    pub(crate) psk: C::Psk,
    pub(crate) clock: C::Clock,
    pub(crate) rng: C::Rng,

    pub(crate) transcript: TranscriptContext<C::Hasher>,
    pub(crate) key_schedule: KeySchedule<C::Hkdf>,

    pub(crate) session: SessionNegotiation,
    pub(crate) hello_retry_count: u8,
    pub(crate) offered_group: Option<NamedGroup>,
    /// Zeroized on drop — reassigned on every (re)generation and cleared
    /// at wrap-up, so the private scalar never lingers past its use (spec
    /// §5: "zeroized on success, failure, or reset").
    pub(crate) ephemeral_private: Option<zeroize::Zeroizing<Vec<u8>>>,
    pub(crate) ephemeral_public: Option<Vec<u8>>,
    pub(crate) cookie: Option<Vec<u8>>,
    pub(crate) client_session_id: Vec<u8>,
    pub(crate) negotiated_suite: Option<CipherSuite>,
    pub(crate) mode: Option<KeyExchangeMode>,
    pub(crate) client_auth_requested: bool,
    pub(crate) certificate_request_context: Vec<u8>,
    pub(crate) server_requested_sig_schemes: Vec<SignatureScheme>,
    pub(crate) early_data_status: EarlyDataStatus,
    pub(crate) psk_offer: Option<crate::session::PskOffer>,
    pub(crate) peer_cert_chain: Option<<C::Cert as crate::io::CertVerifier>::Chain>,
    pub(crate) peer_leaf_public_key: Option<Vec<u8>>,
    pub(crate) inbound_handshake_epoch: Option<Epoch>,
    pub(crate) outbound_handshake_epoch: Option<Epoch>,
    pub(crate) transcript_through_server_hello: Option<Vec<u8>>,
    pub(crate) transcript_through_server_finished: Option<Vec<u8>>,
}

/// Build the 4-byte handshake message header (type + 3-byte length) so
/// the transcript sees exactly what the record layer will frame, even
/// though [`crate::io::RecordLayer::fetch_handshake`]/`start_handshake`
/// deal only in message bodies.
pub(crate) fn handshake_header(ty: HandshakeType, body_len: usize) -> [u8; 4] {
    let len = (body_len as u32).to_be_bytes();
    [ty.to_u8(), len[1], len[2], len[3]]
}

impl<C: Collaborators> HandshakeMachine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<HandshakeConfig>,
        record: C::Record,
        hkdf: C::Hkdf,
        ecdhe: C::Ecdhe,
        sign: C::Sign,
        cert: C::Cert,
        psk: C::Psk,
        clock: C::Clock,
        rng: C::Rng,
    ) -> Self {
        Self {
            state: State::HelloRequest,
            config,
            record,
            ecdhe,
            sign,
            cert,
            psk,
            clock,
            rng,
            transcript: TranscriptContext::new(),
            key_schedule: KeySchedule::new(hkdf),
            session: SessionNegotiation::default(),
            hello_retry_count: 0,
            offered_group: None,
            ephemeral_private: None,
            ephemeral_public: None,
            cookie: None,
            client_session_id: Vec::new(),
            negotiated_suite: None,
            mode: None,
            client_auth_requested: false,
            certificate_request_context: Vec::new(),
            server_requested_sig_schemes: Vec::new(),
            early_data_status: EarlyDataStatus::NotOffered,
            psk_offer: None,
            peer_cert_chain: None,
            peer_leaf_public_key: None,
            inbound_handshake_epoch: None,
            outbound_handshake_epoch: None,
            transcript_through_server_hello: None,
            transcript_through_server_finished: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Advance the handshake by performing at most one message send or
    /// one message receive, then return (spec §4.1 driver contract).
    pub fn step(&mut self) -> StepResult {
        let result = match self.state {
            State::HelloRequest => client_hello::emit_first(self),
            State::ClientHello => client_hello::emit_client_hello(self),
            State::EarlyAppData => client_hello::emit_early_data(self),
            State::ServerHello => server_hello::handle(self),
            State::EncryptedExtensions => encrypted_extensions::handle(self),
            State::CertificateRequest => certificate::handle_certificate_request(self),
            State::ServerCertificate => certificate::handle_certificate(self),
            State::CertificateVerify => certificate::handle_certificate_verify(self),
            State::ServerFinished => finished::handle_server_finished(self),
            State::EndOfEarlyData => finished::emit_end_of_early_data(self),
            State::ClientCertificate => certificate::emit_client_certificate(self),
            State::ClientCertificateVerify => certificate::emit_client_certificate_verify(self),
            State::ClientFinished => finished::emit_client_finished(self),
            State::HandshakeWrapup => finished::wrap_up(self),
            State::HandshakeOver => finished::poll_post_handshake(self),
        };
        match result {
            Ok(step) => step,
            Err(e) => {
                if let Some(alert) = e.alert() {
                    self.record.queue_alert(alert);
                }
                StepResult::Error(e)
            }
        }
    }
}

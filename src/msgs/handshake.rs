//! Handshake message bodies. Extension lists are deliberately *not* part of
//! these structs' `Codec` impls — they're threaded through
//! [`crate::msgs::extensions`] so the PSK binder's two-phase write (spec
//! §4.2) has somewhere to hook in between "rest of ClientHello laid out"
//! and "binder computed and filled in".

use alloc::vec::Vec;

use crate::codec::{Codec, Reader, Writer};
use crate::error::Error;
use crate::msgs::enums::{CipherSuite, Compression, NamedGroup, ProtocolVersion};
use crate::msgs::extensions::{
    parse_server_extension, write_client_extensions, ClientExtension, ExtensionContext,
    ServerExtension,
};

/// A 32-byte handshake random (ClientHello.random / ServerHello.random).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Random(pub [u8; 32]);

impl Codec for Random {
    fn encode(&self, w: &mut Writer<'_>) {
        w.put_bytes(&self.0);
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let b = r.get_bytes(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(b);
        Ok(Random(out))
    }
}

/// The legacy `session_id` field. TLS 1.3 repurposes it as a
/// middlebox-compatibility echo; it carries no cryptographic meaning here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySessionId(pub Vec<u8>);

impl LegacySessionId {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn random(rng_fill: impl FnOnce(&mut [u8])) -> Self {
        let mut buf = [0u8; 32];
        rng_fill(&mut buf);
        Self(buf.to_vec())
    }
}

impl Codec for LegacySessionId {
    fn encode(&self, w: &mut Writer<'_>) {
        let _ = w.length_prefixed(1, |w| w.put_bytes(&self.0));
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        Ok(LegacySessionId(r.get_vec(1)?.to_vec()))
    }
}

/// One `KeyShareEntry`: a named group plus the opaque public key bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub payload: Vec<u8>,
}

impl Codec for KeyShareEntry {
    fn encode(&self, w: &mut Writer<'_>) {
        self.group.encode(w);
        let _ = w.length_prefixed(2, |w| w.put_bytes(&self.payload));
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let group = NamedGroup::read(r)?;
        let payload = r.get_vec(2)?.to_vec();
        Ok(KeyShareEntry { group, payload })
    }
}

/// `certificate_request_context`: empty on client-sent Certificate
/// messages, and the opaque value the server handed out in
/// CertificateRequest for post-handshake auth (not used on the client
/// side, but parsed so the field shape is honored).
pub type CertificateRequestContext = Vec<u8>;

/// One `CertificateEntry` (RFC 8446 §4.4.2): a DER certificate plus its
/// (ignored, beyond length-validity) per-certificate extensions block.
#[derive(Debug, Clone)]
pub struct CertificateEntry {
    pub der: pki_types::CertificateDer<'static>,
}

impl Codec for CertificateEntry {
    fn encode(&self, w: &mut Writer<'_>) {
        let _ = w.length_prefixed(3, |w| w.put_bytes(&self.der));
        // extensions block, empty
        w.put_u16(0);
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let der = pki_types::CertificateDer::from(r.get_vec(3)?.to_vec());
        let _ext = r.get_vec(2)?; // per-entry extensions, content ignored
        Ok(CertificateEntry { der })
    }
}

/// The TLS 1.3 `Certificate` message body (request context + entry list).
/// Extensions per entry are parsed and discarded (spec §4.6).
#[derive(Debug, Clone)]
pub struct CertificatePayload {
    pub context: CertificateRequestContext,
    pub entries: Vec<CertificateEntry>,
}

impl Codec for CertificatePayload {
    fn encode(&self, w: &mut Writer<'_>) {
        let _ = w.length_prefixed(1, |w| w.put_bytes(&self.context));
        let _ = w.length_prefixed(3, |w| {
            for e in &self.entries {
                e.encode(w);
            }
        });
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let context = r.get_vec(1)?.to_vec();
        let mut list = r.sub_reader(3)?;
        let mut entries = Vec::new();
        while !list.eof() {
            entries.push(CertificateEntry::read(&mut list)?);
        }
        Ok(CertificatePayload { context, entries })
    }
}

/// `CertificateVerify` body: signature scheme id + opaque signature.
#[derive(Debug, Clone)]
pub struct CertificateVerifyPayload {
    pub scheme: crate::msgs::enums::SignatureScheme,
    pub signature: Vec<u8>,
}

impl Codec for CertificateVerifyPayload {
    fn encode(&self, w: &mut Writer<'_>) {
        self.scheme.encode(w);
        let _ = w.length_prefixed(2, |w| w.put_bytes(&self.signature));
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let scheme = crate::msgs::enums::SignatureScheme::read(r)?;
        let signature = r.get_vec(2)?.to_vec();
        Ok(CertificateVerifyPayload { scheme, signature })
    }
}

/// `Finished` body: an opaque MAC whose length must equal the
/// ciphersuite's hash length (spec §4.8).
#[derive(Debug, Clone)]
pub struct FinishedPayload(pub Vec<u8>);

impl Codec for FinishedPayload {
    fn encode(&self, w: &mut Writer<'_>) {
        w.put_bytes(&self.0);
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        Ok(FinishedPayload(r.rest().to_vec()))
    }
}

/// Fixed (non-extension) prefix of a ClientHello/ServerHello, shared by
/// both directions of the handshake.
#[derive(Debug, Clone)]
pub struct HelloFixedFields {
    pub legacy_version: ProtocolVersion,
    pub random: Random,
    pub legacy_session_id: LegacySessionId,
}

/// Fields unique to ServerHello (beyond the shared prefix): the single
/// negotiated ciphersuite and the legacy compression method (must be
/// `Null`).
#[derive(Debug, Clone)]
pub struct ServerHelloFixedFields {
    pub cipher_suite: CipherSuite,
    pub legacy_compression_method: Compression,
}

impl Codec for ServerHelloFixedFields {
    fn encode(&self, w: &mut Writer<'_>) {
        self.cipher_suite.encode(w);
        self.legacy_compression_method.encode(w);
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        Ok(ServerHelloFixedFields {
            cipher_suite: CipherSuite::read(r)?,
            legacy_compression_method: Compression::read(r)?,
        })
    }
}

/// A fully assembled ClientHello body: fixed fields, the (legacy,
/// TLS-1.3-ignored) cipher-suite list, and an extension list that the
/// caller has already ordered with `pre_shared_key` last, if present.
///
/// This type does not implement [`Codec`] directly: its PSK binder, if
/// any, can only be computed once everything *before* the binder is on
/// the wire, so encoding it is necessarily a two-step process driven by
/// [`ClientHelloPayload::encode_up_to_binders`] and
/// [`crate::msgs::extensions::write_binders`] rather than a single
/// `encode` call.
#[derive(Debug, Clone)]
pub struct ClientHelloPayload {
    pub fixed: HelloFixedFields,
    pub cipher_suites: Vec<CipherSuite>,
    pub extensions: Vec<ClientExtension>,
}

impl ClientHelloPayload {
    /// Encode everything through the end of the non-PSK extensions, and
    /// report whether a `pre_shared_key` extension still needs writing
    /// (the caller then calls
    /// [`crate::msgs::extensions::write_identities_and_binders_placeholder`]
    /// directly, hashes the transcript so far, and finally
    /// [`crate::msgs::extensions::write_binders`]).
    pub fn encode_up_to_binders(&self, w: &mut Writer<'_>) -> Result<bool, Error> {
        self.fixed.legacy_version.encode(w);
        self.fixed.random.encode(w);
        self.fixed.legacy_session_id.encode(w);
        w.length_prefixed(2, |w| {
            for cs in &self.cipher_suites {
                cs.encode(w);
            }
        })?;
        Compression::Null.encode(w);

        let has_psk = self
            .extensions
            .iter()
            .any(|e| matches!(e, ClientExtension::PreSharedKey(_)));

        let ext_len_pos = w.len();
        w.put_u16(0);
        let ext_body_start = w.len();
        write_client_extensions(w, &self.extensions)?;
        if !has_psk {
            let ext_body_len = w.len() - ext_body_start;
            w.overwrite_bytes(ext_len_pos, &(ext_body_len as u16).to_be_bytes());
        }
        Ok(has_psk)
    }
}

/// A fully parsed ServerHello (or HelloRetryRequest — same wire shape,
/// distinguished by `fixed.random`, spec §4.1/§4.3).
#[derive(Debug, Clone)]
pub struct ServerHelloPayload {
    pub fixed: HelloFixedFields,
    pub suite_fields: ServerHelloFixedFields,
    pub extensions: Vec<ServerExtension>,
}

impl ServerHelloPayload {
    /// `true` if `fixed.random` is the fixed HelloRetryRequest sentinel
    /// (RFC 8446 §4.1.3).
    pub fn is_hello_retry_request(&self) -> bool {
        self.fixed.random.0 == crate::msgs::enums::HRR_RANDOM
    }

    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let legacy_version = ProtocolVersion::read(r)?;
        let random = Random::read(r)?;
        let legacy_session_id = LegacySessionId::read(r)?;
        let suite_fields = ServerHelloFixedFields::read(r)?;

        let is_hrr = random.0 == crate::msgs::enums::HRR_RANDOM;
        let ctx = if is_hrr {
            ExtensionContext::HelloRetryRequest
        } else {
            ExtensionContext::ServerHello
        };

        let mut ext_reader = r.sub_reader(2)?;
        let mut extensions = Vec::new();
        while !ext_reader.eof() {
            extensions.push(parse_server_extension(&mut ext_reader, ctx)?);
        }

        Ok(ServerHelloPayload {
            fixed: HelloFixedFields {
                legacy_version,
                random,
                legacy_session_id,
            },
            suite_fields,
            extensions,
        })
    }
}

/// `EncryptedExtensions` body (spec §4.5): just an extension list, no
/// fixed fields.
#[derive(Debug, Clone)]
pub struct EncryptedExtensionsPayload {
    pub extensions: Vec<ServerExtension>,
}

impl EncryptedExtensionsPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let mut list = r.sub_reader(2)?;
        let mut extensions = Vec::new();
        while !list.eof() {
            extensions.push(parse_server_extension(
                &mut list,
                ExtensionContext::EncryptedExtensions,
            )?);
        }
        Ok(EncryptedExtensionsPayload { extensions })
    }
}

/// `CertificateRequest` body (post-handshake client auth, spec §4.6). The
/// context value is opaque and must be echoed verbatim in the client's
/// response Certificate message.
#[derive(Debug, Clone)]
pub struct CertificateRequestPayload {
    pub context: CertificateRequestContext,
    pub extensions: Vec<ServerExtension>,
}

impl CertificateRequestPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let context = r.get_vec(1)?.to_vec();
        let mut list = r.sub_reader(2)?;
        let mut extensions = Vec::new();
        while !list.eof() {
            extensions.push(parse_server_extension(
                &mut list,
                ExtensionContext::CertificateRequest,
            )?);
        }
        Ok(CertificateRequestPayload { context, extensions })
    }
}

/// `NewSessionTicket` body (spec §5, post-handshake message): lifetime,
/// obfuscation base, a fresh nonce the PSK is derived from, the opaque
/// ticket label, and an extension list (the only recognized one being
/// `early_data`'s `max_early_data_size`).
#[derive(Debug, Clone)]
pub struct NewSessionTicketPayload {
    pub lifetime_seconds: u32,
    pub age_add: u32,
    pub nonce: Vec<u8>,
    pub ticket: Vec<u8>,
    pub extensions: Vec<ServerExtension>,
}

impl NewSessionTicketPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let lifetime_seconds = r.get_u32()?;
        let age_add = r.get_u32()?;
        let nonce = r.get_vec(1)?.to_vec();
        let ticket = r.get_vec(2)?.to_vec();
        let mut list = r.sub_reader(2)?;
        let mut extensions = Vec::new();
        while !list.eof() {
            extensions.push(parse_server_extension(
                &mut list,
                ExtensionContext::NewSessionTicket,
            )?);
        }
        Ok(NewSessionTicketPayload {
            lifetime_seconds,
            age_add,
            nonce,
            ticket,
            extensions,
        })
    }

    /// The `max_early_data_size` carried by this ticket's `early_data`
    /// extension, if the server sent one (spec §5: absence means 0-RTT is
    /// not permitted with this ticket).
    pub fn max_early_data_size(&self) -> Option<u32> {
        self.extensions.iter().find_map(|e| match e {
            ServerExtension::EarlyDataMaxSize(n) => Some(*n),
            _ => None,
        })
    }
}

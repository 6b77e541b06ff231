//! Message coordinator (spec §2, §4.3): fetches the next handshake
//! record, distinguishes ServerHello from HelloRetryRequest from an
//! unexpected TLS 1.2 downgrade, and dispatches to the right parser. The
//! state machine calls into this rather than touching
//! [`crate::io::RecordLayer`] or [`crate::msgs::handshake`] parsers
//! directly, so the classification logic lives in exactly one place.

use alloc::vec::Vec;

use crate::codec::Reader;
use crate::error::Error;
use crate::io::{FetchOutcome, RecordLayer};
use crate::msgs::enums::{
    HandshakeType, ProtocolVersion, DOWNGRADE_TO_TLS11_OR_BELOW_SENTINEL,
    DOWNGRADE_TO_TLS12_SENTINEL,
};
use crate::msgs::extensions::{parse_server_extension, ExtensionContext, ServerExtension};
use crate::msgs::handshake::ServerHelloPayload;

/// Fetch the next handshake message whose type is one of `acceptable`,
/// copying it out of the record layer's buffer. Returns `Ok(None)` for
/// want-read; the driver surfaces that as `StepResult::WantRead` without
/// consuming a state transition.
pub fn fetch_message<R: RecordLayer>(
    record_layer: &mut R,
    acceptable: &[HandshakeType],
) -> Result<Option<(HandshakeType, Vec<u8>)>, Error> {
    match record_layer.fetch_handshake(acceptable)? {
        FetchOutcome::Message(ty, bytes) => Ok(Some((ty, bytes.to_vec()))),
        FetchOutcome::WantRead => Ok(None),
    }
}

/// A ServerHello-shaped message, classified per spec §4.3.
pub enum ServerHelloClass {
    Normal(ServerHelloPayload),
    HelloRetryRequest(ServerHelloPayload),
}

/// Parse a ServerHello-shaped message body and classify it. Performs the
/// downgrade check (spec §4.3, testable property 5) inline: a detected
/// downgrade attempt is returned as `Err(IllegalParameter)` rather than
/// folded into the classification, since it's fatal either way.
pub fn parse_and_classify_server_hello(raw: &[u8]) -> Result<ServerHelloClass, Error> {
    let mut r = Reader::new(raw);
    let payload = ServerHelloPayload::read(&mut r)?;
    check_downgrade(&payload)?;

    if payload.is_hello_retry_request() {
        Ok(ServerHelloClass::HelloRetryRequest(payload))
    } else {
        Ok(ServerHelloClass::Normal(payload))
    }
}

/// Spec §4.3: "Independently inspect the random's last eight bytes for
/// the downgrade sentinel ... combined with absence of a
/// supported_versions extension indicating TLS 1.3, this indicates a
/// downgrade attempt". Checked regardless of whether this ServerHello
/// also happens to be the HRR sentinel value (property 4: HRR
/// classification must not be gated on what extensions follow, so this
/// runs as an independent, separate check).
fn check_downgrade(payload: &ServerHelloPayload) -> Result<(), Error> {
    let last8 = &payload.fixed.random.0[24..32];
    let has_sentinel = last8 == DOWNGRADE_TO_TLS12_SENTINEL || last8 == DOWNGRADE_TO_TLS11_OR_BELOW_SENTINEL;
    if !has_sentinel {
        return Ok(());
    }

    let advertises_tls13 = payload.extensions.iter().any(|e| {
        matches!(e, ServerExtension::SupportedVersions(v) if *v == ProtocolVersion::TLSv1_3)
    });
    if advertises_tls13 {
        return Ok(());
    }

    Err(Error::IllegalParameter(
        "ServerHello carries a downgrade sentinel without a TLS 1.3 supported_versions".into(),
    ))
}

/// Parse an EncryptedExtensions body, dispatching per spec §4.5.
pub fn parse_encrypted_extensions(raw: &[u8]) -> Result<Vec<ServerExtension>, Error> {
    let mut r = Reader::new(raw);
    let mut list = r.sub_reader(2)?;
    let mut out = Vec::new();
    while !list.eof() {
        out.push(parse_server_extension(&mut list, ExtensionContext::EncryptedExtensions)?);
    }
    Ok(out)
}

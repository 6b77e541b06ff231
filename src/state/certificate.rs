//! Certificate / CertificateVerify / CertificateRequest handling (spec
//! §4.1 cert-based states, §4.6, §4.7), plus the client's own Certificate
//! / CertificateVerify emission under post-handshake-style client auth.

use alloc::vec::Vec;

use crate::codec::Codec;
use crate::coordinator::fetch_message;
use crate::error::{CertificateError, Error};
use crate::io::{CertVerifier, Collaborators, RecordLayer, SignatureOps};
use crate::msgs::enums::{HandshakeType, SignatureScheme};
use crate::msgs::extensions::ServerExtension;
use crate::msgs::handshake::{
    CertificateEntry, CertificatePayload, CertificateRequestPayload, CertificateVerifyPayload,
};

use super::{handshake_header, HandshakeMachine, State, StepResult};

const SERVER_CERT_VERIFY_CONTEXT: &[u8] = b"TLS 1.3, server CertificateVerify";
const CLIENT_CERT_VERIFY_CONTEXT: &[u8] = b"TLS 1.3, client CertificateVerify";

fn verify_structure(context: &[u8], transcript_hash: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + context.len() + 1 + transcript_hash.len());
    out.extend_from_slice(&[0x20u8; 64]);
    out.extend_from_slice(context);
    out.push(0x00);
    out.extend_from_slice(transcript_hash);
    out
}

pub(super) fn handle_certificate_request<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    let Some((ty, raw)) = fetch_message(
        &mut machine.record,
        &[HandshakeType::CertificateRequest, HandshakeType::Certificate],
    )?
    else {
        return Ok(StepResult::WantRead);
    };

    if ty == HandshakeType::Certificate {
        machine.client_auth_requested = false;
        process_certificate_message(machine, &raw)?;
        machine.state = State::CertificateVerify;
        return Ok(StepResult::OkContinue);
    }

    let mut r = crate::codec::Reader::new(&raw);
    let payload = CertificateRequestPayload::read(&mut r)?;

    let sig_algs: Vec<&Vec<SignatureScheme>> = payload
        .extensions
        .iter()
        .filter_map(|e| match e {
            ServerExtension::SignatureAlgorithms(v) => Some(v),
            _ => None,
        })
        .collect();
    if sig_algs.len() != 1 {
        return Err(Error::Decode(
            "CertificateRequest must carry signature_algorithms exactly once".into(),
        ));
    }

    machine.client_auth_requested = true;
    machine.certificate_request_context = payload.context.clone();
    machine.server_requested_sig_schemes = sig_algs[0].clone();

    let header = handshake_header(HandshakeType::CertificateRequest, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(&raw);

    machine.state = State::ServerCertificate;
    Ok(StepResult::OkContinue)
}

pub(super) fn handle_certificate<C: Collaborators>(machine: &mut HandshakeMachine<C>) -> Result<StepResult, Error> {
    let Some((_, raw)) = fetch_message(&mut machine.record, &[HandshakeType::Certificate])? else {
        return Ok(StepResult::WantRead);
    };
    process_certificate_message(machine, &raw)?;
    machine.state = State::CertificateVerify;
    Ok(StepResult::OkContinue)
}

fn process_certificate_message<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
    raw: &[u8],
) -> Result<(), Error> {
    let mut r = crate::codec::Reader::new(raw);
    let payload = CertificatePayload::read(&mut r)?;
    if !payload.context.is_empty() {
        return Err(Error::IllegalParameter(
            "server Certificate carries a non-empty certificate_request_context".into(),
        ));
    }

    let der_entries: Vec<pki_types::CertificateDer<'static>> =
        payload.entries.iter().map(|e| e.der.clone()).collect();
    let chain = machine.cert.parse_der(&der_entries)?;
    let server_name = machine.config.server_name.as_deref().unwrap_or("");
    let flags = machine.cert.verify_with_profile(&chain, server_name)?;
    if !flags.is_ok() {
        let err = if flags.access_denied {
            CertificateError::AccessDenied
        } else if flags.bad_certificate {
            CertificateError::BadCertificate
        } else if flags.unsupported_certificate {
            CertificateError::UnsupportedCertificate
        } else if flags.certificate_expired {
            CertificateError::CertificateExpired
        } else if flags.certificate_revoked {
            CertificateError::CertificateRevoked
        } else if flags.unknown_ca {
            CertificateError::UnknownCa
        } else {
            CertificateError::CertificateUnknown
        };
        return Err(Error::Certificate(err));
    }

    machine.peer_leaf_public_key = Some(machine.cert.leaf_public_key(&chain).to_vec());
    machine.session.peer_certificate_chain = der_entries;
    machine.peer_cert_chain = Some(chain);

    let header = handshake_header(HandshakeType::Certificate, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(raw);
    Ok(())
}

pub(super) fn handle_certificate_verify<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    let Some((_, raw)) = fetch_message(&mut machine.record, &[HandshakeType::CertificateVerify])? else {
        return Ok(StepResult::WantRead);
    };

    let mut r = crate::codec::Reader::new(&raw);
    let payload = CertificateVerifyPayload::read(&mut r)?;

    if !machine.config.signature_schemes.contains(&payload.scheme) {
        return Err(Error::IllegalParameter(
            "server CertificateVerify uses a signature scheme the client did not offer".into(),
        ));
    }

    let transcript_hash = machine.transcript.current_hash();
    let content = verify_structure(SERVER_CERT_VERIFY_CONTEXT, &transcript_hash);
    let public_key = machine
        .peer_leaf_public_key
        .as_ref()
        .ok_or_else(|| Error::Internal("CertificateVerify reached with no peer certificate parsed".into()))?;

    machine
        .sign
        .verify(payload.scheme, public_key, &content, &payload.signature)
        .map_err(|_| Error::DecryptError("server CertificateVerify signature did not verify".into()))?;

    let header = handshake_header(HandshakeType::CertificateVerify, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(&raw);

    machine.state = State::ServerFinished;
    Ok(StepResult::OkContinue)
}

pub(super) fn emit_client_certificate<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    // `[CCS_AFTER_SERVER_FINISHED]`, then the outbound transform switches
    // to handshake keys before this, the client's first post-ServerHello
    // message, goes out (spec §4.1 transition rules).
    if machine.config.middlebox_compat_mode {
        machine.record.write_ccs()?;
    }
    let outbound_epoch = machine
        .outbound_handshake_epoch
        .expect("registered in ServerHello post-processing");
    machine.record.install_outbound_transform(outbound_epoch);

    let want_client_cert = machine.client_auth_requested && !machine.config.client_certificate_chain.is_empty();

    let entries: Vec<CertificateEntry> = if want_client_cert {
        machine
            .config
            .client_certificate_chain
            .iter()
            .map(|der| CertificateEntry { der: der.clone() })
            .collect()
    } else {
        Vec::new()
    };
    let payload = CertificatePayload {
        context: machine.certificate_request_context.clone(),
        entries,
    };

    let mut body = Vec::new();
    {
        let mut w = crate::codec::Writer::new(&mut body);
        payload.encode(&mut w);
    }
    let header = handshake_header(HandshakeType::Certificate, body.len());
    machine.transcript.add(&header);
    machine.transcript.add(&body);

    let out = machine.record.start_handshake(HandshakeType::Certificate);
    out.extend_from_slice(&body);
    machine.record.finish_handshake()?;

    machine.state = if want_client_cert {
        State::ClientCertificateVerify
    } else {
        State::ClientFinished
    };
    Ok(StepResult::OkContinue)
}

pub(super) fn emit_client_certificate_verify<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    let scheme = machine
        .config
        .signature_schemes
        .iter()
        .find(|s| machine.server_requested_sig_schemes.contains(s))
        .copied()
        .ok_or_else(|| Error::HandshakeFailure("no signature scheme in common with the server's CertificateRequest".into()))?;

    let transcript_hash = machine.transcript.current_hash();
    let content = verify_structure(CLIENT_CERT_VERIFY_CONTEXT, &transcript_hash);
    let signature = machine
        .sign
        .sign(scheme, &content)?
        .ok_or_else(|| Error::Internal("client certificate configured but signer declined to sign".into()))?;

    let payload = CertificateVerifyPayload { scheme, signature };
    let mut body = Vec::new();
    {
        let mut w = crate::codec::Writer::new(&mut body);
        payload.encode(&mut w);
    }
    let header = handshake_header(HandshakeType::CertificateVerify, body.len());
    machine.transcript.add(&header);
    machine.transcript.add(&body);

    let out = machine.record.start_handshake(HandshakeType::CertificateVerify);
    out.extend_from_slice(&body);
    machine.record.finish_handshake()?;

    machine.state = State::ClientFinished;
    Ok(StepResult::OkContinue)
}

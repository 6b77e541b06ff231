//! Server/client Finished, EndOfEarlyData, handshake wrap-up, and the
//! post-handshake NewSessionTicket poll (spec §4.1 tail states, §4.8,
//! §4.9).

use subtle::ConstantTimeEq;

use crate::coordinator::fetch_message;
use crate::error::Error;
use crate::io::{Collaborators, RecordLayer};
use crate::msgs::enums::HandshakeType;
use crate::msgs::handshake::{FinishedPayload, NewSessionTicketPayload};
use crate::session::EarlyDataStatus;

use super::{handshake_header, HandshakeMachine, State, StepResult};

pub(super) fn handle_server_finished<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    let Some((_, raw)) = fetch_message(&mut machine.record, &[HandshakeType::Finished])? else {
        return Ok(StepResult::WantRead);
    };

    let mut r = crate::codec::Reader::new(&raw);
    let payload = FinishedPayload::read(&mut r)?;

    let base_key = machine
        .key_schedule
        .server_handshake_traffic_secret
        .clone()
        .expect("derived entering EncryptedExtensions");
    let transcript_hash = machine.transcript.current_hash();
    let expected = machine.key_schedule.finished_verify_data(&base_key, &transcript_hash);

    let ok = expected.len() == payload.0.len() && bool::from(expected.ct_eq(&payload.0));
    if !ok {
        log::warn!("server Finished verify_data mismatch, aborting handshake");
        return Err(Error::DecryptError("server Finished verify_data mismatch".into()));
    }

    let header = handshake_header(HandshakeType::Finished, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(&raw);

    let transcript_hash_through_server_finished = machine.transcript.current_hash();
    machine
        .key_schedule
        .derive_master_secret(&transcript_hash_through_server_finished);
    machine.transcript_through_server_finished = Some(transcript_hash_through_server_finished);

    let suite = machine
        .negotiated_suite
        .expect("negotiated in ServerHello");
    let key_len = suite.aead_key_len();
    let iv_len = suite.aead_iv_len();
    let server_ap_secret = machine
        .key_schedule
        .server_application_traffic_secret
        .clone()
        .expect("just derived");
    let transform = machine.key_schedule.traffic_keys(&server_ap_secret, key_len, iv_len);
    let epoch = machine
        .record
        .add_key_material(crate::transform::TransformDirection::ServerToClient, transform);
    machine.record.install_inbound_transform(epoch);

    machine.state = if machine.early_data_status == EarlyDataStatus::Accepted {
        State::EndOfEarlyData
    } else {
        State::ClientCertificate
    };
    Ok(StepResult::OkContinue)
}

pub(super) fn emit_end_of_early_data<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    let body: alloc::vec::Vec<u8> = alloc::vec::Vec::new();
    let header = handshake_header(HandshakeType::EndOfEarlyData, body.len());
    machine.transcript.add(&header);
    machine.transcript.add(&body);

    let out = machine.record.start_handshake(HandshakeType::EndOfEarlyData);
    out.extend_from_slice(&body);
    machine.record.finish_handshake()?;

    machine.state = State::ClientCertificate;
    Ok(StepResult::OkContinue)
}

pub(super) fn emit_client_finished<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    let base_key = machine
        .key_schedule
        .client_handshake_traffic_secret
        .clone()
        .expect("derived entering EncryptedExtensions");
    let transcript_hash = machine.transcript.current_hash();
    let verify_data = machine.key_schedule.finished_verify_data(&base_key, &transcript_hash);

    let payload = FinishedPayload(verify_data);
    let mut body = alloc::vec::Vec::new();
    {
        use crate::codec::Codec;
        let mut w = crate::codec::Writer::new(&mut body);
        payload.encode(&mut w);
    }
    let header = handshake_header(HandshakeType::Finished, body.len());
    machine.transcript.add(&header);
    machine.transcript.add(&body);

    let out = machine.record.start_handshake(HandshakeType::Finished);
    out.extend_from_slice(&body);
    machine.record.finish_handshake()?;

    let transcript_hash_through_client_finished = machine.transcript.current_hash();
    machine
        .key_schedule
        .derive_resumption_master_secret(&transcript_hash_through_client_finished);
    machine.session.resumption_master_secret = machine.key_schedule.resumption_master_secret.clone();

    let suite = machine
        .negotiated_suite
        .expect("negotiated in ServerHello");
    let key_len = suite.aead_key_len();
    let iv_len = suite.aead_iv_len();
    let client_ap_secret = machine
        .key_schedule
        .client_application_traffic_secret
        .clone()
        .expect("derived on server Finished");
    let transform = machine.key_schedule.traffic_keys(&client_ap_secret, key_len, iv_len);
    let epoch = machine
        .record
        .add_key_material(crate::transform::TransformDirection::ClientToServer, transform);
    machine.record.install_outbound_transform(epoch);

    machine.state = State::HandshakeWrapup;
    Ok(StepResult::OkContinue)
}

pub(super) fn wrap_up<C: Collaborators>(machine: &mut HandshakeMachine<C>) -> Result<StepResult, Error> {
    machine.ephemeral_private = None;
    machine.ephemeral_public = None;
    machine.state = State::HandshakeOver;
    log::info!("handshake complete");
    Ok(StepResult::Done)
}

pub(super) fn poll_post_handshake<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
) -> Result<StepResult, Error> {
    let Some((_, raw)) = fetch_message(&mut machine.record, &[HandshakeType::NewSessionTicket])? else {
        return Ok(StepResult::WantRead);
    };

    let mut r = crate::codec::Reader::new(&raw);
    let ticket = NewSessionTicketPayload::read(&mut r)?;

    let header = handshake_header(HandshakeType::NewSessionTicket, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(&raw);

    let suite = machine
        .negotiated_suite
        .expect("negotiated in ServerHello");
    let offer = crate::ticket::ingest(&ticket, &machine.key_schedule, &machine.clock, suite);
    log::trace!(
        "ingested post-handshake NewSessionTicket, max_early_data_size={:?}",
        offer.max_early_data_size
    );
    machine.psk.set_handshake_psk(crate::io::PskEntry {
        identity: offer.identity.clone(),
        secret: offer.secret.clone(),
        obfuscated_ticket_age_base: offer.obfuscated_ticket_age_base,
        received_at: offer.received_at,
        lifetime_seconds: offer.lifetime_seconds,
        cipher_suite: offer.cipher_suite,
        max_early_data_size: offer.max_early_data_size,
        is_external: offer.is_external,
    });

    Ok(StepResult::NewSessionTicket(offer))
}

//! ServerHello / HelloRetryRequest handling (spec §4.1 `SERVER_HELLO`
//! state, §4.3 parser, §4.4 stage 2 key schedule transition).

use crate::coordinator::{fetch_message, parse_and_classify_server_hello, ServerHelloClass};
use crate::error::Error;
use crate::io::{Collaborators, EcdheOps, RecordLayer};
use crate::msgs::enums::{Compression, HandshakeType, ProtocolVersion};
use crate::msgs::extensions::{ServerExtension, ServerKeyShare};
use crate::msgs::handshake::ServerHelloPayload;

use super::{handshake_header, HandshakeMachine, KeyExchangeMode, State, StepResult};

pub(super) fn handle<C: Collaborators>(machine: &mut HandshakeMachine<C>) -> Result<StepResult, Error> {
    let Some((_, raw)) = fetch_message(&mut machine.record, &[HandshakeType::ServerHello])? else {
        return Ok(StepResult::WantRead);
    };

    let class = parse_and_classify_server_hello(&raw)?;
    match class {
        ServerHelloClass::HelloRetryRequest(payload) => handle_hrr(machine, payload, &raw),
        ServerHelloClass::Normal(payload) => handle_normal(machine, payload, &raw),
    }
}

/// Fixed-prefix and echo checks shared by ServerHello and HelloRetryRequest
/// (spec §4.3: "2-byte legacy version (`0x0303` required) ... 1-byte
/// legacy compression (`0x00` required)").
fn validate_common(payload: &ServerHelloPayload, client_session_id: &[u8]) -> Result<(), Error> {
    if payload.fixed.legacy_version != ProtocolVersion::TLSv1_2 {
        return Err(Error::IllegalParameter(
            "ServerHello legacy_version must be 0x0303".into(),
        ));
    }
    if payload.suite_fields.legacy_compression_method != Compression::Null {
        return Err(Error::IllegalParameter(
            "ServerHello legacy_compression_method must be 0".into(),
        ));
    }
    if payload.fixed.legacy_session_id.0 != client_session_id {
        return Err(Error::IllegalParameter(
            "ServerHello legacy_session_id does not echo the client's".into(),
        ));
    }
    Ok(())
}

fn handle_hrr<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
    payload: ServerHelloPayload,
    raw: &[u8],
) -> Result<StepResult, Error> {
    validate_common(&payload, &machine.client_session_id)?;

    if machine.hello_retry_count > 0 {
        return Err(Error::UnexpectedMessage("second HelloRetryRequest on one connection".into()));
    }
    if machine.config.first_ecdhe_group().is_none() {
        return Err(Error::IllegalParameter(
            "HelloRetryRequest received under PSK-only key exchange".into(),
        ));
    }

    let selected_group = payload.extensions.iter().find_map(|e| match e {
        ServerExtension::KeyShare(ServerKeyShare::Selected(g)) => Some(*g),
        _ => None,
    });
    let cookie = payload.extensions.iter().find_map(|e| match e {
        ServerExtension::Cookie(c) => Some(c.clone()),
        _ => None,
    });

    // RFC 8446 permits a cookie-only HRR (the server wants a fresh cookie
    // without reselecting the group); `key_share` is only checked against
    // the client's offer when the server actually sent one.
    let group = match selected_group {
        Some(group) => {
            if !machine.config.supported_groups.contains(&group) {
                return Err(Error::IllegalParameter(
                    "HelloRetryRequest selected a group the client did not offer".into(),
                ));
            }
            if machine.offered_group == Some(group) {
                return Err(Error::IllegalParameter(
                    "HelloRetryRequest selected the group the client already provided a share for".into(),
                ));
            }
            group
        }
        None => machine.offered_group.expect(
            "ephemeral key exchange is enabled (checked above), so the first ClientHello already offered a group",
        ),
    };

    if machine.negotiated_suite.is_none() {
        machine.negotiated_suite = Some(payload.suite_fields.cipher_suite);
        machine
            .transcript
            .start(payload.suite_fields.cipher_suite.hash_len());
    }
    machine.transcript.reset_after_hello_retry_request();
    let header = handshake_header(HandshakeType::ServerHello, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(raw);

    machine.hello_retry_count += 1;
    machine.offered_group = Some(group);
    machine.cookie = cookie;

    log::debug!("HelloRetryRequest selected group {group:?}, resending ClientHello");
    super::client_hello::build_and_send_client_hello(machine, true)?;
    machine.state = State::ServerHello;
    Ok(StepResult::OkContinue)
}

fn handle_normal<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
    payload: ServerHelloPayload,
    raw: &[u8],
) -> Result<StepResult, Error> {
    validate_common(&payload, &machine.client_session_id)?;

    if !machine
        .config
        .cipher_suites
        .contains(&payload.suite_fields.cipher_suite)
    {
        return Err(Error::IllegalParameter(
            "ServerHello selected a ciphersuite the client did not offer".into(),
        ));
    }
    if machine.hello_retry_count > 0 && machine.negotiated_suite != Some(payload.suite_fields.cipher_suite) {
        return Err(Error::IllegalParameter(
            "ServerHello ciphersuite does not match the HelloRetryRequest's".into(),
        ));
    }

    if machine.negotiated_suite.is_none() {
        machine.negotiated_suite = Some(payload.suite_fields.cipher_suite);
        machine
            .transcript
            .start(payload.suite_fields.cipher_suite.hash_len());
    }
    let header = handshake_header(HandshakeType::ServerHello, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(raw);

    let suite = payload.suite_fields.cipher_suite;
    machine.session.negotiated_ciphersuite = Some(suite);
    machine.session.server_random = payload.fixed.random.0;

    let psk_selected = payload.extensions.iter().find_map(|e| match e {
        ServerExtension::PreSharedKey(idx) => Some(*idx),
        _ => None,
    });
    let key_share = payload.extensions.iter().find_map(|e| match e {
        ServerExtension::KeyShare(ServerKeyShare::Full(entry)) => Some(entry.clone()),
        _ => None,
    });

    let mode = match (psk_selected.is_some(), key_share.is_some()) {
        (true, false) => KeyExchangeMode::PskOnly,
        (false, true) => KeyExchangeMode::Ephemeral,
        (true, true) => KeyExchangeMode::PskEphemeral,
        (false, false) => {
            return Err(Error::HandshakeFailure(
                "ServerHello selected neither pre_shared_key nor key_share".into(),
            ))
        }
    };

    if let Some(idx) = psk_selected {
        if idx != 0 {
            return Err(Error::IllegalParameter(
                "server selected a PSK identity index the client did not offer".into(),
            ));
        }
    } else {
        machine.psk.remove_handshake_psk();
        machine.psk_offer = None;
    }

    let ecdhe_shared = if let Some(entry) = &key_share {
        let Some(offered_group) = machine.offered_group else {
            return Err(Error::IllegalParameter("key_share with no group ever offered".into()));
        };
        if entry.group != offered_group {
            return Err(Error::IllegalParameter(
                "ServerHello key_share group does not match what the client offered".into(),
            ));
        }
        let private = machine
            .ephemeral_private
            .as_ref()
            .expect("ephemeral private key retained since ClientHello");
        Some(machine.ecdhe.derive(entry.group, private, &entry.payload)?)
    } else {
        None
    };

    log::debug!("ServerHello negotiated {suite:?} in {mode:?} mode");
    machine.mode = Some(mode);
    machine.session.selected_group = machine.offered_group;

    // Stage 1 re-derivation (spec §4.4, §9 open question: re-derive rather
    // than skip): the PSK offer may have just been dropped above if the
    // server didn't select it, so this re-derives `early_secret` from
    // whatever is now the final answer before stage 2 consumes it.
    let psk_secret = machine.psk_offer.as_ref().map(|p| p.secret.clone());
    machine.key_schedule.derive_early_secret(psk_secret.as_deref());

    let transcript_hash = machine.transcript.current_hash();
    machine
        .key_schedule
        .derive_handshake_secret(ecdhe_shared.as_deref(), &transcript_hash);
    machine.transcript_through_server_hello = Some(transcript_hash);

    let key_len = suite.aead_key_len();
    let iv_len = suite.aead_iv_len();
    let server_hs_secret = machine
        .key_schedule
        .server_handshake_traffic_secret
        .clone()
        .expect("just derived");
    let server_transform = machine.key_schedule.traffic_keys(&server_hs_secret, key_len, iv_len);
    let inbound_epoch = machine
        .record
        .add_key_material(crate::transform::TransformDirection::ServerToClient, server_transform);
    machine.record.install_inbound_transform(inbound_epoch);
    machine.inbound_handshake_epoch = Some(inbound_epoch);

    // Registered now but not installed yet: while 0-RTT data is still being
    // written the client stays on the early-data transform until
    // `EndOfEarlyData` has gone out (spec §4.1 `END_OF_EARLY_DATA`).
    let client_hs_secret = machine
        .key_schedule
        .client_handshake_traffic_secret
        .clone()
        .expect("just derived");
    let client_transform = machine.key_schedule.traffic_keys(&client_hs_secret, key_len, iv_len);
    let outbound_epoch = machine
        .record
        .add_key_material(crate::transform::TransformDirection::ClientToServer, client_transform);
    machine.outbound_handshake_epoch = Some(outbound_epoch);

    machine.state = State::EncryptedExtensions;
    Ok(StepResult::OkContinue)
}

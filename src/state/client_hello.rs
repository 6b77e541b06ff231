//! ClientHello emission (spec §4.1 `HELLO_REQUEST`/`CLIENT_HELLO`/
//! `EARLY_APP_DATA` states, §4.2 extension writers).

use alloc::vec::Vec;

use crate::error::Error;
use crate::io::{Collaborators, EcdheOps, PskProvider, RecordLayer, Rng};
use crate::msgs::enums::{HandshakeType, NamedGroup, ProtocolVersion};
use crate::msgs::extensions::{
    write_binders, write_identities_and_binders_placeholder, ClientExtension, PresharedKeyOffer,
    PskIdentity,
};
use crate::msgs::handshake::{ClientHelloPayload, HelloFixedFields, KeyShareEntry, LegacySessionId, Random};
use crate::session::EarlyDataStatus;

use super::{handshake_header, HandshakeMachine, State, StepResult};

/// Generate (or regenerate, after an HRR) the ephemeral key share for
/// `group` and retain the private half (spec §4.2 `key_share`: "The
/// ephemeral private key is generated here and retained").
fn generate_key_share<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
    group: NamedGroup,
) -> Result<KeyShareEntry, Error> {
    let (private, public) = machine.ecdhe.generate(group)?;
    machine.ephemeral_private = Some(zeroize::Zeroizing::new(private));
    machine.ephemeral_public = Some(public.clone());
    machine.offered_group = Some(group);
    Ok(KeyShareEntry {
        group,
        payload: public,
    })
}

struct PskBinderPlan {
    identity: PskIdentity,
    binder_len: usize,
    is_external: bool,
}

/// Build the extension list, in the fixed order spec §4.2 requires, plus
/// the binder plan if a PSK is offered (the binder itself can't be
/// written until the rest of the message is laid out).
fn build_extensions<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
    is_retry: bool,
) -> Result<(Vec<ClientExtension>, Option<PskBinderPlan>), Error> {
    let mut exts = Vec::new();
    let cfg = machine.config.clone();

    // An aged-out ticket is treated as expired and not offered at all
    // (spec §4.2 "Ticket age math") — not merely truncated to age zero,
    // which would still send the binder/identity/early_data as if the PSK
    // were current.
    if let Some(psk) = &machine.psk_offer {
        if psk.obfuscated_ticket_age(machine.clock.now()).is_none() {
            log::debug!("configured PSK ticket has aged out past the 7-day limit; dropping the offer");
            machine.psk_offer = None;
        }
    }

    let mut versions = alloc::vec![ProtocolVersion::TLSv1_3];
    if cfg.minimum_version == ProtocolVersion::TLSv1_2 {
        versions.push(ProtocolVersion::TLSv1_2);
    }
    exts.push(ClientExtension::SupportedVersions(versions));

    if !cfg.supported_groups.is_empty() {
        exts.push(ClientExtension::SupportedGroups(cfg.supported_groups.clone()));
    }
    if !cfg.signature_schemes.is_empty() {
        exts.push(ClientExtension::SignatureAlgorithms(cfg.signature_schemes.clone()));
    }
    if let Some(name) = &cfg.server_name {
        exts.push(ClientExtension::ServerName(name.clone()));
    }
    if !cfg.alpn_protocols.is_empty() {
        exts.push(ClientExtension::ApplicationLayerProtocolNegotiation(
            cfg.alpn_protocols.clone(),
        ));
    }
    if let Some(code) = cfg.max_fragment_length {
        exts.push(ClientExtension::MaxFragmentLength(code));
    }

    if let Some(cookie) = machine.cookie.clone() {
        exts.push(ClientExtension::Cookie(cookie));
    }

    let ephemeral_enabled = cfg.first_ecdhe_group().is_some();
    if ephemeral_enabled {
        let group = if is_retry {
            machine
                .offered_group
                .expect("HRR retry path always has a server-selected group recorded")
        } else {
            cfg.first_ecdhe_group().expect("checked above")
        };
        let entry = generate_key_share(machine, group)?;
        exts.push(ClientExtension::KeyShare(alloc::vec![entry]));
    }

    let psk_only_configured = !cfg.psk_modes.is_empty()
        && cfg
            .psk_modes
            .iter()
            .all(|m| matches!(m, crate::msgs::enums::PskKeyExchangeMode::PskKe));
    let psk_permits_early_data = machine
        .psk_offer
        .as_ref()
        .is_some_and(|psk| psk.max_early_data_size.is_some());
    let offer_early_data = !is_retry
        && machine.psk_offer.is_some()
        && psk_permits_early_data
        && cfg.enable_early_data
        && !psk_only_configured;
    if offer_early_data {
        exts.push(ClientExtension::EarlyData);
        machine.early_data_status = EarlyDataStatus::Rejected;
    }

    if !cfg.psk_modes.is_empty() {
        exts.push(ClientExtension::PskKeyExchangeModes(cfg.psk_modes.clone()));
    }

    let binder_plan = if let Some(psk) = &machine.psk_offer {
        // Not-offered-at-all expiry is handled above; by this point a
        // present `psk_offer` is guaranteed fresh enough to have a real age.
        let age = psk
            .obfuscated_ticket_age(machine.clock.now())
            .expect("expired tickets are dropped from psk_offer before this point");
        let identity = PskIdentity {
            identity: psk.identity.clone(),
            obfuscated_ticket_age: age,
        };
        let hash_len = psk.cipher_suite.hash_len();
        exts.push(ClientExtension::PreSharedKey(PresharedKeyOffer {
            identities: alloc::vec![identity.clone()],
            binders: Vec::new(),
        }));
        Some(PskBinderPlan {
            identity,
            binder_len: hash_len,
            is_external: psk.is_external,
        })
    } else {
        None
    };

    Ok((exts, binder_plan))
}

/// Shared by the initial ClientHello and the post-HRR retry (spec §4.1:
/// "the re-sent ClientHello MUST echo the HRR cookie ... and MUST use
/// the group the HRR selected").
pub(super) fn build_and_send_client_hello<C: Collaborators>(
    machine: &mut HandshakeMachine<C>,
    is_retry: bool,
) -> Result<(), Error> {
    if !is_retry {
        let mut random = [0u8; 32];
        machine.rng.fill(&mut random);
        machine.session.client_random = random;
        let mut session_id = [0u8; 32];
        machine.rng.fill(&mut session_id);
        machine.client_session_id = session_id.to_vec();
    }

    let (extensions, binder_plan) = build_extensions(machine, is_retry)?;

    let fixed = HelloFixedFields {
        legacy_version: ProtocolVersion::TLSv1_2,
        random: Random(machine.session.client_random),
        legacy_session_id: LegacySessionId(machine.client_session_id.clone()),
    };
    let payload = ClientHelloPayload {
        fixed,
        cipher_suites: machine.config.cipher_suites.clone(),
        extensions,
    };

    let mut body = Vec::new();
    let has_psk = {
        let mut w = crate::codec::Writer::new(&mut body);
        payload.encode_up_to_binders(&mut w)?
    };
    debug_assert_eq!(has_psk, binder_plan.is_some());

    if let Some(plan) = binder_plan {
        let binders_start = {
            let mut w = crate::codec::Writer::new(&mut body);
            write_identities_and_binders_placeholder(
                &mut w,
                &alloc::vec![plan.identity],
                &alloc::vec![plan.binder_len],
            )?
        };

        // RFC 8446 §4.2.11.2: the binder HMAC input is the transcript so
        // far plus this ClientHello *up to but not including* the
        // binders list itself (the binders' length prefix is included).
        let psk = machine
            .psk_offer
            .as_ref()
            .expect("binder_plan is only Some when psk_offer is Some");
        let psk_secret = psk.secret.clone();
        let psk_hash_len = psk.cipher_suite.hash_len();
        // The suite isn't negotiated yet on a first ClientHello; fix the
        // transcript's hash algorithm to the offered PSK's own suite so the
        // binder (and later the early-traffic secret) can be hashed at all.
        // A no-op if an HRR retry already fixed it via ServerHello.
        machine.transcript.start(psk_hash_len);
        machine.key_schedule.derive_early_secret(Some(&psk_secret));

        let mut tentative = machine.transcript.clone();
        let header = handshake_header(HandshakeType::ClientHello, body.len());
        tentative.add(&header);
        tentative.add(&body[..binders_start]);
        let partial_hash = tentative.current_hash();

        let binder_key = machine.key_schedule.binder_key(plan.is_external);
        let binder = machine.key_schedule.binder_mac(&binder_key, &partial_hash);

        let mut w = crate::codec::Writer::new(&mut body);
        write_binders(&mut w, binders_start, &alloc::vec![binder]);
    } else {
        machine.key_schedule.derive_early_secret(None);
    }

    // `[CCS_BEFORE_2ND_CLIENT_HELLO]` precedes the retry ClientHello;
    // `[CCS_AFTER_CLIENT_HELLO]` follows the first one (spec §4.1). Either
    // way it's the legacy compat-mode byte, not transcripted.
    if is_retry && machine.config.middlebox_compat_mode {
        machine.record.write_ccs()?;
    }

    let header = handshake_header(HandshakeType::ClientHello, body.len());
    machine.transcript.add(&header);
    machine.transcript.add(&body);

    let out = machine.record.start_handshake(HandshakeType::ClientHello);
    out.extend_from_slice(&body);
    machine.record.finish_handshake()?;

    if !is_retry && machine.config.middlebox_compat_mode {
        machine.record.write_ccs()?;
    }

    Ok(())
}

pub(super) fn emit_first<C: Collaborators>(machine: &mut HandshakeMachine<C>) -> Result<StepResult, Error> {
    machine.psk_offer = machine.psk.get_psk_to_offer().map(|entry| crate::session::PskOffer {
        identity: entry.identity,
        secret: entry.secret,
        obfuscated_ticket_age_base: entry.obfuscated_ticket_age_base,
        received_at: entry.received_at,
        lifetime_seconds: entry.lifetime_seconds,
        cipher_suite: entry.cipher_suite,
        max_early_data_size: entry.max_early_data_size,
        is_external: entry.is_external,
    });

    machine.state = State::ClientHello;
    Ok(StepResult::OkContinue)
}

pub(super) fn emit_client_hello<C: Collaborators>(machine: &mut HandshakeMachine<C>) -> Result<StepResult, Error> {
    build_and_send_client_hello(machine, false)?;

    // Spec §4.4 "Early stage": once the (first) ClientHello carrying
    // `early_data` has gone out, derive the client early-traffic secret
    // over that ClientHello-only transcript and install it as the
    // outbound transform before any 0-RTT application data is written —
    // otherwise `emit_early_data` would send it under whatever transform
    // (if any) happened to already be active.
    if machine.early_data_status == EarlyDataStatus::Rejected {
        let suite = machine
            .psk_offer
            .as_ref()
            .expect("early_data is only offered when a PSK is being offered")
            .cipher_suite;
        let client_hello_hash = machine.transcript.current_hash();
        let secret = machine.key_schedule.client_early_traffic_secret(&client_hello_hash);
        let transform = machine
            .key_schedule
            .traffic_keys(&secret, suite.aead_key_len(), suite.aead_iv_len());
        let epoch = machine
            .record
            .add_key_material(crate::transform::TransformDirection::ClientToServer, transform);
        machine.record.install_outbound_transform(epoch);
        log::debug!("installed client early-traffic transform for 0-RTT data");
    }

    machine.state = State::EarlyAppData;
    Ok(StepResult::OkContinue)
}

pub(super) fn emit_early_data<C: Collaborators>(machine: &mut HandshakeMachine<C>) -> Result<StepResult, Error> {
    if machine.early_data_status == EarlyDataStatus::Rejected && !machine.config.early_data.is_empty() {
        machine.record.write_application(&machine.config.early_data)?;
    }
    machine.state = State::ServerHello;
    Ok(StepResult::OkContinue)
}

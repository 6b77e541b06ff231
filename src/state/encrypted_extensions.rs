//! EncryptedExtensions handling (spec §4.1 `ENCRYPTED_EXTENSIONS` state,
//! §4.5 parser).

use crate::coordinator::fetch_message;
use crate::error::Error;
use crate::io::Collaborators;
use crate::msgs::enums::HandshakeType;
use crate::msgs::extensions::ServerExtension;
use crate::msgs::handshake::EncryptedExtensionsPayload;
use crate::session::EarlyDataStatus;

use super::{handshake_header, HandshakeMachine, KeyExchangeMode, State, StepResult};

pub(super) fn handle<C: Collaborators>(machine: &mut HandshakeMachine<C>) -> Result<StepResult, Error> {
    let Some((_, raw)) = fetch_message(&mut machine.record, &[HandshakeType::EncryptedExtensions])? else {
        return Ok(StepResult::WantRead);
    };

    let mut r = crate::codec::Reader::new(&raw);
    let payload = EncryptedExtensionsPayload::read(&mut r)?;

    for ext in &payload.extensions {
        match ext {
            ServerExtension::MaxFragmentLength(code) => {
                if machine.config.max_fragment_length != Some(*code) {
                    return Err(Error::IllegalParameter(
                        "EncryptedExtensions max_fragment_length does not match what was offered".into(),
                    ));
                }
            }
            ServerExtension::ApplicationLayerProtocolNegotiation(proto) => {
                if !machine.config.alpn_protocols.iter().any(|p| p == proto) {
                    return Err(Error::IllegalParameter(
                        "EncryptedExtensions ALPN selected a protocol never offered".into(),
                    ));
                }
            }
            ServerExtension::EarlyData => {
                if machine.early_data_status != EarlyDataStatus::Rejected {
                    return Err(Error::IllegalParameter(
                        "EncryptedExtensions carries early_data without the client having offered it".into(),
                    ));
                }
                machine.early_data_status = EarlyDataStatus::Accepted;
            }
            ServerExtension::SupportedGroups(_) | ServerExtension::ServerName => {}
            _ => {
                return Err(Error::UnsupportedExtension(ext.ext_type_raw()));
            }
        }
    }

    let header = handshake_header(HandshakeType::EncryptedExtensions, raw.len());
    machine.transcript.add(&header);
    machine.transcript.add(&raw);

    machine.state = match machine.mode {
        Some(KeyExchangeMode::Ephemeral) => State::CertificateRequest,
        Some(KeyExchangeMode::PskOnly) | Some(KeyExchangeMode::PskEphemeral) => State::ServerFinished,
        None => {
            return Err(Error::Internal(
                "key-exchange mode not yet determined entering EncryptedExtensions".into(),
            ))
        }
    };
    Ok(StepResult::OkContinue)
}

//! Per-extension, symmetric encode/decode routines, keyed by extension
//! type (spec §4.2–§4.7). Each recognized extension gets a writer (client
//! side) and/or a parser (whichever side of the handshake actually
//! receives it); unrecognized extensions are either ignored (where the
//! grammar allows it) or fatal, per the message they appear in.

use alloc::string::String;
use alloc::vec::Vec;

use crate::codec::{Codec, Reader, Writer};
use crate::error::Error;
use crate::msgs::enums::{
    ExtensionType, NamedGroup, PskKeyExchangeMode, ProtocolVersion, SignatureScheme,
};
use crate::msgs::handshake::KeyShareEntry;

/// Which message an extension list is being parsed out of. Several
/// extensions are legal in some messages and fatal in others (spec §4.3:
/// "cookie is valid only in HRR; pre_shared_key only in ServerHello;
/// key_share in both but with different payload shapes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionContext {
    ServerHello,
    HelloRetryRequest,
    EncryptedExtensions,
    CertificateRequest,
    NewSessionTicket,
}

/// A single PSK identity offered in `pre_shared_key` (spec §4.2 point 1).
#[derive(Debug, Clone)]
pub struct PskIdentity {
    pub identity: Vec<u8>,
    pub obfuscated_ticket_age: u32,
}

impl Codec for PskIdentity {
    fn encode(&self, w: &mut Writer<'_>) {
        let _ = w.length_prefixed(2, |w| w.put_bytes(&self.identity));
        w.put_u32(self.obfuscated_ticket_age);
    }
    fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let identity = r.get_vec(2)?.to_vec();
        let obfuscated_ticket_age = r.get_u32()?;
        Ok(PskIdentity {
            identity,
            obfuscated_ticket_age,
        })
    }
}

/// The `pre_shared_key` offer as written into ClientHello: the identity
/// list, written up front, and a binder filled in once the rest of the
/// ClientHello (everything before the binders themselves) has been laid
/// out and hashed (spec §4.2 point 2).
#[derive(Debug, Clone)]
pub struct PresharedKeyOffer {
    pub identities: Vec<PskIdentity>,
    /// One binder per identity, each `Hash.len` bytes; filled in by
    /// [`write_binders`] after [`write_identities_and_binders_placeholder`].
    pub binders: Vec<Vec<u8>>,
}

/// Extensions the client may send; writers are invoked in this fixed
/// order, with `PreSharedKey` always last (spec §4.2: "Writers are
/// composed in a fixed order; `pre_shared_key` MUST be last").
#[derive(Debug, Clone)]
pub enum ClientExtension {
    ServerName(String),
    SupportedGroups(Vec<NamedGroup>),
    SignatureAlgorithms(Vec<SignatureScheme>),
    SupportedVersions(Vec<ProtocolVersion>),
    Cookie(Vec<u8>),
    KeyShare(Vec<KeyShareEntry>),
    ApplicationLayerProtocolNegotiation(Vec<Vec<u8>>),
    MaxFragmentLength(u8),
    EarlyData,
    PskKeyExchangeModes(Vec<PskKeyExchangeMode>),
    /// Written in two phases; see [`PresharedKeyOffer`]. Must be last.
    PreSharedKey(PresharedKeyOffer),
}

impl ClientExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            ClientExtension::ServerName(_) => ExtensionType::ServerName,
            ClientExtension::SupportedGroups(_) => ExtensionType::SupportedGroups,
            ClientExtension::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            ClientExtension::SupportedVersions(_) => ExtensionType::SupportedVersions,
            ClientExtension::Cookie(_) => ExtensionType::Cookie,
            ClientExtension::KeyShare(_) => ExtensionType::KeyShare,
            ClientExtension::ApplicationLayerProtocolNegotiation(_) => {
                ExtensionType::ApplicationLayerProtocolNegotiation
            }
            ClientExtension::MaxFragmentLength(_) => ExtensionType::MaxFragmentLength,
            ClientExtension::EarlyData => ExtensionType::EarlyData,
            ClientExtension::PskKeyExchangeModes(_) => ExtensionType::PskKeyExchangeModes,
            ClientExtension::PreSharedKey(_) => ExtensionType::PreSharedKey,
        }
    }

    /// Encode one extension as `{type, length, body}`. `PreSharedKey` must
    /// be handled separately by [`write_identities_and_binders_placeholder`]
    /// / [`write_binders`] — calling this on it would compute a hollow
    /// binders area, not a real one.
    fn encode_body(&self, w: &mut Writer<'_>) {
        match self {
            ClientExtension::ServerName(name) => {
                let _ = w.length_prefixed(2, |w| {
                    w.put_u8(0); // name_type: host_name
                    let _ = w.length_prefixed(2, |w| w.put_bytes(name.as_bytes()));
                });
            }
            ClientExtension::SupportedGroups(groups) => {
                let _ = w.length_prefixed(2, |w| {
                    for g in groups {
                        g.encode(w);
                    }
                });
            }
            ClientExtension::SignatureAlgorithms(schemes) => {
                let _ = w.length_prefixed(2, |w| {
                    for s in schemes {
                        s.encode(w);
                    }
                });
            }
            ClientExtension::SupportedVersions(versions) => {
                let _ = w.length_prefixed(1, |w| {
                    for v in versions {
                        v.encode(w);
                    }
                });
            }
            ClientExtension::Cookie(bytes) => {
                let _ = w.length_prefixed(2, |w| w.put_bytes(bytes));
            }
            ClientExtension::KeyShare(entries) => {
                let _ = w.length_prefixed(2, |w| {
                    for e in entries {
                        e.encode(w);
                    }
                });
            }
            ClientExtension::ApplicationLayerProtocolNegotiation(protos) => {
                let _ = w.length_prefixed(2, |w| {
                    for p in protos {
                        let _ = w.length_prefixed(1, |w| w.put_bytes(p));
                    }
                });
            }
            ClientExtension::MaxFragmentLength(code) => {
                w.put_u8(*code);
            }
            ClientExtension::EarlyData => {}
            ClientExtension::PskKeyExchangeModes(modes) => {
                let _ = w.length_prefixed(1, |w| {
                    for m in modes {
                        m.encode(w);
                    }
                });
            }
            ClientExtension::PreSharedKey(_) => unreachable!("written via the two-phase path"),
        }
    }

    fn write(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        if matches!(self, ClientExtension::PreSharedKey(_)) {
            return Err(Error::Internal(
                "pre_shared_key must be written via the two-phase binder path".into(),
            ));
        }
        self.ext_type().encode(w);
        w.length_prefixed(2, |w| self.encode_body(w))
    }
}

/// Write every extension except a trailing `pre_shared_key`, in the order
/// given. Returns the count written, for the caller's sent-extensions
/// bookkeeping.
pub fn write_client_extensions(
    w: &mut Writer<'_>,
    exts: &[ClientExtension],
) -> Result<usize, Error> {
    let mut n = 0;
    for ext in exts {
        if matches!(ext, ClientExtension::PreSharedKey(_)) {
            continue;
        }
        ext.write(w)?;
        n += 1;
    }
    Ok(n)
}

/// Phase 1 of the PSK extension (spec §4.2 point 2.1): emit the identity
/// list and a zero-filled binders area sized for `binder_lens` binders,
/// each `binder_lens[i]` bytes. Returns the buffer offset where the
/// binders area body starts, so [`write_binders`] can backfill it once the
/// transcript up to this point is known.
pub fn write_identities_and_binders_placeholder(
    w: &mut Writer<'_>,
    identities: &[PskIdentity],
    binder_lens: &[usize],
) -> Result<usize, Error> {
    ExtensionType::PreSharedKey.encode(w);
    let ext_len_pos = w.len();
    w.put_u16(0); // extension_data length, backfilled below
    let ext_body_start = w.len();

    w.length_prefixed(2, |w| {
        for id in identities {
            id.encode(w);
        }
    })?;

    let binders_area_pos = w.len();
    w.put_u16(0); // binders vector length, backfilled by write_binders
    let binders_start = w.len();
    for len in binder_lens {
        // one-byte opaque length prefix, then the (as yet unknown) binder
        w.put_u8(0);
        w.put_bytes(&alloc::vec![0u8; *len]);
    }
    let ext_body_len = w.len() - ext_body_start;
    write_u16_at(w, ext_len_pos, ext_body_len as u16);
    write_u16_at(w, binders_area_pos, (w.len() - binders_start) as u16);
    Ok(binders_start)
}

/// Phase 2: fill in the binders computed over the partial transcript
/// (everything up to, but not including, the binders themselves). Must be
/// called with the same lengths passed to
/// [`write_identities_and_binders_placeholder`], in the same order.
pub fn write_binders(w: &mut Writer<'_>, binders_start: usize, binders: &[Vec<u8>]) {
    let mut pos = binders_start;
    for binder in binders {
        w.overwrite_u8(pos, binder.len() as u8);
        pos += 1;
        w.overwrite_bytes(pos, binder);
        pos += binder.len();
    }
}

fn write_u16_at(w: &mut Writer<'_>, pos: usize, v: u16) {
    w.overwrite_bytes(pos, &v.to_be_bytes());
}

/// The server's key_share payload has two distinct shapes depending on
/// whether it appears in a HelloRetryRequest (selected group only) or a
/// real ServerHello (a full `KeyShareEntry`) — spec §4.3.
#[derive(Debug, Clone)]
pub enum ServerKeyShare {
    Selected(NamedGroup),
    Full(KeyShareEntry),
}

/// Extensions the server may send, across ServerHello, HelloRetryRequest,
/// EncryptedExtensions, CertificateRequest, and NewSessionTicket. Not
/// every variant is legal in every context — see [`parse_server_extension`].
#[derive(Debug, Clone)]
pub enum ServerExtension {
    SupportedVersions(ProtocolVersion),
    KeyShare(ServerKeyShare),
    PreSharedKey(u16),
    Cookie(Vec<u8>),
    MaxFragmentLength(u8),
    SupportedGroups(Vec<NamedGroup>),
    ApplicationLayerProtocolNegotiation(Vec<u8>),
    ServerName,
    EarlyData,
    SignatureAlgorithms(Vec<SignatureScheme>),
    EarlyDataMaxSize(u32),
    Unknown(u16),
}

impl ServerExtension {
    pub fn ext_type_raw(&self) -> u16 {
        match self {
            ServerExtension::SupportedVersions(_) => ExtensionType::SupportedVersions.to_u16(),
            ServerExtension::KeyShare(_) => ExtensionType::KeyShare.to_u16(),
            ServerExtension::PreSharedKey(_) => ExtensionType::PreSharedKey.to_u16(),
            ServerExtension::Cookie(_) => ExtensionType::Cookie.to_u16(),
            ServerExtension::MaxFragmentLength(_) => ExtensionType::MaxFragmentLength.to_u16(),
            ServerExtension::SupportedGroups(_) => ExtensionType::SupportedGroups.to_u16(),
            ServerExtension::ApplicationLayerProtocolNegotiation(_) => {
                ExtensionType::ApplicationLayerProtocolNegotiation.to_u16()
            }
            ServerExtension::ServerName => ExtensionType::ServerName.to_u16(),
            ServerExtension::EarlyData | ServerExtension::EarlyDataMaxSize(_) => {
                ExtensionType::EarlyData.to_u16()
            }
            ServerExtension::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms.to_u16(),
            ServerExtension::Unknown(t) => *t,
        }
    }
}

/// Parse one `{type, length, body}` extension record given the context it
/// was found in. Returns `Err(UnsupportedExtension)` for anything not
/// permitted in that context, per spec §4.3/§4.5/§4.7/§4.9.
pub fn parse_server_extension(
    r: &mut Reader<'_>,
    ctx: ExtensionContext,
) -> Result<ServerExtension, Error> {
    let raw_type = r.get_u16()?;
    let ty = ExtensionType::from_u16(raw_type);
    let mut body = r.sub_reader(2)?;

    let permitted = matches!(
        (ty, ctx),
        (ExtensionType::SupportedVersions, ExtensionContext::ServerHello)
            | (ExtensionType::SupportedVersions, ExtensionContext::HelloRetryRequest)
            | (ExtensionType::KeyShare, ExtensionContext::ServerHello)
            | (ExtensionType::KeyShare, ExtensionContext::HelloRetryRequest)
            | (ExtensionType::PreSharedKey, ExtensionContext::ServerHello)
            | (ExtensionType::Cookie, ExtensionContext::HelloRetryRequest)
            | (ExtensionType::MaxFragmentLength, ExtensionContext::EncryptedExtensions)
            | (ExtensionType::SupportedGroups, ExtensionContext::EncryptedExtensions)
            | (
                ExtensionType::ApplicationLayerProtocolNegotiation,
                ExtensionContext::EncryptedExtensions
            )
            | (ExtensionType::ServerName, ExtensionContext::EncryptedExtensions)
            | (ExtensionType::EarlyData, ExtensionContext::EncryptedExtensions)
            | (ExtensionType::EarlyData, ExtensionContext::NewSessionTicket)
            | (ExtensionType::SignatureAlgorithms, ExtensionContext::CertificateRequest)
    );
    if !permitted {
        return Err(Error::UnsupportedExtension(raw_type));
    }

    Ok(match (ty, ctx) {
        (ExtensionType::SupportedVersions, _) => {
            ServerExtension::SupportedVersions(ProtocolVersion::read(&mut body)?)
        }
        (ExtensionType::KeyShare, ExtensionContext::HelloRetryRequest) => {
            ServerExtension::KeyShare(ServerKeyShare::Selected(NamedGroup::read(&mut body)?))
        }
        (ExtensionType::KeyShare, _) => {
            ServerExtension::KeyShare(ServerKeyShare::Full(KeyShareEntry::read(&mut body)?))
        }
        (ExtensionType::PreSharedKey, _) => ServerExtension::PreSharedKey(body.get_u16()?),
        (ExtensionType::Cookie, _) => ServerExtension::Cookie(body.get_vec(2)?.to_vec()),
        (ExtensionType::MaxFragmentLength, _) => {
            ServerExtension::MaxFragmentLength(body.get_u8()?)
        }
        (ExtensionType::SupportedGroups, _) => {
            let mut groups = Vec::new();
            let mut list = body.sub_reader(2)?;
            while !list.eof() {
                groups.push(NamedGroup::read(&mut list)?);
            }
            ServerExtension::SupportedGroups(groups)
        }
        (ExtensionType::ApplicationLayerProtocolNegotiation, _) => {
            let mut list = body.sub_reader(2)?;
            let proto = list.get_vec(1)?.to_vec();
            if !list.eof() {
                return Err(Error::Decode(
                    "EncryptedExtensions ALPN must contain exactly one protocol".into(),
                ));
            }
            ServerExtension::ApplicationLayerProtocolNegotiation(proto)
        }
        (ExtensionType::ServerName, _) => {
            if !body.eof() {
                return Err(Error::IllegalParameter(
                    "server_name in EncryptedExtensions must be empty".into(),
                ));
            }
            ServerExtension::ServerName
        }
        (ExtensionType::EarlyData, ExtensionContext::NewSessionTicket) => {
            ServerExtension::EarlyDataMaxSize(body.get_u32()?)
        }
        (ExtensionType::EarlyData, _) => {
            if !body.eof() {
                return Err(Error::IllegalParameter(
                    "early_data in EncryptedExtensions must be empty".into(),
                ));
            }
            ServerExtension::EarlyData
        }
        (ExtensionType::SignatureAlgorithms, _) => {
            let mut schemes = Vec::new();
            let mut list = body.sub_reader(2)?;
            while !list.eof() {
                schemes.push(SignatureScheme::read(&mut list)?);
            }
            ServerExtension::SignatureAlgorithms(schemes)
        }
        _ => unreachable!("filtered by `permitted` above"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn client_extension_order_is_preserved_and_psk_excluded() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        let exts = vec![
            ClientExtension::SupportedVersions(vec![ProtocolVersion::TLSv1_3]),
            ClientExtension::KeyShare(vec![KeyShareEntry {
                group: NamedGroup::X25519,
                payload: vec![0u8; 32],
            }]),
            ClientExtension::PreSharedKey(PresharedKeyOffer {
                identities: Vec::new(),
                binders: Vec::new(),
            }),
        ];
        let n = write_client_extensions(&mut w, &exts).unwrap();
        assert_eq!(n, 2);

        let mut r = Reader::new(&buf);
        assert_eq!(r.get_u16().unwrap(), ExtensionType::SupportedVersions.to_u16());
        let _len = r.get_u16().unwrap();
        let _vlen = r.get_u8().unwrap();
        assert_eq!(r.get_u16().unwrap(), ProtocolVersion::TLSv1_3.to_u16());
        assert_eq!(r.get_u16().unwrap(), ExtensionType::KeyShare.to_u16());
    }

    #[test]
    fn psk_binder_two_phase_round_trips() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        let identities = vec![PskIdentity {
            identity: vec![1, 2, 3],
            obfuscated_ticket_age: 42,
        }];
        let binders_start =
            write_identities_and_binders_placeholder(&mut w, &identities, &[32]).unwrap();
        let binder = vec![0xABu8; 32];
        write_binders(&mut w, binders_start, &[binder.clone()]);

        let mut r = Reader::new(&buf);
        assert_eq!(r.get_u16().unwrap(), ExtensionType::PreSharedKey.to_u16());
        let _ext_len = r.get_u16().unwrap();
        let parsed_ids = r.get_vec(2).unwrap();
        let mut idr = Reader::new(parsed_ids);
        let id = PskIdentity::read(&mut idr).unwrap();
        assert_eq!(id.identity, vec![1, 2, 3]);
        assert_eq!(id.obfuscated_ticket_age, 42);

        let binders_blob = r.get_vec(2).unwrap();
        let mut br = Reader::new(binders_blob);
        let got = br.get_vec(1).unwrap();
        assert_eq!(got, binder.as_slice());
    }

    #[test]
    fn unknown_server_hello_extension_is_unsupported() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        w.put_u16(0xFFFF);
        w.put_u16(0);
        let mut r = Reader::new(&buf);
        match parse_server_extension(&mut r, ExtensionContext::ServerHello) {
            Err(Error::UnsupportedExtension(0xFFFF)) => {}
            other => panic!("expected UnsupportedExtension, got {other:?}"),
        }
    }

    #[test]
    fn cookie_only_valid_in_hrr() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        w.put_u16(ExtensionType::Cookie.to_u16());
        let _ = w.length_prefixed(2, |w| {
            let _ = w.length_prefixed(2, |w| w.put_bytes(b"cookie"));
        });
        let mut r = Reader::new(&buf);
        match parse_server_extension(&mut r, ExtensionContext::ServerHello) {
            Err(Error::UnsupportedExtension(_)) => {}
            other => panic!("expected cookie rejected outside HRR, got {other:?}"),
        }
    }
}

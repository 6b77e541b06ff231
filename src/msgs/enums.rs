//! Wire-format enumerations. Unknown values round-trip as their raw numeric
//! form (`Unknown(u16)`), matching how real deployments see GREASE values
//! and not-yet-assigned registry entries.

use crate::codec::{Codec, Reader, Writer};
use crate::error::Error;

macro_rules! u8_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $variant:ident = $val:expr ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $variant ),+,
            Unknown(u8),
        }

        impl $name {
            pub fn to_u8(self) -> u8 {
                match self {
                    $( $name::$variant => $val ),+,
                    $name::Unknown(v) => v,
                }
            }

            pub fn from_u8(v: u8) -> Self {
                match v {
                    $( $val => $name::$variant ),+,
                    v => $name::Unknown(v),
                }
            }
        }

        impl Codec for $name {
            fn encode(&self, w: &mut Writer<'_>) {
                w.put_u8(self.to_u8());
            }
            fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
                Ok(Self::from_u8(r.get_u8()?))
            }
        }
    };
}

macro_rules! u16_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $variant:ident = $val:expr ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $variant ),+,
            Unknown(u16),
        }

        impl $name {
            pub fn to_u16(self) -> u16 {
                match self {
                    $( $name::$variant => $val ),+,
                    $name::Unknown(v) => v,
                }
            }

            pub fn from_u16(v: u16) -> Self {
                match v {
                    $( $val => $name::$variant ),+,
                    v => $name::Unknown(v),
                }
            }
        }

        impl Codec for $name {
            fn encode(&self, w: &mut Writer<'_>) {
                w.put_u16(self.to_u16());
            }
            fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
                Ok(Self::from_u16(r.get_u16()?))
            }
        }
    };
}

u8_enum! {
    /// TLS record content type.
    ContentType {
        ChangeCipherSpec = 20,
        Alert = 21,
        Handshake = 22,
        ApplicationData = 23,
    }
}

u8_enum! {
    HandshakeType {
        ClientHello = 1,
        ServerHello = 2,
        NewSessionTicket = 4,
        EndOfEarlyData = 5,
        EncryptedExtensions = 8,
        Certificate = 11,
        CertificateRequest = 13,
        CertificateVerify = 15,
        Finished = 20,
        KeyUpdate = 24,
        MessageHash = 254,
    }
}

u16_enum! {
    ExtensionType {
        ServerName = 0,
        MaxFragmentLength = 1,
        StatusRequest = 5,
        SupportedGroups = 10,
        SignatureAlgorithms = 13,
        ApplicationLayerProtocolNegotiation = 16,
        SignedCertificateTimestamp = 18,
        Padding = 21,
        PreSharedKey = 41,
        EarlyData = 42,
        SupportedVersions = 43,
        Cookie = 44,
        PskKeyExchangeModes = 45,
        CertificateAuthorities = 47,
        SignatureAlgorithmsCert = 50,
        KeyShare = 51,
    }
}

u16_enum! {
    NamedGroup {
        Secp256r1 = 0x0017,
        Secp384r1 = 0x0018,
        Secp521r1 = 0x0019,
        X25519 = 0x001D,
        X448 = 0x001E,
        Ffdhe2048 = 0x0100,
    }
}

impl NamedGroup {
    pub fn is_ecdhe(self) -> bool {
        matches!(
            self,
            NamedGroup::Secp256r1
                | NamedGroup::Secp384r1
                | NamedGroup::Secp521r1
                | NamedGroup::X25519
                | NamedGroup::X448
        )
    }
}

u16_enum! {
    CipherSuite {
        Aes128GcmSha256 = 0x1301,
        Aes256GcmSha384 = 0x1302,
        Chacha20Poly1305Sha256 = 0x1303,
    }
}

impl CipherSuite {
    /// Transcript/key-schedule hash width in bytes for this suite.
    pub fn hash_len(self) -> usize {
        match self {
            CipherSuite::Aes256GcmSha384 => 48,
            _ => 32,
        }
    }

    /// AEAD key length in bytes. The record layer owns the cipher itself;
    /// the key schedule only needs the size to call `HKDF-Expand-Label`
    /// with the right output length.
    pub fn aead_key_len(self) -> usize {
        match self {
            CipherSuite::Aes128GcmSha256 => 16,
            CipherSuite::Aes256GcmSha384 | CipherSuite::Chacha20Poly1305Sha256 => 32,
            CipherSuite::Unknown(_) => 16,
        }
    }

    /// AEAD nonce/IV length in bytes; 12 for every RFC 8446 §B.4 suite.
    pub fn aead_iv_len(self) -> usize {
        12
    }
}

u16_enum! {
    SignatureScheme {
        RsaPkcs1Sha256 = 0x0401,
        EcdsaSecp256r1Sha256 = 0x0403,
        RsaPssRsaeSha256 = 0x0804,
        Ed25519 = 0x0807,
        RsaPssRsaeSha384 = 0x0805,
        RsaPssRsaeSha512 = 0x0806,
        EcdsaSecp384r1Sha384 = 0x0503,
        EcdsaSecp521r1Sha512 = 0x0603,
    }
}

u8_enum! {
    AlertDescription {
        CloseNotify = 0,
        UnexpectedMessage = 10,
        BadRecordMac = 20,
        DecryptError = 51,
        HandshakeFailure = 40,
        BadCertificate = 42,
        UnsupportedCertificate = 43,
        CertificateRevoked = 44,
        CertificateExpired = 45,
        CertificateUnknown = 46,
        IllegalParameter = 47,
        UnknownCa = 48,
        AccessDenied = 49,
        DecodeError = 50,
        ProtocolVersion = 70,
        MissingExtension = 109,
        UnsupportedExtension = 110,
        CertificateRequired = 116,
    }
}

u16_enum! {
    ProtocolVersion {
        SSLv2 = 0x0200,
        TLSv1_0 = 0x0301,
        TLSv1_1 = 0x0302,
        TLSv1_2 = 0x0303,
        TLSv1_3 = 0x0304,
    }
}

u8_enum! {
    Compression {
        Null = 0,
    }
}

u8_enum! {
    /// RFC 8446 §4.2.9 PSK key exchange modes.
    PskKeyExchangeMode {
        PskKe = 0,
        PskDheKe = 1,
    }
}

/// RFC 8446 §4.1.3 downgrade-protection sentinels: the last 8 bytes a
/// TLS-1.3-capable server MUST set in ServerHello.random when it
/// negotiates an older version.
pub const DOWNGRADE_TO_TLS12_SENTINEL: [u8; 8] = *b"DOWNGRD\x01";
pub const DOWNGRADE_TO_TLS11_OR_BELOW_SENTINEL: [u8; 8] = *b"DOWNGRD\x00";

/// SHA-256("HelloRetryRequest"), the fixed random value that designates a
/// ServerHello as a HelloRetryRequest (RFC 8446 §4.1.3).
pub const HRR_RANDOM: [u8; 32] = [
    0xCF, 0x21, 0xAD, 0x74, 0xE5, 0x9A, 0x61, 0x11, 0xBE, 0x1D, 0x8C, 0x02, 0x1E, 0x65, 0xB8, 0x91,
    0xC2, 0xA2, 0x11, 0x16, 0x7A, 0xBB, 0x8C, 0x5E, 0x07, 0x9E, 0x09, 0xE2, 0xC8, 0xA8, 0x33, 0x9C,
];

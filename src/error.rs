//! Error taxonomy for the handshake core.
//!
//! Mirrors spec §7: each variant group maps to exactly one TLS alert (or to
//! no alert at all, for resource/internal failures that may leave nothing
//! deliverable). `Error` never represents a would-block condition — that is
//! [`crate::state::StepResult::WantRead`] / `WantWrite`, handled entirely
//! outside this enum so a caller can't mistake it for a terminal failure.

use alloc::string::String;
use core::fmt;

use crate::msgs::enums::AlertDescription;

/// Why a peer certificate chain failed validation, as reported by the
/// external X.509 collaborator ([`crate::io::CertVerifier`]) and mapped to
/// an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateError {
    AccessDenied,
    BadCertificate,
    UnsupportedCertificate,
    CertificateExpired,
    CertificateRevoked,
    UnknownCa,
    CertificateUnknown,
    CertificateRequired,
    NoClientCertificate,
}

impl CertificateError {
    pub fn alert(self) -> AlertDescription {
        match self {
            CertificateError::AccessDenied => AlertDescription::AccessDenied,
            CertificateError::BadCertificate => AlertDescription::BadCertificate,
            CertificateError::UnsupportedCertificate => AlertDescription::UnsupportedCertificate,
            CertificateError::CertificateExpired => AlertDescription::CertificateExpired,
            CertificateError::CertificateRevoked => AlertDescription::CertificateRevoked,
            CertificateError::UnknownCa => AlertDescription::UnknownCa,
            CertificateError::CertificateUnknown => AlertDescription::CertificateUnknown,
            CertificateError::CertificateRequired => AlertDescription::CertificateRequired,
            CertificateError::NoClientCertificate => AlertDescription::CertificateRequired,
        }
    }
}

/// The core's error currency. Every fallible operation in this crate
/// returns `Result<_, Error>`.
#[derive(Debug, Clone)]
pub enum Error {
    /// Truncated buffer, bad length field, unexpected fixed value.
    Decode(String),
    /// Valid shape but violates a TLS 1.3 rule (bad version, bad echo,
    /// wrong HRR group, bad downgrade sentinel).
    IllegalParameter(String),
    /// Wrong handshake type for the current state, or a second HRR.
    UnexpectedMessage(String),
    /// An extension was present in a message that may not carry it.
    UnsupportedExtension(u16),
    /// No common ciphersuite, signature algorithm, or key-exchange mode.
    HandshakeFailure(String),
    /// Finished MAC mismatch or CertificateVerify signature invalid.
    DecryptError(String),
    /// Certificate chain validation failure, pre-mapped to an alert family.
    Certificate(CertificateError),
    /// Allocation or other resource failure. No alert is guaranteed
    /// deliverable.
    Resource(String),
    /// An invariant was violated; this indicates a bug in the driver or
    /// its collaborators, not a protocol violation by the peer.
    Internal(String),
}

impl Error {
    /// The alert to queue for this error, if any is deliverable.
    pub fn alert(&self) -> Option<AlertDescription> {
        match self {
            Error::Decode(_) => Some(AlertDescription::DecodeError),
            Error::IllegalParameter(_) => Some(AlertDescription::IllegalParameter),
            Error::UnexpectedMessage(_) => Some(AlertDescription::UnexpectedMessage),
            Error::UnsupportedExtension(_) => Some(AlertDescription::UnsupportedExtension),
            Error::HandshakeFailure(_) => Some(AlertDescription::HandshakeFailure),
            Error::DecryptError(_) => Some(AlertDescription::DecryptError),
            Error::Certificate(c) => Some(c.alert()),
            Error::Resource(_) | Error::Internal(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Decode(msg) => write!(f, "decode error: {msg}"),
            Error::IllegalParameter(msg) => write!(f, "illegal parameter: {msg}"),
            Error::UnexpectedMessage(msg) => write!(f, "unexpected message: {msg}"),
            Error::UnsupportedExtension(ty) => write!(f, "unsupported extension: {ty:#06x}"),
            Error::HandshakeFailure(msg) => write!(f, "handshake failure: {msg}"),
            Error::DecryptError(msg) => write!(f, "decrypt error: {msg}"),
            Error::Certificate(c) => write!(f, "certificate error: {c:?}"),
            Error::Resource(msg) => write!(f, "resource error: {msg}"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

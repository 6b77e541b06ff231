//! Transform descriptor and lifecycle binder (spec §4.4, §9 design note:
//! "a reimplementation should express [the source's function-pointer
//! transform table] as a capability trait supplied as a handle to the
//! record layer"). This module owns the descriptor and the bookkeeping
//! around allocating and installing one; the AEAD operations themselves
//! are the record layer's problem once a transform has been handed over.

use alloc::vec::Vec;
use zeroize::Zeroize;

/// Direction a transform protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformDirection {
    ClientToServer,
    ServerToClient,
}

/// An opaque, monotonically-advancing identifier for the active
/// transform on one direction, assigned by the record layer when a
/// transform is installed (spec glossary: "Epoch").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(pub u64);

/// One direction's traffic keying material: AEAD key, IV, and the
/// running sequence counter, plus the negotiated hash length so the
/// record layer can recompute per-record nonces and expansion (spec §3
/// Transform entity).
///
/// Zeroized on drop; the orchestrator that allocates these frees (drops)
/// them on any failure path before install (spec §5 "Ephemeral private
/// keys are zeroized on success, failure, or reset" — the same discipline
/// applies to traffic secrets).
pub struct Transform {
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
    pub sequence: u64,
}

impl Transform {
    pub fn new(key: Vec<u8>, iv: Vec<u8>) -> Self {
        Self {
            key,
            iv,
            sequence: 0,
        }
    }

    /// The per-record nonce: the IV with the big-endian sequence number
    /// XORed into its low-order bytes (RFC 8446 §5.3).
    pub fn next_nonce(&mut self) -> Vec<u8> {
        let mut nonce = self.iv.clone();
        let seq_bytes = self.sequence.to_be_bytes();
        let offset = nonce.len() - seq_bytes.len();
        for (n, s) in nonce[offset..].iter_mut().zip(seq_bytes.iter()) {
            *n ^= *s;
        }
        self.sequence += 1;
        nonce
    }
}

impl Drop for Transform {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl core::fmt::Debug for Transform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transform")
            .field("key", &"<redacted>")
            .field("iv", &"<redacted>")
            .field("sequence", &self.sequence)
            .finish()
    }
}

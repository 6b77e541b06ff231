//! Key-schedule orchestrator (spec §4.4): invokes early/handshake/
//! application secret derivation and traffic-key generation at the
//! correct transition points. The HKDF mechanics themselves come from
//! whatever [`HkdfOps`] the embedder supplies — this module only ever
//! calls `Derive-Secret`/`HKDF-Expand-Label` the way RFC 8446 §7.1
//! specifies, never the hash primitive directly.

use alloc::vec::Vec;

use crate::io::HkdfOps;
use crate::transform::Transform;

/// `Derive-Secret(Secret, Label, Messages) = HKDF-Expand-Label(Secret,
/// Label, Transcript-Hash(Messages), Hash.length)` (RFC 8446 §7.1).
fn derive_secret(hkdf: &impl HkdfOps, secret: &[u8], label: &str, transcript_hash: &[u8]) -> Vec<u8> {
    hkdf.hkdf_expand_label(secret, label, transcript_hash, hkdf.hash_len())
}

/// The three stages of RFC 8446's key schedule, advanced one at a time
/// by the state machine as it crosses the transition points spec §4.4
/// names. Each stage's secrets stay available afterward (e.g. the
/// `resumption_master_secret` from the application stage feeds ticket
/// ingestion long after the handshake completes).
pub struct KeySchedule<H: HkdfOps> {
    hkdf: H,
    early_secret: Option<Vec<u8>>,
    handshake_secret: Option<Vec<u8>>,
    master_secret: Option<Vec<u8>>,
    pub client_handshake_traffic_secret: Option<Vec<u8>>,
    pub server_handshake_traffic_secret: Option<Vec<u8>>,
    pub client_application_traffic_secret: Option<Vec<u8>>,
    pub server_application_traffic_secret: Option<Vec<u8>>,
    pub resumption_master_secret: Option<Vec<u8>>,
}

impl<H: HkdfOps> KeySchedule<H> {
    pub fn new(hkdf: H) -> Self {
        Self {
            hkdf,
            early_secret: None,
            handshake_secret: None,
            master_secret: None,
            client_handshake_traffic_secret: None,
            server_handshake_traffic_secret: None,
            client_application_traffic_secret: None,
            server_application_traffic_secret: None,
            resumption_master_secret: None,
        }
    }

    /// Stage 1 (spec §4.4.1): derive `early_secret` from the chosen PSK,
    /// or from an all-zero IKM of `Hash.len` bytes if no PSK is offered.
    /// Called after ClientHello is written, and again (idempotently,
    /// re-deriving over the same PSK) after ServerHello is parsed — the
    /// open question in spec §9 ("skipping redundant early-secret
    /// derivation") is left unresolved; this always re-derives.
    pub fn derive_early_secret(&mut self, psk: Option<&[u8]>) {
        let zero = alloc::vec![0u8; self.hkdf.hash_len()];
        let ikm = psk.unwrap_or(&zero);
        self.early_secret = Some(self.hkdf.hkdf_extract(&zero, ikm));
    }

    /// The PSK binder key: `ext binder` for an externally provisioned
    /// PSK, `res binder` for one derived from a ticket (RFC 8446 §7.1).
    pub fn binder_key(&self, is_external_psk: bool) -> Vec<u8> {
        let early_secret = self
            .early_secret
            .as_ref()
            .expect("derive_early_secret must run before binder_key");
        let label = if is_external_psk {
            "ext binder"
        } else {
            "res binder"
        };
        let empty_hash = self.hkdf.hash_empty();
        derive_secret(&self.hkdf, early_secret, label, &empty_hash)
    }

    /// `HMAC(binder_key, Transcript(ClientHello-without-binders))` (spec
    /// §4.2 point 2).
    pub fn binder_mac(&self, binder_key: &[u8], partial_transcript_hash: &[u8]) -> Vec<u8> {
        let finished_key = derive_secret(&self.hkdf, binder_key, "finished", &self.hkdf.hash_empty());
        self.hkdf.hmac(&finished_key, partial_transcript_hash)
    }

    /// Client early traffic secret, derived over the ClientHello-only
    /// transcript (used to key 0-RTT application data).
    pub fn client_early_traffic_secret(&self, client_hello_hash: &[u8]) -> Vec<u8> {
        let early_secret = self
            .early_secret
            .as_ref()
            .expect("derive_early_secret must run before client_early_traffic_secret");
        derive_secret(&self.hkdf, early_secret, "c e traffic", client_hello_hash)
    }

    /// Stage 2 (spec §4.4.2): immediately after ServerHello
    /// post-processing, mix in the (EC)DHE shared secret — or an all-zero
    /// IKM under PSK-only mode — to derive `handshake_secret`, then the
    /// two handshake traffic secrets over the transcript through
    /// ServerHello.
    pub fn derive_handshake_secret(
        &mut self,
        ecdhe_shared_secret: Option<&[u8]>,
        transcript_hash_through_server_hello: &[u8],
    ) {
        let early_secret = self
            .early_secret
            .as_ref()
            .expect("derive_early_secret must run before derive_handshake_secret");
        let empty_hash = self.hkdf.hash_empty();
        let derived = derive_secret(&self.hkdf, early_secret, "derived", &empty_hash);

        let zero = alloc::vec![0u8; self.hkdf.hash_len()];
        let ikm = ecdhe_shared_secret.unwrap_or(&zero);
        let handshake_secret = self.hkdf.hkdf_extract(&derived, ikm);

        self.client_handshake_traffic_secret = Some(derive_secret(
            &self.hkdf,
            &handshake_secret,
            "c hs traffic",
            transcript_hash_through_server_hello,
        ));
        self.server_handshake_traffic_secret = Some(derive_secret(
            &self.hkdf,
            &handshake_secret,
            "s hs traffic",
            transcript_hash_through_server_hello,
        ));
        self.handshake_secret = Some(handshake_secret);
    }

    /// Stage 3 (spec §4.4.3): after server Finished validates, derive
    /// `master_secret`, the application traffic secrets over the
    /// transcript through server Finished, and
    /// `resumption_master_secret` over the transcript through client
    /// Finished (that one is computed later, once available — see
    /// [`Self::derive_resumption_master_secret`]).
    pub fn derive_master_secret(&mut self, transcript_hash_through_server_finished: &[u8]) {
        let handshake_secret = self
            .handshake_secret
            .as_ref()
            .expect("derive_handshake_secret must run before derive_master_secret");
        let empty_hash = self.hkdf.hash_empty();
        let derived = derive_secret(&self.hkdf, handshake_secret, "derived", &empty_hash);
        let zero = alloc::vec![0u8; self.hkdf.hash_len()];
        let master_secret = self.hkdf.hkdf_extract(&derived, &zero);

        self.client_application_traffic_secret = Some(derive_secret(
            &self.hkdf,
            &master_secret,
            "c ap traffic",
            transcript_hash_through_server_finished,
        ));
        self.server_application_traffic_secret = Some(derive_secret(
            &self.hkdf,
            &master_secret,
            "s ap traffic",
            transcript_hash_through_server_finished,
        ));
        self.master_secret = Some(master_secret);
    }

    /// `resumption_master_secret`, derived once the client Finished has
    /// been sent and its transcript hash is known (spec §4.4.3, §4.9
    /// NewSessionTicket ingester).
    pub fn derive_resumption_master_secret(&mut self, transcript_hash_through_client_finished: &[u8]) {
        let master_secret = self
            .master_secret
            .as_ref()
            .expect("derive_master_secret must run before derive_resumption_master_secret");
        self.resumption_master_secret = Some(derive_secret(
            &self.hkdf,
            master_secret,
            "res master",
            transcript_hash_through_client_finished,
        ));
    }

    /// `HKDF-Expand-Label(resumption_master_secret, "resumption", nonce,
    /// Hash.len)` (spec §4.9), the resumption PSK a NewSessionTicket
    /// establishes.
    pub fn resumption_psk(&self, nonce: &[u8]) -> Vec<u8> {
        let rms = self
            .resumption_master_secret
            .as_ref()
            .expect("derive_resumption_master_secret must run before resumption_psk");
        self.hkdf
            .hkdf_expand_label(rms, "resumption", nonce, self.hkdf.hash_len())
    }

    /// `finished_key = HKDF-Expand-Label(BaseKey, "finished", "",
    /// Hash.length)` (spec §4.8).
    pub fn finished_key(&self, base_key: &[u8]) -> Vec<u8> {
        derive_secret(&self.hkdf, base_key, "finished", &self.hkdf.hash_empty())
    }

    /// `HMAC(finished_key, Transcript-Hash(handshake so far))` (spec
    /// §4.8).
    pub fn finished_verify_data(&self, base_key: &[u8], transcript_hash: &[u8]) -> Vec<u8> {
        let key = self.finished_key(base_key);
        self.hkdf.hmac(&key, transcript_hash)
    }

    /// Derive a direction's traffic key and IV from its traffic secret,
    /// wrapped as an installable [`Transform`] (spec §4.4: "generate
    /// inbound and outbound ... traffic keys").
    pub fn traffic_keys(&self, traffic_secret: &[u8], key_len: usize, iv_len: usize) -> Transform {
        let key = self.hkdf.hkdf_expand_label(traffic_secret, "key", &[], key_len);
        let iv = self.hkdf.hkdf_expand_label(traffic_secret, "iv", &[], iv_len);
        Transform::new(key, iv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    struct FakeHkdf;

    // Folds every input byte into the output instead of truncating the
    // concatenation, so distinct labels/contexts over the same secret don't
    // collapse to the same "derived" value (a plain truncate would let the
    // first 32 bytes of `secret` pass straight through unchanged whenever
    // `secret.len() >= len`, which is exactly the common case here).
    fn fold(parts: &[&[u8]], len: usize, pad: u8) -> Vec<u8> {
        let mut out = alloc::vec![pad; len];
        let mut i = 0usize;
        for part in parts {
            for &b in *part {
                let idx = i % len;
                out[idx] = out[idx].wrapping_add(b).rotate_left(3) ^ (i as u8);
                i += 1;
            }
        }
        out
    }

    impl HkdfOps for FakeHkdf {
        fn hkdf_extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
            fold(&[salt, ikm], 32, 0xAB)
        }
        fn hkdf_expand_label(&self, secret: &[u8], label: &str, context: &[u8], len: usize) -> Vec<u8> {
            fold(&[secret, label.as_bytes(), context], len, 0xCD)
        }
        fn hash_empty(&self) -> Vec<u8> {
            alloc::vec![0u8; 32]
        }
        fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
            fold(&[key, data], 32, 0xEF)
        }
        fn hash_len(&self) -> usize {
            32
        }
    }

    #[test]
    fn early_secret_required_before_binder_key() {
        let mut ks = KeySchedule::new(FakeHkdf);
        ks.derive_early_secret(Some(b"psk-bytes"));
        let key = ks.binder_key(true);
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn handshake_secret_chains_from_early_secret() {
        let mut ks = KeySchedule::new(FakeHkdf);
        ks.derive_early_secret(None);
        ks.derive_handshake_secret(Some(b"shared-ecdhe-secret"), &[1u8; 32]);
        assert!(ks.client_handshake_traffic_secret.is_some());
        assert!(ks.server_handshake_traffic_secret.is_some());
        assert_ne!(
            ks.client_handshake_traffic_secret,
            ks.server_handshake_traffic_secret
        );
    }

    #[test]
    fn traffic_keys_have_requested_lengths() {
        let ks = KeySchedule::new(FakeHkdf);
        let transform = ks.traffic_keys(&[0u8; 32], 16, 12);
        assert_eq!(transform.key.len(), 16);
        assert_eq!(transform.iv.len(), 12);
    }
}

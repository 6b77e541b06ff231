//! Full handshake driver tests: a complete `Collaborators` bundle of fakes
//! wired through `HandshakeMachine::step()` the way a real embedder would
//! drive it, one message send or receive at a time. The per-module unit
//! tests elsewhere in this crate exercise individual parsers and key
//! derivations in isolation; these exercise the state machine's transition
//! table end to end, including the rejection paths a single module test
//! can't observe (the driver has to actually be sitting in the right state
//! for a message to be accepted or refused).

#[cfg(test)]
mod tests {
    use alloc::collections::VecDeque;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::codec::{Codec, Writer};
    use crate::config::HandshakeConfig;
    use crate::error::Error;
    use crate::io::{
        CertVerifier, CertVerifyFlags, Clock, Collaborators, EcdheOps, FetchOutcome, HkdfOps,
        PskEntry, PskProvider, RecordLayer, Rng, SignatureOps, TranscriptHasher,
    };
    use crate::msgs::enums::{
        AlertDescription, CipherSuite, Compression, HandshakeType, NamedGroup, ProtocolVersion,
        SignatureScheme, DOWNGRADE_TO_TLS12_SENTINEL, HRR_RANDOM,
    };
    use crate::msgs::handshake::{
        CertificateEntry, CertificatePayload, CertificateVerifyPayload, FinishedPayload,
        KeyShareEntry, LegacySessionId, Random,
    };
    use crate::msgs::enums::ExtensionType;
    use crate::state::{HandshakeMachine, State, StepResult};
    use crate::transform::{Epoch, Transform, TransformDirection};

    // Folds every input byte into a fixed-width output instead of the
    // truncate-the-concatenation shortcut other fakes in this crate use —
    // with that shortcut a 32-byte secret simply passes through unchanged
    // whenever it's at least as long as the requested output, which would
    // make every derived secret in a multi-stage handshake identical.
    fn fold_bytes(data: &[u8], len: usize, pad: u8) -> Vec<u8> {
        let mut out = vec![pad; len];
        for (i, &b) in data.iter().enumerate() {
            let idx = i % len;
            out[idx] = out[idx].wrapping_add(b).rotate_left(3) ^ ((i as u8) ^ ((i >> 8) as u8));
        }
        out
    }

    struct FakeHkdf;

    impl HkdfOps for FakeHkdf {
        fn hkdf_extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
            let mut buf = salt.to_vec();
            buf.extend_from_slice(ikm);
            fold_bytes(&buf, 32, 0xAB)
        }
        fn hkdf_expand_label(&self, secret: &[u8], label: &str, context: &[u8], len: usize) -> Vec<u8> {
            let mut buf = secret.to_vec();
            buf.extend_from_slice(label.as_bytes());
            buf.extend_from_slice(context);
            fold_bytes(&buf, len, 0xCD)
        }
        fn hash_empty(&self) -> Vec<u8> {
            fold_bytes(&[], 32, 0)
        }
        fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
            let mut buf = key.to_vec();
            buf.extend_from_slice(data);
            fold_bytes(&buf, 32, 0xEF)
        }
        fn hash_len(&self) -> usize {
            32
        }
    }

    #[derive(Clone, Default)]
    struct FakeHasher(Vec<u8>);

    impl TranscriptHasher for FakeHasher {
        fn new() -> Self {
            FakeHasher(Vec::new())
        }
        fn update(&mut self, bytes: &[u8]) {
            self.0.extend_from_slice(bytes);
        }
        fn clone_finalize(&self) -> Vec<u8> {
            fold_bytes(&self.0, 32, 0)
        }
    }

    struct FakeEcdhe;

    impl EcdheOps for FakeEcdhe {
        fn generate(&self, _group: NamedGroup) -> Result<(Vec<u8>, Vec<u8>), Error> {
            Ok((vec![0xAAu8; 32], vec![0xBBu8; 32]))
        }
        fn derive(&self, _group: NamedGroup, private: &[u8], peer_public: &[u8]) -> Result<Vec<u8>, Error> {
            let mut buf = private.to_vec();
            buf.extend_from_slice(peer_public);
            Ok(fold_bytes(&buf, 32, 0x5A))
        }
    }

    struct FakeSign;

    impl SignatureOps for FakeSign {
        fn verify(
            &self,
            _scheme: SignatureScheme,
            _public_key: &[u8],
            _message: &[u8],
            _signature: &[u8],
        ) -> Result<(), Error> {
            Ok(())
        }
        fn sign(&self, _scheme: SignatureScheme, _message: &[u8]) -> Result<Option<Vec<u8>>, Error> {
            Ok(None)
        }
    }

    struct FakeCert;

    impl CertVerifier for FakeCert {
        type Chain = ();

        fn parse_der(&self, _entries: &[pki_types::CertificateDer<'static>]) -> Result<Self::Chain, Error> {
            Ok(())
        }
        fn verify_with_profile(&self, _chain: &Self::Chain, _server_name: &str) -> Result<CertVerifyFlags, Error> {
            Ok(CertVerifyFlags::default())
        }
        fn leaf_public_key<'a>(&self, _chain: &'a Self::Chain) -> &'a [u8] {
            &[]
        }
    }

    #[derive(Default)]
    struct FakePsk;

    impl PskProvider for FakePsk {
        fn get_psk_to_offer(&self) -> Option<PskEntry> {
            None
        }
        fn set_handshake_psk(&mut self, _psk: PskEntry) {}
        fn remove_handshake_psk(&mut self) {}
    }

    struct FakeClock;

    impl Clock for FakeClock {
        fn now(&self) -> Option<u64> {
            None
        }
    }

    struct FakeRng;

    impl Rng for FakeRng {
        fn fill(&self, buf: &mut [u8]) {
            buf.fill(0x07);
        }
    }

    /// A minimal in-memory record layer: an inbound queue the test feeds,
    /// an outbound log the test inspects, and bookkeeping for whichever
    /// transforms/alerts/CCS records the driver produced. No framing, no
    /// encryption — that's the point of the collaborator boundary.
    #[derive(Default)]
    struct FakeRecordLayer {
        inbound: VecDeque<(HandshakeType, Vec<u8>)>,
        sent: Vec<(HandshakeType, Vec<u8>)>,
        transforms: Vec<(TransformDirection, Vec<u8>, Vec<u8>)>,
        installed_inbound: Option<Epoch>,
        installed_outbound: Option<Epoch>,
        ccs_count: u32,
        alerts: Vec<AlertDescription>,
        app_data_written: Vec<Vec<u8>>,
        out_buf: Vec<u8>,
        out_ty: Option<HandshakeType>,
        pending_fetch: Option<Vec<u8>>,
    }

    impl RecordLayer for FakeRecordLayer {
        fn fetch_handshake(&mut self, acceptable: &[HandshakeType]) -> Result<FetchOutcome<'_>, Error> {
            let next_ty = self.inbound.front().map(|(ty, _)| *ty);
            match next_ty {
                None => Ok(FetchOutcome::WantRead),
                Some(ty) if acceptable.contains(&ty) => {
                    let (_, bytes) = self.inbound.pop_front().expect("front() just confirmed non-empty");
                    self.pending_fetch = Some(bytes);
                    Ok(FetchOutcome::Message(ty, self.pending_fetch.as_ref().unwrap()))
                }
                Some(_) => Err(Error::UnexpectedMessage(
                    "fake record layer: queued message's type isn't among the acceptable set".into(),
                )),
            }
        }

        fn start_handshake(&mut self, ty: HandshakeType) -> &mut Vec<u8> {
            self.out_buf.clear();
            self.out_ty = Some(ty);
            &mut self.out_buf
        }

        fn finish_handshake(&mut self) -> Result<(), Error> {
            let ty = self.out_ty.take().expect("start_handshake must precede finish_handshake");
            let body = core::mem::take(&mut self.out_buf);
            self.sent.push((ty, body));
            Ok(())
        }

        fn write_application(&mut self, bytes: &[u8]) -> Result<(), Error> {
            self.app_data_written.push(bytes.to_vec());
            Ok(())
        }

        fn write_ccs(&mut self) -> Result<(), Error> {
            self.ccs_count += 1;
            Ok(())
        }

        fn add_key_material(&mut self, direction: TransformDirection, transform: Transform) -> Epoch {
            let epoch = Epoch(self.transforms.len() as u64);
            self.transforms.push((direction, transform.key.clone(), transform.iv.clone()));
            epoch
        }

        fn install_inbound_transform(&mut self, epoch: Epoch) {
            self.installed_inbound = Some(epoch);
        }

        fn install_outbound_transform(&mut self, epoch: Epoch) {
            self.installed_outbound = Some(epoch);
        }

        fn queue_alert(&mut self, alert: AlertDescription) {
            self.alerts.push(alert);
        }
    }

    struct TestCollabs;

    impl Collaborators for TestCollabs {
        type Record = FakeRecordLayer;
        type Hkdf = FakeHkdf;
        type Ecdhe = FakeEcdhe;
        type Sign = FakeSign;
        type Cert = FakeCert;
        type Psk = FakePsk;
        type Clock = FakeClock;
        type Rng = FakeRng;
        type Hasher = FakeHasher;
    }

    fn ephemeral_config() -> Arc<HandshakeConfig> {
        Arc::new(HandshakeConfig::new_ephemeral_only(
            vec![CipherSuite::Aes128GcmSha256],
            vec![NamedGroup::X25519],
            vec![SignatureScheme::Ed25519],
        ))
    }

    fn two_group_config() -> Arc<HandshakeConfig> {
        Arc::new(HandshakeConfig::new_ephemeral_only(
            vec![CipherSuite::Aes128GcmSha256],
            vec![NamedGroup::X25519, NamedGroup::Secp256r1],
            vec![SignatureScheme::Ed25519],
        ))
    }

    fn new_machine(config: Arc<HandshakeConfig>) -> HandshakeMachine<TestCollabs> {
        HandshakeMachine::<TestCollabs>::new(
            config,
            FakeRecordLayer::default(),
            FakeHkdf,
            FakeEcdhe,
            FakeSign,
            FakeCert,
            FakePsk,
            FakeClock,
            FakeRng,
        )
    }

    fn assert_continue(r: StepResult) {
        match r {
            StepResult::OkContinue => {}
            StepResult::Error(e) => panic!("unexpected handshake error: {e}"),
            _ => panic!("expected OkContinue"),
        }
    }

    fn assert_error(r: StepResult, pred: impl Fn(&Error) -> bool, what: &str) {
        match r {
            StepResult::Error(e) if pred(&e) => {}
            StepResult::Error(e) => panic!("expected {what}, got a different error instead: {e}"),
            _ => panic!("expected {what}, got a non-error step result"),
        }
    }

    /// Drive the three `HELLO_REQUEST`/`CLIENT_HELLO`/`EARLY_APP_DATA`
    /// states and return the ClientHello body the machine sent.
    fn drive_client_hello(machine: &mut HandshakeMachine<TestCollabs>) -> Vec<u8> {
        for _ in 0..3 {
            assert_continue(machine.step());
        }
        machine
            .record
            .sent
            .last()
            .expect("ClientHello should have been sent by now")
            .1
            .clone()
    }

    fn write_ext_supported_versions(buf: &mut Vec<u8>) {
        let mut w = Writer::new(buf);
        ExtensionType::SupportedVersions.encode(&mut w);
        let _ = w.length_prefixed(2, |w| ProtocolVersion::TLSv1_3.encode(w));
    }

    fn write_ext_key_share_full(buf: &mut Vec<u8>, group: NamedGroup, payload: &[u8]) {
        let mut w = Writer::new(buf);
        ExtensionType::KeyShare.encode(&mut w);
        let _ = w.length_prefixed(2, |w| {
            KeyShareEntry { group, payload: payload.to_vec() }.encode(w);
        });
    }

    fn write_ext_key_share_hrr(buf: &mut Vec<u8>, group: NamedGroup) {
        let mut w = Writer::new(buf);
        ExtensionType::KeyShare.encode(&mut w);
        let _ = w.length_prefixed(2, |w| group.encode(w));
    }

    fn write_ext_cookie(buf: &mut Vec<u8>, cookie: &[u8]) {
        let mut w = Writer::new(buf);
        ExtensionType::Cookie.encode(&mut w);
        let _ = w.length_prefixed(2, |w| {
            let _ = w.length_prefixed(2, |w| w.put_bytes(cookie));
        });
    }

    fn write_ext_unknown(buf: &mut Vec<u8>, ty: u16) {
        let mut w = Writer::new(buf);
        w.put_u16(ty);
        w.put_u16(0);
    }

    fn build_server_hello(random: [u8; 32], session_id: &[u8], suite: CipherSuite, ext_bytes: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        ProtocolVersion::TLSv1_2.encode(&mut w);
        Random(random).encode(&mut w);
        LegacySessionId(session_id.to_vec()).encode(&mut w);
        suite.encode(&mut w);
        Compression::Null.encode(&mut w);
        let _ = w.length_prefixed(2, |w| w.put_bytes(ext_bytes));
        buf
    }

    #[test]
    fn full_ephemeral_handshake_reaches_done() {
        let mut machine = new_machine(ephemeral_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();

        let peer_public = vec![0x42u8; 32];
        let mut sh_ext = Vec::new();
        write_ext_supported_versions(&mut sh_ext);
        write_ext_key_share_full(&mut sh_ext, NamedGroup::X25519, &peer_public);
        let sh_body = build_server_hello([0x11u8; 32], &session_id, CipherSuite::Aes128GcmSha256, &sh_ext);
        machine.record.inbound.push_back((HandshakeType::ServerHello, sh_body));
        assert_continue(machine.step());
        assert_eq!(machine.state(), State::EncryptedExtensions);

        let mut ee_body = Vec::new();
        Writer::new(&mut ee_body).put_u16(0);
        machine.record.inbound.push_back((HandshakeType::EncryptedExtensions, ee_body));
        assert_continue(machine.step());
        assert_eq!(machine.state(), State::CertificateRequest);

        let cert_payload = CertificatePayload {
            context: Vec::new(),
            entries: vec![CertificateEntry { der: pki_types::CertificateDer::from(vec![0x10, 0x20, 0x30]) }],
        };
        let mut cert_body = Vec::new();
        cert_payload.encode(&mut Writer::new(&mut cert_body));
        machine.record.inbound.push_back((HandshakeType::Certificate, cert_body));
        assert_continue(machine.step());
        assert_eq!(machine.state(), State::CertificateVerify);

        let cv_payload = CertificateVerifyPayload { scheme: SignatureScheme::Ed25519, signature: vec![0x99u8; 4] };
        let mut cv_body = Vec::new();
        cv_payload.encode(&mut Writer::new(&mut cv_body));
        machine.record.inbound.push_back((HandshakeType::CertificateVerify, cv_body));
        assert_continue(machine.step());
        assert_eq!(machine.state(), State::ServerFinished);

        // The expected verify_data comes straight from this connection's
        // own key schedule and transcript — exactly what `handle_server_
        // finished` will recompute and compare against.
        let base_key = machine
            .key_schedule
            .server_handshake_traffic_secret
            .clone()
            .expect("derived when ServerHello was processed");
        let transcript_hash = machine.transcript.current_hash();
        let verify_data = machine.key_schedule.finished_verify_data(&base_key, &transcript_hash);
        let mut fin_body = Vec::new();
        FinishedPayload(verify_data).encode(&mut Writer::new(&mut fin_body));
        machine.record.inbound.push_back((HandshakeType::Finished, fin_body));
        assert_continue(machine.step());
        assert_eq!(machine.state(), State::ClientCertificate);

        assert_continue(machine.step()); // empty client Certificate (no auth requested)
        assert_eq!(machine.state(), State::ClientFinished);

        assert_continue(machine.step());
        assert_eq!(machine.state(), State::HandshakeWrapup);

        match machine.step() {
            StepResult::Done => {}
            _ => panic!("expected the handshake to complete"),
        }
        assert_eq!(machine.state(), State::HandshakeOver);

        assert!(machine.record.installed_inbound.is_some());
        assert!(machine.record.installed_outbound.is_some());
        assert_eq!(machine.record.transforms.len(), 4, "handshake + application keys, both directions");
        let mut seen = Vec::new();
        for (_, key, iv) in &machine.record.transforms {
            assert!(!key.is_empty() && !iv.is_empty());
            assert!(!seen.contains(key), "two transforms derived identical key material");
            seen.push(key.clone());
        }
        assert!(machine.record.alerts.is_empty());
    }

    #[test]
    fn server_finished_mac_mismatch_is_rejected() {
        let mut machine = new_machine(ephemeral_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();

        let mut sh_ext = Vec::new();
        write_ext_supported_versions(&mut sh_ext);
        write_ext_key_share_full(&mut sh_ext, NamedGroup::X25519, &[0x42u8; 32]);
        let sh_body = build_server_hello([0x11u8; 32], &session_id, CipherSuite::Aes128GcmSha256, &sh_ext);
        machine.record.inbound.push_back((HandshakeType::ServerHello, sh_body));
        assert_continue(machine.step());

        let mut ee_body = Vec::new();
        Writer::new(&mut ee_body).put_u16(0);
        machine.record.inbound.push_back((HandshakeType::EncryptedExtensions, ee_body));
        assert_continue(machine.step());

        let cert_payload = CertificatePayload {
            context: Vec::new(),
            entries: vec![CertificateEntry { der: pki_types::CertificateDer::from(vec![0x10, 0x20, 0x30]) }],
        };
        let mut cert_body = Vec::new();
        cert_payload.encode(&mut Writer::new(&mut cert_body));
        machine.record.inbound.push_back((HandshakeType::Certificate, cert_body));
        assert_continue(machine.step());

        let cv_payload = CertificateVerifyPayload { scheme: SignatureScheme::Ed25519, signature: vec![0x99u8; 4] };
        let mut cv_body = Vec::new();
        cv_payload.encode(&mut Writer::new(&mut cv_body));
        machine.record.inbound.push_back((HandshakeType::CertificateVerify, cv_body));
        assert_continue(machine.step());
        assert_eq!(machine.state(), State::ServerFinished);

        // Never derived from this connection's key schedule, so it cannot
        // match regardless of what the fake HKDF computes.
        let bogus = vec![0x00u8; 32];
        let mut fin_body = Vec::new();
        FinishedPayload(bogus).encode(&mut Writer::new(&mut fin_body));
        machine.record.inbound.push_back((HandshakeType::Finished, fin_body));

        assert_error(machine.step(), |e| matches!(e, Error::DecryptError(_)), "a Finished MAC mismatch");
        assert_eq!(machine.record.alerts, vec![AlertDescription::DecryptError]);
    }

    #[test]
    fn downgrade_sentinel_is_rejected_end_to_end() {
        let mut machine = new_machine(ephemeral_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();

        let mut random = [0u8; 32];
        random[24..32].copy_from_slice(&DOWNGRADE_TO_TLS12_SENTINEL);
        // no supported_versions extension, so the TLS 1.3 marker is absent.
        let sh_body = build_server_hello(random, &session_id, CipherSuite::Aes128GcmSha256, &[]);
        machine.record.inbound.push_back((HandshakeType::ServerHello, sh_body));

        assert_error(machine.step(), |e| matches!(e, Error::IllegalParameter(_)), "a downgrade sentinel rejection");
    }

    #[test]
    fn unknown_extension_in_server_hello_is_rejected_end_to_end() {
        let mut machine = new_machine(ephemeral_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();

        let mut sh_ext = Vec::new();
        write_ext_supported_versions(&mut sh_ext);
        write_ext_key_share_full(&mut sh_ext, NamedGroup::X25519, &[0x42u8; 32]);
        write_ext_unknown(&mut sh_ext, 0xFFFF);
        let sh_body = build_server_hello([0x11u8; 32], &session_id, CipherSuite::Aes128GcmSha256, &sh_ext);
        machine.record.inbound.push_back((HandshakeType::ServerHello, sh_body));

        assert_error(
            machine.step(),
            |e| matches!(e, Error::UnsupportedExtension(0xFFFF)),
            "an unsupported-extension rejection",
        );
    }

    #[test]
    fn hello_retry_request_reusing_offered_group_is_rejected() {
        let mut machine = new_machine(two_group_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();
        assert_eq!(machine.offered_group, Some(NamedGroup::X25519));

        let mut hrr_ext = Vec::new();
        write_ext_supported_versions(&mut hrr_ext);
        write_ext_key_share_hrr(&mut hrr_ext, NamedGroup::X25519); // already offered
        let hrr_body = build_server_hello(HRR_RANDOM, &session_id, CipherSuite::Aes128GcmSha256, &hrr_ext);
        machine.record.inbound.push_back((HandshakeType::ServerHello, hrr_body));

        assert_error(
            machine.step(),
            |e| matches!(e, Error::IllegalParameter(_)),
            "rejection of an HRR that reselects the already-offered group",
        );
    }

    #[test]
    fn second_hello_retry_request_is_rejected() {
        let mut machine = new_machine(two_group_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();

        let mut hrr_ext = Vec::new();
        write_ext_supported_versions(&mut hrr_ext);
        write_ext_key_share_hrr(&mut hrr_ext, NamedGroup::Secp256r1);
        let hrr_body = build_server_hello(HRR_RANDOM, &session_id, CipherSuite::Aes128GcmSha256, &hrr_ext);
        machine.record.inbound.push_back((HandshakeType::ServerHello, hrr_body));
        assert_continue(machine.step());
        assert_eq!(machine.state(), State::ServerHello);
        assert_eq!(machine.offered_group, Some(NamedGroup::Secp256r1));
        assert_eq!(machine.record.sent.len(), 2, "the retried ClientHello should have gone out");

        let mut hrr2_ext = Vec::new();
        write_ext_supported_versions(&mut hrr2_ext);
        write_ext_key_share_hrr(&mut hrr2_ext, NamedGroup::X25519);
        let hrr2_body = build_server_hello(HRR_RANDOM, &session_id, CipherSuite::Aes128GcmSha256, &hrr2_ext);
        machine.record.inbound.push_back((HandshakeType::ServerHello, hrr2_body));

        assert_error(
            machine.step(),
            |e| matches!(e, Error::UnexpectedMessage(_)),
            "rejection of a second HelloRetryRequest",
        );
    }

    #[test]
    fn cookie_only_hello_retry_request_keeps_offered_group() {
        let mut machine = new_machine(two_group_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();
        assert_eq!(machine.offered_group, Some(NamedGroup::X25519));

        // A server may send an HRR carrying only a cookie, with no
        // key_share, when it just wants a fresh cookie and is happy with
        // the group the client already offered.
        let mut hrr_ext = Vec::new();
        write_ext_supported_versions(&mut hrr_ext);
        write_ext_cookie(&mut hrr_ext, b"state-cookie");
        let hrr_body = build_server_hello(HRR_RANDOM, &session_id, CipherSuite::Aes128GcmSha256, &hrr_ext);
        machine.record.inbound.push_back((HandshakeType::ServerHello, hrr_body));

        assert_continue(machine.step());
        assert_eq!(machine.state(), State::ServerHello);
        assert_eq!(machine.offered_group, Some(NamedGroup::X25519), "group must be unchanged by a cookie-only HRR");
        assert_eq!(machine.cookie.as_deref(), Some(b"state-cookie".as_slice()));
        assert_eq!(machine.record.sent.len(), 2, "the retried ClientHello should have gone out");

        let retried = &machine.record.sent[1].1;
        let session_id2 = machine.client_session_id.clone();
        assert_eq!(session_id2, session_id, "HRR retry reuses the same legacy_session_id");
        assert!(
            retried.windows(b"state-cookie".len()).any(|w| w == b"state-cookie"),
            "retried ClientHello must echo the HRR cookie"
        );
    }

    #[test]
    fn server_hello_bad_legacy_version_is_rejected() {
        let mut machine = new_machine(ephemeral_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();

        let mut sh_ext = Vec::new();
        write_ext_supported_versions(&mut sh_ext);
        write_ext_key_share_full(&mut sh_ext, NamedGroup::X25519, &[0x42u8; 32]);
        let mut sh_body = build_server_hello([0x11u8; 32], &session_id, CipherSuite::Aes128GcmSha256, &sh_ext);
        // Clobber the fixed 2-byte legacy_version prefix (TLS 1.1 instead of TLS 1.2).
        sh_body[0] = 0x03;
        sh_body[1] = 0x02;
        machine.record.inbound.push_back((HandshakeType::ServerHello, sh_body));

        assert_error(
            machine.step(),
            |e| matches!(e, Error::IllegalParameter(_)),
            "rejection of a bad ServerHello legacy_version",
        );
    }

    #[test]
    fn server_hello_nonzero_compression_method_is_rejected() {
        let mut machine = new_machine(ephemeral_config());
        drive_client_hello(&mut machine);
        let session_id = machine.client_session_id.clone();

        let mut sh_ext = Vec::new();
        write_ext_supported_versions(&mut sh_ext);
        write_ext_key_share_full(&mut sh_ext, NamedGroup::X25519, &[0x42u8; 32]);
        let mut sh_body = build_server_hello([0x11u8; 32], &session_id, CipherSuite::Aes128GcmSha256, &sh_ext);
        // legacy_version(2) + random(32) + session_id_len(1) + session_id
        // + cipher_suite(2) puts legacy_compression_method right after.
        let compression_offset = 2 + 32 + 1 + session_id.len() + 2;
        assert_eq!(sh_body[compression_offset], 0x00);
        sh_body[compression_offset] = 0x01;
        machine.record.inbound.push_back((HandshakeType::ServerHello, sh_body));

        assert_error(
            machine.step(),
            |e| matches!(e, Error::IllegalParameter(_)),
            "rejection of a non-null ServerHello legacy_compression_method",
        );
    }
}

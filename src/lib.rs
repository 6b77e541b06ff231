//! # tls13-handshake-core
//!
//! The client-side TLS 1.3 handshake state machine: a strict,
//! RFC 8446-conformant driver from an initial ClientHello through full
//! cryptographic establishment of an authenticated, encrypted session,
//! including HelloRetryRequest handling, pre-shared-key resumption, 0-RTT
//! early data, and post-handshake session-ticket ingestion.
//!
//! This crate deliberately does *not* implement:
//! - the record-layer codec (framing, fragmentation, AEAD invocation) —
//!   see [`io::RecordLayer`];
//! - the cryptographic primitives themselves (AEAD, ECDHE, signatures,
//!   X.509 validation) — see [`io::HkdfOps`], [`io::EcdheOps`],
//!   [`io::SignatureOps`], [`io::CertVerifier`];
//! - connection pooling, sockets, or the server-side handshake.
//!
//! Callers plug in those collaborators and drive the state machine one
//! [`state::HandshakeMachine::step`] at a time.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(unreachable_pub)]

extern crate alloc;

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
mod full_handshake_tests;
pub mod io;
pub mod key_schedule;
pub mod msgs;
pub mod session;
pub mod state;
pub mod ticket;
pub mod transcript;
pub mod transform;

pub use config::HandshakeConfig;
pub use error::Error;
pub use state::{HandshakeMachine, StepResult};

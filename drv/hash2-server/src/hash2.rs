// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-instance Hash2 lifecycle.
//!
//! ```text
//!          init            update           finalize (any outcome)
//!   Idle ────────▶ Armed ─────────▶ Ready ──────────────────────▶ Idle
//!                    │  ▲             │ ▲
//!                    └──┘ (failed)    └─┘ update
//! ```
//!
//! `finalize` from `Armed` and `update`/`finalize` from `Idle` are rejected
//! with [`HashError::NotReady`]; `init` from `Armed` or `Ready` is rejected
//! with [`HashError::AlreadyStarted`]. Rejections leave the state untouched.

use core::mem;

use drv_hash2_api::{lookup, AlgorithmDescriptor, Guid, HashError};

use crate::engine::{DigestEngine, MdContext};

enum HashState<C> {
    Idle,
    /// Initialized, nothing absorbed yet
    Armed(C),
    /// At least one update accepted
    Ready(C),
}

/// Observable lifecycle position of an instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstanceState {
    Idle,
    Armed,
    Ready,
}

/// One Hash2 service instance: at most one live computation.
pub struct Hash2Instance<E: DigestEngine> {
    engine: E,
    state: HashState<E::Context>,
}

fn descriptor(algorithm: Option<&Guid>) -> Result<&'static AlgorithmDescriptor, HashError> {
    let guid = algorithm.ok_or(HashError::Unsupported)?;
    lookup(guid).ok_or(HashError::Unsupported)
}

impl<E: DigestEngine> Hash2Instance<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: HashState::Idle,
        }
    }

    pub fn state(&self) -> InstanceState {
        match self.state {
            HashState::Idle => InstanceState::Idle,
            HashState::Armed(_) => InstanceState::Armed,
            HashState::Ready(_) => InstanceState::Ready,
        }
    }

    /// Returns the digest size in bytes for `algorithm`.
    pub fn get_hash_size(&self, algorithm: Option<&Guid>) -> Result<usize, HashError> {
        Ok(descriptor(algorithm)?.output_size)
    }

    fn start(&self, desc: &AlgorithmDescriptor) -> Result<E::Context, HashError> {
        self.engine.create(desc.digest_name).map_err(|e| {
            log::warn!("{}: context creation failed: {e:?}", desc.digest_name);
            HashError::from(e)
        })
    }

    /// Hashes `message[..len]` in one call.
    ///
    /// Runs on a context of its own; a computation already in progress on
    /// this instance is not disturbed.
    pub fn hash(
        &self,
        algorithm: Option<&Guid>,
        message: Option<&[u8]>,
        len: usize,
        out: Option<&mut [u8]>,
    ) -> Result<(), HashError> {
        let out = out.ok_or(HashError::InvalidArgument)?;
        let desc = descriptor(algorithm)?;

        let mut ctx = self.start(desc)?;
        if let Err(e) = ctx.absorb(message, len) {
            log::warn!("{}: one-shot update failed: {e:?}", desc.digest_name);
            let _ = ctx.finalize(None);
            return Err(e.into());
        }
        ctx.finalize(Some(out)).map_err(|e| {
            log::warn!("{}: one-shot final failed: {e:?}", desc.digest_name);
            HashError::from(e)
        })?;

        log::trace!("{}: one-shot over {len} bytes", desc.digest_name);
        Ok(())
    }

    /// Starts a computation.
    pub fn init(&mut self, algorithm: Option<&Guid>) -> Result<(), HashError> {
        let desc = descriptor(algorithm)?;

        if !matches!(self.state, HashState::Idle) {
            return Err(HashError::AlreadyStarted);
        }

        let ctx = self.start(desc)?;
        self.state = HashState::Armed(ctx);
        log::debug!("{}: init", desc.digest_name);
        Ok(())
    }

    /// Absorbs `message[..len]` into the live computation.
    ///
    /// On failure the computation stays attached in its previous state; the
    /// caller may retry or give up with [`finalize`](Self::finalize).
    pub fn update(&mut self, message: Option<&[u8]>, len: usize) -> Result<(), HashError> {
        match mem::replace(&mut self.state, HashState::Idle) {
            HashState::Idle => Err(HashError::NotReady),
            HashState::Armed(mut ctx) => match ctx.absorb(message, len) {
                Ok(()) => {
                    self.state = HashState::Ready(ctx);
                    log::trace!("update: {len} bytes");
                    Ok(())
                }
                Err(e) => {
                    log::warn!("update failed: {e:?}");
                    self.state = HashState::Armed(ctx);
                    Err(e.into())
                }
            },
            HashState::Ready(mut ctx) => {
                let result = ctx.absorb(message, len);
                self.state = HashState::Ready(ctx);
                result.map_err(|e| {
                    log::warn!("update failed: {e:?}");
                    HashError::from(e)
                })?;
                log::trace!("update: {len} bytes");
                Ok(())
            }
        }
    }

    /// Completes the computation, writing the digest to the front of `out`.
    ///
    /// Once past argument and ordering checks the instance is back to idle
    /// regardless of the engine outcome.
    pub fn finalize(&mut self, out: Option<&mut [u8]>) -> Result<(), HashError> {
        let out = out.ok_or(HashError::InvalidArgument)?;

        let ctx = match mem::replace(&mut self.state, HashState::Idle) {
            HashState::Ready(ctx) => ctx,
            other => {
                self.state = other;
                return Err(HashError::NotReady);
            }
        };

        let n = ctx.finalize(Some(out)).map_err(|e| {
            log::warn!("final failed: {e:?}");
            HashError::from(e)
        })?;
        log::debug!("final: {n} byte digest");
        Ok(())
    }

    /// Drops any live computation through the engine's abandon path.
    ///
    /// Returns `true` if there was one.
    pub fn abandon(&mut self) -> bool {
        match mem::replace(&mut self.state, HashState::Idle) {
            HashState::Idle => false,
            HashState::Armed(ctx) | HashState::Ready(ctx) => {
                let _ = ctx.finalize(None);
                log::warn!("abandoned computation in progress");
                true
            }
        }
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::null::NullEngine;
    use crate::rustcrypto::RustCryptoEngine;
    use drv_hash2_api::{
        supported_algorithms, HASH_ALGORITHM_MD5_GUID, HASH_ALGORITHM_SHA1_GUID,
        HASH_ALGORITHM_SHA256_GUID, HASH_ALGORITHM_SHA384_GUID, HASH_ALGORITHM_SHA512_GUID,
    };
    use hex_literal::hex;

    const ABC: &[u8] = b"abc";
    const UNKNOWN_GUID: Guid = Guid::new(0x1234_5678, 0x9abc, 0xdef0, [1, 2, 3, 4, 5, 6, 7, 8]);

    fn instance() -> Hash2Instance<RustCryptoEngine> {
        Hash2Instance::new(RustCryptoEngine::init())
    }

    fn streamed(
        h: &mut Hash2Instance<RustCryptoEngine>,
        guid: &Guid,
        parts: &[&[u8]],
    ) -> Vec<u8> {
        let size = h.get_hash_size(Some(guid)).unwrap();
        let mut out = vec![0u8; size];
        h.init(Some(guid)).unwrap();
        for &part in parts {
            h.update(Some(part), part.len()).unwrap();
        }
        h.finalize(Some(&mut out)).unwrap();
        out
    }

    #[test]
    fn output_sizes_are_stable() {
        let h = instance();
        let expected = [
            (HASH_ALGORITHM_MD5_GUID, 16),
            (HASH_ALGORITHM_SHA1_GUID, 20),
            (HASH_ALGORITHM_SHA256_GUID, 32),
            (HASH_ALGORITHM_SHA384_GUID, 48),
            (HASH_ALGORITHM_SHA512_GUID, 64),
        ];
        for (guid, size) in expected {
            assert_eq!(h.get_hash_size(Some(&guid)), Ok(size));
            assert_eq!(h.get_hash_size(Some(&guid)), Ok(size));
        }
    }

    #[test]
    fn unknown_or_missing_algorithm_is_unsupported() {
        let mut h = instance();
        assert_eq!(h.get_hash_size(None), Err(HashError::Unsupported));
        assert_eq!(
            h.get_hash_size(Some(&UNKNOWN_GUID)),
            Err(HashError::Unsupported)
        );
        assert_eq!(h.init(None), Err(HashError::Unsupported));
        assert_eq!(h.init(Some(&UNKNOWN_GUID)), Err(HashError::Unsupported));
        assert_eq!(h.state(), InstanceState::Idle);

        let mut out = [0u8; 64];
        assert_eq!(
            h.hash(Some(&UNKNOWN_GUID), Some(b"abc"), 3, Some(&mut out)),
            Err(HashError::Unsupported)
        );
    }

    #[test]
    fn streaming_known_answer() {
        let mut h = instance();
        let out = streamed(
            &mut h,
            &HASH_ALGORITHM_SHA256_GUID,
            &[&ABC[..1], &ABC[1..]],
        );
        assert_eq!(
            out[..],
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(h.state(), InstanceState::Idle);
    }

    #[test]
    fn one_shot_matches_streaming() {
        let mut h = instance();
        let message: &[u8] = b"one-shot and streaming agree";
        for desc in supported_algorithms() {
            let mut one_shot = vec![0u8; desc.output_size];
            h.hash(
                Some(&desc.guid),
                Some(message),
                message.len(),
                Some(&mut one_shot),
            )
            .unwrap();
            let stream = streamed(&mut h, &desc.guid, &[message]);
            assert_eq!(one_shot, stream, "{}", desc.digest_name);
        }
    }

    #[test]
    fn chunking_invariance() {
        let mut h = instance();
        let message: &[u8] = b"split me anywhere you like";
        for desc in supported_algorithms() {
            let whole = streamed(&mut h, &desc.guid, &[message]);
            for cut in 1..message.len() {
                let (m1, m2) = message.split_at(cut);
                assert_eq!(streamed(&mut h, &desc.guid, &[m1, m2]), whole);
            }
        }
    }

    #[test]
    fn update_before_init_is_not_ready() {
        let mut h = instance();
        assert_eq!(h.update(Some(b"abc"), 3), Err(HashError::NotReady));
        assert_eq!(h.state(), InstanceState::Idle);
    }

    #[test]
    fn final_without_update_is_not_ready() {
        let mut h = instance();
        let mut out = [0u8; 32];
        h.init(Some(&HASH_ALGORITHM_SHA256_GUID)).unwrap();
        assert_eq!(h.finalize(Some(&mut out)), Err(HashError::NotReady));
        assert_eq!(h.state(), InstanceState::Armed);

        // The computation is still live and completes normally.
        h.update(Some(b"abc"), 3).unwrap();
        h.finalize(Some(&mut out)).unwrap();
        assert_eq!(
            out,
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn final_on_idle_is_not_ready() {
        let mut h = instance();
        let mut out = [0u8; 32];
        assert_eq!(h.finalize(Some(&mut out)), Err(HashError::NotReady));
    }

    #[test]
    fn second_init_is_already_started() {
        let mut h = instance();
        h.init(Some(&HASH_ALGORITHM_SHA1_GUID)).unwrap();
        assert_eq!(
            h.init(Some(&HASH_ALGORITHM_SHA1_GUID)),
            Err(HashError::AlreadyStarted)
        );
        h.update(Some(b"abc"), 3).unwrap();
        assert_eq!(
            h.init(Some(&HASH_ALGORITHM_MD5_GUID)),
            Err(HashError::AlreadyStarted)
        );
        assert_eq!(h.state(), InstanceState::Ready);

        let mut out = [0u8; 20];
        h.finalize(Some(&mut out)).unwrap();
        assert_eq!(out, hex!("a9993e364706816aba3e25717850c26c9cd0d89d"));
    }

    #[test]
    fn init_checks_algorithm_before_busy() {
        let mut h = instance();
        h.init(Some(&HASH_ALGORITHM_SHA1_GUID)).unwrap();
        assert_eq!(h.init(Some(&UNKNOWN_GUID)), Err(HashError::Unsupported));
    }

    #[test]
    fn missing_output_is_invalid_and_keeps_state() {
        let mut h = instance();
        h.init(Some(&HASH_ALGORITHM_MD5_GUID)).unwrap();
        h.update(Some(b"abc"), 3).unwrap();
        assert_eq!(h.finalize(None), Err(HashError::InvalidArgument));
        assert_eq!(h.state(), InstanceState::Ready);

        assert_eq!(
            h.hash(Some(&HASH_ALGORITHM_MD5_GUID), Some(b"abc"), 3, None),
            Err(HashError::InvalidArgument)
        );
        assert_eq!(h.state(), InstanceState::Ready);

        let mut out = [0u8; 16];
        h.finalize(Some(&mut out)).unwrap();
        assert_eq!(out, hex!("900150983cd24fb0d6963f7d28e17f72"));
    }

    #[test]
    fn failed_update_keeps_context_attached() {
        let mut h = instance();
        h.init(Some(&HASH_ALGORITHM_SHA256_GUID)).unwrap();
        assert_eq!(h.update(None, 8), Err(HashError::OutOfResources));
        assert_eq!(h.state(), InstanceState::Armed);

        h.update(Some(b"a"), 1).unwrap();
        assert_eq!(h.update(Some(b"bc"), 9), Err(HashError::OutOfResources));
        assert_eq!(h.state(), InstanceState::Ready);

        h.update(Some(b"bc"), 2).unwrap();
        let mut out = [0u8; 32];
        h.finalize(Some(&mut out)).unwrap();
        assert_eq!(
            out,
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn failed_final_returns_to_idle() {
        let mut h = instance();
        h.init(Some(&HASH_ALGORITHM_SHA512_GUID)).unwrap();
        h.update(Some(b"abc"), 3).unwrap();

        let mut out = [0u8; 20];
        assert_eq!(h.finalize(Some(&mut out)), Err(HashError::OutOfResources));
        assert_eq!(h.state(), InstanceState::Idle);

        // Reentrant after a failed final.
        assert_eq!(h.init(Some(&HASH_ALGORITHM_SHA512_GUID)), Ok(()));
    }

    #[test]
    fn cycle_is_reentrant() {
        let mut h = instance();
        for _ in 0..3 {
            let out = streamed(&mut h, &HASH_ALGORITHM_SHA384_GUID, &[ABC]);
            assert_eq!(out.len(), 48);
            assert_eq!(h.state(), InstanceState::Idle);
        }
    }

    #[test]
    fn empty_update_still_counts() {
        let mut h = instance();
        h.init(Some(&HASH_ALGORITHM_SHA256_GUID)).unwrap();
        h.update(None, 0).unwrap();
        let mut out = [0u8; 32];
        h.finalize(Some(&mut out)).unwrap();
        assert_eq!(
            out,
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn one_shot_leaves_live_computation_alone() {
        let mut h = instance();
        h.init(Some(&HASH_ALGORITHM_SHA1_GUID)).unwrap();
        h.update(Some(b"ab"), 2).unwrap();

        let mut side = [0u8; 16];
        h.hash(
            Some(&HASH_ALGORITHM_MD5_GUID),
            Some(b"abc"),
            3,
            Some(&mut side),
        )
        .unwrap();
        assert_eq!(side, hex!("900150983cd24fb0d6963f7d28e17f72"));
        assert_eq!(h.state(), InstanceState::Ready);

        h.update(Some(b"c"), 1).unwrap();
        let mut out = [0u8; 20];
        h.finalize(Some(&mut out)).unwrap();
        assert_eq!(out, hex!("a9993e364706816aba3e25717850c26c9cd0d89d"));
    }

    #[test]
    fn one_shot_propagates_engine_failures() {
        let h = instance();
        let mut out = [0u8; 32];
        assert_eq!(
            h.hash(Some(&HASH_ALGORITHM_SHA256_GUID), None, 4, Some(&mut out)),
            Err(HashError::OutOfResources)
        );
        let mut short = [0u8; 8];
        let sha256 = Some(&HASH_ALGORITHM_SHA256_GUID);
        assert_eq!(
            h.hash(sha256, Some(b"abc"), 3, Some(&mut short)),
            Err(HashError::OutOfResources)
        );
    }

    #[test]
    fn abandon_drops_live_computation() {
        let mut h = instance();
        assert!(!h.abandon());
        h.init(Some(&HASH_ALGORITHM_MD5_GUID)).unwrap();
        assert!(h.abandon());
        assert_eq!(h.state(), InstanceState::Idle);
        assert_eq!(h.init(Some(&HASH_ALGORITHM_MD5_GUID)), Ok(()));
    }

    #[test]
    fn compiled_out_engine_is_out_of_resources() {
        let mut h = Hash2Instance::new(NullEngine::init());
        assert_eq!(h.get_hash_size(Some(&HASH_ALGORITHM_SHA256_GUID)), Ok(32));
        assert_eq!(
            h.init(Some(&HASH_ALGORITHM_SHA256_GUID)),
            Err(HashError::OutOfResources)
        );
        assert_eq!(h.state(), InstanceState::Idle);

        let mut out = [0u8; 32];
        let sha256 = Some(&HASH_ALGORITHM_SHA256_GUID);
        assert_eq!(
            h.hash(sha256, Some(b"abc"), 3, Some(&mut out)),
            Err(HashError::OutOfResources)
        );
    }
}

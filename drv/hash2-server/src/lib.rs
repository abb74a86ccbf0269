// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Hash2 Server
//!
//! Incremental message-digest service over a pluggable digest engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  handle   ┌─────────────────┐  name   ┌─────────────────┐
//! │  Client Task    │ ───────── │   ServerImpl    │ ─────── │  DigestEngine   │
//! │  (hash-client)  │           │  Hash2Instance  │         │   (backend)     │
//! └─────────────────┘           └─────────────────┘         └─────────────────┘
//! ```
//!
//! ## Operations
//! - `get_hash_size(handle, algorithm)` → digest size in bytes
//! - `hash(handle, algorithm, message, len, out)` → one-shot digest
//! - `init(handle, algorithm)` → `update(handle, message, len)`* →
//!   `finalize(handle, out)`
//!
//! Each instance runs at most one computation at a time. A second `init`
//! before `finalize` is rejected with `AlreadyStarted`; `finalize` needs at
//! least one accepted `update`.
//!
//! ## Algorithms
//! MD5 (16 bytes), SHA-1 (20), SHA-256 (32), SHA-384 (48), SHA-512 (64),
//! identified by their EFI hash-algorithm GUIDs.
//!
//! ## Backends
//! - `RustCryptoEngine`: software RustCrypto implementation (`rustcrypto`)
//! - `NullEngine`: all primitives compiled out
//!
//! The backend must be started with [`DigestEngine::init`] by the process
//! entry point before the server is built.

#![cfg_attr(not(test), no_std)]

use drv_hash2_api::{Guid, HashError};
use heapless::FnvIndexMap;

pub mod engine;
pub mod hash2;
pub mod null;
#[cfg(feature = "rustcrypto")]
pub mod rustcrypto;

pub use engine::{hash_all, DigestEngine, EngineError, MdContext};
pub use hash2::{Hash2Instance, InstanceState};
pub use null::NullEngine;
#[cfg(feature = "rustcrypto")]
pub use rustcrypto::RustCryptoEngine;

#[cfg(feature = "rustcrypto")]
pub type DefaultEngine = RustCryptoEngine;

#[cfg(not(feature = "rustcrypto"))]
pub type DefaultEngine = NullEngine;

/// Maximum number of installed instances (power of two for `FnvIndexMap`).
pub const MAX_INSTANCES: usize = 8;

/// Opaque reference to an installed instance. Never zero.
pub type InstanceHandle = u32;

/// Table of installed Hash2 instances.
///
/// Entry points take the instance handle first; an unknown handle is
/// reported as `InvalidArgument` and touches nothing.
pub struct ServerImpl<E: DigestEngine + Clone> {
    engine: E,
    instances: FnvIndexMap<InstanceHandle, Hash2Instance<E>, MAX_INSTANCES>,
    next_handle: InstanceHandle,
}

impl<E: DigestEngine + Clone> ServerImpl<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            instances: FnvIndexMap::new(),
            next_handle: 1,
        }
    }

    /// Creates a new instance and returns its handle.
    ///
    /// Fails with `OutOfResources` once `MAX_INSTANCES` are installed.
    pub fn install(&mut self) -> Result<InstanceHandle, HashError> {
        if self.instances.len() >= MAX_INSTANCES {
            return Err(HashError::OutOfResources);
        }

        let mut handle = self.next_handle;
        while handle == 0 || self.instances.contains_key(&handle) {
            handle = handle.wrapping_add(1);
        }
        self.next_handle = handle.wrapping_add(1);

        self.instances
            .insert(handle, Hash2Instance::new(self.engine.clone()))
            .map_err(|_| HashError::OutOfResources)?;

        log::debug!("installed instance {handle}");
        Ok(handle)
    }

    /// Tears an instance down, abandoning any computation it still holds.
    pub fn uninstall(&mut self, handle: InstanceHandle) -> Result<(), HashError> {
        let mut instance = self
            .instances
            .remove(&handle)
            .ok_or(HashError::InvalidArgument)?;

        if instance.abandon() {
            log::warn!("instance {handle} uninstalled mid-computation");
        }
        log::debug!("uninstalled instance {handle}");
        Ok(())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instance(&self, handle: InstanceHandle) -> Result<&Hash2Instance<E>, HashError> {
        self.instances
            .get(&handle)
            .ok_or(HashError::InvalidArgument)
    }

    fn instance_mut(
        &mut self,
        handle: InstanceHandle,
    ) -> Result<&mut Hash2Instance<E>, HashError> {
        self.instances
            .get_mut(&handle)
            .ok_or(HashError::InvalidArgument)
    }

    pub fn get_hash_size(
        &self,
        handle: InstanceHandle,
        algorithm: Option<&Guid>,
    ) -> Result<usize, HashError> {
        self.instance(handle)?.get_hash_size(algorithm)
    }

    pub fn hash(
        &self,
        handle: InstanceHandle,
        algorithm: Option<&Guid>,
        message: Option<&[u8]>,
        len: usize,
        out: Option<&mut [u8]>,
    ) -> Result<(), HashError> {
        self.instance(handle)?.hash(algorithm, message, len, out)
    }

    pub fn init(
        &mut self,
        handle: InstanceHandle,
        algorithm: Option<&Guid>,
    ) -> Result<(), HashError> {
        self.instance_mut(handle)?.init(algorithm)
    }

    pub fn update(
        &mut self,
        handle: InstanceHandle,
        message: Option<&[u8]>,
        len: usize,
    ) -> Result<(), HashError> {
        self.instance_mut(handle)?.update(message, len)
    }

    pub fn finalize(
        &mut self,
        handle: InstanceHandle,
        out: Option<&mut [u8]>,
    ) -> Result<(), HashError> {
        self.instance_mut(handle)?.finalize(out)
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use drv_hash2_api::{HASH_ALGORITHM_SHA256_GUID, HASH_ALGORITHM_SHA512_GUID};
    use hex_literal::hex;

    const SHA256: Option<&Guid> = Some(&HASH_ALGORITHM_SHA256_GUID);
    const SHA512: Option<&Guid> = Some(&HASH_ALGORITHM_SHA512_GUID);
    const ABC_SHA256: [u8; 32] =
        hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");

    fn server() -> ServerImpl<DefaultEngine> {
        ServerImpl::new(DefaultEngine::init())
    }

    #[test]
    fn lifecycle_through_handles() {
        let mut server = server();
        let h = server.install().unwrap();

        assert_eq!(server.get_hash_size(h, SHA256), Ok(32));
        server.init(h, SHA256).unwrap();
        server.update(h, Some(b"abc"), 3).unwrap();
        let mut out = [0u8; 32];
        server.finalize(h, Some(&mut out)).unwrap();
        assert_eq!(out, ABC_SHA256);

        let mut one_shot = [0u8; 32];
        let result = server.hash(h, SHA256, Some(b"abc"), 3, Some(&mut one_shot));
        assert_eq!(result, Ok(()));
        assert_eq!(one_shot, ABC_SHA256);
    }

    #[test]
    fn unknown_handle_is_invalid_argument() {
        let mut server = server();
        let h = server.install().unwrap();
        let bogus = h + 100;
        let mut out = [0u8; 32];

        assert_eq!(
            server.get_hash_size(bogus, SHA256),
            Err(HashError::InvalidArgument)
        );
        assert_eq!(
            server.hash(bogus, SHA256, Some(b"abc"), 3, Some(&mut out)),
            Err(HashError::InvalidArgument)
        );
        assert_eq!(server.init(bogus, SHA256), Err(HashError::InvalidArgument));
        assert_eq!(
            server.update(bogus, Some(b"abc"), 3),
            Err(HashError::InvalidArgument)
        );
        assert_eq!(
            server.finalize(bogus, Some(&mut out)),
            Err(HashError::InvalidArgument)
        );
        assert_eq!(
            server.finalize(0, Some(&mut out)),
            Err(HashError::InvalidArgument)
        );

        assert_eq!(out, [0u8; 32]);
        assert_eq!(server.instance(h).unwrap().state(), InstanceState::Idle);
    }

    #[test]
    fn instances_are_independent() {
        let mut server = server();
        let a = server.install().unwrap();
        let b = server.install().unwrap();
        assert_ne!(a, b);

        server.init(a, SHA256).unwrap();
        server.init(b, SHA512).unwrap();
        assert_eq!(server.init(a, SHA256), Err(HashError::AlreadyStarted));

        server.update(a, Some(b"abc"), 3).unwrap();
        assert_eq!(server.instance(a).unwrap().state(), InstanceState::Ready);
        assert_eq!(server.instance(b).unwrap().state(), InstanceState::Armed);

        let mut out = [0u8; 32];
        server.finalize(a, Some(&mut out)).unwrap();
        assert_eq!(out, ABC_SHA256);

        let mut wide = [0u8; 64];
        assert_eq!(
            server.finalize(b, Some(&mut wide)),
            Err(HashError::NotReady)
        );
    }

    #[test]
    fn table_is_bounded() {
        let mut server = server();
        let handles: Vec<_> = (0..MAX_INSTANCES)
            .map(|_| server.install().unwrap())
            .collect();
        assert_eq!(server.install(), Err(HashError::OutOfResources));

        server.uninstall(handles[3]).unwrap();
        let again = server.install().unwrap();
        assert!(!handles[..3].contains(&again));
        assert!(!handles[4..].contains(&again));
        assert_eq!(server.instance_count(), MAX_INSTANCES);
    }

    #[test]
    fn uninstall_abandons_live_computation() {
        let mut server = server();
        let h = server.install().unwrap();
        server.init(h, SHA256).unwrap();
        server.update(h, Some(b"ab"), 2).unwrap();

        server.uninstall(h).unwrap();
        assert_eq!(server.instance_count(), 0);
        assert_eq!(
            server.update(h, Some(b"c"), 1),
            Err(HashError::InvalidArgument)
        );
        assert_eq!(server.uninstall(h), Err(HashError::InvalidArgument));
    }

    #[test]
    fn handles_skip_zero_on_wrap() {
        let mut server = server();
        server.next_handle = u32::MAX;
        assert_eq!(server.install(), Ok(u32::MAX));
        assert_eq!(server.install(), Ok(1));
    }
}

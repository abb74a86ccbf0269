// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Digest engine adapter.
//!
//! An engine turns an algorithm name into an owned [`MdContext`]. The context
//! is the only handle to an in-progress computation: it absorbs data through
//! `&mut self` and is consumed by [`MdContext::finalize`], so a finalized
//! context cannot be touched again.
//!
//! Backends:
//! - `RustCryptoEngine`: software RustCrypto primitives (`rustcrypto` feature)
//! - [`NullEngine`](crate::null::NullEngine): every primitive compiled out

use drv_hash2_api::HashError;

/// Failures reported by an engine backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Context creation was asked for an empty name.
    EmptyName,
    /// No primitive answers to this name in the current backend.
    UnknownDigest,
    /// A nonzero length was given without input data.
    MissingInput,
    /// The length exceeds the input buffer.
    InvalidInputLength,
    /// Finalize was called without an output buffer. The computation is
    /// dropped.
    Abandoned,
    /// The output buffer cannot hold the digest.
    InvalidOutputSize,
}

/// Every engine failure surfaces to Hash2 callers as `OutOfResources`; the
/// registry has already rejected unknown identifiers by the time the engine
/// is reached.
impl From<EngineError> for HashError {
    fn from(_: EngineError) -> Self {
        HashError::OutOfResources
    }
}

/// A backend able to start digest computations by name.
pub trait DigestEngine {
    type Context: MdContext;

    /// Process-wide startup for the backend. Must run before the first
    /// digest operation; calling it again is harmless.
    fn init() -> Self
    where
        Self: Sized;

    /// Allocates and initializes a context for `name`.
    ///
    /// Names are matched exactly, no case folding or alias resolution.
    fn create(&self, name: &str) -> Result<Self::Context, EngineError>;
}

/// One in-progress digest computation.
pub trait MdContext: Sized {
    /// Digest length in bytes.
    fn output_size(&self) -> usize;

    /// Feeds `len` bytes of `data`.
    ///
    /// Fails without touching the state if `data` is `None` while `len` is
    /// nonzero, or if `len` runs past the end of `data`.
    fn absorb(&mut self, data: Option<&[u8]>, len: usize) -> Result<(), EngineError>;

    /// Overwrites `dest` with a copy of this computation.
    ///
    /// Afterwards both contexts hold the same absorbed prefix and advance
    /// independently.
    fn duplicate_into(&self, dest: &mut Self) -> Result<(), EngineError>;

    /// Writes the digest into the front of `out` and releases the context.
    ///
    /// Passing `None` abandons the computation: the context is released and
    /// [`EngineError::Abandoned`] is returned. The context is gone whatever
    /// the outcome.
    fn finalize(self, out: Option<&mut [u8]>) -> Result<usize, EngineError>;
}

/// Resolves the `(data, len)` pair handed to [`MdContext::absorb`].
pub fn input_slice(data: Option<&[u8]>, len: usize) -> Result<&[u8], EngineError> {
    if len == 0 {
        return Ok(&[]);
    }
    let data = data.ok_or(EngineError::MissingInput)?;
    data.get(..len).ok_or(EngineError::InvalidInputLength)
}

/// Create, absorb and finalize in one call.
///
/// A failed absorb abandons the context before returning.
pub fn hash_all<E: DigestEngine>(
    engine: &E,
    name: &str,
    data: Option<&[u8]>,
    len: usize,
    out: &mut [u8],
) -> Result<usize, EngineError> {
    let mut ctx = engine.create(name)?;

    if let Err(e) = ctx.absorb(data, len) {
        let _ = ctx.finalize(None);
        return Err(e);
    }

    ctx.finalize(Some(out))
}

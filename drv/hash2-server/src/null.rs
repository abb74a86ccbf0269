// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine for builds with no digest primitives.
//!
//! Every name fails to resolve, exactly as an unknown name would on a full
//! engine. No context can ever exist.

use crate::engine::{DigestEngine, EngineError, MdContext};

#[derive(Copy, Clone, Debug, Default)]
pub struct NullEngine;

/// Uninhabited: a `NullEngine` never hands out a context.
pub enum NullContext {}

impl DigestEngine for NullEngine {
    type Context = NullContext;

    fn init() -> Self {
        log::info!("null engine: digest primitives compiled out");
        NullEngine
    }

    fn create(&self, name: &str) -> Result<NullContext, EngineError> {
        if name.is_empty() {
            return Err(EngineError::EmptyName);
        }
        Err(EngineError::UnknownDigest)
    }
}

impl MdContext for NullContext {
    fn output_size(&self) -> usize {
        match *self {}
    }

    fn absorb(&mut self, _data: Option<&[u8]>, _len: usize) -> Result<(), EngineError> {
        match *self {}
    }

    fn duplicate_into(&self, _dest: &mut Self) -> Result<(), EngineError> {
        match *self {}
    }

    fn finalize(self, _out: Option<&mut [u8]>) -> Result<usize, EngineError> {
        match self {}
    }
}

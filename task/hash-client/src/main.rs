// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hash Client Task
//!
//! Process entry point for the Hash2 service. Brings up logging and the
//! digest engine, installs one service instance and walks it through the
//! registry, one-shot, streaming, request-frame and forked computations.
//! Any failed call or disagreeing digest makes the process exit nonzero.

use core::fmt;
use std::process::ExitCode;

use drv_hash2_api::{
    lookup, supported_algorithms, Guid, HashError, HASH_ALGORITHM_SHA1_GUID,
    HASH_ALGORITHM_SHA256_GUID, HASH_ALGORITHM_SHA384_GUID,
};
use drv_hash2_server::{
    DefaultEngine, DigestEngine, EngineError, InstanceHandle, MdContext, ServerImpl,
};

type Server = ServerImpl<DefaultEngine>;
type Demo = fn(&mut Server, InstanceHandle) -> Result<(), DemoError>;

const DEMOS: [(&str, Demo); 5] = [
    ("registry", demo_registry),
    ("one-shot", demo_oneshot_hash),
    ("streaming", demo_streaming_hash),
    ("request-frame", demo_request_frame),
    ("fork", demo_fork),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DemoError {
    Hash(HashError),
    /// Two computations of the same message disagreed.
    Mismatch(&'static str),
}

impl From<HashError> for DemoError {
    fn from(e: HashError) -> Self {
        DemoError::Hash(e)
    }
}

impl From<EngineError> for DemoError {
    fn from(e: EngineError) -> Self {
        DemoError::Hash(e.into())
    }
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoError::Hash(e) => write!(f, "{e}"),
            DemoError::Mismatch(what) => write!(f, "{what} digest mismatch"),
        }
    }
}

struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let _ = console_log::init(std::io::stderr(), log::Level::Info);

    // Engine startup has to happen before anything touches a digest.
    let engine = DefaultEngine::init();
    let mut server = ServerImpl::new(engine);

    let handle = match server.install() {
        Ok(h) => h,
        Err(e) => {
            log::error!("install failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for (name, demo) in DEMOS {
        if let Err(e) = demo(&mut server, handle) {
            log::error!("{name} demo: {e}");
            failed = true;
        }
    }

    if let Err(e) = server.uninstall(handle) {
        log::error!("uninstall failed: {e}");
        failed = true;
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn expect_same(what: &'static str, got: &[u8], want: &[u8]) -> Result<(), DemoError> {
    if got == want {
        Ok(())
    } else {
        Err(DemoError::Mismatch(what))
    }
}

/// List every algorithm and its digest size
fn demo_registry(server: &mut Server, handle: InstanceHandle) -> Result<(), DemoError> {
    for desc in supported_algorithms() {
        let size = server.get_hash_size(handle, Some(&desc.guid))?;
        log::info!("{:<6} {} {size} bytes", desc.digest_name, desc.guid);
    }
    Ok(())
}

/// Demonstrate one-shot hash computation for each algorithm
fn demo_oneshot_hash(server: &mut Server, handle: InstanceHandle) -> Result<(), DemoError> {
    let test_data = b"One-shot hash example data";

    for desc in supported_algorithms() {
        let size = server.get_hash_size(handle, Some(&desc.guid))?;
        let mut digest = vec![0u8; size];
        server.hash(
            handle,
            Some(&desc.guid),
            Some(test_data),
            test_data.len(),
            Some(&mut digest),
        )?;
        log::info!("{}(one-shot) = {}", desc.digest_name, Hex(&digest));
    }
    Ok(())
}

/// Demonstrate streaming hash computation for large data
fn demo_streaming_hash(server: &mut Server, handle: InstanceHandle) -> Result<(), DemoError> {
    let algorithm = HASH_ALGORITHM_SHA256_GUID;
    let chunks: &[&[u8]] = &[
        b"This is chunk 1 of a large data stream.",
        b"This is chunk 2 with more data to hash.",
        b"This is chunk 3 continuing the stream.",
        b"This is the final chunk 4 of our data.",
    ];

    let size = server.get_hash_size(handle, Some(&algorithm))?;
    let mut digest = vec![0u8; size];

    server.init(handle, Some(&algorithm))?;
    for &chunk in chunks {
        server.update(handle, Some(chunk), chunk.len())?;
    }
    server.finalize(handle, Some(&mut digest))?;

    let whole = chunks.concat();
    let mut check = vec![0u8; size];
    server.hash(
        handle,
        Some(&algorithm),
        Some(&whole),
        whole.len(),
        Some(&mut check),
    )?;
    expect_same("streamed", &digest, &check)?;

    log::info!("SHA256(streamed) = {}", Hex(&digest));
    Ok(())
}

/// Decode a request frame (identifier, then payload) and hash its payload
fn demo_request_frame(server: &mut Server, handle: InstanceHandle) -> Result<(), DemoError> {
    let mut frame = HASH_ALGORITHM_SHA384_GUID.to_bytes().to_vec();
    frame.extend_from_slice(b"payload carried behind the identifier");

    let (guid, payload) = Guid::from_prefix(&frame).ok_or(HashError::InvalidArgument)?;
    let desc = lookup(&guid).ok_or(HashError::Unsupported)?;

    let mut digest = vec![0u8; desc.output_size];
    server.hash(
        handle,
        Some(&guid),
        Some(payload),
        payload.len(),
        Some(&mut digest),
    )?;

    log::info!("{}(frame) = {}", desc.digest_name, Hex(&digest));
    Ok(())
}

/// Hash a common prefix once, then finish it two different ways
fn demo_fork(server: &mut Server, handle: InstanceHandle) -> Result<(), DemoError> {
    let desc = lookup(&HASH_ALGORITHM_SHA1_GUID).ok_or(HashError::Unsupported)?;
    let engine = server.engine();
    let prefix = b"GET /firmware/manifest ";

    let mut base = engine.create(desc.digest_name)?;
    base.absorb(Some(prefix), prefix.len())?;
    let mut fork = engine.create(desc.digest_name)?;
    base.duplicate_into(&mut fork)?;

    base.absorb(Some(b"v1"), 2)?;
    fork.absorb(Some(b"v2"), 2)?;

    let mut left = vec![0u8; desc.output_size];
    let mut right = vec![0u8; desc.output_size];
    base.finalize(Some(&mut left))?;
    fork.finalize(Some(&mut right))?;

    // Cross-check the fork against the service path.
    let mut expected = vec![0u8; desc.output_size];
    let message = [&prefix[..], &b"v2"[..]].concat();
    server.hash(
        handle,
        Some(&desc.guid),
        Some(&message),
        message.len(),
        Some(&mut expected),
    )?;
    expect_same("forked", &right, &expected)?;

    log::info!("SHA1(prefix|v1) = {}", Hex(&left));
    log::info!("SHA1(prefix|v2) = {}", Hex(&right));
    Ok(())
}

// Copyright 2024 Advanced Micro Devices, Inc.
// SPDX-License-Identifier: Apache-2.0

//! API crate for the Hash2 digest service.
//!
//! Holds everything a client needs without linking an engine: algorithm
//! identifiers, the static algorithm registry and the status codes returned
//! by the service entry points.

#![cfg_attr(not(test), no_std)]

use core::fmt;

use num_traits::FromPrimitive;
use zerocopy::{FromBytes, IntoBytes};

/// Digest sizes in bytes
pub const MD5_DIGEST_SIZE: usize = 16;
pub const SHA1_DIGEST_SIZE: usize = 20;
pub const SHA256_DIGEST_SIZE: usize = 32;
pub const SHA384_DIGEST_SIZE: usize = 48;
pub const SHA512_DIGEST_SIZE: usize = 64;

/// A 128-bit algorithm identifier in the EFI `{u32, u16, u16, [u8; 8]}`
/// layout.
///
/// The layout is fixed so identifiers can be lifted straight out of request
/// bytes with [`Guid::from_prefix`].
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    zerocopy::IntoBytes,
    zerocopy::FromBytes,
    zerocopy::Immutable,
    zerocopy::KnownLayout,
)]
#[repr(C)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Splits a request into its leading identifier (16 bytes, native
    /// endian) and the payload that follows it.
    pub fn from_prefix(bytes: &[u8]) -> Option<(Self, &[u8])> {
        Self::read_from_prefix(bytes).ok()
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.as_bytes());
        out
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1]
        )?;
        for b in &self.data4[2..] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

pub const HASH_ALGORITHM_MD5_GUID: Guid = Guid::new(
    0x0af7_c79c,
    0x65b5,
    0x4319,
    [0xb0, 0xae, 0x44, 0xec, 0x48, 0x4e, 0x4a, 0xd7],
);
pub const HASH_ALGORITHM_SHA1_GUID: Guid = Guid::new(
    0x2ae9_d80f,
    0x3fb2,
    0x4095,
    [0xb7, 0xb1, 0xe9, 0x31, 0x57, 0xb9, 0x46, 0xb6],
);
pub const HASH_ALGORITHM_SHA256_GUID: Guid = Guid::new(
    0x51aa_59de,
    0xfdf2,
    0x4ea3,
    [0xbc, 0x63, 0x87, 0x5f, 0xb7, 0x84, 0x2e, 0xe9],
);
pub const HASH_ALGORITHM_SHA384_GUID: Guid = Guid::new(
    0xefa9_6432,
    0xde33,
    0x4dd2,
    [0xae, 0xe6, 0x32, 0x8c, 0x33, 0xdf, 0x77, 0x7a],
);
pub const HASH_ALGORITHM_SHA512_GUID: Guid = Guid::new(
    0xcaa4_381e,
    0x750c,
    0x4770,
    [0xb8, 0x70, 0x7a, 0x23, 0xb4, 0xe4, 0x21, 0x30],
);

/// Digest algorithms known to the registry
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, num_derive::FromPrimitive)]
#[repr(u32)]
pub enum HashAlgorithm {
    Md5 = 0,
    Sha1 = 1,
    Sha256 = 2,
    Sha384 = 3,
    Sha512 = 4,
}

/// One row of the algorithm registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    pub algorithm: HashAlgorithm,
    pub guid: Guid,
    /// Digest length in bytes
    pub output_size: usize,
    /// Name the engine resolves the primitive by. Matched exactly.
    pub digest_name: &'static str,
}

static HASH_INFO: [AlgorithmDescriptor; 5] = [
    AlgorithmDescriptor {
        algorithm: HashAlgorithm::Md5,
        guid: HASH_ALGORITHM_MD5_GUID,
        output_size: MD5_DIGEST_SIZE,
        digest_name: "MD5",
    },
    AlgorithmDescriptor {
        algorithm: HashAlgorithm::Sha1,
        guid: HASH_ALGORITHM_SHA1_GUID,
        output_size: SHA1_DIGEST_SIZE,
        digest_name: "SHA1",
    },
    AlgorithmDescriptor {
        algorithm: HashAlgorithm::Sha256,
        guid: HASH_ALGORITHM_SHA256_GUID,
        output_size: SHA256_DIGEST_SIZE,
        digest_name: "SHA256",
    },
    AlgorithmDescriptor {
        algorithm: HashAlgorithm::Sha384,
        guid: HASH_ALGORITHM_SHA384_GUID,
        output_size: SHA384_DIGEST_SIZE,
        digest_name: "SHA384",
    },
    AlgorithmDescriptor {
        algorithm: HashAlgorithm::Sha512,
        guid: HASH_ALGORITHM_SHA512_GUID,
        output_size: SHA512_DIGEST_SIZE,
        digest_name: "SHA512",
    },
];

impl HashAlgorithm {
    /// Resolves a wire identifier. Unknown identifiers yield `None`.
    pub fn from_guid(guid: &Guid) -> Option<Self> {
        match *guid {
            HASH_ALGORITHM_MD5_GUID => Some(Self::Md5),
            HASH_ALGORITHM_SHA1_GUID => Some(Self::Sha1),
            HASH_ALGORITHM_SHA256_GUID => Some(Self::Sha256),
            HASH_ALGORITHM_SHA384_GUID => Some(Self::Sha384),
            HASH_ALGORITHM_SHA512_GUID => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::from_u32(raw)
    }

    pub fn descriptor(self) -> &'static AlgorithmDescriptor {
        &HASH_INFO[self as usize]
    }

    /// Returns the output size in bytes
    pub fn output_size(self) -> usize {
        self.descriptor().output_size
    }
}

/// Looks up the registry row for an identifier.
pub fn lookup(guid: &Guid) -> Option<&'static AlgorithmDescriptor> {
    HashAlgorithm::from_guid(guid).map(HashAlgorithm::descriptor)
}

/// Every row of the registry, in identifier order.
pub fn supported_algorithms() -> &'static [AlgorithmDescriptor] {
    &HASH_INFO
}

/// Status codes returned by the Hash2 service entry points.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, num_derive::FromPrimitive)]
#[repr(u32)]
pub enum HashError {
    /// A required handle or buffer was not supplied.
    InvalidArgument = 1,

    /// The algorithm identifier is absent or not in the registry.
    Unsupported = 2,

    /// `init` was called while a computation is still in progress.
    AlreadyStarted = 3,

    /// `update` without a preceding `init`, or `finalize` without at least
    /// one accepted `update`.
    NotReady = 4,

    /// Context creation or the engine primitive failed.
    OutOfResources = 5,
}

impl HashError {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::from_u32(raw)
    }
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            HashError::InvalidArgument => "invalid argument",
            HashError::Unsupported => "unsupported algorithm",
            HashError::AlreadyStarted => "hash already started",
            HashError::NotReady => "hash not ready",
            HashError::OutOfResources => "out of resources",
        };
        f.write_str(msg)
    }
}

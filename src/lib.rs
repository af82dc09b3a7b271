//! Pure Rust implementation of the Argon2 password hashing and key
//! derivation function (RFC 9106), covering Argon2d, Argon2i and Argon2id,
//! the PHC string format, parameter tuning, and batch hashing.

pub mod error;

pub mod batch;
mod blake2b;
mod block;
mod cancel;
mod memory;
pub mod phc;
mod reference;
pub mod tuner;

pub use block::{BLOCK_SIZE, Block};
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use phc::PhcHash;

use blake2b::Blake2b;
use memory::Geometry;

use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

pub const RECOMMENDED_HASH_LENGTH: u32 = 64;
pub const RECOMMENDED_SALT_LENGTH: usize = 16;

/// Minimum salt length in bytes.
pub const MIN_SALT_LENGTH: usize = 8;

/// Minimum output tag length in bytes.
pub const MIN_HASH_LENGTH: u32 = 4;

/// Practical cap on lanes; RFC 9106 allows up to 2^24 - 1 but nothing
/// real uses more than a machine's cores.
pub const MAX_PARALLELISM: u32 = 255;

/// Argon2 primitive type: variants of the algorithm.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Default, Ord)]
pub enum Algorithm {
    /// Optimizes against GPU cracking attacks but vulnerable to side-channels.
    ///
    /// Accesses the memory array in a password dependent order, reducing the
    /// possibility of time–memory tradeoff (TMTO) attacks.
    Argon2d = 0,

    /// Optimized to resist side-channel attacks.
    ///
    /// Accesses the memory array in a password independent order, increasing the
    /// possibility of time-memory tradeoff (TMTO) attacks.
    Argon2i = 1,

    /// Hybrid that mixes Argon2i and Argon2d passes (*default*).
    ///
    /// Uses the Argon2i approach for the first half pass over memory and
    /// Argon2d approach for subsequent passes. This effectively places it in
    /// the "middle" between the other two: it doesn't provide as good
    /// TMTO/GPU cracking resistance as Argon2d, nor as good of side-channel
    /// resistance as Argon2i, but overall provides the most well-rounded
    /// approach to both classes of attacks.
    #[default]
    Argon2id = 2,
}

impl Algorithm {
    /// Identifier used in PHC strings.
    pub fn ident(self) -> &'static str {
        match self {
            Self::Argon2d => "argon2d",
            Self::Argon2i => "argon2i",
            Self::Argon2id => "argon2id",
        }
    }
}

/// Version of the algorithm.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Version {
    /// Version 16 (0x10 in hex)
    ///
    /// Performs overwrite internally
    V0x10 = 0x10,

    /// Version 19 (0x13 in hex, default)
    ///
    /// Performs XOR internally
    #[default]
    V0x13 = 0x13,
}

impl TryFrom<u32> for Version {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0x10 => Ok(Self::V0x10),
            0x13 => Ok(Self::V0x13),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

/// Argon2 instance
///
/// # Parameters
///
/// - `m_cost` - The memory cost in kibibytes
/// - `t_cost` - Iteration cost
/// - `p_cost` - Parallelization (lanes)
/// - `hash_length` - The length of the hash in bytes
/// - `algorithm` - The algorithm to use
/// - `version` - The version of the algorithm to use
/// - `secret` - Optional keyed-hashing secret ("pepper")
/// - `associated_data` - Optional additional input bound into the hash
///
/// By default it will use the `Argon2id` with a `64 byte` hash length.
///
/// Generally speaking you don't want to mess with the `t_cost` and `p_cost`
/// parameters a lot. For max security the `p_cost` should be set to `1` and
/// the `t_cost` could be anything between `8` and `30`. That also depends on
/// the `m_cost` which is the most important parameter. The higher the
/// `m_cost` the more secure the hash is but the time it takes to compute it
/// increases linearly. The [`tuner`] module can pick values against a
/// latency target for you.
///
/// ## Presets
///
/// There are some presets for the `Argon2` struct that you can use.
///
/// - `Argon2::very_fast()`
/// - `Argon2::fast()`
/// - `Argon2::balanced()`
/// - `Argon2::slow()`
/// - `Argon2::very_slow()`
#[derive(Default, Clone, Debug)]
pub struct Argon2 {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
    pub hash_length: u32,
    /// By default we use the Argon2id
    pub algorithm: Algorithm,
    /// By default we use the version 0x13
    pub version: Version,
    pub secret: Option<Vec<u8>>,
    pub associated_data: Option<Vec<u8>>,
}

impl Argon2 {
    /// Create a new Argon2 instance with the given parameters.
    ///
    /// By default it will use the `Argon2id` with a `64 byte` hash length.
    ///
    /// ## Arguments
    ///
    /// - `m_cost` - The memory cost in kibibytes
    /// - `t_cost` - Iteration cost
    /// - `p_cost` - Parallelization
    pub fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Self {
        Self {
            m_cost,
            t_cost,
            p_cost,
            hash_length: RECOMMENDED_HASH_LENGTH,
            ..Default::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_hash_length(mut self, hash_length: u32) -> Self {
        self.hash_length = hash_length;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_associated_data(mut self, associated_data: impl Into<Vec<u8>>) -> Self {
        self.associated_data = Some(associated_data.into());
        self
    }

    /// Checks every parameter bound once, ahead of the hot path.
    pub fn validate(&self) -> Result<()> {
        if self.p_cost == 0 || self.p_cost > MAX_PARALLELISM {
            return Err(Error::InvalidParameter {
                field: "p_cost",
                reason: "must be between 1 and 255",
            });
        }
        if self.t_cost == 0 {
            return Err(Error::InvalidParameter {
                field: "t_cost",
                reason: "must be at least 1",
            });
        }
        if self.m_cost < 8 * self.p_cost {
            return Err(Error::InvalidParameter {
                field: "m_cost",
                reason: "must be at least 8 times p_cost",
            });
        }
        if self.hash_length < MIN_HASH_LENGTH {
            return Err(Error::InvalidParameter {
                field: "hash_length",
                reason: "must be at least 4 bytes",
            });
        }
        if let Some(secret) = &self.secret {
            if secret.len() > u32::MAX as usize {
                return Err(Error::InvalidParameter {
                    field: "secret",
                    reason: "longer than 2^32 - 1 bytes",
                });
            }
        }
        if let Some(associated_data) = &self.associated_data {
            if associated_data.len() > u32::MAX as usize {
                return Err(Error::InvalidParameter {
                    field: "associated_data",
                    reason: "longer than 2^32 - 1 bytes",
                });
            }
        }
        Ok(())
    }

    /// Number of 1024-byte blocks the memory matrix will hold: m' rounded
    /// down from `m_cost` to a multiple of `4 * p_cost`. Zero when the
    /// parameters would not validate.
    pub fn block_count(&self) -> usize {
        if self.p_cost == 0 {
            return 0;
        }
        Geometry::new(self.m_cost, self.p_cost).block_count as usize
    }

    /// Hashes the given password.
    ///
    /// ## Arguments
    ///
    /// - `password` - The password to hash
    /// - `salt` - The salt to use for hashing (at least 8 bytes)
    ///
    /// ## Returns
    ///
    /// The hash of the password in its raw byte form, `hash_length` bytes.
    pub fn hash_password(&self, password: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.hash_length as usize];
        self.hash_password_into(password, salt, &mut out)?;
        Ok(out)
    }

    /// Hashes the given password into a caller-owned buffer.
    ///
    /// The buffer length is the tag length, so this doubles as the
    /// arbitrary-length entry point (`hash_length` is ignored).
    pub fn hash_password_into(
        &self,
        password: &[u8],
        salt: &[u8],
        out: &mut [u8],
    ) -> Result<()> {
        let mut blocks = self.allocate_blocks()?;
        self.hash_with_memory(password, salt, out, &mut blocks, None)
    }

    /// Like [`Argon2::hash_password_into`], but with caller-provided
    /// backing memory for the matrix.
    ///
    /// `blocks` must hold at least [`Argon2::block_count`] blocks. The used
    /// part of the buffer is guaranteed to be all-zero when this returns,
    /// whatever the outcome.
    pub fn hash_password_into_with_memory(
        &self,
        password: &[u8],
        salt: &[u8],
        out: &mut [u8],
        blocks: &mut [Block],
    ) -> Result<()> {
        self.hash_with_memory(password, salt, out, blocks, None)
    }

    /// Hashes with a cancellation token, polled at slice boundaries.
    ///
    /// On cancellation the matrix is zeroized and [`Error::Cancelled`]
    /// is returned; no partial output is written.
    pub fn hash_password_with_token(
        &self,
        password: &[u8],
        salt: &[u8],
        token: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.hash_length as usize];
        let mut blocks = self.allocate_blocks()?;
        self.hash_with_memory(password, salt, &mut out, &mut blocks, Some(token))?;
        Ok(out)
    }

    /// Derives a key of `key_length` bytes; identical to hashing with
    /// `hash_length = key_length`.
    pub fn derive_key(&self, password: &[u8], salt: &[u8], key_length: u32) -> Result<Vec<u8>> {
        let mut key = vec![0u8; key_length as usize];
        self.hash_password_into(password, salt, &mut key)?;
        Ok(key)
    }

    /// Recomputes the hash for `password` and compares it against
    /// `expected` in constant time.
    ///
    /// A candidate of the wrong length returns `false` immediately; the
    /// comparison itself never branches on byte values.
    pub fn verify_password(
        &self,
        password: &[u8],
        salt: &[u8],
        expected: &[u8],
    ) -> Result<bool> {
        if expected.len() != self.hash_length as usize {
            return Ok(false);
        }
        let mut computed = self.hash_password(password, salt)?;
        let matches = computed.ct_eq(expected).into();
        computed.zeroize();
        Ok(matches)
    }

    /// Hashes `password` with a fresh random salt and returns the PHC
    /// string (`$argon2id$v=19$...`) ready for storage.
    pub fn hash_password_phc(&self, password: &[u8]) -> Result<String> {
        let salt = generate_salt(RECOMMENDED_SALT_LENGTH)?;
        let hash = self.hash_password(password, &salt)?;
        Ok(phc::encode(&PhcHash {
            algorithm: self.algorithm,
            version: self.version,
            m_cost: self.m_cost,
            t_cost: self.t_cost,
            p_cost: self.p_cost,
            keyid: None,
            data: self.associated_data.clone(),
            salt,
            hash,
        }))
    }

    fn allocate_blocks(&self) -> Result<Vec<Block>> {
        let count = self.block_count();
        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(count)
            .map_err(|_| Error::OutOfMemory)?;
        blocks.resize_with(count, Block::default);
        Ok(blocks)
    }

    /// The full pipeline: H0, lane seeding, memory filling, finalization.
    /// Every block touched is zeroized before returning, on success and
    /// on error alike.
    fn hash_with_memory(
        &self,
        password: &[u8],
        salt: &[u8],
        out: &mut [u8],
        blocks: &mut [Block],
        token: Option<&CancellationToken>,
    ) -> Result<()> {
        self.validate()?;
        check_inputs(password, salt, out)?;

        let geometry = Geometry::new(self.m_cost, self.p_cost);
        let blocks = blocks
            .get_mut(..geometry.block_count as usize)
            .ok_or(Error::InvalidParameter {
                field: "memory",
                reason: "buffer holds fewer blocks than m_cost requires",
            })?;

        let mut h0 = self.initial_hash(password, salt, out.len() as u32);
        memory::seed_lanes(blocks, &geometry, &h0);
        h0.zeroize();

        let outcome = memory::fill(
            blocks,
            &geometry,
            self.algorithm,
            self.version,
            self.t_cost,
            token,
        );
        if outcome.is_ok() {
            memory::finalize(blocks, &geometry, out);
        }

        for block in blocks.iter_mut() {
            block.zeroize();
        }
        outcome
    }

    /// H0 = Blake2b-512 over all parameters and inputs, each length-prefixed
    /// (RFC 9106 §3.2). Note the memory cost hashed here is the caller's
    /// value, not the rounded block count.
    fn initial_hash(&self, password: &[u8], salt: &[u8], tag_length: u32) -> [u8; 64] {
        let mut digest = Blake2b::new(64);
        digest.update(&self.p_cost.to_le_bytes());
        digest.update(&tag_length.to_le_bytes());
        digest.update(&self.m_cost.to_le_bytes());
        digest.update(&self.t_cost.to_le_bytes());
        digest.update(&(self.version as u32).to_le_bytes());
        digest.update(&(self.algorithm as u32).to_le_bytes());

        digest.update(&(password.len() as u32).to_le_bytes());
        digest.update(password);
        digest.update(&(salt.len() as u32).to_le_bytes());
        digest.update(salt);

        match &self.secret {
            Some(secret) => {
                digest.update(&(secret.len() as u32).to_le_bytes());
                digest.update(secret);
            }
            None => digest.update(&0u32.to_le_bytes()),
        }
        match &self.associated_data {
            Some(associated_data) => {
                digest.update(&(associated_data.len() as u32).to_le_bytes());
                digest.update(associated_data);
            }
            None => digest.update(&0u32.to_le_bytes()),
        }

        let mut h0 = [0u8; 64];
        digest.finalize_into(&mut h0);
        h0
    }
}

// Argon2 Presets
impl Argon2 {
    pub fn very_fast() -> Self {
        Self {
            m_cost: 128_000,
            t_cost: 8,
            p_cost: 1,
            hash_length: RECOMMENDED_HASH_LENGTH,
            ..Default::default()
        }
    }

    pub fn fast() -> Self {
        Self {
            m_cost: 256_000,
            t_cost: 16,
            p_cost: 1,
            hash_length: RECOMMENDED_HASH_LENGTH,
            ..Default::default()
        }
    }

    pub fn balanced() -> Self {
        Self {
            m_cost: 1024_000,
            t_cost: 8,
            p_cost: 1,
            hash_length: RECOMMENDED_HASH_LENGTH,
            ..Default::default()
        }
    }

    pub fn slow() -> Self {
        Self {
            m_cost: 2048_000,
            t_cost: 8,
            p_cost: 1,
            hash_length: RECOMMENDED_HASH_LENGTH,
            ..Default::default()
        }
    }

    pub fn very_slow() -> Self {
        Self {
            m_cost: 3072_000,
            t_cost: 8,
            p_cost: 1,
            hash_length: RECOMMENDED_HASH_LENGTH,
            ..Default::default()
        }
    }
}

/// Fills a fresh salt of `length` bytes from the operating system's CSPRNG.
pub fn generate_salt(length: usize) -> Result<Vec<u8>> {
    if length < MIN_SALT_LENGTH {
        return Err(Error::InvalidParameter {
            field: "salt",
            reason: "must be at least 8 bytes",
        });
    }
    let mut salt = vec![0u8; length];
    OsRng.fill_bytes(&mut salt);
    Ok(salt)
}

fn check_inputs(password: &[u8], salt: &[u8], out: &[u8]) -> Result<()> {
    if password.len() > u32::MAX as usize {
        return Err(Error::InvalidParameter {
            field: "password",
            reason: "longer than 2^32 - 1 bytes",
        });
    }
    if salt.len() < MIN_SALT_LENGTH {
        return Err(Error::InvalidParameter {
            field: "salt",
            reason: "must be at least 8 bytes",
        });
    }
    if salt.len() > u32::MAX as usize {
        return Err(Error::InvalidParameter {
            field: "salt",
            reason: "longer than 2^32 - 1 bytes",
        });
    }
    if out.len() < MIN_HASH_LENGTH as usize {
        return Err(Error::InvalidParameter {
            field: "hash_length",
            reason: "must be at least 4 bytes",
        });
    }
    if out.len() > u32::MAX as usize {
        return Err(Error::InvalidParameter {
            field: "hash_length",
            reason: "longer than 2^32 - 1 bytes",
        });
    }
    Ok(())
}

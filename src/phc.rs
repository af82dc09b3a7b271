//! PHC string codec and the rehash policy.
//!
//! The encoded form is
//! `$argon2<variant>$v=<ver>$m=<m>,t=<t>,p=<p>[,keyid=<b64>][,data=<b64>]$<salt>$<hash>`
//! with RFC 4648 base64 and no padding. Parsing is strict: padded base64,
//! whitespace, unknown or reordered segments, and trailing characters are
//! all rejected. Encoding is canonical and always emits the `v=` segment;
//! decoding accepts legacy strings without one and reports them as version
//! 0x10, surfaced through [`PhcHash::version`] so callers can decide
//! whether to accept such hashes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::{Algorithm, Argon2, MIN_HASH_LENGTH, MIN_SALT_LENGTH, Version};

use core::fmt::Write as _;

/// A decoded (or to-be-encoded) PHC hash record.
///
/// This is an immutable value object: the parameters that produced a stored
/// hash, the salt, and the hash itself. It carries everything needed to
/// re-run the function for verification or to decide on a rehash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhcHash {
    pub algorithm: Algorithm,
    pub version: Version,
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
    /// Optional `keyid` segment, decoded. This crate never interprets it;
    /// it only round-trips.
    pub keyid: Option<Vec<u8>>,
    /// Optional `data` segment (associated data X), decoded.
    pub data: Option<Vec<u8>>,
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

impl PhcHash {
    /// The hashing configuration stored in this record.
    ///
    /// The `data` segment is carried over as associated data; a secret key
    /// referenced by `keyid` has to be attached by the caller via
    /// [`Argon2::with_secret`] before verifying keyed hashes.
    pub fn to_config(&self) -> Argon2 {
        let mut config = Argon2::new(self.m_cost, self.t_cost, self.p_cost)
            .with_algorithm(self.algorithm)
            .with_version(self.version)
            .with_hash_length(self.hash.len() as u32);
        if let Some(data) = &self.data {
            config = config.with_associated_data(data.clone());
        }
        config
    }

    /// True when a stored hash should be recomputed because any tunable
    /// differs from `desired`. A different salt alone never triggers.
    pub fn needs_rehash(&self, desired: &Argon2) -> bool {
        self.algorithm != desired.algorithm
            || self.version != desired.version
            || self.m_cost != desired.m_cost
            || self.t_cost != desired.t_cost
            || self.p_cost != desired.p_cost
            || self.hash.len() as u32 != desired.hash_length
    }
}

/// Renders the canonical PHC string for `hash`.
pub fn encode(hash: &PhcHash) -> String {
    let mut out = String::with_capacity(
        64 + 4 * (hash.salt.len() + hash.hash.len()) / 3,
    );

    let _ = write!(
        out,
        "${}$v={}$m={},t={},p={}",
        hash.algorithm.ident(),
        hash.version as u32,
        hash.m_cost,
        hash.t_cost,
        hash.p_cost,
    );
    if let Some(keyid) = &hash.keyid {
        let _ = write!(out, ",keyid={}", STANDARD_NO_PAD.encode(keyid));
    }
    if let Some(data) = &hash.data {
        let _ = write!(out, ",data={}", STANDARD_NO_PAD.encode(data));
    }
    let _ = write!(
        out,
        "${}${}",
        STANDARD_NO_PAD.encode(&hash.salt),
        STANDARD_NO_PAD.encode(&hash.hash),
    );

    out
}

/// Parses a PHC string, strictly.
pub fn decode(encoded: &str) -> Result<PhcHash> {
    let mut fields = encoded.split('$');
    if fields.next() != Some("") {
        return Err(Error::InvalidPhcFormat("must start with `$`"));
    }

    let ident = fields
        .next()
        .ok_or(Error::InvalidPhcFormat("missing algorithm identifier"))?;
    let suffix = ident
        .strip_prefix("argon2")
        .ok_or(Error::InvalidPhcFormat("not an argon2 identifier"))?;
    let algorithm = match suffix {
        "d" => Algorithm::Argon2d,
        "i" => Algorithm::Argon2i,
        "id" => Algorithm::Argon2id,
        _ => return Err(Error::UnsupportedVariant(ident.to_string())),
    };

    let mut segment = fields
        .next()
        .ok_or(Error::InvalidPhcFormat("missing parameter segment"))?;

    // Legacy strings produced before versioning carry no `v=` segment and
    // mean version 0x10.
    let version = match segment.strip_prefix("v=") {
        Some(value) => {
            let number = parse_decimal(value)?;
            let version = Version::try_from(number)?;
            segment = fields
                .next()
                .ok_or(Error::InvalidPhcFormat("missing parameter segment"))?;
            version
        }
        None => Version::V0x10,
    };

    let mut parameters = segment.split(',');
    let m_cost = expect_decimal(parameters.next(), "m=")?;
    let t_cost = expect_decimal(parameters.next(), "t=")?;
    let p_cost = expect_decimal(parameters.next(), "p=")?;

    let mut keyid = None;
    let mut data = None;
    for extra in parameters {
        if let Some(value) = extra.strip_prefix("keyid=") {
            if keyid.is_some() || data.is_some() {
                return Err(Error::InvalidPhcFormat("parameters out of order"));
            }
            keyid = Some(decode_base64(value)?);
        } else if let Some(value) = extra.strip_prefix("data=") {
            if data.is_some() {
                return Err(Error::InvalidPhcFormat("duplicate data parameter"));
            }
            data = Some(decode_base64(value)?);
        } else {
            return Err(Error::InvalidPhcFormat("unknown parameter"));
        }
    }

    let salt = decode_base64(fields.next().ok_or(Error::InvalidPhcFormat("missing salt"))?)?;
    let hash = decode_base64(fields.next().ok_or(Error::InvalidPhcFormat("missing hash"))?)?;
    if fields.next().is_some() {
        return Err(Error::InvalidPhcFormat("trailing field"));
    }

    if salt.len() < MIN_SALT_LENGTH {
        return Err(Error::InvalidParameter {
            field: "salt",
            reason: "must be at least 8 bytes",
        });
    }
    if hash.len() < MIN_HASH_LENGTH as usize {
        return Err(Error::InvalidParameter {
            field: "hash_length",
            reason: "must be at least 4 bytes",
        });
    }

    Ok(PhcHash {
        algorithm,
        version,
        m_cost,
        t_cost,
        p_cost,
        keyid,
        data,
        salt,
        hash,
    })
}

/// Parses `encoded`, recomputes the hash for `password` with the stored
/// parameters and salt, and compares in constant time.
///
/// Returns the comparison outcome together with the decoded record, so the
/// caller can follow up with [`PhcHash::needs_rehash`] without parsing
/// twice.
pub fn verify(password: &[u8], encoded: &str) -> Result<(bool, PhcHash)> {
    let parsed = decode(encoded)?;
    let config = parsed.to_config();

    let mut computed = vec![0u8; parsed.hash.len()];
    config.hash_password_into(password, &parsed.salt, &mut computed)?;

    let matches = computed.ct_eq(&parsed.hash).into();
    computed.zeroize();
    Ok((matches, parsed))
}

fn decode_base64(value: &str) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(Error::InvalidPhcFormat("empty base64 field"));
    }
    // STANDARD_NO_PAD rejects `=`, whitespace and any non-alphabet byte.
    STANDARD_NO_PAD
        .decode(value)
        .map_err(|_| Error::InvalidPhcFormat("invalid base64"))
}

fn expect_decimal(part: Option<&str>, key: &'static str) -> Result<u32> {
    let part = part.ok_or(Error::InvalidPhcFormat("missing cost parameter"))?;
    let value = part
        .strip_prefix(key)
        .ok_or(Error::InvalidPhcFormat("cost parameters out of order"))?;
    parse_decimal(value)
}

/// Decimal with no sign, no leading zeros and no stray characters.
fn parse_decimal(value: &str) -> Result<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPhcFormat("not a decimal number"));
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(Error::InvalidPhcFormat("leading zero in number"));
    }
    value
        .parse()
        .map_err(|_| Error::InvalidPhcFormat("number out of range"))
}

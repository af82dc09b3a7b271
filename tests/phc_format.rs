//! PHC string interoperability: strings produced by the reference argon2
//! implementation must decode, verify and round-trip here.

use argon2_native::{Algorithm, Argon2, Error, Version, phc};

const REFERENCE_ENCODED: &str =
    "$argon2i$v=19$m=256,t=2,p=1$c29tZXNhbHQ$iekCn0Y3spW+sCcFanM2xBT63UP2sghkUoHLIUpWRS8";

#[test]
fn reference_string_decodes_and_verifies() {
    let (ok, parsed) = phc::verify(b"password", REFERENCE_ENCODED).unwrap();
    assert!(ok);
    assert_eq!(parsed.algorithm, Algorithm::Argon2i);
    assert_eq!(parsed.version, Version::V0x13);
    assert_eq!(parsed.m_cost, 256);
    assert_eq!(parsed.t_cost, 2);
    assert_eq!(parsed.p_cost, 1);
    assert_eq!(parsed.salt, b"somesalt");
    assert_eq!(parsed.hash.len(), 32);
}

#[test]
fn reference_string_rejects_the_wrong_password() {
    let (ok, _) = phc::verify(b"not the password", REFERENCE_ENCODED).unwrap();
    assert!(!ok);
}

#[test]
fn canonical_strings_round_trip_byte_for_byte() {
    let strings = [
        REFERENCE_ENCODED,
        "$argon2id$v=19$m=256,t=2,p=2$c29tZXNhbHQ$bQk8UB/VmZZF4Oo79iDXuL5/0ttZwg2f/5U52iv1cDc",
        "$argon2i$v=19$m=65536,t=2,p=1$ZGlmZnNhbHQ$sDV8zPvvkfOGCw26RHsjSMvv7K2vmQq/6cxAcmxSEnE",
    ];
    for encoded in strings {
        let parsed = phc::decode(encoded).unwrap();
        assert_eq!(phc::encode(&parsed), encoded);
        assert_eq!(phc::decode(&phc::encode(&parsed)).unwrap(), parsed);
    }
}

#[test]
fn legacy_strings_without_version_verify_as_0x10() {
    // Produced by argon2 version 1.0 tooling, before the v= segment existed.
    let legacy =
        "$argon2i$m=256,t=2,p=1$c29tZXNhbHQ$/U3YPXYsSb3q9XxHvc0MLxur+GP960kN9j7emXX8zwY";
    let (ok, parsed) = phc::verify(b"password", legacy).unwrap();
    assert!(ok);
    assert_eq!(parsed.version, Version::V0x10);

    // Canonical re-encoding makes the version explicit.
    let reencoded = phc::encode(&parsed);
    assert!(reencoded.starts_with("$argon2i$v=16$"));
    assert_eq!(phc::decode(&reencoded).unwrap(), parsed);
}

#[test]
fn verify_result_feeds_the_rehash_policy() {
    let policy = Argon2::new(256, 2, 1)
        .with_algorithm(Algorithm::Argon2i)
        .with_hash_length(32);
    let (_, parsed) = phc::verify(b"password", REFERENCE_ENCODED).unwrap();
    assert!(!parsed.needs_rehash(&policy));

    let stronger = Argon2::new(65536, 2, 1)
        .with_algorithm(Algorithm::Argon2i)
        .with_hash_length(32);
    assert!(parsed.needs_rehash(&stronger));
}

#[test]
fn malformed_strings_are_rejected() {
    // Missing `$` between parameters and salt.
    let missing_separator =
        "$argon2i$v=19$m=65536,t=2,p=1c29tZXNhbHQ$wWKIMhR9lyDFvRz9YTZweHKfbftvj+qf+YFY4NeBbtA";
    assert!(matches!(
        phc::decode(missing_separator).unwrap_err(),
        Error::InvalidPhcFormat(_)
    ));

    // Empty salt field.
    let empty_salt = "$argon2i$v=19$m=65536,t=2,p=1$$9sTbSlTio3Biev89thdrlKKiCaYsjjYVJxGAL3swxpQ";
    assert!(matches!(
        phc::decode(empty_salt).unwrap_err(),
        Error::InvalidPhcFormat(_)
    ));

    // Padded base64.
    let padded =
        "$argon2i$v=19$m=256,t=2,p=1$c29tZXNhbHQ=$iekCn0Y3spW+sCcFanM2xBT63UP2sghkUoHLIUpWRS8";
    assert!(matches!(
        phc::decode(padded).unwrap_err(),
        Error::InvalidPhcFormat(_)
    ));

    // Whitespace.
    let spaced =
        "$argon2i$v=19$m=256, t=2,p=1$c29tZXNhbHQ$iekCn0Y3spW+sCcFanM2xBT63UP2sghkUoHLIUpWRS8";
    assert!(matches!(
        phc::decode(spaced).unwrap_err(),
        Error::InvalidPhcFormat(_)
    ));

    // Unknown variant suffix.
    assert!(matches!(
        phc::decode("$argon2xx$v=19$m=256,t=2,p=1$c29tZXNhbHQ$AAAAAA").unwrap_err(),
        Error::UnsupportedVariant(_)
    ));

    // Unknown version.
    assert_eq!(
        phc::decode("$argon2i$v=20$m=256,t=2,p=1$c29tZXNhbHQ$AAAAAA").unwrap_err(),
        Error::UnsupportedVersion(20)
    );
}

#[test]
fn stored_hash_with_flipped_bytes_fails_verification() {
    // Same parameters as the reference string, last b64 chunk corrupted.
    let corrupted =
        "$argon2i$v=19$m=256,t=2,p=1$c29tZXNhbHQ$iekCn0Y3spW+sCcFanM2xBT63UP2sghkUoHLIUpWRT8";
    let (ok, _) = phc::verify(b"password", corrupted).unwrap();
    assert!(!ok);
}

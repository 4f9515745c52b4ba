//! Scrambling and key derivation against recorded reference vectors

use casa_token::{
    SigningKeyId, TokenError, TokenPurpose, derive_key, derive_signing_key, descramble, scramble,
};
use hex_literal::hex;
use proptest::prelude::*;

const RAW_SECRET: [u8; 4] = [0x00, 0x01, 0x02, 0x03];

#[test]
fn descramble_matches_htcondor_fixture() {
    assert_eq!(descramble(&RAW_SECRET).as_slice(), &hex!("deacbcec"));
    assert_eq!(scramble(b"password").as_slice(), &hex!("aecccd9ca9c2cc8b"));
    assert_eq!(descramble(&hex!("aecccd9ca9c2cc8b")).as_slice(), b"password");
    assert!(descramble(&[]).is_empty());
}

#[test]
fn pool_key_doubles_the_secret() {
    let password = descramble(&RAW_SECRET);
    let pool = derive_signing_key(&password, TokenPurpose::HtcondorPool, &SigningKeyId::Pool)
        .expect("derivation");
    assert_eq!(
        pool.as_bytes(),
        &hex!("52249ee499447355e046b1efb3a841a04d26fd2c0b18ddba0019d43b9a5d5c74")
    );

    let mut doubled = password.to_vec();
    doubled.extend_from_slice(&password);
    let manual = derive_key(&doubled, TokenPurpose::HtcondorPool).expect("derivation");
    assert_eq!(pool, manual);
}

#[test]
fn daemon_key_uses_secret_once() {
    let password = descramble(&RAW_SECRET);
    let kid = SigningKeyId::parse("condor@cmsaf.example.org").expect("kid");
    let daemon = derive_signing_key(&password, TokenPurpose::HtcondorPool, &kid)
        .expect("derivation");
    assert_eq!(
        daemon.as_bytes(),
        &hex!("af9bb13808bdcb65b758de9877ebf1dd7e0f1c5ba851078ddc6c1e56cbf2c8d8")
    );
}

#[test]
fn servicex_key_matches_reference() {
    let password = descramble(&RAW_SECRET);
    let key = derive_key(&password, TokenPurpose::ServiceX).expect("derivation");
    assert_eq!(
        key.as_bytes(),
        &hex!("c69066d1b95be7580d1f6f5c7090cf98a91981ab810b2404c2a892c803c26e7e")
    );
}

#[test]
fn textual_password_vectors() {
    let pool = derive_signing_key(b"password", TokenPurpose::HtcondorPool, &SigningKeyId::Pool)
        .expect("derivation");
    let condor = derive_key(b"password", TokenPurpose::HtcondorPool).expect("derivation");
    let servicex = derive_key(b"password", TokenPurpose::ServiceX).expect("derivation");

    assert_eq!(
        pool.as_bytes(),
        &hex!("839fe9acdd6ed825ed9307d64fac28c0a6bf21016e6f7e2a614d8ed811c7ed56")
    );
    assert_eq!(
        condor.as_bytes(),
        &hex!("900d1bb54d03e3b167e758746a365899c8bde33ce1a1399429fbed3c16f0e7ed")
    );
    assert_eq!(
        servicex.as_bytes(),
        &hex!("5e4decd2d6cd9263a5051c39869653e58f293aabff90691a6f3a21e492e42c96")
    );
}

#[test]
fn purposes_parse_by_name_only() {
    assert_eq!("htcondor".parse::<TokenPurpose>().expect("purpose"), TokenPurpose::HtcondorPool);
    assert_eq!("servicex".parse::<TokenPurpose>().expect("purpose"), TokenPurpose::ServiceX);

    for unknown in ["", "HTCondor", "xcache", "master jwt"] {
        let err = unknown.parse::<TokenPurpose>().expect_err("must be rejected");
        assert!(matches!(err, TokenError::UnknownPurpose(_)), "unexpected error: {err}");
    }
}

#[test]
fn key_ids_are_validated() {
    assert_eq!(SigningKeyId::parse("POOL").expect("kid"), SigningKeyId::Pool);
    assert_eq!(
        SigningKeyId::parse("schedd").expect("kid"),
        SigningKeyId::Daemon("schedd".to_string())
    );

    for bad in ["", " ", "pool", "Pool", "PO OL", "POOL\n"] {
        let err = SigningKeyId::parse(bad).expect_err("must be rejected");
        assert!(matches!(err, TokenError::InvalidKeyId(_)), "unexpected error: {err}");
    }
}

#[test]
fn derived_key_debug_is_redacted() {
    let key = derive_key(b"password", TokenPurpose::ServiceX).expect("derivation");
    assert_eq!(format!("{key:?}"), "DerivedSigningKey(<redacted>)");
}

proptest! {
    #[test]
    fn descramble_is_self_inverse(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let twice = descramble(&descramble(&bytes));
        prop_assert_eq!(twice.as_slice(), bytes.as_slice());
    }

    #[test]
    fn derivation_is_deterministic_and_purpose_scoped(
        secret in proptest::collection::vec(any::<u8>(), 1..128),
    ) {
        let a = derive_key(&secret, TokenPurpose::HtcondorPool).expect("derivation");
        let b = derive_key(&secret, TokenPurpose::HtcondorPool).expect("derivation");
        let c = derive_key(&secret, TokenPurpose::ServiceX).expect("derivation");
        prop_assert_eq!(&a, &b);
        prop_assert_ne!(&a, &c);
    }

    #[test]
    fn pool_and_daemon_keys_differ(secret in proptest::collection::vec(any::<u8>(), 1..64)) {
        let pool = derive_signing_key(&secret, TokenPurpose::HtcondorPool, &SigningKeyId::Pool)
            .expect("derivation");
        let daemon = derive_signing_key(
            &secret,
            TokenPurpose::HtcondorPool,
            &SigningKeyId::Daemon("schedd".to_string()),
        )
        .expect("derivation");
        prop_assert_ne!(pool, daemon);
    }
}

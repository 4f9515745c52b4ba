//! Legacy encrypted PEM interoperability

use casa_x509::pem::{decrypt_private_key_pem, encrypt_private_key_pem, is_encrypted_pem};
use casa_x509::{KeyPairFactory, RsaKeyPair, X509Error};
use proptest::prelude::*;

const ENCRYPTED_FIXTURE: &str = include_str!("fixtures/encrypted_rsa_key.pem");
const PLAIN_FIXTURE: &str = include_str!("fixtures/plain_rsa_key.pem");

#[test]
fn decrypts_openssl_encrypted_key() {
    assert!(is_encrypted_pem(ENCRYPTED_FIXTURE));
    assert!(!is_encrypted_pem(PLAIN_FIXTURE));

    let der = decrypt_private_key_pem(ENCRYPTED_FIXTURE, b"password").expect("decrypt fixture");
    let expected = RsaKeyPair::from_pkcs1_pem(PLAIN_FIXTURE)
        .expect("plain fixture")
        .to_pkcs1_der()
        .expect("DER");
    assert_eq!(der.as_slice(), expected.as_slice());
}

#[test]
fn wrong_password_is_rejected() {
    let err = decrypt_private_key_pem(ENCRYPTED_FIXTURE, b"wrong")
        .expect_err("wrong password must fail");
    assert!(matches!(err, X509Error::Decryption(_)), "unexpected error: {err}");
}

#[test]
fn generated_key_round_trips_through_encryption() {
    let key = KeyPairFactory::generate().expect("key generation");
    let pem = key.to_encrypted_pkcs1_pem(b"password").expect("encrypt");

    let der = decrypt_private_key_pem(&pem, b"password").expect("decrypt");
    assert_eq!(der.as_slice(), key.to_pkcs1_der().expect("DER").as_slice());
}

#[test]
fn encrypted_pem_uses_fresh_iv() {
    let der = RsaKeyPair::from_pkcs1_pem(PLAIN_FIXTURE)
        .expect("plain fixture")
        .to_pkcs1_der()
        .expect("DER");
    let a = encrypt_private_key_pem(&der, b"password").expect("encrypt");
    let b = encrypt_private_key_pem(&der, b"password").expect("encrypt");
    assert_ne!(a, b);
}

#[test]
fn encrypted_pem_wraps_at_64_columns() {
    let der = RsaKeyPair::from_pkcs1_pem(PLAIN_FIXTURE)
        .expect("plain fixture")
        .to_pkcs1_der()
        .expect("DER");
    let pem = encrypt_private_key_pem(&der, b"password").expect("encrypt");
    assert!(pem.lines().all(|line| line.len() <= 64 || line.starts_with("DEK-Info")));
}

proptest! {
    #[test]
    fn encryption_round_trips_arbitrary_payloads(
        payload in proptest::collection::vec(any::<u8>(), 0..512),
        password in proptest::collection::vec(any::<u8>(), 1..32),
    ) {
        let pem = encrypt_private_key_pem(&payload, &password).expect("encrypt");
        let plain = decrypt_private_key_pem(&pem, &password).expect("decrypt");
        prop_assert_eq!(plain.as_slice(), payload.as_slice());
    }
}

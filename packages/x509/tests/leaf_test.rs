//! Server and user certificate issuance, CSR validation and chain checks

use casa_x509::{
    KeyPairFactory, SigningRequest, SubjectTemplate, X509Error, build_csr, generate_ca,
    issue_server_certificate, issue_user_certificate, sign_csr,
};
use rcgen::{CertificateParams, SanType};
use time::{Duration, OffsetDateTime};

fn subject() -> SubjectTemplate {
    SubjectTemplate::default()
}

#[test]
fn server_certificate_chains_to_ca() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let (server, key) =
        issue_server_certificate(&ca, "Coffea dask cluster", &subject()).expect("issuance");

    server
        .verify_issued_by(ca.certificate())
        .expect("server certificate must chain to its CA");
    assert_eq!(key.modulus_bits(), 2048);

    let summary = server.summary().expect("summary");
    assert_eq!(summary.subject_common_name.as_deref(), Some("Coffea dask cluster"));
    assert_eq!(summary.issuer_common_name.as_deref(), Some("Leaf test CA"));
}

#[test]
fn server_certificate_usage_is_client_and_server() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let (server, _) =
        issue_server_certificate(&ca, "Coffea dask cluster", &subject()).expect("issuance");
    let summary = server.summary().expect("summary");

    let ku = summary.key_usage.expect("key usage present");
    assert!(ku.critical);
    assert!(ku.digital_signature);
    assert!(ku.key_encipherment);
    assert!(!ku.key_cert_sign);

    let eku = summary.extended_key_usage.expect("extended key usage present");
    assert!(eku.critical);
    assert!(eku.client_auth);
    assert!(eku.server_auth);

    assert!(!summary.basic_constraints.is_some_and(|bc| bc.ca));
}

#[test]
fn user_certificate_is_client_only() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let (user, _) = issue_user_certificate(&ca, "Coffea user", &subject()).expect("issuance");

    user.verify_issued_by(ca.certificate())
        .expect("user certificate must chain to its CA");

    let summary = user.summary().expect("summary");
    assert_eq!(summary.subject_common_name.as_deref(), Some("Coffea user"));

    let ku = summary.key_usage.expect("key usage present");
    assert!(ku.critical && ku.digital_signature && ku.key_encipherment);

    let eku = summary.extended_key_usage.expect("extended key usage present");
    assert!(eku.critical);
    assert!(eku.client_auth);
    assert!(!eku.server_auth, "user certificates must not be server-presentable");
}

#[test]
fn leaf_validity_window_spans_366_days_around_issuance() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let issued = OffsetDateTime::now_utc();
    let (user, _) = issue_user_certificate(&ca, "Coffea user", &subject()).expect("issuance");
    let summary = user.summary().expect("summary");

    assert_eq!(summary.not_after - summary.not_before, Duration::days(366));
    assert!(summary.not_before <= issued);
    assert!(issued <= summary.not_after);
}

#[test]
fn leaf_does_not_chain_to_unrelated_ca() {
    let ca = generate_ca("Real CA", &subject()).expect("CA generation");
    let unrelated = generate_ca("Unrelated CA", &subject()).expect("CA generation");
    let (server, _) = issue_server_certificate(&ca, "server", &subject()).expect("issuance");

    let err = server
        .verify_issued_by(unrelated.certificate())
        .expect_err("unrelated CA must not validate the leaf");
    assert!(matches!(err, X509Error::ChainValidation(_)), "unexpected error: {err}");
}

#[test]
fn same_named_impostor_ca_fails_signature_check() {
    let ca = generate_ca("Shared name CA", &subject()).expect("CA generation");
    let impostor = generate_ca("Shared name CA", &subject()).expect("CA generation");
    let (user, _) = issue_user_certificate(&ca, "Coffea user", &subject()).expect("issuance");

    let err = user
        .verify_issued_by(impostor.certificate())
        .expect_err("identical names must not be enough");
    assert!(matches!(err, X509Error::ChainValidation(_)), "unexpected error: {err}");
}

#[test]
fn leaf_is_rejected_once_expired() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let (server, _) = issue_server_certificate(&ca, "server", &subject()).expect("issuance");
    let later = OffsetDateTime::now_utc() + Duration::days(400);

    let err = server
        .verify_issued_by_at(ca.certificate(), later)
        .expect_err("expired certificate must fail");
    assert!(matches!(err, X509Error::ChainValidation(_)), "unexpected error: {err}");
}

#[test]
fn csr_survives_pem_transport() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let (csr, _) = build_csr("Transported user", &subject()).expect("CSR");
    assert!(csr.pem().starts_with("-----BEGIN CERTIFICATE REQUEST-----"));

    let received = SigningRequest::from_pem(csr.pem()).expect("PEM parse");
    assert_eq!(received.der(), csr.der());

    let cert = sign_csr(&ca, &received).expect("signing");
    let summary = cert.summary().expect("summary");
    assert_eq!(summary.subject_common_name.as_deref(), Some("Transported user"));
}

#[test]
fn csr_with_extensions_is_rejected() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let key = KeyPairFactory::generate()
        .expect("key generation")
        .signing_key()
        .expect("signing key");

    let mut params = CertificateParams::default();
    params.distinguished_name = subject().distinguished_name("Sneaky user");
    params.subject_alt_names = vec![SanType::DnsName(
        "evil.example.org".try_into().expect("valid DNS name"),
    )];
    let request = params.serialize_request(&key).expect("CSR serialization");
    let csr = SigningRequest::from_der(request.der().to_vec());

    let err = sign_csr(&ca, &csr).expect_err("CSR with extensions must be rejected");
    assert!(
        matches!(err, X509Error::DisallowedExtensions { count: 1 }),
        "unexpected error: {err}"
    );
    assert!(err.is_untrusted_request());
}

#[test]
fn csr_with_tampered_signature_is_rejected() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let (csr, _) = build_csr("Coffea user", &subject()).expect("CSR");

    let mut der = csr.der().to_vec();
    if let Some(last) = der.last_mut() {
        *last ^= 0x01;
    }
    let tampered = SigningRequest::from_der(der);

    let err = sign_csr(&ca, &tampered).expect_err("tampered CSR must be rejected");
    assert!(matches!(err, X509Error::InvalidSignature), "unexpected error: {err}");
    assert!(err.is_untrusted_request());
}

#[test]
fn garbage_csr_is_malformed() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let garbage = SigningRequest::from_der(vec![0x30, 0x03, 0x02, 0x01, 0x00]);

    let err = sign_csr(&ca, &garbage).expect_err("garbage must be rejected");
    assert!(matches!(err, X509Error::MalformedRequest(_)), "unexpected error: {err}");
    assert!(!err.is_untrusted_request());
}

#[test]
fn certificate_pem_round_trips() {
    let ca = generate_ca("Leaf test CA", &subject()).expect("CA generation");
    let reparsed = casa_x509::Certificate::from_pem(ca.certificate().pem()).expect("PEM parse");
    assert_eq!(reparsed.der(), ca.certificate().der());

    let err = casa_x509::Certificate::from_pem("not a certificate")
        .expect_err("junk must not parse");
    assert!(matches!(err, X509Error::Parse(_)), "unexpected error: {err}");
}

//! Configuration file driving signing defaults and the verification policy.

mod common;

use std::fs;
use std::sync::Arc;

use common::Pki;
use nuget_package_signing::{
    read_signature, sign_package_data, verify_signature, ConfigError, ConfigManager,
    HashAlgorithm, SignatureConfiguration, SignatureType, VerificationCode,
};

#[test]
fn configured_roots_and_defaults_sign_and_verify() {
    let pki = Pki::new();
    let dir = tempfile::tempdir().unwrap();
    let root_pem = dir.path().join("roots.pem");
    fs::write(&root_pem, pki.root.certificate.to_pem().unwrap()).unwrap();

    let manager = ConfigManager::with_path(dir.path().join("config.toml"));
    let mut config = SignatureConfiguration::default();
    config.signing.hash_algorithm = "SHA384".into();
    config.signing.signature_type = "repository".into();
    config.verification.trusted_root_pem_files = vec![root_pem];
    config.verification.allowed_signature_types = vec!["repository".into()];
    manager.save(&config).unwrap();

    let loaded = manager.load().unwrap();
    assert_eq!(loaded, config);

    let options = loaded
        .signing_options(pki.signer.certificate.clone(), pki.signer.key.clone())
        .unwrap()
        .with_chain(vec![pki.root.certificate.clone()]);
    assert_eq!(options.hash_algorithm, HashAlgorithm::Sha384);
    assert!(options.timestamp_url.is_none());

    let hash = HashAlgorithm::Sha384.digest(b"content");
    let signature = read_signature(&sign_package_data(&hash, &options).unwrap()).unwrap();
    assert_eq!(signature.signature_type(), SignatureType::Repository);

    let trust_store = Arc::new(loaded.build_trust_store().unwrap());
    assert_eq!(trust_store.len(), 1);
    let verification = loaded.to_verification_options(trust_store).unwrap();
    let result = verify_signature(&signature, &verification);
    assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
}

#[test]
fn policy_from_file_rejects_author_signatures() {
    let pki = Pki::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[verification]
allow_untrusted_root = true
allowed_signature_types = ["repository"]
"#,
    )
    .unwrap();

    let config = ConfigManager::with_path(&path).load().unwrap();
    assert_eq!(config.signing.hash_algorithm, "sha256");

    let options = config
        .signing_options(pki.signer.certificate.clone(), pki.signer.key.clone())
        .unwrap()
        .with_chain(vec![pki.root.certificate.clone()]);
    let hash = HashAlgorithm::Sha256.digest(b"content");
    let signature = read_signature(&sign_package_data(&hash, &options).unwrap()).unwrap();

    let trust_store = Arc::new(config.build_trust_store().unwrap());
    let result = verify_signature(
        &signature,
        &config.to_verification_options(trust_store).unwrap(),
    );
    assert!(result.has_error(VerificationCode::SignatureTypeNotAllowed));
    assert!(result.has_warning(VerificationCode::UntrustedRoot));
}

#[test]
fn unreadable_trusted_root_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("not-a-cert.pem");
    fs::write(&bogus, "just text").unwrap();

    let mut config = SignatureConfiguration::default();
    config.verification.trusted_root_pem_files = vec![bogus.clone()];
    match config.build_trust_store() {
        Err(ConfigError::TrustedRoot { path, .. }) => {
            assert_eq!(path, bogus.display().to_string());
        }
        other => panic!("expected a trusted root error, got {other:?}"),
    }
}

#[test]
fn sha1_in_policy_is_refused() {
    let mut config = SignatureConfiguration::default();
    config.verification.allowed_hash_algorithms = vec!["sha1".into()];
    assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
}

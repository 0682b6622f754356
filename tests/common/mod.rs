//! Shared fixtures for the integration suites: throwaway RSA certificates, an
//! in-process timestamp authority and package archives built with `zip`.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509NameBuilder, X509};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use nuget_package_signing::adapters::TimestampTransport;
use nuget_package_signing::domain::asn1::writer;
use nuget_package_signing::domain::constants::{
    OID_CONTENT_TYPE, OID_MESSAGE_DIGEST, OID_SIGNED_DATA, OID_SIGNING_CERTIFICATE_V2,
    OID_TST_INFO,
};
use nuget_package_signing::domain::pkcs7::{
    AlgorithmIdentifier, Attribute, AttributeSet, ContentInfo, EncapsulatedContentInfo,
    MessageImprint, PkiStatusInfo, SignedData, SignerInfo, TimeStampReq, TimeStampResp, TstInfo,
};
use nuget_package_signing::services::signature_builder::signer_identifier;
use nuget_package_signing::services::signed_attributes_builder::signing_certificate_v2;
use nuget_package_signing::{HashAlgorithm, TimestampError, TimestampUrl};

/// A certificate with its private key.
pub struct Identity {
    pub certificate: X509,
    pub key: PKey<Private>,
}

pub fn rsa_key(bits: u32) -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(bits).unwrap()).unwrap()
}

/// What kind of certificate [`issue`] produces.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Ca,
    CodeSigning,
    CodeSigningWithoutSki,
    TimeStamping,
}

pub struct Validity {
    pub not_before: SystemTime,
    pub not_after: SystemTime,
}

impl Validity {
    pub fn current() -> Self {
        let now = SystemTime::now();
        Self {
            not_before: now - Duration::from_secs(86_400),
            not_after: now + Duration::from_secs(365 * 86_400),
        }
    }

    pub fn expired() -> Self {
        let now = SystemTime::now();
        Self {
            not_before: now - Duration::from_secs(30 * 86_400),
            not_after: now - Duration::from_secs(86_400),
        }
    }
}

fn asn1_time(time: SystemTime) -> Asn1Time {
    let seconds = time.duration_since(UNIX_EPOCH).unwrap().as_secs();
    Asn1Time::from_unix(seconds as _).unwrap()
}

static SERIAL: AtomicUsize = AtomicUsize::new(1000);

/// Issue a certificate for `key`, self-signed when `issuer` is `None`.
pub fn issue(
    common_name: &str,
    key: &PKey<Private>,
    issuer: Option<&Identity>,
    profile: Profile,
    validity: &Validity,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    name.append_entry_by_text("O", "Package Signing Tests").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = SERIAL.fetch_add(1, Ordering::Relaxed) as u32;
    let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => builder
            .set_issuer_name(issuer.certificate.subject_name())
            .unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&asn1_time(validity.not_before)).unwrap();
    builder.set_not_after(&asn1_time(validity.not_after)).unwrap();

    match profile {
        Profile::Ca => {
            builder
                .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
                .unwrap();
            builder
                .append_extension(
                    KeyUsage::new()
                        .critical()
                        .key_cert_sign()
                        .crl_sign()
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
        Profile::CodeSigning | Profile::CodeSigningWithoutSki => {
            builder
                .append_extension(
                    KeyUsage::new()
                        .critical()
                        .digital_signature()
                        .build()
                        .unwrap(),
                )
                .unwrap();
            builder
                .append_extension(ExtendedKeyUsage::new().code_signing().build().unwrap())
                .unwrap();
        }
        Profile::TimeStamping => {
            builder
                .append_extension(
                    KeyUsage::new()
                        .critical()
                        .digital_signature()
                        .build()
                        .unwrap(),
                )
                .unwrap();
            builder
                .append_extension(
                    ExtendedKeyUsage::new()
                        .critical()
                        .time_stamping()
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
    }
    if profile != Profile::CodeSigningWithoutSki {
        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))
            .unwrap();
        builder.append_extension(ski).unwrap();
    }

    let signing_key = issuer.map_or(key, |issuer| &issuer.key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// A root, a code-signing leaf under it and a timestamping leaf under it.
pub struct Pki {
    pub root: Identity,
    pub signer: Identity,
    pub tsa: Identity,
}

impl Pki {
    pub fn new() -> Self {
        Self::with_signer_profile(Profile::CodeSigning, &Validity::current())
    }

    pub fn with_signer_profile(profile: Profile, validity: &Validity) -> Self {
        let root_key = rsa_key(2048);
        let root = Identity {
            certificate: issue("Test Root CA", &root_key, None, Profile::Ca, &Validity::current()),
            key: root_key,
        };
        let signer_key = rsa_key(2048);
        let signer = Identity {
            certificate: issue("Test Package Author", &signer_key, Some(&root), profile, validity),
            key: signer_key,
        };
        let tsa_key = rsa_key(2048);
        let tsa = Identity {
            certificate: issue(
                "Test Timestamp Authority",
                &tsa_key,
                Some(&root),
                Profile::TimeStamping,
                &Validity::current(),
            ),
            key: tsa_key,
        };
        Self { root, signer, tsa }
    }
}

/// How the in-process authority answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TsaBehavior {
    Grant,
    GrantWithMods,
    WrongNonce,
    /// Echo the nonce without its leading sign byte.
    UnpaddedNonce,
    WrongImprint,
    Reject,
    OmitToken,
}

/// A timestamp authority that signs tokens in memory.
pub struct FakeTsa {
    certificate: X509,
    key: PKey<Private>,
    chain: Vec<X509>,
    behavior: TsaBehavior,
    requests: AtomicUsize,
}

impl FakeTsa {
    pub fn new(tsa: &Identity, root: &Identity, behavior: TsaBehavior) -> Self {
        Self {
            certificate: tsa.certificate.clone(),
            key: tsa.key.clone(),
            chain: vec![root.certificate.clone()],
            behavior,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Build a granted token over `imprint`, echoing `nonce`.
    pub fn token(&self, imprint: MessageImprint, nonce: Option<Vec<u8>>) -> Vec<u8> {
        let tst_info = TstInfo {
            version: 1,
            policy: vec![0x2a, 0x03, 0x04, 0x05],
            message_imprint: imprint,
            serial_number: vec![0x01, 0x23],
            gen_time: UNIX_EPOCH
                + Duration::from_secs(
                    SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap()
                        .as_secs(),
                ),
            accuracy: None,
            ordering: false,
            nonce,
            tsa: None,
        }
        .to_der();

        let algorithm = HashAlgorithm::Sha256;
        let signed_attributes = AttributeSet::from_attributes(vec![
            Attribute::single(OID_CONTENT_TYPE, writer::oid(OID_TST_INFO)),
            Attribute::single(
                OID_MESSAGE_DIGEST,
                writer::octet_string(&algorithm.digest(&tst_info)),
            ),
            Attribute::single(
                OID_SIGNING_CERTIFICATE_V2,
                signing_certificate_v2(&self.certificate, algorithm).unwrap(),
            ),
        ]);
        let mut signer = Signer::new(algorithm.message_digest(), &self.key).unwrap();
        signer.update(&signed_attributes.set_der()).unwrap();
        let signature = signer.sign_to_vec().unwrap();

        let sid = signer_identifier(&self.certificate).unwrap();
        let version = sid.version() as i64;
        let mut certificates = vec![self.certificate.to_der().unwrap()];
        certificates.extend(self.chain.iter().map(|c| c.to_der().unwrap()));
        let signed_data = SignedData {
            version,
            digest_algorithms: vec![AlgorithmIdentifier::with_null(algorithm.oid())],
            encap_content_info: EncapsulatedContentInfo {
                content_type: OID_TST_INFO.to_vec(),
                content: Some(tst_info),
            },
            certificates,
            signer_infos: vec![SignerInfo {
                version,
                sid,
                digest_algorithm: AlgorithmIdentifier::with_null(algorithm.oid()),
                signed_attributes: Some(signed_attributes),
                signature_algorithm: AlgorithmIdentifier::with_null(
                    algorithm.rsa_signature_oid(),
                ),
                signature,
                unsigned_attributes: None,
            }],
        };
        ContentInfo::new(OID_SIGNED_DATA, signed_data.to_der()).to_der()
    }

    fn respond(&self, request: &TimeStampReq) -> Vec<u8> {
        let granted = |status| PkiStatusInfo {
            status,
            status_text: Vec::new(),
            fail_info: None,
        };
        let (status, token) = match self.behavior {
            TsaBehavior::Grant => (
                granted(0),
                Some(self.token(request.message_imprint.clone(), request.nonce.clone())),
            ),
            TsaBehavior::GrantWithMods => (
                granted(1),
                Some(self.token(request.message_imprint.clone(), request.nonce.clone())),
            ),
            TsaBehavior::WrongNonce => (
                granted(0),
                Some(self.token(request.message_imprint.clone(), Some(vec![0x01, 0x02, 0x03]))),
            ),
            TsaBehavior::UnpaddedNonce => {
                let nonce = request.nonce.as_ref().map(|nonce| {
                    let leading = nonce.iter().take_while(|&&b| b == 0).count();
                    nonce[leading..].to_vec()
                });
                (
                    granted(0),
                    Some(self.token(request.message_imprint.clone(), nonce)),
                )
            }
            TsaBehavior::WrongImprint => {
                let mut imprint = request.message_imprint.clone();
                imprint.hashed_message[0] ^= 0xff;
                (granted(0), Some(self.token(imprint, request.nonce.clone())))
            }
            TsaBehavior::Reject => (
                PkiStatusInfo {
                    status: 2,
                    status_text: vec!["policy not supported".into()],
                    fail_info: Some(1 << 15),
                },
                None,
            ),
            TsaBehavior::OmitToken => (granted(0), None),
        };
        TimeStampResp {
            status,
            time_stamp_token: token,
        }
        .to_der()
    }
}

impl TimestampTransport for FakeTsa {
    fn post_timestamp_query(
        &self,
        _url: &TimestampUrl,
        request_der: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, TimestampError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let request = TimeStampReq::decode(request_der)?;
        Ok(self.respond(&request))
    }
}

pub fn tsa_url() -> TimestampUrl {
    TimestampUrl::new("http://timestamp.test.invalid/rfc3161").unwrap()
}

/// A stored-entry archive, written in the given order.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_archive_with(entries, CompressionMethod::Stored)
}

pub fn zip_archive_with(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, data) in entries {
        // the signature entry is always stored
        let options = if name.eq_ignore_ascii_case(".signature.p7s") {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            options
        };
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A small package body: nuspec plus one library.
pub fn package_entries() -> Vec<(&'static str, &'static [u8])> {
    vec![
        (
            "Example.Package.nuspec",
            &b"<?xml version=\"1.0\"?><package><metadata><id>Example.Package</id></metadata></package>"[..],
        ),
        ("lib/net8.0/Example.dll", &b"MZ\x90\x00not really a PE image"[..]),
        ("[Content_Types].xml", &b"<Types/>"[..]),
    ]
}

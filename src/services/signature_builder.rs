//! PKCS#7 signature builder service.
//!
//! Assembles the CMS `SignedData` for a package: detached `id-data` content,
//! one RSA `SignerInfo` over the signed attributes, the signer certificate
//! plus chain, and an optional RFC 3161 token as an unsigned attribute.

use std::time::SystemTime;

use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;
use openssl::x509::X509;

use crate::domain::asn1::writer::integer_content_unsigned;
use crate::domain::constants::{OID_DATA, OID_SIGNED_DATA, OID_TIMESTAMP_TOKEN};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::pkcs7::{
    AlgorithmIdentifier, Attribute, AttributeSet, ContentInfo, EncapsulatedContentInfo,
    SignedData, SignerIdentifier, SignerInfo,
};
use crate::infra::error::SignResult;
use crate::services::signed_attributes_builder::{content_digest, SignedAttributesBuilder};
use crate::services::signing::SigningOptions;
use crate::services::timestamp::TimestampClient;

/// Builds primary package signatures from validated [`SigningOptions`].
pub struct PackageSignatureBuilder {
    options: SigningOptions,
    timestamp_client: Option<TimestampClient>,
}

impl PackageSignatureBuilder {
    /// Validate `options` up front; nothing is signed if they are unusable.
    pub fn new(options: SigningOptions) -> SignResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            timestamp_client: None,
        })
    }

    /// Use `client` for timestamping instead of one built from the options' URL.
    #[must_use]
    pub fn with_timestamp_client(mut self, client: TimestampClient) -> Self {
        self.timestamp_client = Some(client);
        self
    }

    #[must_use]
    pub fn options(&self) -> &SigningOptions {
        &self.options
    }

    /// Sign a content hash computed by the caller and return `ContentInfo` DER.
    pub fn sign(&self, content_hash: &[u8]) -> SignResult<Vec<u8>> {
        let (certificate, private_key) = self.options.validate()?;
        let algorithm = self.options.hash_algorithm;
        let digest = content_digest(content_hash, algorithm)?;

        let signed_attributes = SignedAttributesBuilder::new().build(
            &digest,
            self.options.signature_type,
            certificate,
            SystemTime::now(),
        )?;
        let signature = rsa_sign(private_key, algorithm, &signed_attributes.set_der())?;
        log::debug!("RSA signature: {} bytes", signature.len());

        let unsigned_attributes = match self.timestamp_client()? {
            Some(client) => {
                let token = client.request_timestamp(&algorithm.digest(&signature), algorithm)?;
                Some(AttributeSet::from_attributes(vec![Attribute::single(
                    OID_TIMESTAMP_TOKEN,
                    token,
                )]))
            }
            None => None,
        };

        let sid = signer_identifier(certificate)?;
        let version = sid.version() as i64;
        let signer_info = SignerInfo {
            version,
            sid,
            digest_algorithm: AlgorithmIdentifier::with_null(algorithm.oid()),
            signed_attributes: Some(signed_attributes),
            signature_algorithm: AlgorithmIdentifier::with_null(algorithm.rsa_signature_oid()),
            signature,
            unsigned_attributes,
        };

        let mut certificates = vec![certificate.to_der()?];
        for extra in &self.options.chain {
            certificates.push(extra.to_der()?);
        }

        let signed_data = SignedData {
            version,
            digest_algorithms: vec![AlgorithmIdentifier::with_null(algorithm.oid())],
            encap_content_info: EncapsulatedContentInfo {
                content_type: OID_DATA.to_vec(),
                content: None,
            },
            certificates,
            signer_infos: vec![signer_info],
        };
        let der = ContentInfo::new(OID_SIGNED_DATA, signed_data.to_der()).to_der();
        log::info!(
            "built {} package signature ({} bytes, {})",
            self.options.signature_type,
            der.len(),
            algorithm
        );
        Ok(der)
    }

    fn timestamp_client(&self) -> SignResult<Option<TimestampClient>> {
        if let Some(client) = &self.timestamp_client {
            return Ok(Some(client.clone()));
        }
        match &self.options.timestamp_url {
            Some(url) => Ok(Some(TimestampClient::new(
                url.clone(),
                self.options.timestamp_timeout,
            )?)),
            None => Ok(None),
        }
    }
}

/// Sign `content_hash` with `options`. See [`PackageSignatureBuilder::sign`].
pub fn sign_package_data(content_hash: &[u8], options: &SigningOptions) -> SignResult<Vec<u8>> {
    PackageSignatureBuilder::new(options.clone())?.sign(content_hash)
}

/// Subject key identifier when the certificate has one, otherwise issuer and serial.
pub fn signer_identifier(certificate: &X509) -> SignResult<SignerIdentifier> {
    if let Some(ski) = certificate.subject_key_id() {
        return Ok(SignerIdentifier::SubjectKeyIdentifier(ski.as_slice().to_vec()));
    }
    let serial = certificate.serial_number().to_bn()?.to_vec();
    Ok(SignerIdentifier::IssuerAndSerialNumber {
        issuer: certificate.issuer_name().to_der()?,
        serial_number: integer_content_unsigned(&serial),
    })
}

fn rsa_sign(key: &PKey<Private>, algorithm: HashAlgorithm, data: &[u8]) -> SignResult<Vec<u8>> {
    let mut signer = Signer::new(algorithm.message_digest(), key)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

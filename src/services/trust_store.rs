//! Trusted root certificates for chain validation.
//!
//! A `TrustStore` is an explicit value owned by the caller. Build it once,
//! then share it read-only (for example behind an `Arc`) across verifications.
//! Adding certificates while a verification is running is the caller's
//! responsibility to serialize.

use openssl::error::ErrorStack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::verify::X509VerifyFlags;
use openssl::x509::X509;

#[derive(Clone, Default)]
pub struct TrustStore {
    certificates: Vec<X509>,
    fingerprints: Vec<Vec<u8>>,
    use_system_roots: bool,
}

impl TrustStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also trust the platform's default certificate locations.
    #[must_use]
    pub fn with_system_roots(mut self) -> Self {
        self.use_system_roots = true;
        self
    }

    #[must_use]
    pub fn uses_system_roots(&self) -> bool {
        self.use_system_roots
    }

    /// Trust `certificate`. Returns `false` if it was already present.
    pub fn add_certificate(&mut self, certificate: X509) -> Result<bool, ErrorStack> {
        let fingerprint = fingerprint(&certificate)?;
        if self.fingerprints.contains(&fingerprint) {
            return Ok(false);
        }
        log::debug!("trusting {}", subject_line(&certificate));
        self.fingerprints.push(fingerprint);
        self.certificates.push(certificate);
        Ok(true)
    }

    /// Trust every certificate in a PEM bundle; returns how many were new.
    pub fn add_pem(&mut self, pem: &[u8]) -> Result<usize, ErrorStack> {
        let mut added = 0;
        for certificate in X509::stack_from_pem(pem)? {
            if self.add_certificate(certificate)? {
                added += 1;
            }
        }
        Ok(added)
    }

    #[must_use]
    pub fn contains(&self, certificate: &X509) -> bool {
        fingerprint(certificate).is_ok_and(|fp| self.fingerprints.contains(&fp))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty() && !self.use_system_roots
    }

    #[must_use]
    pub fn certificates(&self) -> &[X509] {
        &self.certificates
    }

    /// OpenSSL store over these roots plus `extra_roots`, with time checks off:
    /// validity periods are judged separately.
    pub(crate) fn build_store(&self, extra_roots: &[X509]) -> Result<X509Store, ErrorStack> {
        let mut builder = X509StoreBuilder::new()?;
        builder.set_flags(X509VerifyFlags::NO_CHECK_TIME)?;
        if self.use_system_roots {
            builder.set_default_paths()?;
        }
        for certificate in &self.certificates {
            builder.add_cert(certificate.clone())?;
        }
        for certificate in extra_roots {
            if !self.contains(certificate) {
                builder.add_cert(certificate.clone())?;
            }
        }
        Ok(builder.build())
    }
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("certificates", &self.certificates.len())
            .field("use_system_roots", &self.use_system_roots)
            .finish()
    }
}

fn fingerprint(certificate: &X509) -> Result<Vec<u8>, ErrorStack> {
    Ok(certificate
        .digest(openssl::hash::MessageDigest::sha256())?
        .to_vec())
}

pub(crate) fn subject_line(certificate: &X509) -> String {
    certificate
        .subject_name()
        .entries()
        .filter_map(|entry| {
            let key = entry.object().nid().short_name().ok()?;
            let value = String::from_utf8_lossy(entry.data().as_slice());
            Some(format!("{key}={value}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

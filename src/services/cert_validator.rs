//! Certificate validation service.
//!
//! Key strength, validity period and chain building for signer and TSA
//! certificates. Each check reports its own outcome; combining them into a
//! verdict is left to the verification engine.

use std::cmp::Ordering;
use std::time::SystemTime;

use openssl::asn1::Asn1Time;
use openssl::error::ErrorStack;
use openssl::pkey::Id;
use openssl::stack::Stack;
use openssl::x509::{X509Ref, X509StoreContext, X509VerifyResult, X509};

use crate::domain::asn1::time::to_unix_seconds;
use crate::domain::constants::{
    MIN_RSA_KEY_BITS, X509_V_ERR_DEPTH_ZERO_SELF_SIGNED_CERT, X509_V_ERR_SELF_SIGNED_CERT_IN_CHAIN,
    X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT, X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT_LOCALLY,
    X509_V_ERR_UNABLE_TO_VERIFY_LEAF_SIGNATURE,
};
use crate::services::signing::key_type_name;
use crate::services::trust_store::{subject_line, TrustStore};

/// Longest issuer walk attempted when looking for an untrusted root.
const MAX_CHAIN_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrength {
    Acceptable { bits: u32 },
    Weak { bits: u32 },
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityStatus {
    Valid,
    NotYetValid,
    Expired,
}

#[derive(Debug, Clone)]
pub enum ChainStatus {
    /// The chain ends at a certificate in the trust store.
    Trusted { root: X509 },
    /// The chain is sound but ends at a self-signed root the store does not hold.
    UntrustedRoot { root: X509 },
    Invalid { reason: String },
}

pub struct CertificateValidator;

impl CertificateValidator {
    /// RSA only, at least 2048 bits.
    pub fn check_key_strength(certificate: &X509Ref) -> KeyStrength {
        let key = match certificate.public_key() {
            Ok(key) => key,
            Err(e) => return KeyStrength::Unsupported(format!("unreadable public key: {e}")),
        };
        if key.id() != Id::RSA {
            return KeyStrength::Unsupported(key_type_name(key.id()));
        }
        let bits = key.bits();
        if bits < MIN_RSA_KEY_BITS {
            KeyStrength::Weak { bits }
        } else {
            KeyStrength::Acceptable { bits }
        }
    }

    /// Compare `at` against `notBefore`/`notAfter`.
    pub fn check_validity(certificate: &X509Ref, at: SystemTime) -> Result<ValidityStatus, ErrorStack> {
        let now = Asn1Time::from_unix(to_unix_seconds(at) as _)?;
        if now.compare(certificate.not_before())? == Ordering::Less {
            return Ok(ValidityStatus::NotYetValid);
        }
        if now.compare(certificate.not_after())? == Ordering::Greater {
            return Ok(ValidityStatus::Expired);
        }
        Ok(ValidityStatus::Valid)
    }

    /// Build a chain from `leaf` through `intermediates` to a root.
    ///
    /// Validity periods are ignored here. When no trusted root is reachable but
    /// the supplied certificates end in a self-signed root that correctly signs
    /// the chain, the result is [`ChainStatus::UntrustedRoot`].
    pub fn validate_chain(
        leaf: &X509,
        intermediates: &[X509],
        trust_store: &TrustStore,
    ) -> Result<ChainStatus, ErrorStack> {
        let (verified, error, root) = verify_with(leaf, intermediates, trust_store, &[])?;
        if verified {
            return Ok(match root {
                Some(root) => ChainStatus::Trusted { root },
                None => ChainStatus::Invalid {
                    reason: "verified chain has no root".into(),
                },
            });
        }

        log::debug!(
            "chain for {} did not verify: {} ({})",
            subject_line(leaf),
            error.error_string(),
            error.as_raw()
        );
        if !is_missing_trust_anchor(error.as_raw()) {
            return Ok(ChainStatus::Invalid {
                reason: error.error_string().to_string(),
            });
        }

        let Some(candidate) = find_self_signed_root(leaf, intermediates)? else {
            return Ok(ChainStatus::Invalid {
                reason: error.error_string().to_string(),
            });
        };
        let (verified, retry_error, _) =
            verify_with(leaf, intermediates, trust_store, std::slice::from_ref(&candidate))?;
        if verified {
            log::debug!("chain ends at untrusted root {}", subject_line(&candidate));
            Ok(ChainStatus::UntrustedRoot { root: candidate })
        } else {
            Ok(ChainStatus::Invalid {
                reason: retry_error.error_string().to_string(),
            })
        }
    }
}

fn verify_with(
    leaf: &X509,
    intermediates: &[X509],
    trust_store: &TrustStore,
    extra_roots: &[X509],
) -> Result<(bool, X509VerifyResult, Option<X509>), ErrorStack> {
    let store = trust_store.build_store(extra_roots)?;
    let mut chain = Stack::new()?;
    for certificate in intermediates {
        chain.push(certificate.clone())?;
    }
    let mut context = X509StoreContext::new()?;
    context.init(&store, leaf, &chain, |ctx| {
        let verified = ctx.verify_cert()?;
        let root = ctx
            .chain()
            .and_then(|chain| chain.iter().last())
            .map(X509Ref::to_owned);
        Ok((verified, ctx.error(), root))
    })
}

fn is_missing_trust_anchor(code: i32) -> bool {
    matches!(
        code,
        X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT
            | X509_V_ERR_DEPTH_ZERO_SELF_SIGNED_CERT
            | X509_V_ERR_SELF_SIGNED_CERT_IN_CHAIN
            | X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT_LOCALLY
            | X509_V_ERR_UNABLE_TO_VERIFY_LEAF_SIGNATURE
    )
}

/// Follow issuer links through `pool` until a self-signed certificate is reached.
fn find_self_signed_root(leaf: &X509, pool: &[X509]) -> Result<Option<X509>, ErrorStack> {
    let mut current = leaf.clone();
    for _ in 0..MAX_CHAIN_DEPTH {
        if is_self_signed(&current)? {
            return Ok(Some(current));
        }
        let mut issuer = None;
        for candidate in pool {
            if candidate.issued(&current) != X509VerifyResult::OK {
                continue;
            }
            let key = candidate.public_key()?;
            if current.verify(&key)? {
                issuer = Some(candidate.clone());
                break;
            }
        }
        match issuer {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(None)
}

fn is_self_signed(certificate: &X509) -> Result<bool, ErrorStack> {
    if certificate.issued(certificate) != X509VerifyResult::OK {
        return Ok(false);
    }
    let key = certificate.public_key()?;
    certificate.verify(&key)
}

//! `AlgorithmIdentifier` (RFC 5280 4.1.1.2).

use std::fmt;

use crate::domain::asn1::{oid_to_string, writer, DerReader};
use crate::domain::crypto::HashAlgorithm;
use crate::infra::error::Asn1Result;

#[derive(Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    /// OID content octets.
    pub oid: Vec<u8>,
    /// Complete DER of the parameters, if any (usually NULL).
    pub parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    /// Identifier with an explicit NULL parameter, as written for digest and RSA algorithms.
    #[must_use]
    pub fn with_null(oid: &[u8]) -> Self {
        Self {
            oid: oid.to_vec(),
            parameters: Some(writer::null()),
        }
    }

    /// Identifier with absent parameters.
    #[must_use]
    pub fn without_parameters(oid: &[u8]) -> Self {
        Self {
            oid: oid.to_vec(),
            parameters: None,
        }
    }

    pub fn decode(reader: &mut DerReader<'_>, what: &'static str) -> Asn1Result<Self> {
        let mut seq = reader.read_sequence(what)?;
        let oid = seq.read_oid(what)?.to_vec();
        let parameters = if seq.is_empty() {
            None
        } else {
            Some(seq.read_tlv(what)?.raw.to_vec())
        };
        seq.finish(what)?;
        Ok(Self { oid, parameters })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let oid = writer::oid(&self.oid);
        match &self.parameters {
            Some(params) => writer::sequence(&[&oid, params]),
            None => writer::sequence(&[&oid]),
        }
    }

    /// Digest algorithm named by this identifier, if it is SHA-256/384/512.
    #[must_use]
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        HashAlgorithm::from_oid(&self.oid)
    }

    #[must_use]
    pub fn dotted(&self) -> String {
        oid_to_string(&self.oid)
    }
}

impl fmt::Debug for AlgorithmIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AlgorithmIdentifier({})", self.dotted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::OID_SHA256;
    use hex_literal::hex;

    #[test]
    fn encodes_sha256_with_null() {
        let der = AlgorithmIdentifier::with_null(OID_SHA256).to_der();
        assert_eq!(der, hex!("300d06096086480165030402010500"));
    }

    #[test]
    fn decodes_absent_parameters() {
        let der = hex!("300b0609608648016503040203");
        let mut reader = DerReader::new(&der);
        let alg = AlgorithmIdentifier::decode(&mut reader, "alg").unwrap();
        assert!(alg.parameters.is_none());
        assert_eq!(alg.hash_algorithm(), Some(HashAlgorithm::Sha512));
        assert_eq!(alg.to_der(), der);
    }
}

//! Centralized constants for DER tags, object identifiers and archive records.
//!
//! OIDs are stored as DER content octets (without tag and length) so they can be
//! compared directly against decoded `OBJECT IDENTIFIER` contents.

// === ASN.1 DER tags ===

pub const ASN1_BOOLEAN_TAG: u8 = 0x01;
pub const ASN1_INTEGER_TAG: u8 = 0x02;
pub const ASN1_BIT_STRING_TAG: u8 = 0x03;
pub const ASN1_OCTET_STRING_TAG: u8 = 0x04;
pub const ASN1_NULL_TAG: u8 = 0x05;
pub const ASN1_OID_TAG: u8 = 0x06;
pub const ASN1_UTF8_STRING_TAG: u8 = 0x0c;
pub const ASN1_UTC_TIME_TAG: u8 = 0x17;
pub const ASN1_GENERALIZED_TIME_TAG: u8 = 0x18;
pub const ASN1_SEQUENCE_TAG: u8 = 0x30;
pub const ASN1_SET_TAG: u8 = 0x31;

/// ASN.1 NULL value (tag + length)
pub const ASN1_NULL: &[u8] = &[0x05, 0x00];

/// `[0]` constructed: ContentInfo content, SignedData certificates, SignerInfo signedAttrs.
pub const CONTEXT_0_CONSTRUCTED_TAG: u8 = 0xa0;
/// `[1]` constructed: SignerInfo unsignedAttrs, TSTInfo extensions.
pub const CONTEXT_1_CONSTRUCTED_TAG: u8 = 0xa1;
/// `[1]` constructed in SignedData: crls (skipped on read).
pub const SIGNED_DATA_CRLS_TAG: u8 = 0xa1;
/// `[4]` constructed: GeneralName directoryName.
pub const GENERAL_NAME_DIRECTORY_TAG: u8 = 0xa4;
/// `[0]` primitive: SignerIdentifier subjectKeyIdentifier, Accuracy millis.
pub const CONTEXT_0_PRIMITIVE_TAG: u8 = 0x80;
/// `[1]` primitive: Accuracy micros.
pub const CONTEXT_1_PRIMITIVE_TAG: u8 = 0x81;

// === CMS content types (RFC 5652, RFC 3161) ===

/// id-data 1.2.840.113549.1.7.1
pub const OID_DATA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01];

/// id-signedData 1.2.840.113549.1.7.2
pub const OID_SIGNED_DATA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

/// id-ct-TSTInfo 1.2.840.113549.1.9.16.1.4
pub const OID_TST_INFO: &[u8] = &[
    0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x01, 0x04,
];

// === Attributes (PKCS#9, ESS, CAdES) ===

/// contentType 1.2.840.113549.1.9.3
pub const OID_CONTENT_TYPE: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x03];

/// messageDigest 1.2.840.113549.1.9.4
pub const OID_MESSAGE_DIGEST: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x04];

/// signingTime 1.2.840.113549.1.9.5
pub const OID_SIGNING_TIME: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x05];

/// id-aa-signingCertificateV2 1.2.840.113549.1.9.16.2.47
pub const OID_SIGNING_CERTIFICATE_V2: &[u8] = &[
    0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x02, 0x2f,
];

/// id-aa-ets-commitmentType 1.2.840.113549.1.9.16.2.16
pub const OID_COMMITMENT_TYPE_INDICATION: &[u8] = &[
    0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x02, 0x10,
];

/// id-cti-ets-proofOfOrigin 1.2.840.113549.1.9.16.6.1 (author)
pub const OID_COMMITMENT_AUTHOR: &[u8] = &[
    0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x06, 0x01,
];

/// id-cti-ets-proofOfReceipt 1.2.840.113549.1.9.16.6.2 (repository)
pub const OID_COMMITMENT_REPOSITORY: &[u8] = &[
    0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x06, 0x02,
];

/// id-aa-timeStampToken 1.2.840.113549.1.9.16.2.14
pub const OID_TIMESTAMP_TOKEN: &[u8] = &[
    0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x02, 0x0e,
];

// === Hash algorithms ===

/// SHA-256 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

/// SHA-384 2.16.840.1.101.3.4.2.2
pub const OID_SHA384: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02];

/// SHA-512 2.16.840.1.101.3.4.2.3
pub const OID_SHA512: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03];

// === Signature algorithms ===

/// rsaEncryption 1.2.840.113549.1.1.1 (accepted on read as a signature algorithm)
pub const OID_RSA_ENCRYPTION: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];

/// sha256WithRSAEncryption 1.2.840.113549.1.1.11
pub const OID_SHA256_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];

/// sha384WithRSAEncryption 1.2.840.113549.1.1.12
pub const OID_SHA384_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0c];

/// sha512WithRSAEncryption 1.2.840.113549.1.1.13
pub const OID_SHA512_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0d];

// === RFC 3161 ===

/// Nonce length in bytes; the top bit of the first byte is always cleared.
pub const TS_REQ_NONCE_LENGTH: usize = 32;

/// HTTP content type of a DER `TimeStampReq`.
pub const TIMESTAMP_QUERY_CONTENT_TYPE: &str = "application/timestamp-query";

/// HTTP content type of a DER `TimeStampResp`.
pub const TIMESTAMP_REPLY_CONTENT_TYPE: &str = "application/timestamp-reply";

/// PKIStatus granted
pub const PKI_STATUS_GRANTED: i64 = 0;

/// PKIStatus grantedWithMods
pub const PKI_STATUS_GRANTED_WITH_MODS: i64 = 1;

// === Key policy ===

/// Minimum accepted RSA modulus length.
pub const MIN_RSA_KEY_BITS: u32 = 2048;

// === OpenSSL verify codes that mean "chain does not end in a trusted root" ===

pub const X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT: i32 = 2;
pub const X509_V_ERR_DEPTH_ZERO_SELF_SIGNED_CERT: i32 = 18;
pub const X509_V_ERR_SELF_SIGNED_CERT_IN_CHAIN: i32 = 19;
pub const X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT_LOCALLY: i32 = 20;
pub const X509_V_ERR_UNABLE_TO_VERIFY_LEAF_SIGNATURE: i32 = 21;

// === Package archive ===

/// Name of the signature entry inside a package (matched case-insensitively).
pub const SIGNATURE_FILE_NAME: &str = ".signature.p7s";

pub const ZIP_LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const ZIP_CENTRAL_DIRECTORY_HEADER_SIGNATURE: u32 = 0x0201_4b50;
pub const ZIP_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
pub const ZIP_DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

pub const ZIP_LOCAL_FILE_HEADER_FIXED_SIZE: usize = 30;
pub const ZIP_CENTRAL_DIRECTORY_HEADER_FIXED_SIZE: usize = 46;
pub const ZIP_END_OF_CENTRAL_DIRECTORY_FIXED_SIZE: usize = 22;
pub const ZIP_MAX_COMMENT_LENGTH: usize = u16::MAX as usize;

/// Offset of "relative offset of local header" inside a central directory header.
pub const ZIP_CENTRAL_HEADER_LOCAL_OFFSET_FIELD: usize = 42;

/// Offsets of the fields rewritten in the end-of-central-directory record.
pub const ZIP_EOCDR_ENTRIES_ON_DISK_FIELD: usize = 8;
pub const ZIP_EOCDR_TOTAL_ENTRIES_FIELD: usize = 10;
pub const ZIP_EOCDR_CENTRAL_DIRECTORY_SIZE_FIELD: usize = 12;
pub const ZIP_EOCDR_CENTRAL_DIRECTORY_OFFSET_FIELD: usize = 16;

/// Compression method "stored".
pub const ZIP_COMPRESSION_STORED: u16 = 0;

/// ZIP64 end-of-central-directory locator; its presence means ZIP64.
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIZE: usize = 20;

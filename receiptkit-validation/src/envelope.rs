// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PKCS#7 signed-data envelope parsing and verification.
//!
//! A receipt arrives as a DER ContentInfo wrapping SignedData. This module
//! unwraps that container with the workspace's own DER reader, then verifies
//! the signer's signature against a single caller-supplied trust anchor.
//! The trust model is deliberately single-anchor: receipts are signed
//! directly by one pinned authority, so no certificate chain is built and
//! the certificates embedded in the envelope are ignored.
//!
//! Trust anchor inputs are flexible to support common calling patterns:
//! - DER X.509 certificate (the SubjectPublicKeyInfo is extracted)
//! - DER SubjectPublicKeyInfo (SPKI)

use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::{Digest as _, Sha256};
use signature::Verifier as _;
use thiserror::Error;
use x509_parser::prelude::FromDer as _;

use receiptkit_asn1::{
    decode_element, read_object_identifier, Asn1Class, Asn1Element, Asn1Reader, DecodeError,
    TAG_INTEGER, TAG_OBJECT_IDENTIFIER, TAG_OCTET_STRING, TAG_SEQUENCE, TAG_SET,
};

use crate::status::ValidationStatus;

const OID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
const OID_DATA: &str = "1.2.840.113549.1.7.1";
const OID_MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";

const OID_SHA1: &str = "1.3.14.3.2.26";
const OID_SHA256: &str = "2.16.840.1.101.3.4.2.1";
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
const OID_SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
const OID_ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";

#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The bytes are not a well-formed DER ContentInfo/SignedData.
    #[error("envelope is not well-formed DER: {0}")]
    Malformed(#[from] DecodeError),
    /// The outer content type is not signed-data.
    #[error("outer content type is not signed-data")]
    NotSignedData,
    /// The encapsulated content type is not plain data.
    #[error("encapsulated content type is not data")]
    NotDataContent,
    /// The trust anchor is neither a DER certificate nor a DER public key.
    #[error("trust anchor is not a DER certificate or SubjectPublicKeyInfo")]
    UntrustedAnchor,
    /// The signature did not verify against the trust anchor.
    #[error("signature verification failed: {0}")]
    SignatureRejected(String),
}

impl EnvelopeError {
    /// The terminal validation status this failure maps to.
    pub fn status(&self) -> ValidationStatus {
        match self {
            Self::Malformed(_) => ValidationStatus::UnknownReceiptFormat,
            Self::NotSignedData => ValidationStatus::InvalidPkcs7Signature,
            Self::NotDataContent => ValidationStatus::InvalidPkcs7Type,
            Self::UntrustedAnchor => ValidationStatus::InvalidAppleRootCertificate,
            Self::SignatureRejected(_) => ValidationStatus::FailedAppleSignature,
        }
    }
}

/// Signed attributes from the optional `[0] IMPLICIT` SignerInfo block.
///
/// When present, the signature covers the attributes re-tagged as SET OF
/// instead of the content itself, and the messageDigest attribute must
/// match the content digest.
#[derive(Debug, Clone)]
struct SignedAttributes {
    der_set: Vec<u8>,
    message_digest: Vec<u8>,
}

impl SignedAttributes {
    fn from_implicit_set(contents: &[u8]) -> Result<Self, DecodeError> {
        let mut message_digest = None;

        let mut reader = Asn1Reader::new(contents);
        while !reader.is_empty() {
            let attribute = reader.read_universal(TAG_SEQUENCE)?;
            let mut fields = Asn1Reader::new(attribute.value);
            let oid = read_object_identifier(&fields.read_universal(TAG_OBJECT_IDENTIFIER)?)
                .ok_or(DecodeError::UnexpectedTag)?;
            let values = fields.read_universal(TAG_SET)?;
            if oid == OID_MESSAGE_DIGEST {
                let digest = Asn1Reader::new(values.value).read_universal(TAG_OCTET_STRING)?;
                message_digest = Some(digest.value.to_vec());
            }
        }

        let message_digest = message_digest.ok_or(DecodeError::UnexpectedTag)?;
        Ok(Self {
            der_set: encode_set_of(contents),
            message_digest,
        })
    }
}

/// A parsed (but not yet verified) signed-data envelope.
///
/// Borrows the receipt buffer: the content and signature are views, copied
/// only where the signature primitives require owned bytes.
#[derive(Debug)]
pub struct SignedEnvelope<'a> {
    content: &'a [u8],
    digest_algorithm_oid: String,
    signature_algorithm_oid: String,
    signed_attrs: Option<SignedAttributes>,
    signature: &'a [u8],
}

impl<'a> SignedEnvelope<'a> {
    /// Parse a DER ContentInfo wrapping SignedData.
    pub fn parse(input: &'a [u8]) -> Result<Self, EnvelopeError> {
        let outer = decode_element(input, 0, input.len())?;
        if !outer.is_universal(TAG_SEQUENCE) {
            return Err(DecodeError::UnexpectedTag.into());
        }

        // ContentInfo ::= SEQUENCE { contentType OID, [0] EXPLICIT content }
        let mut content_info = Asn1Reader::new(outer.value);
        let content_type =
            read_object_identifier(&content_info.read_universal(TAG_OBJECT_IDENTIFIER)?)
                .ok_or(DecodeError::UnexpectedTag)?;
        if content_type != OID_SIGNED_DATA {
            return Err(EnvelopeError::NotSignedData);
        }
        let wrapper = content_info.read_element()?;
        if !wrapper.is_context_specific(0) {
            return Err(DecodeError::UnexpectedTag.into());
        }

        // SignedData ::= SEQUENCE { version, digestAlgorithms,
        //   encapContentInfo, [0] certificates?, [1] crls?, signerInfos }
        let signed_data = Asn1Reader::new(wrapper.value).read_universal(TAG_SEQUENCE)?;
        let mut sd_fields = Asn1Reader::new(signed_data.value);
        let _version = sd_fields.read_universal(TAG_INTEGER)?;
        let _digest_algorithms = sd_fields.read_universal(TAG_SET)?;

        let encap = sd_fields.read_universal(TAG_SEQUENCE)?;
        let mut encap_fields = Asn1Reader::new(encap.value);
        let encap_type =
            read_object_identifier(&encap_fields.read_universal(TAG_OBJECT_IDENTIFIER)?)
                .ok_or(DecodeError::UnexpectedTag)?;
        if encap_type != OID_DATA {
            return Err(EnvelopeError::NotDataContent);
        }
        let econtent = encap_fields.read_element()?;
        if !econtent.is_context_specific(0) {
            return Err(DecodeError::UnexpectedTag.into());
        }
        let content = Asn1Reader::new(econtent.value)
            .read_universal(TAG_OCTET_STRING)?
            .value;

        // Skip the optional certificate and crl blocks; single-anchor
        // verification never consults them.
        let signer_infos = loop {
            let elem = sd_fields.read_element()?;
            if elem.class == Asn1Class::ContextSpecific {
                continue;
            }
            if elem.is_universal(TAG_SET) {
                break elem;
            }
            return Err(DecodeError::UnexpectedTag.into());
        };

        // SignerInfo ::= SEQUENCE { version, issuerAndSerialNumber,
        //   digestAlgorithm, [0] signedAttrs?, signatureAlgorithm, signature }
        let signer_info = Asn1Reader::new(signer_infos.value).read_universal(TAG_SEQUENCE)?;
        let mut si_fields = Asn1Reader::new(signer_info.value);
        let _si_version = si_fields.read_universal(TAG_INTEGER)?;
        let _issuer_and_serial = si_fields.read_universal(TAG_SEQUENCE)?;
        let digest_algorithm_oid = {
            let alg = si_fields.read_universal(TAG_SEQUENCE)?;
            algorithm_oid(&alg)?
        };

        let mut next = si_fields.read_element()?;
        let signed_attrs = if next.is_context_specific(0) {
            let attrs = SignedAttributes::from_implicit_set(next.value)?;
            next = si_fields.read_element()?;
            Some(attrs)
        } else {
            None
        };

        if !next.is_universal(TAG_SEQUENCE) {
            return Err(DecodeError::UnexpectedTag.into());
        }
        let signature_algorithm_oid = algorithm_oid(&next)?;
        let signature = si_fields.read_universal(TAG_OCTET_STRING)?.value;

        Ok(Self {
            content,
            digest_algorithm_oid,
            signature_algorithm_oid,
            signed_attrs,
            signature,
        })
    }

    /// The inner content bytes, to be trusted only after [`verify`] passes.
    ///
    /// [`verify`]: Self::verify
    pub fn payload(&self) -> &'a [u8] {
        self.content
    }

    /// Verify the envelope signature against a single trust anchor.
    ///
    /// Chain building is intentionally disabled: the anchor's public key
    /// must itself verify the signature.
    pub fn verify(&self, trust_anchor_der: &[u8]) -> Result<(), EnvelopeError> {
        let spki_der = trust_anchor_spki(trust_anchor_der)?;

        let message: &[u8] = match &self.signed_attrs {
            Some(attrs) => {
                let digest = digest_for_oid(&self.digest_algorithm_oid, self.content)
                    .ok_or_else(|| {
                        EnvelopeError::SignatureRejected(format!(
                            "unsupported digest algorithm OID: {}",
                            self.digest_algorithm_oid
                        ))
                    })?;
                if digest != attrs.message_digest {
                    return Err(EnvelopeError::SignatureRejected(
                        "signed attributes do not match the content digest".to_string(),
                    ));
                }
                &attrs.der_set
            }
            None => self.content,
        };

        verify_signature(
            &spki_der,
            &self.signature_algorithm_oid,
            &self.digest_algorithm_oid,
            message,
            self.signature,
        )
        .map_err(EnvelopeError::SignatureRejected)
    }
}

/// Extract the SPKI DER from a trust anchor given as DER cert or bare SPKI.
fn trust_anchor_spki(trust_anchor_der: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if let Ok((_, cert)) = x509_parser::parse_x509_certificate(trust_anchor_der) {
        return Ok(cert.tbs_certificate.subject_pki.raw.to_vec());
    }
    if let Ok((rest, _)) = x509_parser::x509::SubjectPublicKeyInfo::from_der(trust_anchor_der) {
        let used = trust_anchor_der.len() - rest.len();
        return Ok(trust_anchor_der[..used].to_vec());
    }
    Err(EnvelopeError::UntrustedAnchor)
}

fn algorithm_oid(alg: &Asn1Element<'_>) -> Result<String, DecodeError> {
    let mut fields = Asn1Reader::new(alg.value);
    read_object_identifier(&fields.read_universal(TAG_OBJECT_IDENTIFIER)?)
        .ok_or(DecodeError::UnexpectedTag)
}

fn digest_for_oid(oid: &str, data: &[u8]) -> Option<Vec<u8>> {
    match oid {
        OID_SHA1 => Some(Sha1::digest(data).to_vec()),
        OID_SHA256 => Some(Sha256::digest(data).to_vec()),
        _ => None,
    }
}

/// Re-encode the contents of an implicitly tagged signedAttrs block as the
/// SET OF the signature was computed over.
fn encode_set_of(contents: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(contents.len() + 6);
    out.push(0x31);
    if contents.len() < 0x80 {
        out.push(contents.len() as u8);
    } else {
        let bytes = contents.len().to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(contents);
    out
}

/// Dispatch signature verification by algorithm OID.
fn verify_signature(
    spki_der: &[u8],
    signature_algorithm_oid: &str,
    digest_algorithm_oid: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<(), String> {
    match signature_algorithm_oid {
        // rsaEncryption: the digest algorithm comes from the SignerInfo.
        OID_RSA_ENCRYPTION => match digest_algorithm_oid {
            OID_SHA1 => verify_rsa_sha1(spki_der, message, signature),
            OID_SHA256 => verify_rsa_sha256(spki_der, message, signature),
            other => Err(format!("unsupported digest algorithm OID: {other}")),
        },
        OID_SHA1_WITH_RSA => verify_rsa_sha1(spki_der, message, signature),
        OID_SHA256_WITH_RSA => verify_rsa_sha256(spki_der, message, signature),
        OID_ECDSA_WITH_SHA256 => verify_ecdsa_p256(spki_der, message, signature),
        other => Err(format!("unsupported signature algorithm OID: {other}")),
    }
}

fn rsa_public_key(spki_der: &[u8]) -> Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_der(spki_der).map_err(|e| format!("bad RSA public key: {e}"))
}

fn verify_rsa_sha1(spki_der: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), String> {
    let key = rsa_public_key(spki_der)?;
    let vk = pkcs1v15::VerifyingKey::<Sha1>::new(key);
    let signature = pkcs1v15::Signature::try_from(sig)
        .map_err(|e| format!("bad RSA signature bytes: {e}"))?;
    vk.verify(msg, &signature)
        .map_err(|_| "signature verification failed".to_string())
}

fn verify_rsa_sha256(spki_der: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), String> {
    let key = rsa_public_key(spki_der)?;
    let vk = pkcs1v15::VerifyingKey::<Sha256>::new(key);
    let signature = pkcs1v15::Signature::try_from(sig)
        .map_err(|e| format!("bad RSA signature bytes: {e}"))?;
    vk.verify(msg, &signature)
        .map_err(|_| "signature verification failed".to_string())
}

fn verify_ecdsa_p256(spki_der: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), String> {
    let pk = p256::PublicKey::from_public_key_der(spki_der)
        .map_err(|e| format!("bad P-256 public key: {e}"))?;
    let ep = pk.to_encoded_point(false);
    let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| format!("bad P-256 public key: {e}"))?;
    // PKCS#7 carries ECDSA signatures in DER form.
    let signature = p256::ecdsa::Signature::from_der(sig)
        .map_err(|e| format!("bad ECDSA signature bytes: {e}"))?;
    vk.verify(msg, &signature)
        .map_err(|_| "signature verification failed".to_string())
}

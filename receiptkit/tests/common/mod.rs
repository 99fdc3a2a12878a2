// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! End-to-end fixtures: hand-rolled DER encoding for receipt payloads and
//! the RSA-signed PKCS#7 envelopes that wrap them.

#![allow(dead_code)]

use std::sync::OnceLock;

use rsa::pkcs8::EncodePublicKey as _;
use rsa::signature::{SignatureEncoding as _, Signer as _};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use receiptkit::{compute_device_hash, ReceiptValidationOptions};

pub const OID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
pub const OID_DATA: &str = "1.2.840.113549.1.7.1";
pub const OID_SHA256: &str = "2.16.840.1.101.3.4.2.1";
pub const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";

pub const DEVICE_IDENTIFIER: [u8; 16] = [0x11; 16];

// --- DER encoding ---

pub fn encode_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
}

pub fn encode_tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(contents.len() + 6);
    out.push(tag);
    encode_length(&mut out, contents.len());
    out.extend_from_slice(contents);
    out
}

pub fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let lead = bytes[start];
        let next = bytes[start + 1];
        let redundant = (lead == 0x00 && next & 0x80 == 0) || (lead == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    encode_tlv(0x02, &bytes[start..])
}

pub fn encode_utf8_string(s: &str) -> Vec<u8> {
    encode_tlv(0x0c, s.as_bytes())
}

pub fn encode_ia5_string(s: &str) -> Vec<u8> {
    encode_tlv(0x16, s.as_bytes())
}

pub fn encode_octet_string(bytes: &[u8]) -> Vec<u8> {
    encode_tlv(0x04, bytes)
}

pub fn encode_sequence(contents: &[u8]) -> Vec<u8> {
    encode_tlv(0x30, contents)
}

pub fn encode_set(contents: &[u8]) -> Vec<u8> {
    encode_tlv(0x31, contents)
}

pub fn encode_oid(dotted: &str) -> Vec<u8> {
    let arcs: Vec<u64> = dotted.split('.').map(|a| a.parse().unwrap()).collect();
    let mut contents = Vec::new();
    push_base128(&mut contents, arcs[0] * 40 + arcs[1]);
    for &arc in &arcs[2..] {
        push_base128(&mut contents, arc);
    }
    encode_tlv(0x06, &contents)
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut septets = [0u8; 10];
    let mut count = 0;
    loop {
        septets[count] = (value & 0x7f) as u8;
        value >>= 7;
        count += 1;
        if value == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        out.push(septets[i] | if i > 0 { 0x80 } else { 0 });
    }
}

fn algorithm_identifier(oid: &str) -> Vec<u8> {
    let mut contents = encode_oid(oid);
    contents.extend_from_slice(&encode_tlv(0x05, &[])); // NULL parameters
    encode_sequence(&contents)
}

// --- receipt payload fixtures ---

pub fn encode_attribute(attribute_type: i64, version: i64, value: &[u8]) -> Vec<u8> {
    let mut contents = encode_integer(attribute_type);
    contents.extend_from_slice(&encode_integer(version));
    contents.extend_from_slice(&encode_octet_string(value));
    encode_sequence(&contents)
}

pub fn encode_attribute_set(attributes: &[Vec<u8>]) -> Vec<u8> {
    let contents: Vec<u8> = attributes.iter().flatten().copied().collect();
    encode_set(&contents)
}

pub fn purchase_record(product_id: &str, transaction_id: &str, quantity: i64) -> Vec<u8> {
    encode_attribute_set(&[
        encode_attribute(1701, 1, &encode_integer(quantity)),
        encode_attribute(1702, 1, &encode_utf8_string(product_id)),
        encode_attribute(1703, 1, &encode_utf8_string(transaction_id)),
        encode_attribute(1704, 1, &encode_ia5_string("2021-10-05T10:22:11Z")),
    ])
}

/// A complete receipt payload whose hash attribute is consistent with
/// `DEVICE_IDENTIFIER`, the opaque bytes, and the encoded bundle id.
pub fn receipt_payload(
    bundle_id: &str,
    bundle_version: &str,
    opaque: &[u8],
    expiration: Option<&str>,
    purchases: &[Vec<u8>],
) -> Vec<u8> {
    let bundle = encode_utf8_string(bundle_id);
    let hash = compute_device_hash(&DEVICE_IDENTIFIER, opaque, &bundle);

    let mut attributes = vec![
        encode_attribute(2, 1, &bundle),
        encode_attribute(3, 1, &encode_utf8_string(bundle_version)),
        encode_attribute(4, 1, opaque),
        encode_attribute(5, 1, &hash),
        encode_attribute(12, 1, &encode_ia5_string("2021-10-05T10:22:11Z")),
        encode_attribute(19, 1, &encode_utf8_string("1.0")),
    ];
    if let Some(expiration) = expiration {
        attributes.push(encode_attribute(21, 1, &encode_ia5_string(expiration)));
    }
    for purchase in purchases {
        attributes.push(encode_attribute(17, 1, purchase));
    }
    encode_attribute_set(&attributes)
}

pub fn validation_options(bundle_id: &str, bundle_version: &str) -> ReceiptValidationOptions {
    ReceiptValidationOptions {
        expected_bundle_identifier: bundle_id.to_string(),
        expected_bundle_version: bundle_version.to_string(),
        device_identifier: DEVICE_IDENTIFIER,
        now: None,
    }
}

// --- signing and envelope assembly ---

pub fn test_signing_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap())
}

/// The trust anchor handed to the verifier: the signer's SPKI DER.
pub fn trust_anchor(key: &RsaPrivateKey) -> Vec<u8> {
    key.to_public_key()
        .to_public_key_der()
        .unwrap()
        .as_bytes()
        .to_vec()
}

pub fn sign_message(key: &RsaPrivateKey, message: &[u8]) -> Vec<u8> {
    let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone());
    signing_key.sign(message).to_vec()
}

/// A PKCS#7 ContentInfo/SignedData envelope signed directly over the payload.
pub fn signed_envelope(payload: &[u8], key: &RsaPrivateKey) -> Vec<u8> {
    let signature = sign_message(key, payload);

    let mut issuer_and_serial = encode_sequence(&[]);
    issuer_and_serial.extend_from_slice(&encode_integer(1));

    let mut signer_info = encode_integer(1);
    signer_info.extend_from_slice(&encode_sequence(&issuer_and_serial));
    signer_info.extend_from_slice(&algorithm_identifier(OID_SHA256));
    signer_info.extend_from_slice(&algorithm_identifier(OID_RSA_ENCRYPTION));
    signer_info.extend_from_slice(&encode_octet_string(&signature));
    let signer_infos = encode_set(&encode_sequence(&signer_info));

    let mut encap = encode_oid(OID_DATA);
    encap.extend_from_slice(&encode_tlv(0xa0, &encode_octet_string(payload)));

    let mut signed_data = encode_integer(1);
    signed_data.extend_from_slice(&encode_set(&algorithm_identifier(OID_SHA256)));
    signed_data.extend_from_slice(&encode_sequence(&encap));
    signed_data.extend_from_slice(&signer_infos);

    let mut content_info = encode_oid(OID_SIGNED_DATA);
    content_info.extend_from_slice(&encode_tlv(0xa0, &encode_sequence(&signed_data)));
    encode_sequence(&content_info)
}

/// A fully signed receipt ready for the whole pipeline.
pub fn signed_receipt(
    bundle_id: &str,
    bundle_version: &str,
    expiration: Option<&str>,
    purchases: &[Vec<u8>],
    key: &RsaPrivateKey,
) -> Vec<u8> {
    let payload = receipt_payload(bundle_id, bundle_version, &[0xaa, 0xbb], expiration, purchases);
    signed_envelope(&payload, key)
}

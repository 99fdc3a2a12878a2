// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! DER encoding helpers for building test fixtures by hand.

#![allow(dead_code)]

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

/// SEQUENCE(INTEGER type, INTEGER version, OCTET STRING value).
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

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Readers for the primitive types the receipt schema uses.
//!
//! Each reader succeeds only for its matching tag and returns `None`
//! otherwise: a mistyped field in the payload resolves to an absent value,
//! which the validation layer treats as a missing component when the field
//! was required. String readers borrow the value bytes directly.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::der::{
    decode_element, Asn1Element, TAG_IA5_STRING, TAG_INTEGER, TAG_OBJECT_IDENTIFIER,
    TAG_UTF8_STRING,
};

/// Read a big-endian signed INTEGER of up to 8 value bytes.
pub fn read_integer(elem: &Asn1Element<'_>) -> Option<i64> {
    if !elem.is_universal(TAG_INTEGER) || elem.constructed {
        return None;
    }
    let bytes = elem.value;
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    // Sign-extend from the first value byte, then accumulate.
    let mut value: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in bytes {
        value = value.wrapping_shl(8) | i64::from(b);
    }
    Some(value)
}

pub fn read_utf8_string<'a>(elem: &Asn1Element<'a>) -> Option<&'a str> {
    if !elem.is_universal(TAG_UTF8_STRING) {
        return None;
    }
    std::str::from_utf8(elem.value).ok()
}

pub fn read_ia5_string<'a>(elem: &Asn1Element<'a>) -> Option<&'a str> {
    if !elem.is_universal(TAG_IA5_STRING) || !elem.value.is_ascii() {
        return None;
    }
    std::str::from_utf8(elem.value).ok()
}

/// Read a string of either form the receipt schema uses (UTF8 or IA5).
pub fn read_string<'a>(elem: &Asn1Element<'a>) -> Option<&'a str> {
    read_utf8_string(elem).or_else(|| read_ia5_string(elem))
}

/// Read an IA5STRING holding a `yyyy-MM-dd'T'HH:mm:ssZ` timestamp in GMT.
///
/// Tag or format mismatch is absence, not an error.
pub fn read_gmt_timestamp(elem: &Asn1Element<'_>) -> Option<DateTime<Utc>> {
    let text = read_ia5_string(elem)?;
    parse_gmt_timestamp(text)
}

fn parse_gmt_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Read an OBJECT IDENTIFIER into dotted-decimal form.
///
/// Algorithm identifiers are dispatched on their dotted string form, so this
/// is the only OID representation the workspace needs.
pub fn read_object_identifier(elem: &Asn1Element<'_>) -> Option<String> {
    if !elem.is_universal(TAG_OBJECT_IDENTIFIER) || elem.value.is_empty() {
        return None;
    }

    let mut arcs: Vec<u64> = Vec::new();
    let mut current: u64 = 0;
    let mut continuing = false;
    for &b in elem.value {
        if current > u64::MAX >> 7 {
            return None;
        }
        current = (current << 7) | u64::from(b & 0x7f);
        continuing = b & 0x80 != 0;
        if !continuing {
            arcs.push(current);
            current = 0;
        }
    }
    if continuing {
        return None;
    }

    // The first encoded arc folds the first two identifier components.
    let (first, second) = match arcs[0] {
        n if n < 40 => (0, n),
        n if n < 80 => (1, n - 40),
        n => (2, n - 80),
    };
    let mut out = format!("{first}.{second}");
    for arc in &arcs[1..] {
        let _ = write!(out, ".{arc}");
    }
    Some(out)
}

/// Decode one element from `input` and read it as an INTEGER.
pub fn decode_integer(input: &[u8]) -> Option<i64> {
    let elem = decode_element(input, 0, input.len()).ok()?;
    read_integer(&elem)
}

/// Decode one element from `input` and read it as a UTF8 or IA5 string.
pub fn decode_string(input: &[u8]) -> Option<&str> {
    let elem = decode_element(input, 0, input.len()).ok()?;
    read_string(&elem)
}

/// Decode one element from `input` and read it as a GMT timestamp.
pub fn decode_gmt_timestamp(input: &[u8]) -> Option<DateTime<Utc>> {
    let elem = decode_element(input, 0, input.len()).ok()?;
    read_gmt_timestamp(&elem)
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The DER element decoder and a checked cursor over a byte window.
//!
//! `decode_element` reads exactly one tag/length/value triple and returns a
//! borrowed view of the value bytes; it never copies and never reads past
//! the window the caller handed it. `Asn1Reader` layers a cursor on top so
//! nested structures can be walked with checked arithmetic instead of raw
//! offset bookkeeping.

use thiserror::Error;

/// UNIVERSAL tag numbers used by the receipt and envelope formats.
pub const TAG_INTEGER: u32 = 0x02;
pub const TAG_OCTET_STRING: u32 = 0x04;
pub const TAG_OBJECT_IDENTIFIER: u32 = 0x06;
pub const TAG_UTF8_STRING: u32 = 0x0c;
pub const TAG_SEQUENCE: u32 = 0x10;
pub const TAG_SET: u32 = 0x11;
pub const TAG_IA5_STRING: u32 = 0x16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asn1Class {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// One decoded tag-length-value element.
///
/// `value` borrows the input buffer, so the buffer must outlive every view
/// derived from it. `header_len` is the number of bytes the tag and length
/// octets consumed; `total_len` is the element's full encoded length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asn1Element<'a> {
    pub class: Asn1Class,
    pub tag: u32,
    pub constructed: bool,
    pub header_len: usize,
    pub value: &'a [u8],
}

impl<'a> Asn1Element<'a> {
    pub fn total_len(&self) -> usize {
        self.header_len + self.value.len()
    }

    pub fn is_universal(&self, tag: u32) -> bool {
        self.class == Asn1Class::Universal && self.tag == tag
    }

    pub fn is_context_specific(&self, tag: u32) -> bool {
        self.class == Asn1Class::ContextSpecific && self.tag == tag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The element's header or declared value length extends past the end of
    /// its enclosing window.
    #[error("element extends past the end of its enclosing window")]
    Truncated,
    /// Indefinite lengths, lengths wider than 4 octets, and tag numbers
    /// wider than 32 bits are not valid in this profile of DER.
    #[error("unsupported tag or length encoding")]
    UnsupportedTag,
    /// The element decoded cleanly but does not carry the tag the structure
    /// requires at this position.
    #[error("element does not have the expected tag")]
    UnexpectedTag,
}

/// Decode one element starting at `offset`, reading at most `max_len` bytes.
///
/// The returned value slice always lies within `offset .. offset + max_len`;
/// a declared length that would exceed the window fails with
/// [`DecodeError::Truncated`] rather than truncating silently.
pub fn decode_element<'a>(
    input: &'a [u8],
    offset: usize,
    max_len: usize,
) -> Result<Asn1Element<'a>, DecodeError> {
    if offset > input.len() {
        return Err(DecodeError::Truncated);
    }
    let window_len = max_len.min(input.len() - offset);
    let window = &input[offset..offset + window_len];

    let mut pos = 0usize;
    let first = *window.first().ok_or(DecodeError::Truncated)?;
    pos += 1;

    let class = match first >> 6 {
        0 => Asn1Class::Universal,
        1 => Asn1Class::Application,
        2 => Asn1Class::ContextSpecific,
        _ => Asn1Class::Private,
    };
    let constructed = first & 0x20 != 0;

    let mut tag = u32::from(first & 0x1f);
    if tag == 0x1f {
        // High-tag-number form: base-128 septets, most significant first.
        tag = 0;
        let mut septets = 0usize;
        loop {
            let b = *window.get(pos).ok_or(DecodeError::Truncated)?;
            pos += 1;
            septets += 1;
            if septets > 4 {
                return Err(DecodeError::UnsupportedTag);
            }
            tag = (tag << 7) | u32::from(b & 0x7f);
            if b & 0x80 == 0 {
                break;
            }
        }
    }

    let first_len = *window.get(pos).ok_or(DecodeError::Truncated)?;
    pos += 1;
    let len = if first_len < 0x80 {
        usize::from(first_len)
    } else if first_len == 0x80 {
        // Indefinite length is BER, not DER.
        return Err(DecodeError::UnsupportedTag);
    } else {
        let octets = usize::from(first_len & 0x7f);
        if octets > 4 {
            return Err(DecodeError::UnsupportedTag);
        }
        let mut len = 0usize;
        for _ in 0..octets {
            let b = *window.get(pos).ok_or(DecodeError::Truncated)?;
            pos += 1;
            len = (len << 8) | usize::from(b);
        }
        len
    };

    if len > window.len() - pos {
        return Err(DecodeError::Truncated);
    }

    Ok(Asn1Element {
        class,
        tag,
        constructed,
        header_len: pos,
        value: &window[pos..pos + len],
    })
}

/// A checked cursor over a byte window.
///
/// Each successful read advances past the element's full encoded length;
/// the cursor can never move past the end of the window.
#[derive(Debug, Clone)]
pub struct Asn1Reader<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> Asn1Reader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Decode the element at the cursor and advance past it.
    pub fn read_element(&mut self) -> Result<Asn1Element<'a>, DecodeError> {
        let elem = decode_element(self.input, self.offset, self.remaining())?;
        self.offset += elem.total_len();
        Ok(elem)
    }

    /// Decode the element at the cursor, requiring a UNIVERSAL tag.
    pub fn read_universal(&mut self, tag: u32) -> Result<Asn1Element<'a>, DecodeError> {
        let elem = self.read_element()?;
        if !elem.is_universal(tag) {
            return Err(DecodeError::UnexpectedTag);
        }
        Ok(elem)
    }
}

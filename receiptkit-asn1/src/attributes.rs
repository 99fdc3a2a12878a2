// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The attribute walker.
//!
//! A receipt payload is a SET of SEQUENCE(INTEGER attributeType,
//! INTEGER attributeVersion, OCTET STRING attributeValue). The walker
//! iterates that shape lazily, yielding one raw attribute per step until the
//! cursor lands exactly on the SET boundary. The same walker runs over the
//! OCTET STRING payload of an in-app-purchase attribute, which embeds a
//! nested SET of the same shape.

use crate::der::{
    decode_element, Asn1Reader, DecodeError, TAG_INTEGER, TAG_OCTET_STRING, TAG_SEQUENCE, TAG_SET,
};
use crate::primitives::read_integer;

/// One raw (type, version, value) record.
///
/// The value borrows the payload buffer and is meant to be consumed
/// immediately by the record builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptAttribute<'a> {
    pub attribute_type: i64,
    pub version: i64,
    pub value: &'a [u8],
}

/// Lazy, single-pass iterator over an attribute SET.
///
/// Yields `Err` once and then fuses if any record is malformed: a cursor
/// that would overrun the SET mid-record, or a child with an unexpected
/// tag, ends the walk rather than yielding a partial record.
pub struct AttributeWalker<'a> {
    reader: Asn1Reader<'a>,
    failed: bool,
}

impl<'a> AttributeWalker<'a> {
    /// Decode the outer SET element of `input` and walk its records.
    pub fn over_set(input: &'a [u8]) -> Result<Self, DecodeError> {
        let set = decode_element(input, 0, input.len())?;
        if !set.is_universal(TAG_SET) {
            return Err(DecodeError::UnexpectedTag);
        }
        Ok(Self {
            reader: Asn1Reader::new(set.value),
            failed: false,
        })
    }

    fn next_attribute(&mut self) -> Result<ReceiptAttribute<'a>, DecodeError> {
        let record = self.reader.read_universal(TAG_SEQUENCE)?;

        let mut fields = Asn1Reader::new(record.value);
        let attribute_type = read_integer(&fields.read_universal(TAG_INTEGER)?)
            .ok_or(DecodeError::UnexpectedTag)?;
        let version = read_integer(&fields.read_universal(TAG_INTEGER)?)
            .ok_or(DecodeError::UnexpectedTag)?;
        let value = fields.read_universal(TAG_OCTET_STRING)?;
        if !fields.is_empty() {
            return Err(DecodeError::UnexpectedTag);
        }

        Ok(ReceiptAttribute {
            attribute_type,
            version,
            value: value.value,
        })
    }
}

impl<'a> Iterator for AttributeWalker<'a> {
    type Item = Result<ReceiptAttribute<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        match self.next_attribute() {
            Ok(attribute) => Some(Ok(attribute)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

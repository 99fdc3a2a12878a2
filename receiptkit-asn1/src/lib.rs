// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! DER tag-length-value decoding for App Store receipt payloads.
//!
//! This crate is the wire-format layer of the workspace: a bounds-checked
//! element decoder, readers for the primitive types the receipt schema uses
//! (INTEGER, UTF8STRING, IA5STRING, GMT timestamps, OBJECT IDENTIFIER), and
//! the attribute walker that iterates a SET of (type, version, value)
//! records.
//!
//! Everything here operates on borrowed views into the caller's buffer. The
//! input is attacker-influenced, so every read validates its length against
//! the enclosing window before any byte is dereferenced; no decode path
//! panics.

mod attributes;
mod der;
mod primitives;

pub use attributes::{AttributeWalker, ReceiptAttribute};
pub use der::{
    decode_element, Asn1Class, Asn1Element, Asn1Reader, DecodeError, TAG_IA5_STRING, TAG_INTEGER,
    TAG_OBJECT_IDENTIFIER, TAG_OCTET_STRING, TAG_SEQUENCE, TAG_SET, TAG_UTF8_STRING,
};
pub use primitives::{
    decode_gmt_timestamp, decode_integer, decode_string, read_gmt_timestamp, read_ia5_string,
    read_integer, read_object_identifier, read_string, read_utf8_string,
};

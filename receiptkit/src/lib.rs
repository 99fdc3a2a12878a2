// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! High-level App Store receipt validation facade.
//!
//! This crate is the primary entry point: [`validate_receipt`] runs the
//! whole pipeline (envelope verification, payload decoding, business-rule
//! validation) over raw receipt bytes and a single trust anchor.
//!
//! Design note: the member crates stay usable on their own. The re-exports
//! below expose each stage for callers that want to run them piecewise.

mod api;

pub use api::{validate_receipt, ReceiptVerdict};

pub use receiptkit_asn1::{AttributeWalker, DecodeError, ReceiptAttribute};
pub use receiptkit_validation::{
    compute_device_hash, validate_parsed_receipt, EnvelopeError, InAppPurchase, Receipt,
    ReceiptValidationOptions, SignedEnvelope, ValidationStatus,
};

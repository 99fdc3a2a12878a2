// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Envelope verification and business-rule validation for App Store
//! receipts.
//!
//! This crate takes the raw receipt bytes through three stages:
//! - [`SignedEnvelope`] parses the PKCS#7 signed-data container and verifies
//!   its signature against a single caller-supplied trust anchor.
//! - [`Receipt::from_payload`] builds the typed record from the verified
//!   payload, recursing into nested in-app-purchase records.
//! - [`validate_parsed_receipt`] applies the ordered rule chain (presence,
//!   identity, version, device hash, freshness).
//!
//! Every outcome is a value from the closed [`ValidationStatus`] set; no
//! stage raises, and no stage caches or shares state.

mod envelope;
mod receipt;
mod status;
mod validator;

pub use envelope::{EnvelopeError, SignedEnvelope};
pub use receipt::{InAppPurchase, Receipt};
pub use status::ValidationStatus;
pub use validator::{compute_device_hash, validate_parsed_receipt, ReceiptValidationOptions};

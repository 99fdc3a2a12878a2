// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The ordered business-rule chain over a built receipt.
//!
//! Rules run in a fixed order and short-circuit on the first failure:
//! presence, bundle identity, bundle version, device-binding hash,
//! freshness. The caller supplies its expected identity values and the
//! 16-byte device identifier; nothing here reads process-wide state.

use chrono::{DateTime, Utc};
use sha1::{Digest as _, Sha1};

use crate::receipt::Receipt;
use crate::status::ValidationStatus;

/// Caller-supplied expectations for one validation run.
#[derive(Debug, Clone)]
pub struct ReceiptValidationOptions {
    /// The bundle identifier the application knows itself by.
    pub expected_bundle_identifier: String,
    /// The bundle version the application knows itself by.
    pub expected_bundle_version: String,
    /// The 16 raw bytes of the device identifier the receipt is bound to.
    pub device_identifier: [u8; 16],
    /// Reference instant for the freshness rule. `None` means the current
    /// time; tests inject a fixed instant.
    pub now: Option<DateTime<Utc>>,
}

/// Apply the rule chain to a fully built receipt.
pub fn validate_parsed_receipt(
    receipt: &Receipt,
    options: &ReceiptValidationOptions,
) -> ValidationStatus {
    let (
        Some(bundle_identifier),
        Some(bundle_identifier_data),
        Some(bundle_version),
        Some(opaque_data),
        Some(hash_data),
    ) = (
        receipt.bundle_identifier.as_deref(),
        receipt.bundle_identifier_data.as_deref(),
        receipt.bundle_version.as_deref(),
        receipt.opaque_data.as_deref(),
        receipt.hash_data.as_deref(),
    )
    else {
        return ValidationStatus::MissingComponent;
    };

    if bundle_identifier != options.expected_bundle_identifier {
        return ValidationStatus::InvalidBundleIdentifier;
    }

    if bundle_version != options.expected_bundle_version {
        return ValidationStatus::InvalidVersionIdentifier;
    }

    let computed =
        compute_device_hash(&options.device_identifier, opaque_data, bundle_identifier_data);
    if computed.as_slice() != hash_data {
        return ValidationStatus::InvalidHash;
    }

    let now = options.now.unwrap_or_else(Utc::now);
    if let Some(expiration_date) = receipt.expiration_date {
        if expiration_date < now {
            return ValidationStatus::InvalidExpired;
        }
    }

    ValidationStatus::ValidationSuccess
}

/// SHA-1 over device identifier, opaque data, and the raw encoded
/// bundle-identifier bytes, in that order.
///
/// The signing scheme is defined over the original attribute encoding, so
/// the decoded bundle string must never be substituted here.
pub fn compute_device_hash(
    device_identifier: &[u8; 16],
    opaque_data: &[u8],
    bundle_identifier_data: &[u8],
) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(device_identifier);
    hasher.update(opaque_data);
    hasher.update(bundle_identifier_data);
    hasher.finalize().into()
}

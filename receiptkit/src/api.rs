// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use log::debug;

use receiptkit_validation::{
    validate_parsed_receipt, Receipt, ReceiptValidationOptions, SignedEnvelope, ValidationStatus,
};

/// Outcome of a full validation run.
///
/// The receipt is present whenever the payload was decoded, including runs
/// where a later business rule failed, so callers can still inspect the
/// decoded fields of a rejected receipt.
#[derive(Debug, Clone)]
pub struct ReceiptVerdict {
    pub status: ValidationStatus,
    pub receipt: Option<Receipt>,
}

impl ReceiptVerdict {
    fn rejected(status: ValidationStatus) -> Self {
        Self {
            status,
            receipt: None,
        }
    }
}

/// Validate raw receipt bytes against a trust anchor and the caller's
/// expected identity.
///
/// The pipeline is synchronous and single-pass: verify the signed envelope,
/// decode the payload into a [`Receipt`], then apply the rule chain. The
/// first failing stage decides the status.
pub fn validate_receipt(
    receipt_der: &[u8],
    trust_anchor_der: &[u8],
    options: &ReceiptValidationOptions,
) -> ReceiptVerdict {
    if receipt_der.is_empty() {
        return ReceiptVerdict::rejected(ValidationStatus::NoReceiptPresent);
    }

    let envelope = match SignedEnvelope::parse(receipt_der) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!("envelope parse failed: {err}");
            return ReceiptVerdict::rejected(err.status());
        }
    };

    if let Err(err) = envelope.verify(trust_anchor_der) {
        debug!("envelope verification failed: {err}");
        return ReceiptVerdict::rejected(err.status());
    }

    let receipt = match Receipt::from_payload(envelope.payload()) {
        Ok(receipt) => receipt,
        Err(err) => {
            debug!("payload decode failed: {err}");
            return ReceiptVerdict::rejected(ValidationStatus::UnexpectedAsn1Type);
        }
    };

    let status = validate_parsed_receipt(&receipt, options);
    ReceiptVerdict {
        status,
        receipt: Some(receipt),
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The typed receipt record and its builder.
//!
//! The builder drives the attribute walker over the verified payload once,
//! dispatching each attribute through a static code-to-field mapping. The
//! same walk-and-dispatch shape runs recursively over attribute 17, whose
//! value embeds a SET of in-app-purchase attributes.
//!
//! Two failure policies coexist deliberately: the top-level walk is
//! all-or-nothing, while a malformed nested purchase record is dropped and
//! the outer scan continues at the next attribute boundary.

use chrono::{DateTime, Utc};
use log::debug;

use receiptkit_asn1::{
    decode_gmt_timestamp, decode_integer, decode_string, AttributeWalker, DecodeError,
};

/// The decoded receipt. All fields are optional until the payload scan
/// populates them; the validator decides which ones are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Receipt {
    pub bundle_identifier: Option<String>,
    /// Raw encoded bytes of the bundle-identifier attribute value. The
    /// device-binding hash is defined over these bytes, not the decoded
    /// string.
    pub bundle_identifier_data: Option<Vec<u8>>,
    pub bundle_version: Option<String>,
    pub opaque_data: Option<Vec<u8>>,
    pub hash_data: Option<Vec<u8>>,
    pub original_app_version: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub in_app_purchases: Vec<InAppPurchase>,
}

/// One in-app purchase record from a type-17 attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InAppPurchase {
    pub quantity: Option<i64>,
    pub product_id: Option<String>,
    pub transaction_id: Option<String>,
    pub original_transaction_id: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub original_purchase_date: Option<DateTime<Utc>>,
    /// Kept as the raw string the payload carries, not parsed as a date.
    pub cancellation_date: Option<String>,
    pub subscription_expiration_date: Option<DateTime<Utc>>,
    /// Part of the purchase schema; no attribute code populates it.
    pub subscription_introductory_price_period: Option<i64>,
    pub web_order_line_id: Option<i64>,
}

/// Receipt-level attribute codes. Codes outside this mapping are ignored,
/// keeping the scan forward compatible with new attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiptField {
    BundleIdentifier,
    BundleVersion,
    OpaqueData,
    HashData,
    CreationDate,
    PurchaseRecord,
    OriginalAppVersion,
    ExpirationDate,
}

impl ReceiptField {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(Self::BundleIdentifier),
            3 => Some(Self::BundleVersion),
            4 => Some(Self::OpaqueData),
            5 => Some(Self::HashData),
            12 => Some(Self::CreationDate),
            17 => Some(Self::PurchaseRecord),
            19 => Some(Self::OriginalAppVersion),
            21 => Some(Self::ExpirationDate),
            _ => None,
        }
    }
}

/// Purchase-level attribute codes inside a type-17 value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PurchaseField {
    Quantity,
    ProductId,
    TransactionId,
    PurchaseDate,
    OriginalTransactionId,
    OriginalPurchaseDate,
    SubscriptionExpirationDate,
    WebOrderLineId,
    CancellationDate,
}

impl PurchaseField {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            1701 => Some(Self::Quantity),
            1702 => Some(Self::ProductId),
            1703 => Some(Self::TransactionId),
            1704 => Some(Self::PurchaseDate),
            1705 => Some(Self::OriginalTransactionId),
            1706 => Some(Self::OriginalPurchaseDate),
            1708 => Some(Self::SubscriptionExpirationDate),
            1711 => Some(Self::WebOrderLineId),
            1712 => Some(Self::CancellationDate),
            _ => None,
        }
    }
}

impl Receipt {
    /// Build a receipt from a verified payload in one forward scan.
    ///
    /// A mistyped value resolves to an absent field; a structurally
    /// malformed payload fails the whole build.
    pub fn from_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut receipt = Receipt::default();

        for attribute in AttributeWalker::over_set(payload)? {
            let attribute = attribute?;
            let Some(field) = ReceiptField::from_code(attribute.attribute_type) else {
                continue;
            };
            match field {
                ReceiptField::BundleIdentifier => {
                    receipt.bundle_identifier = decode_string(attribute.value).map(str::to_owned);
                    receipt.bundle_identifier_data = Some(attribute.value.to_vec());
                }
                ReceiptField::BundleVersion => {
                    receipt.bundle_version = decode_string(attribute.value).map(str::to_owned);
                }
                ReceiptField::OpaqueData => {
                    receipt.opaque_data = Some(attribute.value.to_vec());
                }
                ReceiptField::HashData => {
                    receipt.hash_data = Some(attribute.value.to_vec());
                }
                ReceiptField::CreationDate => {
                    receipt.creation_date = decode_gmt_timestamp(attribute.value);
                }
                ReceiptField::PurchaseRecord => {
                    match InAppPurchase::from_encoded_set(attribute.value) {
                        Ok(purchase) => receipt.in_app_purchases.push(purchase),
                        Err(err) => {
                            debug!("dropping malformed in-app purchase record: {err}");
                        }
                    }
                }
                ReceiptField::OriginalAppVersion => {
                    receipt.original_app_version =
                        decode_string(attribute.value).map(str::to_owned);
                }
                ReceiptField::ExpirationDate => {
                    receipt.expiration_date = decode_gmt_timestamp(attribute.value);
                }
            }
        }

        Ok(receipt)
    }
}

impl InAppPurchase {
    /// Decode one purchase record from the nested attribute SET.
    ///
    /// Returns `Err` for any structural fault so the caller can apply the
    /// drop policy explicitly.
    pub fn from_encoded_set(input: &[u8]) -> Result<Self, DecodeError> {
        let mut purchase = InAppPurchase::default();

        for attribute in AttributeWalker::over_set(input)? {
            let attribute = attribute?;
            let Some(field) = PurchaseField::from_code(attribute.attribute_type) else {
                continue;
            };
            match field {
                PurchaseField::Quantity => {
                    purchase.quantity = decode_integer(attribute.value);
                }
                PurchaseField::ProductId => {
                    purchase.product_id = decode_string(attribute.value).map(str::to_owned);
                }
                PurchaseField::TransactionId => {
                    purchase.transaction_id = decode_string(attribute.value).map(str::to_owned);
                }
                PurchaseField::PurchaseDate => {
                    purchase.purchase_date = decode_gmt_timestamp(attribute.value);
                }
                PurchaseField::OriginalTransactionId => {
                    purchase.original_transaction_id =
                        decode_string(attribute.value).map(str::to_owned);
                }
                PurchaseField::OriginalPurchaseDate => {
                    purchase.original_purchase_date = decode_gmt_timestamp(attribute.value);
                }
                PurchaseField::SubscriptionExpirationDate => {
                    purchase.subscription_expiration_date = decode_gmt_timestamp(attribute.value);
                }
                PurchaseField::WebOrderLineId => {
                    purchase.web_order_line_id = decode_integer(attribute.value);
                }
                PurchaseField::CancellationDate => {
                    purchase.cancellation_date = decode_string(attribute.value).map(str::to_owned);
                }
            }
        }

        Ok(purchase)
    }
}

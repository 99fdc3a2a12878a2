// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The closed set of validation outcomes.
//!
//! Validation is structured as values rather than exceptions: exactly one
//! status is produced per run, the first failing stage wins, and later
//! stages do not execute. The variant set is part of the external contract
//! and must not grow or shrink with the payload vocabulary.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// Every stage passed.
    ValidationSuccess,
    /// No receipt bytes were provided.
    NoReceiptPresent,
    /// A failure outside the decode/verify stages.
    UnknownFailure,
    /// The receipt is not a well-formed PKCS#7 container.
    UnknownReceiptFormat,
    /// The outer container is not tagged as signed-data.
    InvalidPkcs7Signature,
    /// The embedded content type is not plain data.
    InvalidPkcs7Type,
    /// The supplied trust anchor could not be used.
    InvalidAppleRootCertificate,
    /// The envelope signature did not verify against the trust anchor.
    FailedAppleSignature,
    /// The verified payload is not a well-formed attribute SET.
    UnexpectedAsn1Type,
    /// A required receipt field was absent.
    MissingComponent,
    /// The bundle identifier did not match the caller's expectation.
    InvalidBundleIdentifier,
    /// The bundle version did not match the caller's expectation.
    InvalidVersionIdentifier,
    /// The device-binding hash check failed.
    InvalidHash,
    /// The receipt's expiration date has passed.
    InvalidExpired,
}

impl ValidationStatus {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::ValidationSuccess)
    }

    /// Stable human-readable description.
    pub fn message(self) -> &'static str {
        match self {
            Self::ValidationSuccess => "Valid receipt.",
            Self::NoReceiptPresent => "Receipt not found.",
            Self::UnknownFailure => "Unexpected failure occurred.",
            Self::UnknownReceiptFormat => "The receipt is not PKCS7.",
            Self::InvalidPkcs7Signature => "Invalid Signature.",
            Self::InvalidPkcs7Type => "Invalid Type.",
            Self::InvalidAppleRootCertificate => "Apple root certificate not found.",
            Self::FailedAppleSignature => "Receipt not signed by Apple.",
            Self::UnexpectedAsn1Type => "Unexpected Type.",
            Self::MissingComponent => "Expected component not found.",
            Self::InvalidBundleIdentifier => "Receipt bundle id does not match app bundle id.",
            Self::InvalidVersionIdentifier => "Receipt version id does not match app version.",
            Self::InvalidHash => "Failed hash check.",
            Self::InvalidExpired => "Receipt expired.",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

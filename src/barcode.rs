//! Scan payload validation.
//!
//! Corrupt reads are rejected here, before they reach the count
//! reconciliation engine. EAN/UPC symbologies are checked against their
//! checksum digit; codes without a checksum (industrial linear codes,
//! free-form 2D payloads) only pass a length guard.
//!
//! Checksum failures carry the expected check digit so the scan UI can
//! prompt for a rescan instead of silently dropping the attempt.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

/// Shortest scan payload accepted without a checksum.
pub const MIN_GENERIC_LEN: usize = 4;
/// Longest scan payload accepted without a checksum.
pub const MAX_GENERIC_LEN: usize = 80;

/// Symbology a scan payload is validated against. Scanning hardware may
/// report one as a hint; otherwise numeric payloads are routed by digit
/// count and everything else falls back to the generic guard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum Symbology {
    #[serde(rename = "ean13")]
    #[strum(serialize = "EAN-13")]
    Ean13,
    #[serde(rename = "ean8")]
    #[strum(serialize = "EAN-8")]
    Ean8,
    #[serde(rename = "upca")]
    #[strum(serialize = "UPC-A")]
    UpcA,
    #[serde(rename = "upce")]
    #[strum(serialize = "UPC-E")]
    UpcE,
    #[serde(rename = "generic")]
    #[strum(serialize = "generic")]
    Generic,
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidatedScan {
    /// Trimmed payload text.
    pub normalized: String,
    /// Symbology the payload was accepted as.
    pub symbology: Symbology,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("scan payload is empty")]
    Empty,

    #[error("{symbology} codes must be numeric")]
    NonNumeric { symbology: Symbology },

    #[error("{symbology} codes must be {expected} digits, got {actual}")]
    WrongLength {
        symbology: Symbology,
        expected: usize,
        actual: usize,
    },

    #[error("{symbology} checksum failed: expected check digit {expected}")]
    ChecksumMismatch { symbology: Symbology, expected: u8 },

    #[error("UPC-E number system digit {0} is out of range (0-2)")]
    UnsupportedNumberSystem(u8),

    #[error("scan payload shorter than 4 characters looks like a truncated read")]
    TooShort,

    #[error("scan payload longer than 80 characters")]
    TooLong,
}

/// Validates a raw scan payload, optionally against a symbology hint
/// reported by the scanning hardware.
pub fn validate(raw: &str, hint: Option<Symbology>) -> Result<ValidatedScan, ScanError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ScanError::Empty);
    }

    match hint {
        Some(symbology) => validate_as(text, symbology),
        None => route(text),
    }
}

/// Routes an unhinted payload. Numeric payloads go by digit count:
/// 13 is EAN-13, 12 is UPC-A, 8 tries EAN-8 and falls back to UPC-E.
fn route(text: &str) -> Result<ValidatedScan, ScanError> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return validate_as(text, Symbology::Generic);
    }

    match text.len() {
        13 => validate_as(text, Symbology::Ean13),
        12 => validate_as(text, Symbology::UpcA),
        8 => validate_as(text, Symbology::Ean8)
            .or_else(|ean8_err| validate_as(text, Symbology::UpcE).map_err(|_| ean8_err)),
        _ => validate_as(text, Symbology::Generic),
    }
}

fn validate_as(text: &str, symbology: Symbology) -> Result<ValidatedScan, ScanError> {
    match symbology {
        Symbology::Ean13 => validate_ean13(text),
        Symbology::Ean8 => validate_ean8(text),
        Symbology::UpcA => validate_upca(text),
        Symbology::UpcE => validate_upce(text),
        Symbology::Generic => validate_generic(text),
    }?;

    Ok(ValidatedScan {
        normalized: text.to_string(),
        symbology,
    })
}

fn digits_of(text: &str, symbology: Symbology, expected: usize) -> Result<Vec<u8>, ScanError> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::NonNumeric { symbology });
    }
    if text.len() != expected {
        return Err(ScanError::WrongLength {
            symbology,
            expected,
            actual: text.len(),
        });
    }
    Ok(text.bytes().map(|b| b - b'0').collect())
}

/// EAN-13 check digit over the first 12 digits: weight 1 on even
/// 0-indexed positions, weight 3 on odd.
fn ean13_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .take(12)
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 0 {
                u32::from(d)
            } else {
                u32::from(d) * 3
            }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// EAN-8 inverts the EAN-13 weighting: weight 3 on even 0-indexed
/// positions, weight 1 on odd, over the first 7 digits.
fn ean8_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .take(7)
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 0 {
                u32::from(d) * 3
            } else {
                u32::from(d)
            }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn validate_ean13(text: &str) -> Result<(), ScanError> {
    let digits = digits_of(text, Symbology::Ean13, 13)?;
    let expected = ean13_check_digit(&digits);
    if expected != digits[12] {
        return Err(ScanError::ChecksumMismatch {
            symbology: Symbology::Ean13,
            expected,
        });
    }
    Ok(())
}

fn validate_ean8(text: &str) -> Result<(), ScanError> {
    let digits = digits_of(text, Symbology::Ean8, 8)?;
    let expected = ean8_check_digit(&digits);
    if expected != digits[7] {
        return Err(ScanError::ChecksumMismatch {
            symbology: Symbology::Ean8,
            expected,
        });
    }
    Ok(())
}

/// UPC-A is EAN-13's right-aligned subset: a leading zero turns the
/// 12-digit code into an EAN-13 with the same check digit.
fn validate_upca(text: &str) -> Result<(), ScanError> {
    let digits = digits_of(text, Symbology::UpcA, 12)?;
    let expected = upca_check_digit(&digits[..11]);
    if expected != digits[11] {
        return Err(ScanError::ChecksumMismatch {
            symbology: Symbology::UpcA,
            expected,
        });
    }
    Ok(())
}

fn upca_check_digit(payload: &[u8]) -> u8 {
    let mut widened = Vec::with_capacity(13);
    widened.push(0);
    widened.extend_from_slice(payload);
    ean13_check_digit(&widened)
}

/// UPC-E validation expands the compressed code to its 12-digit UPC-A
/// form per the zero-suppression rules, then compares the UPC-A check
/// digit of the expansion against the code's own check digit. Only
/// number systems 0-2 are compressible.
fn validate_upce(text: &str) -> Result<(), ScanError> {
    let digits = digits_of(text, Symbology::UpcE, 8)?;
    let number_system = digits[0];
    if number_system > 2 {
        return Err(ScanError::UnsupportedNumberSystem(number_system));
    }

    let body = expand_upce_body(&digits[1..7]);
    let mut payload = Vec::with_capacity(11);
    payload.push(number_system);
    payload.extend_from_slice(&body);

    let expected = upca_check_digit(&payload);
    if expected != digits[7] {
        return Err(ScanError::ChecksumMismatch {
            symbology: Symbology::UpcE,
            expected,
        });
    }
    Ok(())
}

/// Zero-suppression expansion of the six UPC-E data digits into the
/// ten-digit UPC-A body. The last data digit selects the pattern.
fn expand_upce_body(d: &[u8]) -> [u8; 10] {
    match d[5] {
        0..=2 => [d[0], d[1], d[5], 0, 0, 0, 0, d[2], d[3], d[4]],
        3 => [d[0], d[1], d[2], 0, 0, 0, 0, 0, d[3], d[4]],
        4 => [d[0], d[1], d[2], d[3], 0, 0, 0, 0, 0, d[4]],
        _ => [d[0], d[1], d[2], d[3], d[4], 0, 0, 0, 0, d[5]],
    }
}

/// Codes without a checksum only get a sanity guard: obviously truncated
/// reads and absurdly long payloads are rejected, everything else passes.
fn validate_generic(text: &str) -> Result<(), ScanError> {
    if text.len() < MIN_GENERIC_LEN {
        return Err(ScanError::TooShort);
    }
    if text.len() > MAX_GENERIC_LEN {
        return Err(ScanError::TooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("4006381333931", Symbology::Ean13 ; "ean13 known vector")]
    #[test_case("9638507496104", Symbology::Ean13 ; "ean13 second vector")]
    #[test_case("036000291452", Symbology::UpcA ; "upca known vector")]
    #[test_case("96385074", Symbology::Ean8 ; "ean8 known vector")]
    fn accepts_valid_numeric_codes(raw: &str, symbology: Symbology) {
        let scan = validate(raw, None).expect("valid code rejected");
        assert_eq!(scan.symbology, symbology);
        assert_eq!(scan.normalized, raw);
    }

    #[test]
    fn reports_expected_check_digit_on_mismatch() {
        // Perturb the final digit of a valid EAN-13 by one.
        let err = validate("4006381333932", None).unwrap_err();
        assert_eq!(
            err,
            ScanError::ChecksumMismatch {
                symbology: Symbology::Ean13,
                expected: 1
            }
        );
        assert!(err.to_string().contains("expected check digit 1"));
    }

    #[test]
    fn routes_by_digit_count_without_hint() {
        assert_eq!(
            validate("4006381333931", None).unwrap().symbology,
            Symbology::Ean13
        );
        assert_eq!(
            validate("036000291452", None).unwrap().symbology,
            Symbology::UpcA
        );
        assert_eq!(
            validate("96385074", None).unwrap().symbology,
            Symbology::Ean8
        );
        // 10 digits carry no checksum; the generic guard applies.
        assert_eq!(
            validate("1234567890", None).unwrap().symbology,
            Symbology::Generic
        );
    }

    #[test]
    fn eight_digit_codes_fall_back_to_upce() {
        // Fails the EAN-8 checksum but expands to a valid UPC-A form.
        let scan = validate("01234505", None).expect("UPC-E fallback rejected");
        assert_eq!(scan.symbology, Symbology::UpcE);

        // Fails both: the primary EAN-8 mismatch is reported.
        let err = validate("01234509", None).unwrap_err();
        assert_eq!(
            err,
            ScanError::ChecksumMismatch {
                symbology: Symbology::Ean8,
                expected: 3
            }
        );
    }

    #[test_case("01234505" ; "pattern digit 0")]
    #[test_case("01234558" ; "pattern digit 5")]
    fn accepts_valid_upce_codes(raw: &str) {
        validate(raw, Some(Symbology::UpcE)).expect("valid UPC-E rejected");
    }

    #[test]
    fn rejects_upce_number_system_out_of_range() {
        // Invalid regardless of the remaining digits.
        let err = validate("91234558", Some(Symbology::UpcE)).unwrap_err();
        assert_eq!(err, ScanError::UnsupportedNumberSystem(9));
        let err = validate("34567899", Some(Symbology::UpcE)).unwrap_err();
        assert_eq!(err, ScanError::UnsupportedNumberSystem(3));
    }

    #[test]
    fn hint_overrides_digit_count_routing() {
        // 12 digits would route to UPC-A, but the hardware said EAN-13.
        let err = validate("036000291452", Some(Symbology::Ean13)).unwrap_err();
        assert_eq!(
            err,
            ScanError::WrongLength {
                symbology: Symbology::Ean13,
                expected: 13,
                actual: 12
            }
        );
    }

    #[test]
    fn generic_guard_bounds_length() {
        assert_eq!(validate("AB1", None).unwrap_err(), ScanError::TooShort);
        assert_eq!(
            validate(&"X".repeat(81), None).unwrap_err(),
            ScanError::TooLong
        );
        assert!(validate("CRATE-0042-A", None).is_ok());
        assert!(validate(&"X".repeat(80), None).is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let scan = validate("  96385074\n", None).unwrap();
        assert_eq!(scan.normalized, "96385074");
    }

    #[test]
    fn rejects_empty_payloads() {
        assert_eq!(validate("   ", None).unwrap_err(), ScanError::Empty);
    }

    proptest! {
        // Checksums must be sensitive to any single-digit error.
        #[test]
        fn ean13_detects_single_digit_corruption(pos in 0usize..13, delta in 1u8..10) {
            let valid = "4006381333931";
            let mut digits: Vec<u8> = valid.bytes().map(|b| b - b'0').collect();
            digits[pos] = (digits[pos] + delta) % 10;
            let corrupted: String = digits.iter().map(|d| (d + b'0') as char).collect();
            prop_assert!(validate(&corrupted, Some(Symbology::Ean13)).is_err());
        }

        #[test]
        fn upca_detects_single_digit_corruption(pos in 0usize..12, delta in 1u8..10) {
            let valid = "036000291452";
            let mut digits: Vec<u8> = valid.bytes().map(|b| b - b'0').collect();
            digits[pos] = (digits[pos] + delta) % 10;
            let corrupted: String = digits.iter().map(|d| (d + b'0') as char).collect();
            prop_assert!(validate(&corrupted, Some(Symbology::UpcA)).is_err());
        }

        #[test]
        fn ean8_detects_single_digit_corruption(pos in 0usize..8, delta in 1u8..10) {
            let valid = "96385074";
            let mut digits: Vec<u8> = valid.bytes().map(|b| b - b'0').collect();
            digits[pos] = (digits[pos] + delta) % 10;
            let corrupted: String = digits.iter().map(|d| (d + b'0') as char).collect();
            prop_assert!(validate(&corrupted, Some(Symbology::Ean8)).is_err());
        }
    }
}

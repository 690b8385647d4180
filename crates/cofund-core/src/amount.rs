//! # Monetary Amounts
//!
//! Amounts are carried as validated decimal strings so that no value ever
//! passes through a binary float between the client and the store.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum number of fractional digits accepted in an amount.
pub const MAX_FRACTION_DIGITS: usize = 2;

/// A non-negative decimal amount such as `"1500"` or `"249.90"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(String);

impl Amount {
    /// Validate and wrap a decimal string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let reject = |reason: &str| CoreError::InvalidAmount {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let (whole, fraction) = match s.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (s, None),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(reject("expected a non-negative decimal number"));
        }
        if let Some(fraction) = fraction {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(reject("malformed fractional part"));
            }
            if fraction.len() > MAX_FRACTION_DIGITS {
                return Err(reject("too many fractional digits"));
            }
        }
        Ok(Self(s.to_string()))
    }

    /// The decimal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0' || b == b'.')
    }
}

impl TryFrom<String> for Amount {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_plain_and_fractional() {
        assert_eq!(Amount::parse("1500").unwrap().as_str(), "1500");
        assert_eq!(Amount::parse("249.90").unwrap().as_str(), "249.90");
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "-5", "1.", ".5", "1.234", "12a", "1e3", "1,5"] {
            assert!(Amount::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn zero_detection() {
        assert!(Amount::parse("0").unwrap().is_zero());
        assert!(Amount::parse("0.00").unwrap().is_zero());
        assert!(!Amount::parse("0.01").unwrap().is_zero());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Amount = serde_json::from_str("\"10.5\"").unwrap();
        assert_eq!(ok.as_str(), "10.5");
        assert!(serde_json::from_str::<Amount>("\"-1\"").is_err());
    }

    proptest! {
        #[test]
        fn any_integer_with_cents_is_accepted(whole in 0u64..1_000_000_000, cents in 0u32..100) {
            let s = format!("{whole}.{cents:02}");
            let parsed = Amount::parse(&s).unwrap();
            prop_assert_eq!(parsed.as_str(), s.as_str());
        }
    }
}

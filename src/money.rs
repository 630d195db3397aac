//! Money math and idempotency-key derivation
//!
//! All amounts are integer minor units (cents). Commission is charged to
//! the sender at 1.5%, rounded up to the nearest minor unit.

use sha2::{Digest, Sha256};

/// Commission numerator (1.5% = 3/200)
pub const COMMISSION_NUM: u64 = 3;

/// Commission denominator
pub const COMMISSION_DEN: u64 = 200;

/// Calculate the commission for a transfer amount.
///
/// Uses u128 intermediate to prevent overflow. Always rounds up: repeated
/// sub-cent truncation would leak value out of the closed system.
///
/// # Example
/// ```
/// use payrail::money::commission;
/// assert_eq!(commission(10_000), 150); // 1.5% of 100.00
/// assert_eq!(commission(1), 1);        // ceil(0.015)
/// ```
#[inline]
pub fn commission(amount: i64) -> i64 {
    debug_assert!(amount >= 0);
    let num = amount as u128 * COMMISSION_NUM as u128;
    num.div_ceil(COMMISSION_DEN as u128) as i64
}

/// Total amount debited from the sender: `amount + commission(amount)`.
#[inline]
pub fn total_debited(amount: i64) -> i64 {
    amount + commission(amount)
}

/// Derive an idempotency key when the caller did not supply one.
///
/// `sha256(sender_id || "|" || receiver_id || "|" || amount || "|" || timestamp)`,
/// hex-encoded. Callers are encouraged to supply their own key so that a
/// client-side retry collapses to the same key across clock drift.
pub fn derive_idempotency_key(
    sender_id: i64,
    receiver_id: i64,
    amount: i64,
    timestamp: i64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{sender_id}|{receiver_id}|{amount}|{timestamp}"));
    hex::encode(hasher.finalize())
}

/// Format minor units as a decimal string, e.g. 123456 -> "1234.56".
pub fn format_cents(minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_basic() {
        // 100.00 * 1.5% = 1.50
        assert_eq!(commission(10_000), 150);
        // 500.00 * 1.5% = 7.50
        assert_eq!(commission(50_000), 750);
    }

    #[test]
    fn test_commission_rounds_up() {
        // ceil(0.015) = 1
        assert_eq!(commission(1), 1);
        // 6666 * 3 / 200 = 99.99 -> 100
        assert_eq!(commission(6_666), 100);
        // 6667 * 3 / 200 = 100.005 -> 101
        assert_eq!(commission(6_667), 101);
        // 333 * 3 / 200 = 4.995 -> 5
        assert_eq!(commission(333), 5);
    }

    #[test]
    fn test_commission_zero() {
        assert_eq!(commission(0), 0);
    }

    #[test]
    fn test_total_debited() {
        assert_eq!(total_debited(10_000), 10_150);
        assert_eq!(total_debited(333), 338);
    }

    #[test]
    fn test_no_overflow() {
        // Amounts near i64::MAX must not overflow the intermediate
        let large = i64::MAX / 2;
        let c = commission(large);
        assert!(c > 0);
        assert_eq!(c as u128, (large as u128 * 3).div_ceil(200));
    }

    #[test]
    fn test_micro_loss_regression() {
        // 1,000 transfers of 333 each: total commission must be exactly
        // 1000 * 5, with no value leaked to rounding.
        let per_transfer = commission(333);
        assert_eq!(per_transfer, 5);
        let total: i64 = (0..1_000).map(|_| total_debited(333)).sum();
        assert_eq!(total, 1_000 * (333 + 5));
    }

    #[test]
    fn test_derive_idempotency_key_deterministic() {
        let a = derive_idempotency_key(1, 2, 10_000, 1_700_000_000);
        let b = derive_idempotency_key(1, 2, 10_000, 1_700_000_000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        // Any input change produces a different key
        assert_ne!(a, derive_idempotency_key(1, 2, 10_000, 1_700_000_001));
        assert_ne!(a, derive_idempotency_key(2, 1, 10_000, 1_700_000_000));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(123_456), "1234.56");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(-150), "-1.50");
    }
}

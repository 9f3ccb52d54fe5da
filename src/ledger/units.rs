//! XRP amount and ledger time conversions.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 1 XRP = 1,000,000 drops
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Seconds between the Unix epoch and the ripple epoch (2000-01-01T00:00:00Z)
pub const RIPPLE_EPOCH_OFFSET: i64 = 946_684_800;

/// Convert an XRP amount into drops, refusing negative or sub-drop values
pub fn xrp_to_drops(xrp: Decimal) -> AppResult<u64> {
    if xrp.is_sign_negative() {
        return Err(AppError::InvalidArgument(format!(
            "XRP amount {} must not be negative",
            xrp
        )));
    }

    let drops = xrp * Decimal::from(DROPS_PER_XRP);
    if !drops.fract().is_zero() {
        return Err(AppError::InvalidArgument(format!(
            "XRP amount {} has more than 6 decimal places",
            xrp
        )));
    }

    drops
        .to_u64()
        .ok_or_else(|| AppError::InvalidArgument(format!("XRP amount {} is out of range", xrp)))
}

pub fn drops_to_xrp(drops: u64) -> Decimal {
    (Decimal::from(drops) / Decimal::from(DROPS_PER_XRP)).normalize()
}

/// Parse a drops string as returned by the ledger (`"1000000"`)
pub fn parse_drops(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok()
}

/// Seconds since the ripple epoch; instants before it clamp to 0
pub fn to_ripple_time(at: DateTime<Utc>) -> u32 {
    (at.timestamp() - RIPPLE_EPOCH_OFFSET).clamp(0, u32::MAX as i64) as u32
}

pub fn from_ripple_time(ripple_time: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(ripple_time as i64 + RIPPLE_EPOCH_OFFSET, 0)
        .single()
        .unwrap_or_default()
}

pub fn ripple_now() -> u32 {
    to_ripple_time(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_to_xrp() {
        assert_eq!(drops_to_xrp(1_000_000), Decimal::ONE);
        assert_eq!(drops_to_xrp(2_500_000), Decimal::new(25, 1));
        assert_eq!(drops_to_xrp(1), Decimal::new(1, 6));
        assert_eq!(drops_to_xrp(2_500_000).to_string(), "2.5");
    }

    #[test]
    fn test_xrp_to_drops() {
        assert_eq!(xrp_to_drops(Decimal::new(1, 3)).unwrap(), 1_000);
        assert_eq!(xrp_to_drops(Decimal::new(25, 1)).unwrap(), 2_500_000);
        assert!(xrp_to_drops(Decimal::new(1, 7)).is_err());
        assert!(xrp_to_drops(Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_ripple_time_round_trip_at_epoch() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_ripple_time(epoch), 0);
        assert_eq!(from_ripple_time(0), epoch);
        assert_eq!(from_ripple_time(86_400), epoch + chrono::Duration::days(1));
    }

    #[test]
    fn test_times_before_epoch_clamp() {
        let before = Utc.with_ymd_and_hms(1999, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(to_ripple_time(before), 0);
    }
}

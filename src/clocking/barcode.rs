use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::policy::ClockingPolicy;
use crate::error::AppError;

pub const SYMBOLOGY: &str = "CODE128";
const FALLBACK_IMAGE_BASE: &str = "https://barcode.tec-it.com/barcode.ashx";

/// `STORE-{store_id}-{yyyyMMdd}`
pub fn store_code(store_id: u64, day: NaiveDate) -> String {
    format!("STORE-{}-{}", store_id, day.format("%Y%m%d"))
}

/// Hosted rendering of the same payload, for clients that fail to draw it.
pub fn fallback_image_url(code: &str) -> String {
    format!("{FALLBACK_IMAGE_BASE}?data={code}&code=Code128")
}

/// Codes accepted at `now`: today's first, then one per grace day going back.
pub fn accepted_codes(store_id: u64, now: DateTime<Utc>, policy: &ClockingPolicy) -> Vec<String> {
    let today = policy.local_date(now);
    (0..=policy.grace_days)
        .filter_map(|back| today.checked_sub_days(Days::new(back.into())))
        .map(|day| store_code(store_id, day))
        .collect()
}

pub fn validate(
    scanned: &str,
    store_id: u64,
    now: DateTime<Utc>,
    policy: &ClockingPolicy,
) -> Result<(), AppError> {
    let scanned = scanned.trim();
    if accepted_codes(store_id, now, policy)
        .iter()
        .any(|code| code == scanned)
    {
        Ok(())
    } else {
        Err(AppError::InvalidBarcode)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "code": "STORE-7-20261016",
    "symbology": "CODE128",
    "fallback_image_url": "https://barcode.tec-it.com/barcode.ashx?data=STORE-7-20261016&code=Code128",
    "valid_from": "2026-10-16",
    "valid_until": "2026-10-17"
}))]
pub struct StoreBarcode {
    pub code: String,
    pub symbology: String,
    pub fallback_image_url: String,
    #[schema(format = "date", value_type = String)]
    pub valid_from: NaiveDate,
    /// Last store-local day on which the code still scans.
    #[schema(format = "date", value_type = String)]
    pub valid_until: NaiveDate,
}

pub fn barcode_for(store_id: u64, now: DateTime<Utc>, policy: &ClockingPolicy) -> StoreBarcode {
    let today = policy.local_date(now);
    let code = store_code(store_id, today);
    StoreBarcode {
        fallback_image_url: fallback_image_url(&code),
        code,
        symbology: SYMBOLOGY.to_string(),
        valid_from: today,
        valid_until: today
            .checked_add_days(Days::new(policy.grace_days.into()))
            .unwrap_or(today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::policy::tests::at;

    #[test]
    fn code_format() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(store_code(7, day), "STORE-7-20260105");
    }

    #[test]
    fn accepts_today_and_yesterday_only() {
        let policy = ClockingPolicy::default();
        let now = at(2026, 10, 16, 9, 0);
        assert!(validate("STORE-7-20261016", 7, now, &policy).is_ok());
        assert!(validate("STORE-7-20261015", 7, now, &policy).is_ok());
        assert_eq!(
            validate("STORE-7-20261014", 7, now, &policy),
            Err(AppError::InvalidBarcode)
        );
        assert_eq!(
            validate("STORE-7-20261017", 7, now, &policy),
            Err(AppError::InvalidBarcode)
        );
        assert_eq!(
            validate("STORE-7-20200101", 7, now, &policy),
            Err(AppError::InvalidBarcode)
        );
    }

    #[test]
    fn rejects_other_stores_and_malformed_codes() {
        let policy = ClockingPolicy::default();
        let now = at(2026, 10, 16, 9, 0);
        for code in ["STORE-8-20261016", "STORE-7", "store-7-20261016", "", "STORE-7-2026-10-16"] {
            assert!(validate(code, 7, now, &policy).is_err(), "{code:?}");
        }
    }

    #[test]
    fn grace_window_crosses_month_boundary() {
        let policy = ClockingPolicy::default();
        let now = at(2026, 11, 1, 8, 0);
        assert_eq!(
            accepted_codes(3, now, &policy),
            vec!["STORE-3-20261101".to_string(), "STORE-3-20261031".to_string()]
        );
    }

    #[test]
    fn barcode_carries_fallback_and_validity() {
        let policy = ClockingPolicy::default();
        let barcode = barcode_for(7, at(2026, 10, 16, 7, 0), &policy);
        assert_eq!(barcode.code, "STORE-7-20261016");
        assert_eq!(barcode.symbology, "CODE128");
        assert_eq!(
            barcode.fallback_image_url,
            "https://barcode.tec-it.com/barcode.ashx?data=STORE-7-20261016&code=Code128"
        );
        assert_eq!(barcode.valid_until, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
    }
}

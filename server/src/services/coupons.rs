use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Coupon, CouponKind};
use crate::services::clock::Clock;
use crate::services::error::CouponError;
use crate::services::round_money;
use crate::store::CouponSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuote {
    pub original_amount: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
}

/// Applies a coupon to `amount` as of `today`. Pure: same inputs, same quote.
pub fn evaluate(
    coupon: Option<&Coupon>,
    amount: Decimal,
    today: NaiveDate,
) -> Result<CouponQuote, CouponError> {
    let coupon = coupon.ok_or(CouponError::Invalid)?;

    if !coupon.is_active {
        return Err(CouponError::Inactive);
    }
    if coupon.expires_at < today {
        return Err(CouponError::Expired);
    }
    if amount < coupon.min_amount {
        return Err(CouponError::MinimumAmountNotMet {
            minimum: coupon.min_amount,
        });
    }

    let discount = match coupon.kind().ok_or(CouponError::InvalidConfiguration)? {
        CouponKind::Percent => round_money(amount * coupon.value / Decimal::ONE_HUNDRED),
        CouponKind::Fixed => round_money(coupon.value),
    };
    let discount = discount.clamp(Decimal::ZERO, amount.max(Decimal::ZERO));

    Ok(CouponQuote {
        original_amount: amount,
        discount,
        final_amount: amount - discount,
    })
}

/// Looks coupons up in the payment store and evaluates them against the clock.
#[derive(Clone)]
pub struct CouponEvaluator {
    source: Arc<dyn CouponSource>,
    clock: Arc<dyn Clock>,
}

impl CouponEvaluator {
    pub fn new(source: Arc<dyn CouponSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Read-only; never changes the coupon store.
    pub async fn apply(&self, code: &str, amount: Decimal) -> Result<CouponQuote, CouponError> {
        let coupon = self.source.find_coupon(code).await?;
        evaluate(coupon.as_ref(), amount, self.clock.today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn coupon(kind: &str, value: Decimal, min: Decimal) -> Coupon {
        Coupon {
            code: "SAVE10".to_string(),
            kind: kind.to_string(),
            value,
            min_amount: min,
            is_active: true,
            expires_at: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        }
    }

    #[test]
    fn percent_coupon_discounts_ten_percent() {
        let save10 = coupon("Percent", Decimal::new(10, 0), Decimal::new(50, 0));
        let quote = evaluate(Some(&save10), Decimal::new(10000, 2), today()).unwrap();

        assert_eq!(quote.discount, Decimal::new(1000, 2));
        assert_eq!(quote.final_amount, Decimal::new(9000, 2));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let save10 = coupon("Percent", Decimal::new(15, 0), Decimal::ZERO);
        let amount = Decimal::new(3333, 2);

        let first = evaluate(Some(&save10), amount, today()).unwrap();
        let second = evaluate(Some(&save10), amount, today()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.discount, Decimal::new(500, 2));
    }

    #[test]
    fn fixed_discount_is_clamped_to_amount() {
        let flat = coupon("Fixed", Decimal::new(2000, 2), Decimal::ZERO);
        let quote = evaluate(Some(&flat), Decimal::new(1250, 2), today()).unwrap();

        assert_eq!(quote.discount, Decimal::new(1250, 2));
        assert_eq!(quote.final_amount, Decimal::ZERO);
    }

    #[test]
    fn negative_fixed_value_never_raises_the_price() {
        let odd = coupon("Fixed", Decimal::new(-500, 2), Decimal::ZERO);
        let quote = evaluate(Some(&odd), Decimal::new(1000, 2), today()).unwrap();

        assert_eq!(quote.discount, Decimal::ZERO);
        assert_eq!(quote.final_amount, Decimal::new(1000, 2));
    }

    #[test]
    fn rejections_follow_the_documented_order() {
        assert!(matches!(
            evaluate(None, Decimal::ONE, today()),
            Err(CouponError::Invalid)
        ));

        let mut inactive = coupon("Percent", Decimal::TEN, Decimal::ZERO);
        inactive.is_active = false;
        inactive.expires_at = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(matches!(
            evaluate(Some(&inactive), Decimal::ONE, today()),
            Err(CouponError::Inactive)
        ));

        let mut expired = coupon("Percent", Decimal::TEN, Decimal::ZERO);
        expired.expires_at = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
        assert!(matches!(
            evaluate(Some(&expired), Decimal::ONE, today()),
            Err(CouponError::Expired)
        ));

        let minimum = coupon("Percent", Decimal::TEN, Decimal::new(50, 0));
        assert!(matches!(
            evaluate(Some(&minimum), Decimal::new(4999, 2), today()),
            Err(CouponError::MinimumAmountNotMet { .. })
        ));

        let unknown = coupon("BOGO", Decimal::TEN, Decimal::ZERO);
        assert!(matches!(
            evaluate(Some(&unknown), Decimal::ONE, today()),
            Err(CouponError::InvalidConfiguration)
        ));
    }

    #[test]
    fn coupon_expiring_today_is_still_valid() {
        let mut last_day = coupon("Percent", Decimal::TEN, Decimal::ZERO);
        last_day.expires_at = today();
        assert!(evaluate(Some(&last_day), Decimal::TEN, today()).is_ok());
    }
}

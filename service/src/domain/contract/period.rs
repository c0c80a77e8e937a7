//! Rental [`Period`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{DateTimeOf, Money, Percent};
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::Mileage;

/// Number of seconds in a day.
const DAY_SECS: u64 = 24 * 60 * 60;

/// Agreed rental period and financial terms of a contract.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Period {
    /// [`DateTime`] when the rental starts.
    pub starts_at: StartDateTime,

    /// [`DateTime`] when the rental ends.
    ///
    /// Never precedes [`Period::starts_at`].
    pub ends_at: EndDateTime,

    /// Odometer reading at handover, in kilometers.
    pub initial_mileage: Mileage,

    /// Mileage allowance included in the price, in kilometers.
    pub allowed_mileage: Option<Mileage>,

    /// Fuel level at handover.
    pub initial_fuel: Percent,

    /// Price per rental day.
    pub daily_rate: Money,

    /// Deposit to be paid at handover.
    pub deposit: Money,

    /// Total price of the whole rental.
    pub total_amount: Money,
}

impl Period {
    /// Creates a new [`Period`] if the provided terms are valid: the end
    /// never precedes the start, and no amount is negative.
    #[expect(clippy::too_many_arguments, reason = "still readable")]
    #[must_use]
    pub fn new(
        starts_at: StartDateTime,
        ends_at: EndDateTime,
        initial_mileage: Mileage,
        allowed_mileage: Option<Mileage>,
        initial_fuel: Percent,
        daily_rate: Money,
        deposit: Money,
        total_amount: Money,
    ) -> Option<Self> {
        (ends_at.coerce::<()>() >= starts_at.coerce()
            && !daily_rate.is_negative()
            && !deposit.is_negative()
            && !total_amount.is_negative())
        .then_some(Self {
            starts_at,
            ends_at,
            initial_mileage,
            allowed_mileage,
            initial_fuel,
            daily_rate,
            deposit,
            total_amount,
        })
    }

    /// Returns the duration of this [`Period`] in days, rounded up to whole
    /// days.
    #[must_use]
    pub fn duration_days(&self) -> u32 {
        let duration = self.ends_at.coerce::<()>() - self.starts_at.coerce();
        let mut days = duration.as_secs() / DAY_SECS;
        if duration.as_secs() % DAY_SECS != 0 || duration.subsec_nanos() != 0 {
            days += 1;
        }
        u32::try_from(days).expect("period shorter than `u32::MAX` days")
    }
}

/// Marker type indicating a [`Period`] start.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type indicating a [`Period`] end.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// [`DateTime`] when a rental [`Period`] starts.
pub type StartDateTime = DateTimeOf<(Period, Start)>;

/// [`DateTime`] when a rental [`Period`] ends.
pub type EndDateTime = DateTimeOf<(Period, End)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{DateTime, Money, Percent};
    use rust_decimal::Decimal;

    use super::Period;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    fn period(starts_at: &str, ends_at: &str) -> Option<Period> {
        Period::new(
            at(starts_at).coerce(),
            at(ends_at).coerce(),
            10_000,
            Some(500),
            Percent::new(Decimal::ONE_HUNDRED).unwrap(),
            money("50USD"),
            money("200USD"),
            money("350USD"),
        )
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(period("2025-03-10T10:00:00Z", "2025-03-09T10:00:00Z")
            .is_none());
        assert!(period("2025-03-10T10:00:00Z", "2025-03-10T10:00:00Z")
            .is_some());
    }

    #[test]
    fn rejects_negative_amounts() {
        let p = Period::new(
            at("2025-03-10T10:00:00Z").coerce(),
            at("2025-03-12T10:00:00Z").coerce(),
            0,
            None,
            Percent::new(Decimal::ONE_HUNDRED).unwrap(),
            money("-1USD"),
            money("0USD"),
            money("0USD"),
        );
        assert!(p.is_none());
    }

    #[test]
    fn duration_rounds_up_to_whole_days() {
        let p = period("2025-03-10T10:00:00Z", "2025-03-17T10:00:00Z");
        assert_eq!(p.unwrap().duration_days(), 7);

        let p = period("2025-03-10T10:00:00Z", "2025-03-17T10:00:01Z");
        assert_eq!(p.unwrap().duration_days(), 8);

        let p = period("2025-03-10T10:00:00Z", "2025-03-10T10:00:00Z");
        assert_eq!(p.unwrap().duration_days(), 0);
    }
}

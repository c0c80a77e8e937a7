//! [`Contract`] definitions.

pub mod document;
pub mod payment;
pub mod period;
pub mod renter;
pub mod return_details;
pub mod signature;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xxhash_rust::xxh3;

use crate::domain::{
    user,
    vehicle::{self, Mileage},
};
#[cfg(doc)]
use crate::domain::{User, Vehicle};

pub use self::{
    document::Document,
    payment::Payment,
    period::Period,
    renter::Renter,
    return_details::ReturnDetails,
    signature::{Signature, Signatures},
};

/// Rental contract between a [`Vehicle`] owner and a [`Renter`].
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// Human-readable [`Number`] of this [`Contract`].
    ///
    /// Assigned once at creation, never mutated.
    pub number: Number,

    /// ID of the rented [`Vehicle`].
    pub vehicle_id: vehicle::Id,

    /// ID of the [`User`] who created this [`Contract`].
    pub owner_id: user::Id,

    /// [`Renter`] of the [`Vehicle`].
    pub renter: Renter,

    /// Rental [`Period`] and financial terms.
    pub period: Period,

    /// [`Document`]s attached to this [`Contract`].
    pub documents: Vec<Document>,

    /// Per-party [`Signatures`] of this [`Contract`].
    pub signatures: Signatures,

    /// [`Status`] of this [`Contract`].
    pub status: Status,

    /// [`Payment`] state of this [`Contract`].
    pub payment: Payment,

    /// [`ReturnDetails`] of this [`Contract`], recorded at finalization.
    pub return_details: Option<ReturnDetails>,

    /// Free-form [`Notes`] on this [`Contract`].
    ///
    /// Overwritten with the reason on cancellation.
    pub notes: Option<Notes>,

    /// [`Revision`] of this [`Contract`].
    pub revision: Revision,

    /// [`DateTime`] when this [`Contract`] was created.
    pub created_at: CreationDateTime,
}

impl Contract {
    /// Returns the duration of this [`Contract`]'s rental in days, rounded
    /// up to whole days.
    #[must_use]
    pub fn duration_days(&self) -> u32 {
        self.period.duration_days()
    }

    /// Returns how far the returned [`Vehicle`] overran the agreed mileage
    /// allowance, in kilometers.
    ///
    /// `0` is returned while this [`Contract`] has no [`ReturnDetails`], or
    /// when no allowance was agreed.
    #[must_use]
    pub fn mileage_overage(&self) -> Mileage {
        let (Some(details), Some(allowed)) =
            (self.return_details.as_ref(), self.period.allowed_mileage)
        else {
            return 0;
        };
        details
            .final_mileage
            .saturating_sub(self.period.initial_mileage)
            .saturating_sub(allowed)
    }

    /// Returns whether the recorded transactions cover the total amount of
    /// this [`Contract`].
    ///
    /// `false` is returned while no transactions are recorded at all.
    #[must_use]
    pub fn is_fully_paid(&self) -> bool {
        !self.payment.transactions.is_empty()
            && self.payment.balance() >= self.period.total_amount.amount
    }

    /// Replaces all [`Document`]s of the provided [`document::Kind`] with
    /// the given ones.
    ///
    /// Existing documents of the kind are removed wholesale before the new
    /// ones are appended.
    pub fn replace_documents(
        &mut self,
        kind: document::Kind,
        documents: impl IntoIterator<Item = Document>,
    ) {
        self.documents.retain(|d| d.kind != kind);
        self.documents.extend(documents);
    }

    /// Returns the [`Fingerprint`] identifying duplicate submissions of this
    /// [`Contract`].
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(
            self.owner_id,
            self.vehicle_id,
            self.period.starts_at,
            self.period.ends_at,
            &self.renter.email,
        )
    }
}

/// ID of a [`Contract`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Human-readable sequence number of a [`Contract`].
///
/// Formatted as `LOC-{YY}{MM}-{NNN}`, where `YY`/`MM` are the 2-digit year
/// and month of creation, and `NNN` is a zero-padded per-owner sequence
/// inside that calendar month.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(String);

impl Number {
    /// Composes a new [`Number`] out of the creation [`DateTime`] and the
    /// per-owner sequence inside the creation month.
    #[must_use]
    pub fn compose(at: CreationDateTime, sequence: u32) -> Self {
        Self(format!(
            "LOC-{:02}{:02}-{sequence:03}",
            at.year().rem_euclid(100),
            at.month(),
        ))
    }

    /// Creates a new [`Number`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Number`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Number`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Number`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^LOC-\d{4}-\d{3,}$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Number {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Number`")
    }
}

/// Fingerprint of a [`Contract`] used for deduplicating repeated
/// submissions.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Fingerprint(Uuid);

impl Fingerprint {
    /// Calculates a new [`Fingerprint`] for a [`Contract`].
    #[must_use]
    pub fn new(
        owner_id: user::Id,
        vehicle_id: vehicle::Id,
        starts_at: period::StartDateTime,
        ends_at: period::EndDateTime,
        renter_email: &user::Email,
    ) -> Self {
        use std::hash::Hash as _;

        // WARNING: Avoid changing the order of the fields in the hasher,
        //          because it will be a breaking change requiring to migrate
        //          all existing fingerprints in the database to the new
        //          format.
        let mut hasher = xxh3::Xxh3Builder::new().build();
        owner_id.hash(&mut hasher);
        vehicle_id.hash(&mut hasher);
        starts_at.unix_timestamp().hash(&mut hasher);
        ends_at.unix_timestamp().hash(&mut hasher);
        renter_email.hash(&mut hasher);

        Self(Uuid::from_u128(hasher.digest128()))
    }
}

/// Free-form notes on a [`Contract`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Notes(String);

impl Notes {
    /// Creates a new [`Notes`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `notes` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(notes: impl Into<String>) -> Self {
        Self(notes.into())
    }

    /// Creates a new [`Notes`] if the given `notes` is valid.
    #[must_use]
    pub fn new(notes: impl Into<String>) -> Option<Self> {
        let notes = notes.into();
        Self::check(&notes).then_some(Self(notes))
    }

    /// Checks whether the given `notes` is a valid [`Notes`].
    fn check(notes: impl AsRef<str>) -> bool {
        let notes = notes.as_ref();
        notes.trim() == notes && !notes.is_empty() && notes.len() <= 2048
    }
}

impl FromStr for Notes {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Notes`")
    }
}

/// Monotonic revision of a [`Contract`].
///
/// Incremented on every persisted mutation; a write observing a stale
/// [`Revision`] is rejected.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Revision(i32);

impl Revision {
    /// Returns the [`Revision`] following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

define_kind! {
    #[doc = "Status of a [`Contract`]."]
    enum Status {
        #[doc = "Created, not signed by anyone yet."]
        Draft = 1,

        #[doc = "Signed by one party."]
        Pending = 2,

        #[doc = "Signed by both parties, rental ongoing."]
        Active = 3,

        #[doc = "Vehicle returned, rental finished."]
        Completed = 4,

        #[doc = "Cancelled before completion."]
        Cancelled = 5,

        #[doc = "Terminated administratively."]
        Terminated = 6,
    }
}

impl Status {
    /// Returns whether this [`Status`] is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Terminated)
    }

    /// Returns whether a [`Contract`] in this [`Status`] accepts field
    /// updates.
    #[must_use]
    pub fn allows_update(self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    /// Returns whether a [`Contract`] in this [`Status`] accepts signatures.
    #[must_use]
    pub fn allows_signing(self) -> bool {
        !self.is_terminal()
    }

    /// Returns whether a [`Contract`] in this [`Status`] can be cancelled.
    #[must_use]
    pub fn allows_cancellation(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Returns whether a [`Contract`] in this [`Status`] can be finalized.
    #[must_use]
    pub fn allows_finalization(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns whether a [`Contract`] in this [`Status`] can be deleted.
    #[must_use]
    pub fn allows_deletion(self) -> bool {
        matches!(self, Self::Draft | Self::Pending | Self::Cancelled)
    }
}

/// [`DateTime`] when a [`Contract`] was created.
pub type CreationDateTime = DateTimeOf<(Contract, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{DateTime, Money, Percent};
    use rust_decimal::Decimal;

    use crate::domain::{user, vehicle};

    use super::{
        payment::{transaction, Transaction},
        period::Period,
        renter::Renter,
        Contract, Id, Number, Payment, ReturnDetails, Signatures, Status,
    };

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    fn contract(total_amount: Money) -> Contract {
        let created_at = at("2025-03-14T12:00:00Z").coerce();
        Contract {
            id: Id::new(),
            number: Number::compose(created_at, 1),
            vehicle_id: vehicle::Id::new(),
            owner_id: user::Id::new(),
            renter: Renter {
                name: "Jean Martin".parse().unwrap(),
                email: "jean@example.com".parse().unwrap(),
                phone: None,
                address: None,
            },
            period: Period::new(
                at("2025-03-15T10:00:00Z").coerce(),
                at("2025-03-22T10:00:00Z").coerce(),
                10_000,
                Some(500),
                Percent::new(Decimal::ONE_HUNDRED).unwrap(),
                money("50USD"),
                money("200USD"),
                total_amount,
            )
            .unwrap(),
            documents: Vec::new(),
            signatures: Signatures::default(),
            status: Status::Draft,
            payment: Payment::default(),
            return_details: None,
            notes: None,
            revision: super::Revision::default(),
            created_at,
        }
    }

    fn returned(final_mileage: vehicle::Mileage) -> ReturnDetails {
        ReturnDetails {
            returned_at: at("2025-03-22T09:00:00Z"),
            final_mileage,
            fuel: Percent::new(Decimal::from(50)).unwrap(),
            condition: super::return_details::Condition::Good,
            notes: None,
            additional_charges: Vec::new(),
        }
    }

    fn transaction(kind: transaction::Kind, amount: &str) -> Transaction {
        Transaction {
            kind,
            amount: money(amount),
            occurred_at: DateTime::now().coerce(),
            reference: "tx".into(),
        }
    }

    #[test]
    fn number_format() {
        let march = at("2025-03-14T12:00:00Z").coerce();
        assert_eq!(Number::compose(march, 3).to_string(), "LOC-2503-003");
        assert_eq!(Number::compose(march, 1).to_string(), "LOC-2503-001");

        let december = at("2024-12-01T00:00:00Z").coerce();
        assert_eq!(Number::compose(december, 12).to_string(), "LOC-2412-012");

        assert!(Number::new("LOC-2503-003").is_some());
        assert!(Number::new("LOC-253-003").is_none());
        assert!(Number::new("RENT-2503-003").is_none());
    }

    #[test]
    fn mileage_overage() {
        let mut c = contract(money("350USD"));
        assert_eq!(c.mileage_overage(), 0, "no return details yet");

        c.return_details = Some(returned(10_700));
        assert_eq!(c.mileage_overage(), 200);

        c.return_details = Some(returned(10_300));
        assert_eq!(c.mileage_overage(), 0);

        c.period.allowed_mileage = None;
        assert_eq!(c.mileage_overage(), 0, "no allowance agreed");
    }

    #[test]
    fn fully_paid() {
        let mut c = contract(money("200USD"));
        assert!(!c.is_fully_paid(), "no transactions at all");

        c.payment.transactions = vec![
            transaction(transaction::Kind::Payment, "100USD"),
            transaction(transaction::Kind::Payment, "100USD"),
        ];
        assert!(c.is_fully_paid());

        let mut c = contract(money("201USD"));
        c.payment.transactions = vec![
            transaction(transaction::Kind::Payment, "100USD"),
            transaction(transaction::Kind::Payment, "100USD"),
        ];
        assert!(!c.is_fully_paid());

        c.payment.transactions.push(transaction(
            transaction::Kind::Refund,
            "50USD",
        ));
        assert!(!c.is_fully_paid());
    }

    #[test]
    fn fingerprint_ignores_irrelevant_fields() {
        let a = contract(money("350USD"));
        let mut b = a.clone();
        b.id = Id::new();
        b.notes = Some("resubmitted".parse().unwrap());
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.renter.email = "other@example.com".parse().unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn status_gates() {
        use Status as S;

        for s in [S::Draft, S::Pending] {
            assert!(s.allows_update());
            assert!(s.allows_signing());
            assert!(s.allows_deletion());
            assert!(!s.allows_finalization());
        }

        assert!(!S::Active.allows_update());
        assert!(S::Active.allows_cancellation());
        assert!(S::Active.allows_finalization());
        assert!(!S::Active.allows_deletion());

        for s in [S::Completed, S::Cancelled, S::Terminated] {
            assert!(s.is_terminal());
            assert!(!s.allows_update());
            assert!(!s.allows_signing());
            assert!(!s.allows_cancellation());
            assert!(!s.allows_finalization());
        }
        assert!(S::Cancelled.allows_deletion());
        assert!(!S::Completed.allows_deletion());
        assert!(!S::Terminated.allows_deletion());

        assert!(!S::Draft.allows_cancellation(), "nothing to cancel yet");
    }
}

//! Contract [`Payment`] definitions.

use common::{define_kind, DateTime, DateTimeOf, Money};
use common::unit;
use derive_more::{AsRef, Display, FromStr};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment state of a contract.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Payment {
    /// [`Status`] of this [`Payment`].
    pub status: Status,

    /// Payment [`Method`] used, if known.
    pub method: Option<Method>,

    /// Indicator whether the deposit has been paid.
    pub deposit_paid: bool,

    /// [`DateTime`] when the deposit was returned, if it was.
    pub deposit_returned_at: Option<DateTime>,

    /// Recorded [`Transaction`]s, in order of occurrence.
    pub transactions: Vec<Transaction>,
}

impl Payment {
    /// Returns the signed balance of the recorded [`Transaction`]s: payments
    /// add, refunds subtract.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.transactions
            .iter()
            .map(|t| match t.kind {
                transaction::Kind::Payment => t.amount.amount,
                transaction::Kind::Refund => -t.amount.amount,
            })
            .sum()
    }
}

impl Default for Payment {
    fn default() -> Self {
        Self {
            status: Status::Pending,
            method: None,
            deposit_paid: false,
            deposit_returned_at: None,
            transactions: Vec::new(),
        }
    }
}

define_kind! {
    #[doc = "Status of a [`Payment`]."]
    enum Status {
        #[doc = "Nothing has been paid yet."]
        Pending = 1,

        #[doc = "Part of the total amount has been paid."]
        Partial = 2,

        #[doc = "The total amount has been paid."]
        Completed = 3,

        #[doc = "The payment has been refunded."]
        Refunded = 4,
    }
}

/// Payment method of a [`Payment`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str, String)]
pub struct Method(String);

impl Method {
    /// Creates a new [`Method`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `method` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(method: impl Into<String>) -> Self {
        Self(method.into())
    }

    /// Creates a new [`Method`] if the given `method` is valid.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Option<Self> {
        let method = method.into();
        Self::check(&method).then_some(Self(method))
    }

    /// Checks whether the given `method` is a valid [`Method`].
    fn check(method: impl AsRef<str>) -> bool {
        let method = method.as_ref();
        method.trim() == method && !method.is_empty() && method.len() <= 64
    }
}

impl FromStr for Method {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Method`")
    }
}

/// Single money movement recorded on a [`Payment`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Transaction {
    /// [`transaction::Kind`] of this [`Transaction`].
    pub kind: transaction::Kind,

    /// Amount moved by this [`Transaction`].
    pub amount: Money,

    /// [`DateTime`] when this [`Transaction`] occurred.
    pub occurred_at: OccurrenceDateTime,

    /// Billing-provider reference of this [`Transaction`].
    pub reference: String,
}

pub mod transaction {
    //! [`Transaction`]-related definitions.

    use common::define_kind;

    #[cfg(doc)]
    use super::Transaction;

    define_kind! {
        #[doc = "Kind of a [`Transaction`]."]
        enum Kind {
            #[doc = "Money paid towards the contract."]
            Payment = 1,

            #[doc = "Money returned to the payer."]
            Refund = 2,
        }
    }
}

/// [`DateTime`] when a [`Transaction`] occurred.
pub type OccurrenceDateTime = DateTimeOf<(Transaction, unit::Creation)>;

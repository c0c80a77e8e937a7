//! Contract [`Signature`] definitions.

use common::{define_kind, unit, DateTimeOf};
#[cfg(doc)]
use common::DateTime;
use derive_more::{AsRef, Display, FromStr};
use serde::{Deserialize, Serialize};

/// Signature of one party on a contract.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Signature {
    /// Captured signature image [`Blob`].
    pub data: Blob,

    /// [`DateTime`] when this [`Signature`] was recorded, taken from the
    /// server clock.
    pub signed_at: SigningDateTime,

    /// Network [`Origin`] the signing request came from.
    pub origin: Option<Origin>,
}

define_kind! {
    #[doc = "Party signing a contract."]
    enum Party {
        #[doc = "The vehicle owner."]
        Owner = 1,

        #[doc = "The renter."]
        Renter = 2,
    }
}

/// Per-party [`Signature`] slots of a contract.
///
/// One slot per [`Party`]: a party cannot sign twice, and a contract is
/// fully signed only once both slots are populated.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Signatures {
    /// [`Signature`] of the vehicle owner.
    pub owner: Option<Signature>,

    /// [`Signature`] of the renter.
    pub renter: Option<Signature>,
}

impl Signatures {
    /// Returns the [`Signature`] of the provided [`Party`], if recorded.
    #[must_use]
    pub fn of(&self, party: Party) -> Option<&Signature> {
        match party {
            Party::Owner => self.owner.as_ref(),
            Party::Renter => self.renter.as_ref(),
        }
    }

    /// Records the [`Signature`] of the provided [`Party`].
    ///
    /// Returns `false` (leaving the slot untouched) if the [`Party`] has
    /// signed already.
    pub fn record(&mut self, party: Party, signature: Signature) -> bool {
        let slot = match party {
            Party::Owner => &mut self.owner,
            Party::Renter => &mut self.renter,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(signature);
        true
    }

    /// Returns whether both parties have signed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.owner.is_some() && self.renter.is_some()
    }

    /// Returns the number of recorded [`Signature`]s.
    #[must_use]
    pub fn count(&self) -> usize {
        usize::from(self.owner.is_some()) + usize::from(self.renter.is_some())
    }
}

/// Captured signature image of a [`Signature`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str, String)]
pub struct Blob(String);

impl Blob {
    /// Creates a new [`Blob`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `data` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    /// Creates a new [`Blob`] if the given `data` is valid.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Option<Self> {
        let data = data.into();
        Self::check(&data).then_some(Self(data))
    }

    /// Checks whether the given `data` is a valid [`Blob`].
    fn check(data: impl AsRef<str>) -> bool {
        let data = data.as_ref();
        !data.is_empty() && data.len() <= 1_048_576
    }
}

impl FromStr for Blob {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Blob`")
    }
}

/// Network origin a [`Signature`] was recorded from.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str, String)]
pub struct Origin(String);

impl Origin {
    /// Creates a new [`Origin`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `origin` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    /// Creates a new [`Origin`] if the given `origin` is valid.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Option<Self> {
        let origin = origin.into();
        Self::check(&origin).then_some(Self(origin))
    }

    /// Checks whether the given `origin` is a valid [`Origin`].
    fn check(origin: impl AsRef<str>) -> bool {
        let origin = origin.as_ref();
        origin.trim() == origin && !origin.is_empty() && origin.len() <= 64
    }
}

impl FromStr for Origin {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Origin`")
    }
}

/// [`DateTime`] when a [`Signature`] was recorded.
pub type SigningDateTime = DateTimeOf<(Signature, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{Blob, Party, Signature, Signatures};

    fn signature() -> Signature {
        Signature {
            data: Blob::new("data:image/png;base64,AAAA").unwrap(),
            signed_at: DateTime::now().coerce(),
            origin: None,
        }
    }

    #[test]
    fn completes_only_with_both_parties() {
        let mut signatures = Signatures::default();
        assert!(!signatures.is_complete());

        assert!(signatures.record(Party::Owner, signature()));
        assert!(!signatures.is_complete());
        assert_eq!(signatures.count(), 1);

        assert!(signatures.record(Party::Renter, signature()));
        assert!(signatures.is_complete());
        assert_eq!(signatures.count(), 2);
    }

    #[test]
    fn rejects_second_signature_of_same_party() {
        let mut signatures = Signatures::default();
        assert!(signatures.record(Party::Owner, signature()));
        assert!(!signatures.record(Party::Owner, signature()));
        assert_eq!(signatures.count(), 1);
        assert!(!signatures.is_complete());
    }
}

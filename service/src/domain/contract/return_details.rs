//! [`ReturnDetails`] definitions.

use common::{define_kind, DateTime, Money, Percent};
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::Mileage;

/// Details recorded when a rented vehicle is returned.
///
/// Populated exactly once, when a contract is finalized.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReturnDetails {
    /// [`DateTime`] when the vehicle was actually returned.
    pub returned_at: DateTime,

    /// Odometer reading at return, in kilometers.
    pub final_mileage: Mileage,

    /// Fuel level at return.
    pub fuel: Percent,

    /// [`Condition`] of the returned vehicle.
    pub condition: Condition,

    /// Free-form notes about the return.
    pub notes: Option<String>,

    /// Additional [`Charge`]s applied at return.
    pub additional_charges: Vec<Charge>,
}

define_kind! {
    #[doc = "Condition of a returned vehicle."]
    enum Condition {
        #[doc = "No visible wear."]
        Perfect = 1,

        #[doc = "Normal wear."]
        Good = 2,

        #[doc = "Visible damage."]
        Damaged = 3,
    }
}

/// Additional charge applied at vehicle return.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Charge {
    /// What this [`Charge`] is for.
    pub description: String,

    /// Amount of this [`Charge`].
    pub amount: Money,
}

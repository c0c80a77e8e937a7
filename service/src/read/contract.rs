//! [`Contract`] read model definitions.

use derive_more::{From, Into};

#[cfg(doc)]
use crate::domain::Contract;

/// Wrapper around a [`Contract`] indicating that it was created inside the
/// deduplication window.
#[derive(Clone, Debug)]
pub struct Recent<T>(pub T);

/// Count of [`Contract`]s an owner created within some calendar month.
///
/// Drives the per-owner monthly numbering sequence.
#[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
pub struct MonthlyCount(i32);

pub mod list {
    //! [`Contract`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{contract, user};
    #[cfg(doc)]
    use crate::domain::Contract;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = contract::Id;

    /// Cursor pointing to a specific [`Contract`] in a list.
    pub type Cursor = contract::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// ID of the owning [`user::Id`] to restrict the list to.
        pub owner: Option<user::Id>,

        /// [`contract::Status`] to restrict the list to.
        pub status: Option<contract::Status>,

        /// [`contract::Number`] (or its part) to fuzzy search for.
        pub number: Option<contract::Number>,
    }

    /// Total count of [`Contract`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}

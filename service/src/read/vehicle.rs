//! [`Vehicle`] read model definitions.

#[cfg(doc)]
use crate::domain::Vehicle;

pub mod list {
    //! [`Vehicle`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{user, vehicle};
    #[cfg(doc)]
    use crate::domain::Vehicle;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = vehicle::Id;

    /// Cursor pointing to a specific [`Vehicle`] in a list.
    pub type Cursor = vehicle::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// ID of the owning [`user::Id`] to restrict the list to.
        pub owner: Option<user::Id>,

        /// [`vehicle::Registration`] (or its part) to fuzzy search for.
        pub registration: Option<vehicle::Registration>,
    }

    /// Total count of [`Vehicle`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}

//! [`Query`] collection related to the multiple [`Vehicle`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Vehicle, Query};

use super::DatabaseQuery;

/// Queries a list of [`Vehicle`]s.
pub type List = DatabaseQuery<
    By<read::vehicle::list::Page, read::vehicle::list::Selector>,
>;

/// Queries total count of [`Vehicle`]s.
pub type TotalCount = DatabaseQuery<By<read::vehicle::list::TotalCount, ()>>;

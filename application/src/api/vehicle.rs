//! [`Vehicle`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{api, api::scalar, define_error, AsError, Context, Error};

/// Vehicle available for rent.
#[derive(Clone, Debug, From)]
pub struct Vehicle(domain::Vehicle);

/// Vehicle available for rent.
#[graphql_object(context = Context)]
impl Vehicle {
    /// Unique identifier of the `Vehicle`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Make (manufacturer) of the `Vehicle`.
    #[must_use]
    pub fn make(&self) -> Make {
        self.0.make.clone().into()
    }

    /// Model of the `Vehicle`.
    #[must_use]
    pub fn model(&self) -> Model {
        self.0.model.clone().into()
    }

    /// Registration plate of the `Vehicle`.
    #[must_use]
    pub fn registration(&self) -> Registration {
        self.0.registration.clone().into()
    }

    /// Odometer reading of the `Vehicle`, in kilometers.
    #[must_use]
    pub fn mileage(&self) -> i32 {
        i32::try_from(self.0.mileage).unwrap_or(i32::MAX)
    }

    /// Identifier of the `Contract` currently occupying the `Vehicle`.
    #[must_use]
    pub fn current_rental(&self) -> Option<api::contract::Id> {
        self.0.current_rental.map(Into::into)
    }

    /// `User` owning the `Vehicle`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the owning `User` has been removed.
    pub async fn owner(&self, ctx: &Context) -> Result<api::User, Error> {
        ctx.service()
            .execute(query::user::ById::by(self.0.owner_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| OwnerError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// `DateTime` when this `Vehicle` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

define_error! {
    enum OwnerError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` owning the `Vehicle` does not exist"]
        NotExists,
    }
}

/// Unique identifier of a `Vehicle`.
#[derive(Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq)]
#[from(domain::vehicle::Id, Uuid)]
#[into(domain::vehicle::Id, Uuid)]
#[graphql(name = "VehicleId", transparent)]
pub struct Id(Uuid);

/// Make of a `Vehicle`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VehicleMake",
    with = scalar::Via::<domain::vehicle::Make>,
)]
pub struct Make(domain::vehicle::Make);

/// Model of a `Vehicle`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VehicleModel",
    with = scalar::Via::<domain::vehicle::Model>,
)]
pub struct Model(domain::vehicle::Model);

/// Registration plate of a `Vehicle`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VehicleRegistration",
    with = scalar::Via::<domain::vehicle::Registration>,
)]
pub struct Registration(domain::vehicle::Registration);

pub mod list {
    //! Definitions related to the [`Vehicle`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    #[cfg(doc)]
    use super::Vehicle;
    use crate::{api::scalar, define_error, AsError, Context, Error};

    /// Cursor for the `Vehicle` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(super::Id, read::vehicle::list::Cursor)]
    #[graphql(
        name = "VehicleListCursor",
        with = scalar::Via::<read::vehicle::list::Cursor>,
    )]
    pub struct Cursor(pub read::vehicle::list::Cursor);

    /// Edge in the [`Vehicle`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::vehicle::list::Edge);

    /// Edge in the `Vehicle` list.
    #[graphql_object(name = "VehicleListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `VehicleListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `VehicleListEdge`.
        ///
        /// # Errors
        ///
        /// Possible error codes:
        /// - `VEHICLE_NOT_EXISTS` - the `Vehicle` has been removed meanwhile.
        pub async fn node(
            &self,
            ctx: &Context,
        ) -> Result<super::Vehicle, Error> {
            ctx.service()
                .execute(query::vehicle::ById::by(self.0.node))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())?
                .ok_or_else(|| NodeError::NotExists.into())
                .map_err(ctx.error())
                .map(Into::into)
        }
    }

    define_error! {
        enum NodeError {
            #[code = "VEHICLE_NOT_EXISTS"]
            #[status = NOT_FOUND]
            #[message = "`Vehicle` does not exist"]
            NotExists,
        }
    }

    /// Connection of the [`Vehicle`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::vehicle::list::Connection);

    /// Connection of the `Vehicle` list.
    #[graphql_object(name = "VehicleListConnection", context = Context)]
    impl Connection {
        /// Edges in this `VehicleListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.0.page_info(),
                start_cursor: self.0.edges.first().map(|e| e.cursor.into()),
                end_cursor: self.0.edges.last().map(|e| e.cursor.into()),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::vehicle::list::PageInfo`].
        info: read::vehicle::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `VehicleListConnection` page.
    #[graphql_object(name = "VehicleListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> &Option<Cursor> {
            &self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> &Option<Cursor> {
            &self.end_cursor
        }

        /// Total `Vehicle`s count.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::vehicles::TotalCount::by(()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }
}

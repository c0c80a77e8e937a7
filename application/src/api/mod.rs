//! GraphQL API definitions.

pub mod contract;
mod mutation;
mod query;
pub mod scalar;
mod subscription;
pub mod user;
pub mod vehicle;

use crate::define_error;

pub use self::{
    contract::Contract, mutation::Mutation, query::Query,
    subscription::Subscription, user::User, vehicle::Vehicle,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Ambiguous pagination arguments"]
        Ambiguous,
    }
}

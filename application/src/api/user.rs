//! [`User`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{api::scalar, Context};

/// Platform user owning vehicles and rental contracts.
#[derive(Clone, Debug, From)]
pub struct User(domain::User);

/// Platform user owning vehicles and rental contracts.
#[graphql_object(context = Context)]
impl User {
    /// Unique identifier of the `User`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Name of the `User`.
    #[must_use]
    pub fn name(&self) -> Name {
        self.0.name.clone().into()
    }

    /// Email address of the `User`.
    #[must_use]
    pub fn email(&self) -> Email {
        self.0.email.clone().into()
    }

    /// Phone number of the `User`.
    #[must_use]
    pub fn phone(&self) -> Option<Phone> {
        self.0.phone.clone().map(Into::into)
    }

    /// `DateTime` when this `User` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `User`.
#[derive(Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq)]
#[from(domain::user::Id, Uuid)]
#[into(domain::user::Id, Uuid)]
#[graphql(name = "UserId", transparent)]
pub struct Id(Uuid);

/// Name of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserName",
    with = scalar::Via::<domain::user::Name>,
)]
pub struct Name(domain::user::Name);

/// Email address of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserEmail",
    with = scalar::Via::<domain::user::Email>,
)]
pub struct Email(domain::user::Email);

/// Phone number of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserPhone",
    with = scalar::Via::<domain::user::Phone>,
)]
pub struct Phone(domain::user::Phone);

/// Password of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserPassword",
    with = scalar::Via::<domain::user::Password>,
)]
pub struct Password(domain::user::Password);

pub mod session {
    //! `User` session definitions.

    use common::DateTime;
    use juniper::graphql_object;
    use service::command::create_user_session;

    use crate::Context;

    use super::User;

    /// Result of a session creation.
    #[derive(Clone, Debug)]
    pub struct CreateResult {
        /// Bearer token of the created session.
        token: String,

        /// `User` the session belongs to.
        user: User,

        /// `DateTime` when the session expires.
        expires_at: DateTime,
    }

    /// Result of a session creation.
    #[graphql_object(name = "SessionCreateResult", context = Context)]
    impl CreateResult {
        /// Bearer token authenticating the created session.
        #[must_use]
        pub fn token(&self) -> &str {
            &self.token
        }

        /// `User` the created session belongs to.
        #[must_use]
        pub fn user(&self) -> &User {
            &self.user
        }

        /// `DateTime` when the created session expires.
        #[must_use]
        pub fn expires_at(&self) -> DateTime {
            self.expires_at
        }
    }

    impl From<create_user_session::Output> for CreateResult {
        fn from(output: create_user_session::Output) -> Self {
            Self {
                token: output.token.to_string(),
                user: output.user.into(),
                expires_at: output.expires_at.coerce(),
            }
        }
    }
}

//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates a new `User` with the provided credentials and contact info.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `EMAIL_OCCUPIED` - provided `UserEmail` is occupied by another
    ///                      `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createUser",
            email = %email,
            name = %name,
            otel.name = Self::SPAN_NAME,
            phone = ?phone,
        ),
    )]
    pub async fn create_user(
        name: api::user::Name,
        email: api::user::Email,
        password: api::user::Password,
        phone: Option<api::user::Phone>,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let user = ctx
            .service()
            .execute(command::CreateUser {
                name: name.into(),
                email: email.into(),
                password: secrecy::SecretBox::init_with(move || {
                    password.into()
                }),
                phone: phone.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByUserId(user.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Creates a new `UserSession` with the provided credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `WRONG_CREDENTIALS` - provided credentials does not match any `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createUserSession",
            email = %email,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_user_session(
        email: api::user::Email,
        password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByCredentials {
                email: email.into(),
                password: secrecy::SecretBox::init_with(move || {
                    password.into()
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Creates a new `Vehicle` owned by the current `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createVehicle",
            make = %make,
            model = %model,
            otel.name = Self::SPAN_NAME,
            registration = %registration,
        ),
    )]
    pub async fn create_vehicle(
        make: api::vehicle::Make,
        model: api::vehicle::Model,
        registration: api::vehicle::Registration,
        mileage: i32,
        ctx: &Context,
    ) -> Result<api::Vehicle, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let mileage = u32::try_from(mileage)
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateVehicle {
                owner_id: my_id.into(),
                make: make.into(),
                model: model.into(),
                registration: registration.into(),
                mileage,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Contract` for the provided `Vehicle`.
    ///
    /// Repeating an identical submission within a minute returns the already
    /// created `Contract` instead of creating a duplicate.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `VEHICLE_NOT_EXISTS` - the `Vehicle` with the provided ID does not
    ///                          exist or is not owned by the current `User`;
    /// - `INVALID_PERIOD` - the provided rental period is invalid.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createContract",
            otel.name = Self::SPAN_NAME,
            vehicle_id = %vehicle_id,
        ),
    )]
    pub async fn create_contract(
        vehicle_id: api::vehicle::Id,
        renter: api::contract::RenterInput,
        period: api::contract::PeriodInput,
        documents: Option<Vec<api::contract::DocumentInput>>,
        notes: Option<api::contract::Notes>,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let period = period.try_into().map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateContract {
                vehicle_id: vehicle_id.into(),
                owner_id: my_id.into(),
                renter: renter.into(),
                period,
                documents: documents
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                notes: notes.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the `Contract` with the provided ID.
    ///
    /// Provided documents replace the existing documents of their kinds
    /// wholesale.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does
    ///                           not exist;
    /// - `CONTRACT_STATUS_FORBIDS` - the `Contract` status does not allow
    ///                               updates;
    /// - `INVALID_PERIOD` - the provided rental period is invalid.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateContract",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_contract(
        id: api::contract::Id,
        renter: Option<api::contract::RenterInput>,
        period: Option<api::contract::PeriodInput>,
        documents: Option<Vec<api::contract::DocumentInput>>,
        notes: Option<api::contract::Notes>,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let period = period
            .map(TryInto::try_into)
            .transpose()
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateContract {
                contract_id: id.into(),
                owner_id: my_id.into(),
                renter: renter.map(Into::into),
                period,
                documents: documents
                    .map(|ds| ds.into_iter().map(Into::into).collect()),
                notes: notes.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Records a signature of the provided party on the `Contract`.
    ///
    /// The `Contract` becomes active the moment both parties have signed.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does
    ///                           not exist;
    /// - `CONTRACT_STATUS_FORBIDS` - the `Contract` status does not allow
    ///                               signing;
    /// - `PARTY_SIGNED` - the provided party has signed already.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "signContract",
            id = %id,
            otel.name = Self::SPAN_NAME,
            party = ?party,
        ),
    )]
    pub async fn sign_contract(
        id: api::contract::Id,
        party: api::contract::Party,
        signature: api::contract::SignatureBlob,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let origin = ctx.client_ip().and_then(|ip| {
            service::domain::contract::signature::Origin::new(ip.to_string())
        });

        ctx.service()
            .execute(command::SignContract {
                contract_id: id.into(),
                owner_id: my_id.into(),
                party: party.into(),
                data: signature.into(),
                origin,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the `Contract` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does
    ///                           not exist;
    /// - `CONTRACT_STATUS_FORBIDS` - the `Contract` status does not allow
    ///                               cancellation.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelContract",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_contract(
        id: api::contract::Id,
        reason: api::contract::Notes,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CancelContract {
                contract_id: id.into(),
                owner_id: my_id.into(),
                reason: reason.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Finalizes the `Contract` with the provided ID upon the vehicle
    /// return.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does
    ///                           not exist;
    /// - `CONTRACT_STATUS_FORBIDS` - the `Contract` is not active;
    /// - `INVALID_RETURN_DETAILS` - the provided return details are invalid.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "finalizeContract",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn finalize_contract(
        id: api::contract::Id,
        return_details: api::contract::ReturnDetailsInput,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let return_details =
            return_details.try_into().map_err(ctx.error())?;

        ctx.service()
            .execute(command::FinalizeContract {
                contract_id: id.into(),
                owner_id: my_id.into(),
                return_details,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `Contract` with the provided ID, releasing its attached
    /// documents from storage.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does
    ///                           not exist;
    /// - `CONTRACT_STATUS_FORBIDS` - active and completed `Contract`s are
    ///                               not deletable.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteContract",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_contract(
        id: api::contract::Id,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::DeleteContract {
                contract_id: id.into(),
                owner_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`UserEmail` is occupied by another `User`"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_CREDENTIALS"]
                #[status = FORBIDDEN]
                #[message = "Provided credentials does not match any `User`"]
                WrongCredentials,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(Error::WrongCredentials.into())
            }
        }
    }
}

impl AsError for command::create_vehicle::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "USER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`User` with the provided ID does not exist"]
                UserNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(Error::UserNotExists.into()),
        }
    }
}

impl AsError for command::create_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "VEHICLE_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Vehicle` with the provided ID does not exist"]
                VehicleNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::VehicleNotExists(_) => Some(Error::VehicleNotExists.into()),
        }
    }
}

/// Helper building the common [`Error`] of a `Contract` status rejecting an
/// operation.
fn status_forbids_error(status: service::domain::contract::Status) -> Error {
    Error {
        code: "CONTRACT_STATUS_FORBIDS",
        status_code: http::StatusCode::BAD_REQUEST,
        message: format!(
            "`Contract` in `{status}` status does not allow the requested \
             operation",
        ),
        backtrace: None,
    }
}

define_error! {
    enum ContractError {
        #[code = "CONTRACT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Contract` with the provided ID does not exist"]
        NotExists,
    }
}

impl AsError for command::update_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::ContractNotExists(_) => Some(ContractError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::StatusForbids(status) => Some(status_forbids_error(*status)),
        }
    }
}

impl AsError for command::sign_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PARTY_SIGNED"]
                #[status = CONFLICT]
                #[message = "Provided party has signed the `Contract` \
                             already"]
                AlreadySigned,
            }
        }

        match self {
            Self::AlreadySigned(_) => Some(Error::AlreadySigned.into()),
            Self::ContractNotExists(_) => Some(ContractError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::StatusForbids(status) => Some(status_forbids_error(*status)),
        }
    }
}

impl AsError for command::cancel_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::ContractNotExists(_) => Some(ContractError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::StatusForbids(status) => Some(status_forbids_error(*status)),
        }
    }
}

impl AsError for command::finalize_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::ContractNotExists(_) | Self::VehicleNotExists(_) => {
                Some(ContractError::NotExists.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::StatusForbids(status) => Some(status_forbids_error(*status)),
        }
    }
}

impl AsError for command::delete_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::ContractNotExists(_) => Some(ContractError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::StatusForbids(status) => Some(status_forbids_error(*status)),
        }
    }
}

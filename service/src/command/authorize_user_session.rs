//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`].
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db, Fx> Command<AuthorizeUserSession> for Service<Db, Fx>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        drop(
            self.database()
                .execute(Select(By::<Option<User>, _>::new(session.user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::UserNotExists(session.user_id))
                .map_err(tracerr::wrap!())?,
        );

        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::Handler as _;
    use secrecy::SecretBox;

    use crate::command::tests::{
        sample_user, service, FakeExternal, InMemory,
    };

    use super::{
        super::CreateUserSession, AuthorizeUserSession, ExecutionError,
    };

    #[tokio::test]
    async fn roundtrips_issued_token() {
        let db = InMemory::default();
        let user = sample_user();
        db.put_user(user.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let issued = svc
            .execute(CreateUserSession::ByCredentials {
                email: user.email.clone(),
                password: SecretBox::init_with(|| {
                    "correct horse".parse().unwrap()
                }),
            })
            .await
            .unwrap();

        let session = svc
            .execute(AuthorizeUserSession {
                token: issued.token,
            })
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let db = InMemory::default();
        let svc = service(db.clone(), FakeExternal::default());

        // SAFETY: Deliberately malformed token for the negative case.
        #[expect(unsafe_code, reason = "deliberately malformed")]
        let token = unsafe {
            crate::domain::user::session::Token::new_unchecked(
                "not-a-jwt".to_owned(),
            )
        };
        let err = svc
            .execute(AuthorizeUserSession { token })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }
}

//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password, Phone};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    ///
    /// Doubles as the login credential.
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Phone`] of a new [`User`].
    pub phone: Option<user::Phone>,
}

impl<Db, Fx> Command<CreateUser> for Service<Db, Fx>
where
    Db: Database<
            Select<By<Option<User>, user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            phone,
        } = cmd;

        let u = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(email.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash: user::PasswordHash::new(password.expose_secret()),
            phone,
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use common::Handler as _;
    use secrecy::SecretBox;

    use crate::command::tests::{
        sample_user, service, FakeExternal, InMemory,
    };

    use super::{CreateUser, ExecutionError};

    fn command(email: &str) -> CreateUser {
        let email = email.to_owned();
        CreateUser {
            name: "Bob Renter".parse().unwrap(),
            email: email.parse().unwrap(),
            password: SecretBox::init_with(|| {
                "correct horse".parse().unwrap()
            }),
            phone: None,
        }
    }

    #[tokio::test]
    async fn creates_user() {
        let db = InMemory::default();
        let svc = service(db.clone(), FakeExternal::default());

        let user = svc.execute(command("bob@example.com")).await.unwrap();
        assert_eq!(user.email.to_string(), "bob@example.com");
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let db = InMemory::default();
        let existing = sample_user();
        db.put_user(existing.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let err = svc
            .execute(command(existing.email.as_ref()))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::EmailOccupied(_),
        ));
    }
}

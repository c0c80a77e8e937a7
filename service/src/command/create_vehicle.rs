//! [`Command`] for creating a new [`Vehicle`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user,
        vehicle::{self, Mileage},
        User, Vehicle,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Vehicle`].
#[derive(Clone, Debug)]
pub struct CreateVehicle {
    /// ID of the [`User`] owning the [`Vehicle`].
    pub owner_id: user::Id,

    /// [`vehicle::Make`] of a new [`Vehicle`].
    pub make: vehicle::Make,

    /// [`vehicle::Model`] of a new [`Vehicle`].
    pub model: vehicle::Model,

    /// [`vehicle::Registration`] plate of a new [`Vehicle`].
    pub registration: vehicle::Registration,

    /// Odometer reading of a new [`Vehicle`], in kilometers.
    pub mileage: Mileage,
}

impl<Db, Fx> Command<CreateVehicle> for Service<Db, Fx>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<Insert<Vehicle>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Vehicle;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateVehicle) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateVehicle {
            owner_id,
            make,
            model,
            registration,
            mileage,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(owner_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(owner_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let vehicle = Vehicle {
            id: vehicle::Id::new(),
            owner_id,
            make,
            model,
            registration,
            mileage,
            current_rental: None,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(vehicle.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(vehicle)
    }
}

/// Error of [`CreateVehicle`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::Handler as _;

    use crate::command::tests::{
        sample_user, service, FakeExternal, InMemory,
    };

    use super::CreateVehicle;

    #[tokio::test]
    async fn creates_unoccupied_vehicle() {
        let db = InMemory::default();
        let owner = sample_user();
        db.put_user(owner.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let vehicle = svc
            .execute(CreateVehicle {
                owner_id: owner.id,
                make: "Peugeot".parse().unwrap(),
                model: "208".parse().unwrap(),
                registration: "EF-456-GH".parse().unwrap(),
                mileage: 42_000,
            })
            .await
            .unwrap();

        assert_eq!(vehicle.owner_id, owner.id);
        assert_eq!(vehicle.current_rental, None);
        assert_eq!(db.vehicle(vehicle.id).unwrap().mileage, 42_000);
    }

    #[tokio::test]
    async fn rejects_unknown_owner() {
        let db = InMemory::default();
        let svc = service(db.clone(), FakeExternal::default());

        let result = svc
            .execute(CreateVehicle {
                owner_id: crate::domain::user::Id::new(),
                make: "Peugeot".parse().unwrap(),
                model: "208".parse().unwrap(),
                registration: "EF-456-GH".parse().unwrap(),
                mileage: 0,
            })
            .await;
        assert!(result.is_err());
    }
}

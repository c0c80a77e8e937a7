//! [`Command`] for creating a new [`Contract`].

use std::{fmt, ops::Range, time::Duration};

use common::{
    operations::{
        By, Commit, Insert, Lock, Notify, Render, Select, Transact,
        Transacted, Update,
    },
    DateTime, Handler,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        contract::{self, Document, Payment, Period, Renter, Signatures},
        user, vehicle, Contract, Vehicle,
    },
    infra::{database, notifier::Notification, Database},
    read::contract::{MonthlyCount, Recent},
    Service,
};

use super::Command;

/// Window inside which an identical submission is treated as a retry of an
/// already created [`Contract`].
const DEDUP_WINDOW: Duration = Duration::from_secs(60);

/// [`Command`] for creating a new [`Contract`].
#[derive(Clone, Debug)]
pub struct CreateContract {
    /// ID of the [`Vehicle`] to rent out.
    pub vehicle_id: vehicle::Id,

    /// ID of the [`User`] creating the [`Contract`].
    ///
    /// [`User`]: crate::domain::User
    pub owner_id: user::Id,

    /// [`Renter`] of the [`Vehicle`].
    pub renter: Renter,

    /// Rental [`Period`] and financial terms.
    pub period: Period,

    /// [`Document`]s attached upfront.
    pub documents: Vec<Document>,

    /// Initial [`contract::Notes`].
    pub notes: Option<contract::Notes>,
}

impl<Db, Fx> Command<CreateContract> for Service<Db, Fx>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Vehicle>, vehicle::Id>>,
            Ok = Option<Vehicle>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    Option<Recent<Contract>>,
                    (contract::Fingerprint, contract::CreationDateTime),
                >,
            >,
            Ok = Option<Recent<Contract>>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Vehicle, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    Option<Recent<Contract>>,
                    (contract::Fingerprint, contract::CreationDateTime),
                >,
            >,
            Ok = Option<Recent<Contract>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<MonthlyCount, (user::Id, Range<contract::CreationDateTime>)>,
            >,
            Ok = MonthlyCount,
            Err = Traced<database::Error>,
        > + Database<Insert<Contract>, Err = Traced<database::Error>>
        + Database<Update<Vehicle>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Fx: Handler<Render<Contract>, Ok = Vec<u8>, Err: fmt::Display>
        + Handler<Notify<Notification>, Ok = (), Err: fmt::Display>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateContract) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateContract {
            vehicle_id,
            owner_id,
            renter,
            period,
            documents,
            notes,
        } = cmd;

        let vehicle = self
            .database()
            .execute(Select(By::<Option<Vehicle>, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|v| v.owner_id == owner_id)
            .ok_or(E::VehicleNotExists(vehicle_id))
            .map_err(tracerr::wrap!())?;

        let now: contract::CreationDateTime = DateTime::now().coerce();
        let fingerprint = contract::Fingerprint::new(
            owner_id,
            vehicle_id,
            period.starts_at,
            period.ends_at,
            &renter.email,
        );
        let cutoff = now - DEDUP_WINDOW;

        // Idempotent retry guard: an identical submission inside the window
        // returns the already created `Contract` unchanged.
        if let Some(Recent(existing)) = self
            .database()
            .execute(Select(By::<Option<Recent<Contract>>, _>::new((
                fingerprint,
                cutoff,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            return Ok(existing);
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Vehicle`.
        tx.execute(Lock(By::new(vehicle.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // Concurrent duplicate submissions race up to this point.
        if let Some(Recent(existing)) = tx
            .execute(Select(By::<Option<Recent<Contract>>, _>::new((
                fingerprint,
                cutoff,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            return Ok(existing);
        }

        let count: i32 = tx
            .execute(Select(By::<MonthlyCount, _>::new((
                owner_id,
                now.calendar_month(),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into();
        let sequence = u32::try_from(count).expect("non-negative count") + 1;

        let contract = Contract {
            id: contract::Id::new(),
            number: contract::Number::compose(now, sequence),
            vehicle_id: vehicle.id,
            owner_id,
            renter,
            period,
            documents,
            signatures: Signatures::default(),
            status: contract::Status::Draft,
            payment: Payment::default(),
            return_details: None,
            notes,
            revision: contract::Revision::default(),
            created_at: now,
        };
        tx.execute(Insert(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut vehicle = vehicle;
        vehicle.current_rental = Some(contract.id);
        tx.execute(Update(vehicle))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // The creation is effective once committed: rendering and delivery
        // failures are logged only.
        let attachment = match self
            .external()
            .execute(Render(contract.clone()))
            .await
        {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("failed to render `Contract` PDF: {e}");
                None
            }
        };
        if let Err(e) = self
            .external()
            .execute(Notify(Notification::Created {
                contract: contract.clone(),
                attachment,
            }))
            .await
        {
            log::warn!("failed to notify about `Contract` creation: {e}");
        }

        Ok(contract)
    }
}

/// Error of [`CreateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Vehicle`] with the provided ID does not exist or is not owned by
    /// the caller.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use common::Handler as _;

    use crate::{
        command::tests::{
            sample_period, sample_renter, sample_user, sample_vehicle,
            service, FakeExternal, InMemory,
        },
        domain::contract::Status,
    };

    use super::CreateContract;

    fn command(
        vehicle_id: crate::domain::vehicle::Id,
        owner_id: crate::domain::user::Id,
    ) -> CreateContract {
        CreateContract {
            vehicle_id,
            owner_id,
            renter: sample_renter(),
            period: sample_period(),
            documents: Vec::new(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn creates_draft_and_links_vehicle() {
        let db = InMemory::default();
        let fx = FakeExternal::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle.clone());
        let svc = service(db.clone(), fx.clone());

        let contract = svc
            .execute(command(vehicle.id, owner.id))
            .await
            .unwrap();

        assert_eq!(contract.status, Status::Draft);
        assert!(contract.number.to_string().ends_with("-001"));
        assert_eq!(
            db.vehicle(vehicle.id).unwrap().current_rental,
            Some(contract.id),
        );
        assert_eq!(
            fx.notifications.lock().unwrap().as_slice(),
            &["created"],
        );
    }

    #[tokio::test]
    async fn deduplicates_repeated_submission() {
        let db = InMemory::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let cmd = command(vehicle.id, owner.id);
        let first = svc.execute(cmd.clone()).await.unwrap();
        let second = svc.execute(cmd).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.number, second.number);
        assert_eq!(db.contracts_count(), 1);
    }

    #[tokio::test]
    async fn numbers_sequentially_per_owner_within_month() {
        let db = InMemory::default();
        let owner = sample_user();
        let other = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let other_vehicle = sample_vehicle(other.id);
        db.put_user(owner.clone());
        db.put_user(other.clone());
        db.put_vehicle(vehicle.clone());
        db.put_vehicle(other_vehicle.clone());
        for i in 0..2 {
            let mut seeded = crate::command::tests::sample_contract(
                owner.id,
                vehicle.id,
                Status::Cancelled,
            );
            seeded.renter.email =
                format!("earlier{i}@example.com").parse().unwrap();
            db.put_contract(seeded);
        }
        let svc = service(db.clone(), FakeExternal::default());

        let third = svc
            .execute(command(vehicle.id, owner.id))
            .await
            .unwrap();
        assert!(third.number.to_string().ends_with("-003"));

        let independent = svc
            .execute(command(other_vehicle.id, other.id))
            .await
            .unwrap();
        assert!(independent.number.to_string().ends_with("-001"));
    }

    #[tokio::test]
    async fn rejects_foreign_vehicle() {
        let db = InMemory::default();
        let owner = sample_user();
        let stranger = sample_user();
        let vehicle = sample_vehicle(owner.id);
        db.put_user(owner.clone());
        db.put_user(stranger.clone());
        db.put_vehicle(vehicle.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let result = svc.execute(command(vehicle.id, stranger.id)).await;
        assert!(result.is_err());
        assert_eq!(db.contracts_count(), 0);
    }
}

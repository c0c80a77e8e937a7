//! [`Command`] for cancelling a [`Contract`].

use std::fmt;

use common::{
    operations::{
        By, Commit, Lock, Notify, Select, Transact, Transacted, Update,
    },
    Handler,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{contract, user, vehicle, Contract, Vehicle},
    infra::{database, notifier::Notification, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Contract`].
#[derive(Clone, Debug)]
pub struct CancelContract {
    /// ID of the [`Contract`] to cancel.
    pub contract_id: contract::Id,

    /// ID of the [`User`] cancelling the [`Contract`].
    ///
    /// [`User`]: crate::domain::User
    pub owner_id: user::Id,

    /// Reason of the cancellation.
    ///
    /// Overwrites the [`Contract`] notes.
    pub reason: contract::Notes,
}

impl<Db, Fx> Command<CancelContract> for Service<Db, Fx>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Vehicle, vehicle::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Vehicle>, vehicle::Id>>,
            Ok = Option<Vehicle>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Err = Traced<database::Error>>
        + Database<Update<Vehicle>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Fx: Handler<Notify<Notification>, Ok = (), Err: fmt::Display>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CancelContract) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelContract {
            contract_id,
            owner_id,
            reason,
        } = cmd;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.allows_cancellation() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Vehicle` and `Contract`.
        tx.execute(Lock(By::<Vehicle, _>::new(contract.vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Contract, _>::new(contract.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.allows_cancellation() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        contract.status = contract::Status::Cancelled;
        contract.notes = Some(reason);
        contract.revision = contract.revision.next();
        tx.execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // The `Vehicle` is freed the instant the `Contract` leaves the
        // occupying statuses.
        let vehicle = tx
            .execute(Select(By::<Option<Vehicle>, _>::new(contract.vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(mut vehicle) = vehicle {
            if vehicle.current_rental == Some(contract.id) {
                vehicle.current_rental = None;
                tx.execute(Update(vehicle))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // The cancellation is effective once committed: a delivery failure
        // is logged only.
        if let Err(e) = self
            .external()
            .execute(Notify(Notification::Cancelled(contract.clone())))
            .await
        {
            log::warn!("failed to notify about `Contract` cancellation: {e}");
        }

        Ok(contract)
    }
}

/// Error of [`CancelContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] status does not allow cancellation.
    #[display("`Contract` in `{_0}` status cannot be cancelled")]
    StatusForbids(#[error(not(source))] contract::Status),
}

#[cfg(test)]
mod spec {
    use common::Handler as _;

    use crate::{
        command::tests::{
            sample_contract, sample_user, sample_vehicle, service,
            FakeExternal, InMemory,
        },
        domain::contract::Status,
    };

    use super::{CancelContract, ExecutionError};

    #[tokio::test]
    async fn cancels_and_frees_vehicle() {
        let db = InMemory::default();
        let fx = FakeExternal::default();
        let owner = sample_user();
        let mut vehicle = sample_vehicle(owner.id);
        let contract = sample_contract(owner.id, vehicle.id, Status::Active);
        vehicle.current_rental = Some(contract.id);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle.clone());
        db.put_contract(contract.clone());
        let svc = service(db.clone(), fx.clone());

        let cancelled = svc
            .execute(CancelContract {
                contract_id: contract.id,
                owner_id: owner.id,
                reason: "renter never showed up".parse().unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, Status::Cancelled);
        assert_eq!(
            cancelled.notes.as_ref().unwrap().to_string(),
            "renter never showed up",
        );
        assert_eq!(db.vehicle(vehicle.id).unwrap().current_rental, None);
        assert_eq!(
            fx.notifications.lock().unwrap().as_slice(),
            &["cancelled"],
        );
    }

    #[tokio::test]
    async fn overwrites_previous_notes() {
        let db = InMemory::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let mut contract =
            sample_contract(owner.id, vehicle.id, Status::Pending);
        contract.notes = Some("some earlier remark".parse().unwrap());
        db.put_user(owner.clone());
        db.put_vehicle(vehicle);
        db.put_contract(contract.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let cancelled = svc
            .execute(CancelContract {
                contract_id: contract.id,
                owner_id: owner.id,
                reason: "dates moved".parse().unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(
            cancelled.notes.as_ref().unwrap().to_string(),
            "dates moved",
        );
    }

    #[tokio::test]
    async fn rejects_disallowed_statuses() {
        for status in [
            Status::Draft,
            Status::Completed,
            Status::Cancelled,
            Status::Terminated,
        ] {
            let db = InMemory::default();
            let owner = sample_user();
            let vehicle = sample_vehicle(owner.id);
            let contract = sample_contract(owner.id, vehicle.id, status);
            db.put_user(owner.clone());
            db.put_vehicle(vehicle);
            db.put_contract(contract.clone());
            let svc = service(db.clone(), FakeExternal::default());

            let err = svc
                .execute(CancelContract {
                    contract_id: contract.id,
                    owner_id: owner.id,
                    reason: "nope".parse().unwrap(),
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::StatusForbids(s) if *s == status,
            ));
            assert_eq!(db.contract(contract.id).unwrap().status, status);
        }
    }
}

//! [`Command`] for finalizing a [`Contract`].

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
    domain::{
        contract::{self, ReturnDetails},
        user, vehicle, Contract, Vehicle,
    },
    infra::{database, notifier::Notification, Database},
    Service,
};

use super::Command;

/// [`Command`] for finalizing a [`Contract`] upon the vehicle return.
#[derive(Clone, Debug)]
pub struct FinalizeContract {
    /// ID of the [`Contract`] to finalize.
    pub contract_id: contract::Id,

    /// ID of the [`User`] finalizing the [`Contract`].
    ///
    /// [`User`]: crate::domain::User
    pub owner_id: user::Id,

    /// [`ReturnDetails`] recorded at the vehicle return.
    pub return_details: ReturnDetails,
}

impl<Db, Fx> Command<FinalizeContract> for Service<Db, Fx>
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

    async fn execute(
        &self,
        cmd: FinalizeContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let FinalizeContract {
            contract_id,
            owner_id,
            return_details,
        } = cmd;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.allows_finalization() {
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
        if !contract.status.allows_finalization() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        let mut vehicle = tx
            .execute(Select(By::<Option<Vehicle>, _>::new(contract.vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::VehicleNotExists(contract.vehicle_id))
            .map_err(tracerr::wrap!())?;

        contract.status = contract::Status::Completed;
        contract.return_details = Some(return_details.clone());
        contract.revision = contract.revision.next();
        tx.execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // The odometer reading moves onto the `Vehicle`, and the `Vehicle`
        // is freed.
        vehicle.mileage = return_details.final_mileage;
        if vehicle.current_rental == Some(contract.id) {
            vehicle.current_rental = None;
        }
        tx.execute(Update(vehicle))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // The completion is effective once committed: a delivery failure is
        // logged only.
        if let Err(e) = self
            .external()
            .execute(Notify(Notification::Completed(contract.clone())))
            .await
        {
            log::warn!("failed to notify about `Contract` completion: {e}");
        }

        Ok(contract)
    }
}

/// Error of [`FinalizeContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] status does not allow finalization.
    #[display("`Contract` in `{_0}` status cannot be finalized")]
    StatusForbids(#[error(not(source))] contract::Status),

    /// [`Vehicle`] related to the [`Contract`] does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Handler as _, Percent};
    use rust_decimal::Decimal;

    use crate::{
        command::tests::{
            sample_contract, sample_user, sample_vehicle, service,
            FakeExternal, InMemory,
        },
        domain::contract::{
            return_details::Condition, ReturnDetails, Status,
        },
    };

    use super::{ExecutionError, FinalizeContract};

    fn returned(final_mileage: u32) -> ReturnDetails {
        ReturnDetails {
            returned_at: DateTime::now(),
            final_mileage,
            fuel: Percent::new(Decimal::from(40)).unwrap(),
            condition: Condition::Good,
            notes: None,
            additional_charges: Vec::new(),
        }
    }

    #[tokio::test]
    async fn completes_and_updates_vehicle() {
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

        let completed = svc
            .execute(FinalizeContract {
                contract_id: contract.id,
                owner_id: owner.id,
                return_details: returned(10_700),
            })
            .await
            .unwrap();

        assert_eq!(completed.status, Status::Completed);
        assert_eq!(
            completed.return_details.as_ref().unwrap().final_mileage,
            10_700,
        );
        assert_eq!(completed.mileage_overage(), 200);

        let vehicle = db.vehicle(vehicle.id).unwrap();
        assert_eq!(vehicle.mileage, 10_700);
        assert_eq!(vehicle.current_rental, None);
        assert_eq!(
            fx.notifications.lock().unwrap().as_slice(),
            &["completed"],
        );
    }

    #[tokio::test]
    async fn rejects_non_active_statuses() {
        for status in [
            Status::Draft,
            Status::Pending,
            Status::Completed,
            Status::Cancelled,
            Status::Terminated,
        ] {
            let db = InMemory::default();
            let owner = sample_user();
            let vehicle = sample_vehicle(owner.id);
            let contract = sample_contract(owner.id, vehicle.id, status);
            db.put_user(owner.clone());
            db.put_vehicle(vehicle.clone());
            db.put_contract(contract.clone());
            let svc = service(db.clone(), FakeExternal::default());

            let err = svc
                .execute(FinalizeContract {
                    contract_id: contract.id,
                    owner_id: owner.id,
                    return_details: returned(10_700),
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::StatusForbids(s) if *s == status,
            ));
            assert!(db
                .contract(contract.id)
                .unwrap()
                .return_details
                .is_none());
            assert_eq!(db.vehicle(vehicle.id).unwrap().mileage, 10_000);
        }
    }
}

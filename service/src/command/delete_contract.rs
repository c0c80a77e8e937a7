//! [`Command`] for deleting a [`Contract`].

use std::fmt;

use common::{
    operations::{
        By, Commit, Delete, Lock, Release, Select, Transact, Transacted,
        Update,
    },
    Handler,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        contract::{self, document},
        user, vehicle, Contract, Vehicle,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Contract`].
///
/// Only contracts that never became active (or were cancelled) are
/// deletable.
#[derive(Clone, Copy, Debug)]
pub struct DeleteContract {
    /// ID of the [`Contract`] to delete.
    pub contract_id: contract::Id,

    /// ID of the [`User`] deleting the [`Contract`].
    ///
    /// [`User`]: crate::domain::User
    pub owner_id: user::Id,
}

impl<Db, Fx> Command<DeleteContract> for Service<Db, Fx>
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
        > + Database<
            Delete<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<Update<Vehicle>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Fx: Handler<Release<document::Reference>, Ok = bool, Err: fmt::Display>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteContract) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteContract {
            contract_id,
            owner_id,
        } = cmd;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.allows_deletion() {
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

        let contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.allows_deletion() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        tx.execute(Delete(By::<Contract, _>::new(contract.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

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

        // The deletion is effective once committed: attached files are
        // released best-effort.
        for doc in &contract.documents {
            if let Err(e) = self
                .external()
                .execute(Release(doc.reference.clone()))
                .await
            {
                log::warn!(
                    reference = %doc.reference,
                    "failed to release `Contract` document: {e}",
                );
            }
        }

        Ok(contract)
    }
}

/// Error of [`DeleteContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] status does not allow deletion.
    #[display("`Contract` in `{_0}` status cannot be deleted")]
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
        domain::contract::{document, Document, Status},
    };

    use super::{DeleteContract, ExecutionError};

    #[tokio::test]
    async fn deletes_and_releases_documents() {
        let db = InMemory::default();
        let fx = FakeExternal::default();
        let owner = sample_user();
        let mut vehicle = sample_vehicle(owner.id);
        let mut contract =
            sample_contract(owner.id, vehicle.id, Status::Pending);
        contract.documents = vec![Document {
            kind: document::Kind::IdCard,
            url: "https://files.example.com/id.png".parse().unwrap(),
            reference: "contracts/id.png".parse().unwrap(),
            description: None,
        }];
        vehicle.current_rental = Some(contract.id);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle.clone());
        db.put_contract(contract.clone());
        let svc = service(db.clone(), fx.clone());

        let deleted = svc
            .execute(DeleteContract {
                contract_id: contract.id,
                owner_id: owner.id,
            })
            .await
            .unwrap();

        assert_eq!(deleted.id, contract.id);
        assert!(db.contract(contract.id).is_none());
        assert_eq!(db.vehicle(vehicle.id).unwrap().current_rental, None);
        assert_eq!(
            fx.released
                .lock()
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            ["contracts/id.png"],
        );
    }

    #[tokio::test]
    async fn rejects_active_and_completed() {
        for status in [Status::Active, Status::Completed, Status::Terminated]
        {
            let db = InMemory::default();
            let owner = sample_user();
            let vehicle = sample_vehicle(owner.id);
            let contract = sample_contract(owner.id, vehicle.id, status);
            db.put_user(owner.clone());
            db.put_vehicle(vehicle);
            db.put_contract(contract.clone());
            let svc = service(db.clone(), FakeExternal::default());

            let err = svc
                .execute(DeleteContract {
                    contract_id: contract.id,
                    owner_id: owner.id,
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::StatusForbids(s) if *s == status,
            ));
            assert!(
                db.contract(contract.id).is_some(),
                "contract must be left untouched",
            );
        }
    }

    #[tokio::test]
    async fn deletes_cancelled_contracts() {
        let db = InMemory::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let contract =
            sample_contract(owner.id, vehicle.id, Status::Cancelled);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle);
        db.put_contract(contract.clone());
        let svc = service(db.clone(), FakeExternal::default());

        _ = svc
            .execute(DeleteContract {
                contract_id: contract.id,
                owner_id: owner.id,
            })
            .await
            .unwrap();
        assert!(db.contract(contract.id).is_none());
    }
}

//! [`Command`] for recording a signature on a [`Contract`].

use std::fmt;

use common::{
    operations::{
        By, Commit, Lock, Notify, Select, Transact, Transacted, Update,
    },
    DateTime, Handler,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        contract::{self, signature, Signature},
        user, Contract,
    },
    infra::{database, notifier::Notification, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a signature on a [`Contract`].
///
/// The second party's signature activates the [`Contract`].
#[derive(Clone, Debug)]
pub struct SignContract {
    /// ID of the [`Contract`] to sign.
    pub contract_id: contract::Id,

    /// ID of the [`User`] submitting the signature.
    ///
    /// [`User`]: crate::domain::User
    pub owner_id: user::Id,

    /// [`signature::Party`] the signature belongs to.
    pub party: signature::Party,

    /// Captured signature image.
    pub data: signature::Blob,

    /// Network origin the signing request came from.
    pub origin: Option<signature::Origin>,
}

impl<Db, Fx> Command<SignContract> for Service<Db, Fx>
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
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Fx: Handler<Notify<Notification>, Ok = (), Err: fmt::Display>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignContract) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignContract {
            contract_id,
            owner_id,
            party,
            data,
            origin,
        } = cmd;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.allows_signing() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent signings of the same `Contract`.
        tx.execute(Lock(By::new(contract.id)))
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
        if !contract.status.allows_signing() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        let recorded = contract.signatures.record(
            party,
            Signature {
                data,
                signed_at: DateTime::now().coerce(),
                origin,
            },
        );
        if !recorded {
            return Err(tracerr::new!(E::AlreadySigned(party)));
        }

        let activated = contract.signatures.is_complete();
        if activated {
            contract.status = contract::Status::Active;
        } else if contract.status == contract::Status::Draft {
            contract.status = contract::Status::Pending;
        }

        contract.revision = contract.revision.next();
        tx.execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if activated {
            // The activation is effective once committed: a delivery failure
            // is logged only.
            if let Err(e) = self
                .external()
                .execute(Notify(Notification::Activated(contract.clone())))
                .await
            {
                log::warn!("failed to notify about `Contract` activation: {e}");
            }
        }

        Ok(contract)
    }
}

/// Error of [`SignContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// The provided [`signature::Party`] has signed already.
    #[display("`{_0}` party has signed already")]
    AlreadySigned(#[error(not(source))] signature::Party),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] status does not allow signing.
    #[display("`Contract` in `{_0}` status cannot be signed")]
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
        domain::contract::{signature::Party, Status},
    };

    use super::{ExecutionError, SignContract};

    fn command(
        contract_id: crate::domain::contract::Id,
        owner_id: crate::domain::user::Id,
        party: Party,
    ) -> SignContract {
        SignContract {
            contract_id,
            owner_id,
            party,
            data: "data:image/png;base64,AAAA".parse().unwrap(),
            origin: Some("198.51.100.7".parse().unwrap()),
        }
    }

    #[tokio::test]
    async fn activates_exactly_on_second_party() {
        let db = InMemory::default();
        let fx = FakeExternal::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let contract = sample_contract(owner.id, vehicle.id, Status::Draft);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle);
        db.put_contract(contract.clone());
        let svc = service(db.clone(), fx.clone());

        let signed = svc
            .execute(command(contract.id, owner.id, Party::Owner))
            .await
            .unwrap();
        assert_eq!(signed.status, Status::Pending, "one signature only");
        assert!(fx.notifications.lock().unwrap().is_empty());

        let signed = svc
            .execute(command(contract.id, owner.id, Party::Renter))
            .await
            .unwrap();
        assert_eq!(signed.status, Status::Active);
        assert_eq!(signed.signatures.count(), 2);
        assert_eq!(
            fx.notifications.lock().unwrap().as_slice(),
            &["activated"],
        );
    }

    #[tokio::test]
    async fn rejects_double_signature_of_one_party() {
        let db = InMemory::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let contract = sample_contract(owner.id, vehicle.id, Status::Draft);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle);
        db.put_contract(contract.clone());
        let svc = service(db.clone(), FakeExternal::default());

        _ = svc
            .execute(command(contract.id, owner.id, Party::Owner))
            .await
            .unwrap();
        let err = svc
            .execute(command(contract.id, owner.id, Party::Owner))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AlreadySigned(Party::Owner),
        ));
        let stored = db.contract(contract.id).unwrap();
        assert_eq!(stored.signatures.count(), 1);
        assert_eq!(stored.status, Status::Pending, "never activated");
    }

    #[tokio::test]
    async fn rejects_terminal_statuses() {
        for status in
            [Status::Completed, Status::Cancelled, Status::Terminated]
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
                .execute(command(contract.id, owner.id, Party::Owner))
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::StatusForbids(s) if *s == status,
            ));
            assert_eq!(
                db.contract(contract.id).unwrap().signatures.count(),
                0,
            );
        }
    }
}

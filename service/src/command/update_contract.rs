//! [`Command`] for updating a [`Contract`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        contract::{self, document, Document, Period, Renter},
        user, Contract,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`Contract`].
///
/// Only provided fields are touched. Provided [`Document`]s replace the
/// existing documents of their kinds wholesale.
#[derive(Clone, Debug)]
pub struct UpdateContract {
    /// ID of the [`Contract`] to update.
    pub contract_id: contract::Id,

    /// ID of the [`User`] performing the update.
    ///
    /// [`User`]: crate::domain::User
    pub owner_id: user::Id,

    /// New [`Renter`] details.
    pub renter: Option<Renter>,

    /// New rental [`Period`].
    pub period: Option<Period>,

    /// [`Document`]s replacing the existing ones of the same kinds.
    pub documents: Option<Vec<Document>>,

    /// New [`contract::Notes`].
    pub notes: Option<contract::Notes>,
}

impl<Db, Fx> Command<UpdateContract> for Service<Db, Fx>
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
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateContract) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateContract {
            contract_id,
            owner_id,
            renter,
            period,
            documents,
            notes,
        } = cmd;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.allows_update() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent modifications of the same `Contract`.
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
        if !contract.status.allows_update() {
            return Err(tracerr::new!(E::StatusForbids(contract.status)));
        }

        if let Some(renter) = renter {
            contract.renter = renter;
        }
        if let Some(period) = period {
            contract.period = period;
        }
        if let Some(documents) = documents {
            for kind in [
                document::Kind::IdCard,
                document::Kind::DrivingLicense,
                document::Kind::VehiclePhotos,
                document::Kind::Other,
            ] {
                let group = documents
                    .iter()
                    .filter(|d| d.kind == kind)
                    .cloned()
                    .collect::<Vec<_>>();
                if !group.is_empty() {
                    contract.replace_documents(kind, group);
                }
            }
        }
        if let Some(notes) = notes {
            contract.notes = Some(notes);
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

        Ok(contract)
    }
}

/// Error of [`UpdateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] status does not allow updates.
    #[display("`Contract` in `{_0}` status cannot be updated")]
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

    use super::{ExecutionError, UpdateContract};

    fn document(kind: document::Kind, marker: &str) -> Document {
        Document {
            kind,
            url: format!("https://files.example.com/{marker}")
                .parse()
                .unwrap(),
            reference: marker.parse().unwrap(),
            description: None,
        }
    }

    fn command(
        contract_id: crate::domain::contract::Id,
        owner_id: crate::domain::user::Id,
    ) -> UpdateContract {
        UpdateContract {
            contract_id,
            owner_id,
            renter: None,
            period: None,
            documents: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn replaces_documents_of_kind_wholesale() {
        let db = InMemory::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let mut contract =
            sample_contract(owner.id, vehicle.id, Status::Draft);
        contract.documents = vec![
            document(document::Kind::IdCard, "id-old-1"),
            document(document::Kind::IdCard, "id-old-2"),
            document(document::Kind::Other, "other-kept"),
        ];
        db.put_user(owner.clone());
        db.put_vehicle(vehicle);
        db.put_contract(contract.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let updated = svc
            .execute(UpdateContract {
                documents: Some(vec![document(
                    document::Kind::IdCard,
                    "id-new",
                )]),
                ..command(contract.id, owner.id)
            })
            .await
            .unwrap();

        let references = updated
            .documents
            .iter()
            .map(|d| d.reference.to_string())
            .collect::<Vec<_>>();
        assert_eq!(references, ["other-kept", "id-new"]);
        assert_eq!(
            db.contract(contract.id).unwrap().documents.len(),
            2,
        );
    }

    #[tokio::test]
    async fn bumps_revision() {
        let db = InMemory::default();
        let owner = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let contract = sample_contract(owner.id, vehicle.id, Status::Pending);
        db.put_user(owner.clone());
        db.put_vehicle(vehicle);
        db.put_contract(contract.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let updated = svc
            .execute(UpdateContract {
                notes: Some("checked".parse().unwrap()),
                ..command(contract.id, owner.id)
            })
            .await
            .unwrap();

        assert_eq!(updated.revision, contract.revision.next());
        assert_eq!(updated.status, Status::Pending, "status is untouched");
    }

    #[tokio::test]
    async fn rejects_disallowed_statuses() {
        for status in [
            Status::Active,
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
                .execute(UpdateContract {
                    notes: Some("nope".parse().unwrap()),
                    ..command(contract.id, owner.id)
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::StatusForbids(s) if *s == status,
            ));
            assert!(
                db.contract(contract.id).unwrap().notes.is_none(),
                "contract must be left untouched",
            );
        }
    }

    #[tokio::test]
    async fn hides_foreign_contracts() {
        let db = InMemory::default();
        let owner = sample_user();
        let stranger = sample_user();
        let vehicle = sample_vehicle(owner.id);
        let contract = sample_contract(owner.id, vehicle.id, Status::Draft);
        db.put_user(owner.clone());
        db.put_user(stranger.clone());
        db.put_vehicle(vehicle);
        db.put_contract(contract.clone());
        let svc = service(db.clone(), FakeExternal::default());

        let err = svc
            .execute(command(contract.id, stranger.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotExists(_),
        ));
    }
}

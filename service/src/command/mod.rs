//! [`Command`] definition.

pub mod authorize_user_session;
pub mod cancel_contract;
pub mod create_contract;
pub mod create_user;
pub mod create_user_session;
pub mod create_vehicle;
pub mod delete_contract;
pub mod finalize_contract;
pub mod sign_contract;
pub mod update_contract;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    cancel_contract::CancelContract, create_contract::CreateContract,
    create_user::CreateUser, create_user_session::CreateUserSession,
    create_vehicle::CreateVehicle, delete_contract::DeleteContract,
    finalize_contract::FinalizeContract, sign_contract::SignContract,
    update_contract::UpdateContract,
};

#[cfg(test)]
pub(crate) mod tests {
    //! In-memory doubles backing [`Command`] tests.

    use std::{
        collections::HashMap,
        convert::Infallible,
        ops::Range,
        str::FromStr as _,
        sync::{Arc, Mutex},
    };

    use common::{
        operations::{
            By, Commit, Delete, Insert, Lock, Notify, Release, Render,
            Select, Transact, Update,
        },
        DateTime, Handler, Money, Percent,
    };
    use rust_decimal::Decimal;
    use tracerr::Traced;

    use crate::{
        domain::{
            contract::{self, document, Period, Renter, Signatures},
            user, vehicle, Contract, User, Vehicle,
        },
        infra::{database, notifier::Notification},
        read::contract::{MonthlyCount, Recent},
        Config, Service,
    };

    /// In-memory database double.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct InMemory {
        /// Shared state of this [`InMemory`] database.
        state: Arc<Mutex<State>>,
    }

    /// State of an [`InMemory`] database.
    #[derive(Debug, Default)]
    struct State {
        /// Stored [`Contract`]s.
        contracts: HashMap<contract::Id, Contract>,

        /// Stored [`Vehicle`]s.
        vehicles: HashMap<vehicle::Id, Vehicle>,

        /// Stored [`User`]s.
        users: HashMap<user::Id, User>,
    }

    impl InMemory {
        pub(crate) fn put_contract(&self, c: Contract) {
            _ = self.state.lock().unwrap().contracts.insert(c.id, c);
        }

        pub(crate) fn put_vehicle(&self, v: Vehicle) {
            _ = self.state.lock().unwrap().vehicles.insert(v.id, v);
        }

        pub(crate) fn put_user(&self, u: User) {
            _ = self.state.lock().unwrap().users.insert(u.id, u);
        }

        pub(crate) fn contract(&self, id: contract::Id) -> Option<Contract> {
            self.state.lock().unwrap().contracts.get(&id).cloned()
        }

        pub(crate) fn vehicle(&self, id: vehicle::Id) -> Option<Vehicle> {
            self.state.lock().unwrap().vehicles.get(&id).cloned()
        }

        pub(crate) fn contracts_count(&self) -> usize {
            self.state.lock().unwrap().contracts.len()
        }
    }

    impl Handler<Transact> for InMemory {
        type Ok = Self;
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Transact) -> Result<Self, Self::Err> {
            Ok(self.clone())
        }
    }

    impl Handler<Commit> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Commit) -> Result<(), Self::Err> {
            Ok(())
        }
    }

    impl Handler<Lock<By<Contract, contract::Id>>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Lock<By<Contract, contract::Id>>,
        ) -> Result<(), Self::Err> {
            Ok(())
        }
    }

    impl Handler<Lock<By<Vehicle, vehicle::Id>>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Lock<By<Vehicle, vehicle::Id>>,
        ) -> Result<(), Self::Err> {
            Ok(())
        }
    }

    impl Handler<Select<By<Option<Contract>, contract::Id>>> for InMemory {
        type Ok = Option<Contract>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Contract>, contract::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.contract(by.into_inner()))
        }
    }

    impl Handler<Select<By<Option<Vehicle>, vehicle::Id>>> for InMemory {
        type Ok = Option<Vehicle>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Vehicle>, vehicle::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.vehicle(by.into_inner()))
        }
    }

    impl Handler<Select<By<Option<User>, user::Id>>> for InMemory {
        type Ok = Option<User>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<User>, user::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .users
                .get(&by.into_inner())
                .cloned())
        }
    }

    impl Handler<Select<By<Option<User>, user::Email>>> for InMemory {
        type Ok = Option<User>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<User>, user::Email>>,
        ) -> Result<Self::Ok, Self::Err> {
            let email = by.into_inner();
            Ok(self
                .state
                .lock()
                .unwrap()
                .users
                .values()
                .find(|u| u.email == email)
                .cloned())
        }
    }

    impl
        Handler<
            Select<
                By<
                    Option<Recent<Contract>>,
                    (contract::Fingerprint, contract::CreationDateTime),
                >,
            >,
        > for InMemory
    {
        type Ok = Option<Recent<Contract>>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<
                By<
                    Option<Recent<Contract>>,
                    (contract::Fingerprint, contract::CreationDateTime),
                >,
            >,
        ) -> Result<Self::Ok, Self::Err> {
            let (fingerprint, cutoff) = by.into_inner();
            Ok(self
                .state
                .lock()
                .unwrap()
                .contracts
                .values()
                .find(|c| {
                    c.fingerprint() == fingerprint && c.created_at >= cutoff
                })
                .cloned()
                .map(Recent))
        }
    }

    impl
        Handler<
            Select<
                By<MonthlyCount, (user::Id, Range<contract::CreationDateTime>)>,
            >,
        > for InMemory
    {
        type Ok = MonthlyCount;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<
                By<MonthlyCount, (user::Id, Range<contract::CreationDateTime>)>,
            >,
        ) -> Result<Self::Ok, Self::Err> {
            let (owner_id, month) = by.into_inner();
            let count = self
                .state
                .lock()
                .unwrap()
                .contracts
                .values()
                .filter(|c| c.owner_id == owner_id && month.contains(&c.created_at))
                .count();
            Ok(i32::try_from(count).unwrap().into())
        }
    }

    impl Handler<Insert<Contract>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(c): Insert<Contract>,
        ) -> Result<(), Self::Err> {
            self.put_contract(c);
            Ok(())
        }
    }

    impl Handler<Update<Contract>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Update(c): Update<Contract>,
        ) -> Result<(), Self::Err> {
            let mut state = self.state.lock().unwrap();
            let stale = state
                .contracts
                .get(&c.id)
                .map_or(true, |stored| stored.revision.next() != c.revision);
            if stale {
                return Err(tracerr::new!(database::Error::Conflict));
            }
            _ = state.contracts.insert(c.id, c);
            Ok(())
        }
    }

    impl Handler<Delete<By<Contract, contract::Id>>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Delete(by): Delete<By<Contract, contract::Id>>,
        ) -> Result<(), Self::Err> {
            _ = self
                .state
                .lock()
                .unwrap()
                .contracts
                .remove(&by.into_inner());
            Ok(())
        }
    }

    impl Handler<Insert<Vehicle>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(v): Insert<Vehicle>,
        ) -> Result<(), Self::Err> {
            self.put_vehicle(v);
            Ok(())
        }
    }

    impl Handler<Update<Vehicle>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Update(v): Update<Vehicle>,
        ) -> Result<(), Self::Err> {
            self.put_vehicle(v);
            Ok(())
        }
    }

    impl Handler<Insert<User>> for InMemory {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(u): Insert<User>,
        ) -> Result<(), Self::Err> {
            self.put_user(u);
            Ok(())
        }
    }

    /// External collaborators double recording everything it is asked to do.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct FakeExternal {
        /// Names of delivered notifications, in order.
        pub(crate) notifications: Arc<Mutex<Vec<&'static str>>>,

        /// Released storage references, in order.
        pub(crate) released: Arc<Mutex<Vec<document::Reference>>>,
    }

    impl Handler<Notify<Notification>> for FakeExternal {
        type Ok = ();
        type Err = Infallible;

        async fn execute(
            &self,
            Notify(n): Notify<Notification>,
        ) -> Result<(), Infallible> {
            self.notifications.lock().unwrap().push(match n {
                Notification::Created { .. } => "created",
                Notification::Activated(_) => "activated",
                Notification::Cancelled(_) => "cancelled",
                Notification::Completed(_) => "completed",
            });
            Ok(())
        }
    }

    impl Handler<Render<Contract>> for FakeExternal {
        type Ok = Vec<u8>;
        type Err = Infallible;

        async fn execute(
            &self,
            _: Render<Contract>,
        ) -> Result<Vec<u8>, Infallible> {
            Ok(b"%PDF-test".to_vec())
        }
    }

    impl Handler<Release<document::Reference>> for FakeExternal {
        type Ok = bool;
        type Err = Infallible;

        async fn execute(
            &self,
            Release(reference): Release<document::Reference>,
        ) -> Result<bool, Infallible> {
            self.released.lock().unwrap().push(reference);
            Ok(true)
        }
    }

    /// Builds a [`Service`] over the provided doubles.
    pub(crate) fn service(
        db: InMemory,
        fx: FakeExternal,
    ) -> Service<InMemory, FakeExternal> {
        Service::new(
            Config {
                jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                    b"secret",
                ),
                jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                    b"secret",
                ),
            },
            db,
            fx,
        )
    }

    pub(crate) fn sample_user() -> User {
        User {
            id: user::Id::new(),
            name: "Alice Owner".parse().unwrap(),
            email: "alice@example.com".parse().unwrap(),
            password_hash: user::PasswordHash::new(
                &user::Password::new("correct horse").unwrap(),
            ),
            phone: None,
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        }
    }

    pub(crate) fn sample_vehicle(owner_id: user::Id) -> Vehicle {
        Vehicle {
            id: vehicle::Id::new(),
            owner_id,
            make: "Renault".parse().unwrap(),
            model: "Clio V".parse().unwrap(),
            registration: "AB-123-CD".parse().unwrap(),
            mileage: 10_000,
            current_rental: None,
            created_at: DateTime::now().coerce(),
        }
    }

    pub(crate) fn sample_renter() -> Renter {
        Renter {
            name: "Jean Martin".parse().unwrap(),
            email: "jean@example.com".parse().unwrap(),
            phone: None,
            address: None,
        }
    }

    pub(crate) fn sample_period() -> Period {
        let now = DateTime::now();
        Period::new(
            now.coerce(),
            (now + std::time::Duration::from_secs(7 * 24 * 60 * 60)).coerce(),
            10_000,
            Some(500),
            Percent::new(Decimal::ONE_HUNDRED).unwrap(),
            Money::from_str("50USD").unwrap(),
            Money::from_str("200USD").unwrap(),
            Money::from_str("350USD").unwrap(),
        )
        .unwrap()
    }

    pub(crate) fn sample_contract(
        owner_id: user::Id,
        vehicle_id: vehicle::Id,
        status: contract::Status,
    ) -> Contract {
        let created_at: contract::CreationDateTime = DateTime::now().coerce();
        Contract {
            id: contract::Id::new(),
            number: contract::Number::compose(created_at, 1),
            vehicle_id,
            owner_id,
            renter: sample_renter(),
            period: sample_period(),
            documents: Vec::new(),
            signatures: Signatures::default(),
            status,
            payment: contract::Payment::default(),
            return_details: None,
            notes: None,
            revision: contract::Revision::default(),
            created_at,
        }
    }
}

//! [`Vehicle`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{vehicle, Vehicle},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read,
};

impl<C, IDs> Database<Select<By<HashMap<vehicle::Id, Vehicle>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[vehicle::Id]>,
{
    type Ok = HashMap<vehicle::Id, Vehicle>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<vehicle::Id, Vehicle>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[vehicle::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap();

        const SQL: &str = "\
            SELECT id, owner_id, \
                   make, model, registration, \
                   mileage, current_rental, \
                   created_at \
            FROM vehicles \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Vehicle {
                        id,
                        owner_id: row.get("owner_id"),
                        make: row.get("make"),
                        model: row.get("model"),
                        registration: row.get("registration"),
                        mileage: u32::try_from(row.get::<_, i64>("mileage"))
                            .expect("`mileage` overflow"),
                        current_rental: row.get("current_rental"),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Vehicle>, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<vehicle::Id, Vehicle>, [vehicle::Id; 1]>>,
        Ok = HashMap<vehicle::Id, Vehicle>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Vehicle>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Vehicle>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Vehicle>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Vehicle>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(vehicle): Insert<Vehicle>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(vehicle))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Vehicle>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(vehicle): Update<Vehicle>,
    ) -> Result<Self::Ok, Self::Err> {
        let Vehicle {
            id,
            owner_id,
            make,
            model,
            registration,
            mileage,
            current_rental,
            created_at,
        } = vehicle;

        let mileage = i64::from(mileage);

        const SQL: &str = "\
            INSERT INTO vehicles (\
                id, owner_id, \
                make, model, registration, \
                mileage, current_rental, \
                created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, \
                $3::VARCHAR, $4::VARCHAR, $5::VARCHAR, \
                $6::INT8, $7::UUID, \
                $8::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET owner_id = EXCLUDED.owner_id, \
                make = EXCLUDED.make, \
                model = EXCLUDED.model, \
                registration = EXCLUDED.registration, \
                mileage = EXCLUDED.mileage, \
                current_rental = EXCLUDED.current_rental, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[
                &id,
                &owner_id,
                &make,
                &model,
                &registration,
                &mileage,
                &current_rental,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Vehicle, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Vehicle, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: vehicle::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO vehicles_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<
        Select<By<read::vehicle::list::Page, read::vehicle::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::vehicle::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::vehicle::list::Page, read::vehicle::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::vehicle::list::Selector {
            arguments,
            filter:
                read::vehicle::list::Filter {
                    owner,
                    registration,
                },
        } = by.into_inner();

        let limit = i32::try_from(arguments.limit()).unwrap() + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let owner_idx = owner.as_ref().map(|o| {
            ps.push(o);
            ps.len()
        });

        let registration_pattern =
            registration.as_ref().map(|r| FuzzPattern::new(r.as_ref()));
        let registration_pattern_idx =
            registration_pattern.as_ref().map(|r| {
                ps.push(r);
                ps.len()
            });

        let sql = format!(
            "SELECT id \
             FROM vehicles \
             WHERE true \
                   {cursor} \
                   {owner_filtering} \
                   {registration_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            order = arguments.kind().order().sql(),
            owner_filtering =
                owner_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND owner_id = ${idx}::UUID"))
                }),
            registration_filtering = registration_pattern_idx
                .into_iter()
                .format_with("", |idx, f| {
                    f(&format_args!(
                        "AND LOWER(registration) \
                         SIMILAR TO LOWER(${idx}::VARCHAR)"
                    ))
                }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id: vehicle::Id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::vehicle::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::vehicle::list::TotalCount, ()>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::vehicle::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<read::vehicle::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM vehicles";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}

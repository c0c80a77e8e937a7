//! [`Contract`]-related [`Database`] implementations.

use std::{collections::HashMap, ops::Range};

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use serde::{de::DeserializeOwned, Serialize};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{contract, user, Contract},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read::{
        self,
        contract::{MonthlyCount, Recent},
    },
};

/// Decodes a `JSONB` column of the provided [`Row`].
fn decode<T: DeserializeOwned>(row: &Row, column: &str) -> T {
    serde_json::from_value(row.get::<_, serde_json::Value>(column))
        .unwrap_or_else(|e| panic!("invalid `{column}` JSON: {e}"))
}

/// Encodes the provided value for a `JSONB` column.
fn encode<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).expect("serializable")
}

/// Restores a [`Contract`] out of the provided [`Row`].
fn from_row(row: &Row) -> Contract {
    Contract {
        id: row.get("id"),
        number: row.get("number"),
        vehicle_id: row.get("vehicle_id"),
        owner_id: row.get("owner_id"),
        renter: decode(row, "renter"),
        period: decode(row, "period"),
        documents: decode(row, "documents"),
        signatures: decode(row, "signatures"),
        status: row.get("status"),
        payment: decode(row, "payment"),
        return_details: row
            .get::<_, Option<serde_json::Value>>("return_details")
            .map(|v| {
                serde_json::from_value(v)
                    .unwrap_or_else(|e| panic!("invalid `return_details` JSON: {e}"))
            }),
        notes: row.get("notes"),
        revision: row.get("revision"),
        created_at: row.get("created_at"),
    }
}

/// Columns selected to restore a [`Contract`].
const COLUMNS: &str = "\
    id, number, vehicle_id, owner_id, \
    renter, period, documents, signatures, \
    status, payment, return_details, notes, \
    revision, created_at";

impl<C, IDs> Database<Select<By<HashMap<contract::Id, Contract>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[contract::Id]>,
{
    type Ok = HashMap<contract::Id, Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<contract::Id, Contract>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[contract::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM contracts \
             WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
             LIMIT $2::INT4",
        );
        Ok(self
            .query(&sql, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let contract = from_row(&row);
                (contract.id, contract)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Contract>, contract::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<contract::Id, Contract>, [contract::Id; 1]>>,
        Ok = HashMap<contract::Id, Contract>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C>
    Database<
        Select<
            By<
                Option<Recent<Contract>>,
                (contract::Fingerprint, contract::CreationDateTime),
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Contract>, contract::Id>>,
        Ok = Option<Contract>,
        Err = Traced<database::Error>,
    >,
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

        const SQL: &str = "\
            SELECT id \
            FROM contracts \
            WHERE fingerprint = $1::UUID \
              AND created_at >= $2::TIMESTAMPTZ \
            ORDER BY created_at DESC \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&fingerprint, &cutoff])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        self.execute(Select(By::<Option<Contract>, _>::new(row.get("id"))))
            .await
            .map_err(tracerr::wrap!())
            .map(|c| c.map(Recent))
    }
}

impl<C>
    Database<
        Select<
            By<MonthlyCount, (user::Id, Range<contract::CreationDateTime>)>,
        >,
    > for Postgres<C>
where
    C: Connection,
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

        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM contracts \
            WHERE owner_id = $1::UUID \
              AND created_at >= $2::TIMESTAMPTZ \
              AND created_at < $3::TIMESTAMPTZ";
        self.query_opt(SQL, &[&owner_id, &month.start, &month.end])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}

impl<C> Database<Insert<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        let fingerprint = contract.fingerprint();
        let Contract {
            id,
            number,
            vehicle_id,
            owner_id,
            renter,
            period,
            documents,
            signatures,
            status,
            payment,
            return_details,
            notes,
            revision,
            created_at,
        } = contract;

        const SQL: &str = "\
            INSERT INTO contracts (\
                id, number, fingerprint, \
                vehicle_id, owner_id, \
                renter, period, documents, signatures, \
                status, payment, return_details, notes, \
                revision, created_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::UUID, \
                $4::UUID, $5::UUID, \
                $6::JSONB, $7::JSONB, $8::JSONB, $9::JSONB, \
                $10::INT2, $11::JSONB, $12::JSONB, $13::VARCHAR, \
                $14::INT4, $15::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &number,
                &fingerprint,
                &vehicle_id,
                &owner_id,
                &encode(&renter),
                &encode(&period),
                &encode(&documents),
                &encode(&signatures),
                &status,
                &encode(&payment),
                &return_details.as_ref().map(encode),
                &notes,
                &revision,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(contract): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        let Contract {
            id,
            number: _,
            vehicle_id: _,
            owner_id: _,
            renter,
            period,
            documents,
            signatures,
            status,
            payment,
            return_details,
            notes,
            revision,
            created_at: _,
        } = contract;

        // Conditional write: the row is touched only if nobody has bumped
        // the revision since it was read.
        const SQL: &str = "\
            UPDATE contracts \
            SET renter = $2::JSONB, \
                period = $3::JSONB, \
                documents = $4::JSONB, \
                signatures = $5::JSONB, \
                status = $6::INT2, \
                payment = $7::JSONB, \
                return_details = $8::JSONB, \
                notes = $9::VARCHAR, \
                revision = $10::INT4 \
            WHERE id = $1::UUID \
              AND revision = $10::INT4 - 1";
        let updated = self
            .exec(
                SQL,
                &[
                    &id,
                    &encode(&renter),
                    &encode(&period),
                    &encode(&documents),
                    &encode(&signatures),
                    &status,
                    &encode(&payment),
                    &return_details.as_ref().map(encode),
                    &notes,
                    &revision,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        if updated == 0 {
            return Err(tracerr::new!(database::Error::Conflict));
        }
        Ok(())
    }
}

impl<C> Database<Delete<By<Contract, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: contract::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM contracts \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Contract, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: contract::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO contracts_lock \
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
        Select<By<read::contract::list::Page, read::contract::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::contract::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::contract::list::Page, read::contract::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::list::Selector {
            arguments,
            filter:
                read::contract::list::Filter {
                    owner,
                    status,
                    number,
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
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });

        let number_pattern =
            number.as_ref().map(|n| FuzzPattern::new(n.as_ref()));
        let number_pattern_idx = number_pattern.as_ref().map(|n| {
            ps.push(n);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM contracts \
             WHERE true \
                   {cursor} \
                   {owner_filtering} \
                   {status_filtering} \
                   {number_filtering} \
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
            status_filtering =
                status_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND status = ${idx}::INT2"))
                }),
            number_filtering =
                number_pattern_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!(
                        "AND LOWER(number) SIMILAR TO LOWER(${idx}::VARCHAR)"
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
                let id: contract::Id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::contract::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::contract::list::TotalCount, ()>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::contract::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<read::contract::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM contracts";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}

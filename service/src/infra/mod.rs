//! Infrastructure layer.

pub mod database;
pub mod notifier;
pub mod pdf;
pub mod storage;

use common::{
    operations::{Notify, Release, Render, Store},
    Handler,
};

use crate::domain::{contract::document, Contract};

pub use self::database::Database;
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};

/// External collaborators of the service: object storage, notification
/// delivery and PDF rendering, bundled behind a single [`Handler`] facade.
#[derive(Clone, Debug)]
pub struct External {
    /// Object storage.
    pub storage: storage::Fs,

    /// Notification delivery.
    pub notifier: notifier::Log,

    /// PDF renderer.
    pub renderer: pdf::Renderer,
}

impl Handler<Store<storage::File>> for External {
    type Ok = storage::Stored;
    type Err = <storage::Fs as Handler<Store<storage::File>>>::Err;

    async fn execute(
        &self,
        op: Store<storage::File>,
    ) -> Result<Self::Ok, Self::Err> {
        self.storage.execute(op).await
    }
}

impl Handler<Release<document::Reference>> for External {
    type Ok = bool;
    type Err =
        <storage::Fs as Handler<Release<document::Reference>>>::Err;

    async fn execute(
        &self,
        op: Release<document::Reference>,
    ) -> Result<Self::Ok, Self::Err> {
        self.storage.execute(op).await
    }
}

impl Handler<Notify<notifier::Notification>> for External {
    type Ok = ();
    type Err = <notifier::Log as Handler<
        Notify<notifier::Notification>,
    >>::Err;

    async fn execute(
        &self,
        op: Notify<notifier::Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.notifier.execute(op).await
    }
}

impl Handler<Render<Contract>> for External {
    type Ok = Vec<u8>;
    type Err = <pdf::Renderer as Handler<Render<Contract>>>::Err;

    async fn execute(
        &self,
        op: Render<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        self.renderer.execute(op).await
    }
}

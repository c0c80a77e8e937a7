//! Application provides API for interacting with the [`Service`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;
pub mod rate;

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Request, WebSocketUpgrade},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_client_ip::InsecureClientIp;
use common::{
    operations::{Release, Render, Store},
    Handler as _,
};
use derive_more::Debug;
use juniper::{http::GraphQLBatchResponse, DefaultScalarValue, ScalarValue};
use juniper_axum::{extract::JuniperRequest, subscriptions};
use juniper_graphql_ws::ConnectionConfig;
use service::{
    domain::contract::{self, document},
    infra::storage,
    query,
    Query as _,
};
use tracing as log;
use uuid::Uuid;
// Used in binary.
use refinery as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    config::Config,
    context::{Context, Session},
    error::{AsError, Error},
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<service::infra::Postgres>;

/// [`juniper`] GraphQL response.
#[derive(Debug)]
pub struct JuniperResponse<S = DefaultScalarValue>
where
    S: ScalarValue,
{
    /// Status code of the response.
    pub status_code: http::StatusCode,

    /// Underlying GraphQL response.
    #[debug(skip)]
    pub response: GraphQLBatchResponse<S>,
}

impl<S> IntoResponse for JuniperResponse<S>
where
    S: ScalarValue,
{
    fn into_response(self) -> Response {
        let Self {
            status_code,
            response,
        } = self;

        if response.is_ok() {
            Json(response).into_response()
        } else {
            (status_code, Json(response)).into_response()
        }
    }
}

/// GraphQL API handler.
pub async fn graphql(
    Extension(schema): Extension<Arc<api::Schema>>,
    context: Context,
    JuniperRequest(gql_request): JuniperRequest,
) -> JuniperResponse {
    let response = gql_request.execute(&*schema, &context).await;
    // Read the status code only after the execution, resolvers record it on
    // the context.
    JuniperResponse {
        status_code: context.error_status_code(),
        response,
    }
}

/// GraphQL subscriptions handler.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
pub async fn graphql_subscriptions(
    Extension(schema): Extension<Arc<api::Schema>>,
    mut context: Context,
    ws: WebSocketUpgrade,
) -> Response {
    ws.protocols(["graphql-transport-ws", "graphql-ws"])
        .max_frame_size(1024)
        .max_message_size(1024)
        .write_buffer_size(512)
        .max_write_buffer_size(1024)
        .on_upgrade(move |socket| {
            subscriptions::serve_ws(socket, schema, move |vars| async move {
                context.apply_subscription_variables(&vars).map(|()| {
                    ConnectionConfig::new(context)
                        .with_max_in_flight_operations(10)
                })
            })
        })
}

/// Advisory request throttling middleware.
///
/// Turns an over-limit caller away with `429`; callers whose address cannot
/// be told are admitted.
pub async fn throttle(
    Extension(limiter): Extension<Arc<rate::Limiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip =
        InsecureClientIp::from(request.headers(), request.extensions())
            .ok()
            .map(|ip| ip.0);
    match client_ip {
        Some(ip) if !limiter.allow(ip) => {
            http::StatusCode::TOO_MANY_REQUESTS.into_response()
        }
        Some(_) | None => next.run(request).await,
    }
}

/// Renders the contract identified by the path as a PDF document.
pub async fn contract_pdf(
    Path(id): Path<Uuid>,
    context: Context,
) -> Response {
    let contract = match owned_contract(&context, id.into()).await {
        Ok(contract) => contract,
        Err(e) => return rest_error(&e),
    };

    let bytes = match context
        .service()
        .external()
        .execute(Render(contract))
        .await
    {
        Ok(bytes) => bytes,
        Err(never) => match never {},
    };

    (
        [(http::header::CONTENT_TYPE, "application/pdf")],
        bytes,
    )
        .into_response()
}

/// Accepts a multipart upload of contract documents.
///
/// Every part is pushed into storage under its field name as the document
/// kind; the stored references then replace the contract documents of the
/// uploaded kinds wholesale. On a mid-batch failure every already stored
/// file is released before the error is returned.
pub async fn upload_documents(
    Path(id): Path<Uuid>,
    context: Context,
    mut multipart: Multipart,
) -> Response {
    use service::{command, Command as _};

    let session = match context.current_session().await {
        Ok(session) => session,
        Err(e) => return rest_error(&e),
    };
    let contract = match owned_contract(&context, id.into()).await {
        Ok(contract) => contract,
        Err(e) => return rest_error(&e),
    };

    let mut documents = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                release_documents(&context, &documents).await;
                return rest_error(&Error {
                    code: "INVALID_INPUT",
                    status_code: http::StatusCode::BAD_REQUEST,
                    message: format!("malformed multipart payload: {e}"),
                    backtrace: None,
                });
            }
        };

        let Some(kind) = field
            .name()
            .and_then(|n| n.parse::<document::Kind>().ok())
        else {
            release_documents(&context, &documents).await;
            return rest_error(&Error {
                code: "INVALID_INPUT",
                status_code: http::StatusCode::BAD_REQUEST,
                message: "multipart field name must be a document kind"
                    .to_owned(),
                backtrace: None,
            });
        };

        let name = field.file_name().unwrap_or("document").to_owned();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                release_documents(&context, &documents).await;
                return rest_error(&Error {
                    code: "INVALID_INPUT",
                    status_code: http::StatusCode::BAD_REQUEST,
                    message: format!("malformed multipart payload: {e}"),
                    backtrace: None,
                });
            }
        };

        let stored = match context
            .service()
            .external()
            .execute(Store(storage::File {
                bytes: bytes.to_vec(),
                folder: format!("contracts/{}", contract.id),
                name,
            }))
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                log::error!("failed to store `Contract` document: {e}");
                release_documents(&context, &documents).await;
                return rest_error(&Error::internal(
                    &"failed to store the uploaded document",
                ));
            }
        };

        documents.push(document::Document {
            kind,
            url: stored.url,
            reference: stored.reference,
            description: None,
        });
    }

    let updated = context
        .service()
        .execute(command::UpdateContract {
            contract_id: contract.id,
            owner_id: session.user_id.into(),
            renter: None,
            period: None,
            documents: Some(documents.clone()),
            notes: None,
        })
        .await;
    match updated {
        Ok(contract) => {
            (http::StatusCode::CREATED, Json(contract.documents))
                .into_response()
        }
        Err(e) => {
            release_documents(&context, &documents).await;
            rest_error(&e.into_error())
        }
    }
}

/// Loads the [`Contract`] with the provided ID, owned by the current
/// session's user.
///
/// [`Contract`]: contract::Contract
async fn owned_contract(
    context: &Context,
    id: contract::Id,
) -> Result<contract::Contract, Error> {
    let session = context.current_session().await?;
    context
        .service()
        .execute(query::contract::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .filter(|c| api::user::Id::from(c.owner_id) == session.user_id)
        .ok_or(Error {
            code: "CONTRACT_NOT_EXISTS",
            status_code: http::StatusCode::NOT_FOUND,
            message: "`Contract` with the provided ID does not exist"
                .to_owned(),
            backtrace: None,
        })
}

/// Releases the already stored documents of an aborted upload.
async fn release_documents(
    context: &Context,
    documents: &[document::Document],
) {
    for doc in documents {
        if let Err(e) = context
            .service()
            .external()
            .execute(Release(doc.reference.clone()))
            .await
        {
            log::warn!(
                reference = %doc.reference,
                "failed to release an uploaded document: {e}",
            );
        }
    }
}

/// Renders the provided [`Error`] as a plain REST response.
fn rest_error(error: &Error) -> Response {
    (error.status_code, error.message.clone()).into_response()
}

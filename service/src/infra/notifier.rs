//! Notification delivery definitions.

use std::convert::Infallible;

use common::{operations::Notify, Handler};
use tracing as log;

use crate::domain::Contract;

/// Notification emitted by a contract lifecycle transition.
///
/// Delivery is fire-and-forget: transitions are effective once persisted,
/// regardless of the delivery outcome.
#[derive(Clone, Debug)]
pub enum Notification {
    /// [`Contract`] has been created.
    Created {
        /// The created [`Contract`].
        contract: Contract,

        /// Rendered PDF copy of the [`Contract`], if rendering succeeded.
        attachment: Option<Vec<u8>>,
    },

    /// [`Contract`] has been signed by both parties.
    Activated(Contract),

    /// [`Contract`] has been cancelled.
    Cancelled(Contract),

    /// [`Contract`] has been completed.
    Completed(Contract),
}

/// [`Notification`] delivery writing to the log.
///
/// Stand-in for an outbound delivery channel (email is sent by an external
/// collaborator).
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Handler<Notify<Notification>> for Log {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Notify(notification): Notify<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        match notification {
            Notification::Created {
                contract,
                attachment,
            } => {
                log::info!(
                    contract = %contract.number,
                    renter = %contract.renter.email,
                    attachment_bytes = attachment
                        .as_ref()
                        .map_or(0, Vec::len),
                    "contract created",
                );
            }
            Notification::Activated(contract) => {
                log::info!(
                    contract = %contract.number,
                    renter = %contract.renter.email,
                    "contract activated",
                );
            }
            Notification::Cancelled(contract) => {
                log::info!(
                    contract = %contract.number,
                    renter = %contract.renter.email,
                    reason = ?contract.notes.as_ref().map(ToString::to_string),
                    "contract cancelled",
                );
            }
            Notification::Completed(contract) => {
                log::info!(
                    contract = %contract.number,
                    renter = %contract.renter.email,
                    "contract completed",
                );
            }
        }
        Ok(())
    }
}

//! [`Contract`]-related definitions.

use common::{DateTime, Money, Percent};
use derive_more::{AsRef, Display, From, Into};
use juniper::{
    graphql_object, GraphQLEnum, GraphQLInputObject, GraphQLScalar,
};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{api, api::scalar, define_error, AsError, Context, Error};

/// Rental contract between a `Vehicle` owner and a renter.
#[derive(Clone, Debug, From)]
pub struct Contract(domain::Contract);

/// Rental contract between a `Vehicle` owner and a renter.
#[graphql_object(context = Context)]
impl Contract {
    /// Unique identifier of the `Contract`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Human-readable number of the `Contract`, unique per owner within the
    /// creation month.
    #[must_use]
    pub fn number(&self) -> Number {
        self.0.number.clone().into()
    }

    /// Status of the `Contract`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// `Vehicle` rented out under the `Contract`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `VEHICLE_NOT_EXISTS` - the related `Vehicle` has been removed.
    pub async fn vehicle(&self, ctx: &Context) -> Result<api::Vehicle, Error> {
        ctx.service()
            .execute(query::vehicle::ById::by(self.0.vehicle_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| RelatedError::VehicleNotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// `User` owning the `Contract`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the owning `User` has been removed.
    pub async fn owner(&self, ctx: &Context) -> Result<api::User, Error> {
        ctx.service()
            .execute(query::user::ById::by(self.0.owner_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| RelatedError::UserNotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Renter of the `Vehicle`.
    #[must_use]
    pub fn renter(&self) -> Renter {
        self.0.renter.clone().into()
    }

    /// Rental period and financial terms of the `Contract`.
    #[must_use]
    pub fn period(&self) -> Period {
        self.0.period.into()
    }

    /// Documents attached to the `Contract`.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.0.documents.iter().cloned().map(Into::into).collect()
    }

    /// Per-party signatures of the `Contract`.
    #[must_use]
    pub fn signatures(&self) -> Signatures {
        self.0.signatures.clone().into()
    }

    /// Payment state of the `Contract`.
    #[must_use]
    pub fn payment(&self) -> Payment {
        self.0.payment.clone().into()
    }

    /// Return details of the `Contract`, recorded at finalization.
    #[must_use]
    pub fn return_details(&self) -> Option<ReturnDetails> {
        self.0.return_details.clone().map(Into::into)
    }

    /// Free-form notes on the `Contract`.
    #[must_use]
    pub fn notes(&self) -> Option<Notes> {
        self.0.notes.clone().map(Into::into)
    }

    /// Duration of the rental in days, rounded up to whole days.
    #[must_use]
    pub fn duration_days(&self) -> i32 {
        i32::try_from(self.0.duration_days()).unwrap_or(i32::MAX)
    }

    /// How far the returned `Vehicle` overran the agreed mileage allowance,
    /// in kilometers.
    #[must_use]
    pub fn mileage_overage(&self) -> i32 {
        i32::try_from(self.0.mileage_overage()).unwrap_or(i32::MAX)
    }

    /// Indicator whether the recorded transactions cover the total amount.
    #[must_use]
    pub fn is_fully_paid(&self) -> bool {
        self.0.is_fully_paid()
    }

    /// Revision of the `Contract`, bumped on every modification.
    #[must_use]
    pub fn revision(&self) -> i32 {
        self.0.revision.into()
    }

    /// `DateTime` when this `Contract` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

define_error! {
    enum RelatedError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` owning the `Contract` does not exist"]
        UserNotExists,

        #[code = "VEHICLE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Vehicle` related to the `Contract` does not exist"]
        VehicleNotExists,
    }
}

/// Unique identifier of a `Contract`.
#[derive(Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq)]
#[from(domain::contract::Id, Uuid)]
#[into(domain::contract::Id, Uuid)]
#[graphql(name = "ContractId", transparent)]
pub struct Id(Uuid);

/// Number of a `Contract`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractNumber",
    with = scalar::Via::<domain::contract::Number>,
)]
pub struct Number(domain::contract::Number);

/// Free-form notes on a `Contract`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractNotes",
    with = scalar::Via::<domain::contract::Notes>,
)]
pub struct Notes(domain::contract::Notes);

/// Status of a `Contract`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractStatus")]
pub enum Status {
    /// Created, not signed by anyone yet.
    Draft,

    /// Signed by one party.
    Pending,

    /// Signed by both parties, rental ongoing.
    Active,

    /// Vehicle returned, rental finished.
    Completed,

    /// Cancelled before completion.
    Cancelled,

    /// Terminated administratively.
    Terminated,
}

impl From<domain::contract::Status> for Status {
    fn from(status: domain::contract::Status) -> Self {
        use domain::contract::Status as S;
        match status {
            S::Draft => Self::Draft,
            S::Pending => Self::Pending,
            S::Active => Self::Active,
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
            S::Terminated => Self::Terminated,
        }
    }
}

impl From<Status> for domain::contract::Status {
    fn from(status: Status) -> Self {
        use Status as S;
        match status {
            S::Draft => Self::Draft,
            S::Pending => Self::Pending,
            S::Active => Self::Active,
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
            S::Terminated => Self::Terminated,
        }
    }
}

/// Party signing a `Contract`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractParty")]
pub enum Party {
    /// The vehicle owner.
    Owner,

    /// The renter.
    Renter,
}

impl From<Party> for domain::contract::signature::Party {
    fn from(party: Party) -> Self {
        match party {
            Party::Owner => Self::Owner,
            Party::Renter => Self::Renter,
        }
    }
}

/// Renter of a `Vehicle`.
#[derive(Clone, Debug, From)]
pub struct Renter(domain::contract::Renter);

/// Renter of a `Vehicle`.
#[graphql_object(name = "ContractRenter", context = Context)]
impl Renter {
    /// Full name of the renter.
    #[must_use]
    pub fn name(&self) -> String {
        self.0.name.to_string()
    }

    /// Email address of the renter.
    #[must_use]
    pub fn email(&self) -> String {
        self.0.email.to_string()
    }

    /// Phone number of the renter.
    #[must_use]
    pub fn phone(&self) -> Option<String> {
        self.0.phone.as_ref().map(ToString::to_string)
    }

    /// Postal address of the renter.
    #[must_use]
    pub fn address(&self) -> Option<String> {
        self.0.address.as_ref().map(ToString::to_string)
    }
}

/// Rental period and financial terms of a `Contract`.
#[derive(Clone, Copy, Debug, From)]
pub struct Period(domain::contract::Period);

/// Rental period and financial terms of a `Contract`.
#[graphql_object(name = "ContractPeriod", context = Context)]
impl Period {
    /// `DateTime` when the rental starts.
    #[must_use]
    pub fn starts_at(&self) -> DateTime {
        self.0.starts_at.coerce()
    }

    /// `DateTime` when the rental ends.
    #[must_use]
    pub fn ends_at(&self) -> DateTime {
        self.0.ends_at.coerce()
    }

    /// Odometer reading at handover, in kilometers.
    #[must_use]
    pub fn initial_mileage(&self) -> i32 {
        i32::try_from(self.0.initial_mileage).unwrap_or(i32::MAX)
    }

    /// Mileage allowance included in the price, in kilometers.
    #[must_use]
    pub fn allowed_mileage(&self) -> Option<i32> {
        self.0
            .allowed_mileage
            .map(|m| i32::try_from(m).unwrap_or(i32::MAX))
    }

    /// Fuel level at handover.
    #[must_use]
    pub fn initial_fuel(&self) -> Percent {
        self.0.initial_fuel
    }

    /// Price per rental day.
    #[must_use]
    pub fn daily_rate(&self) -> Money {
        self.0.daily_rate
    }

    /// Deposit to be paid at handover.
    #[must_use]
    pub fn deposit(&self) -> Money {
        self.0.deposit
    }

    /// Total price of the whole rental.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.0.total_amount
    }
}

/// Kind of a `Contract` document.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractDocumentKind")]
pub enum DocumentKind {
    /// Renter's identity card.
    IdCard,

    /// Renter's driving license.
    DrivingLicense,

    /// Photos of the vehicle at handover.
    VehiclePhotos,

    /// Any other document.
    Other,
}

impl From<domain::contract::document::Kind> for DocumentKind {
    fn from(kind: domain::contract::document::Kind) -> Self {
        use domain::contract::document::Kind as K;
        match kind {
            K::IdCard => Self::IdCard,
            K::DrivingLicense => Self::DrivingLicense,
            K::VehiclePhotos => Self::VehiclePhotos,
            K::Other => Self::Other,
        }
    }
}

impl From<DocumentKind> for domain::contract::document::Kind {
    fn from(kind: DocumentKind) -> Self {
        use DocumentKind as K;
        match kind {
            K::IdCard => Self::IdCard,
            K::DrivingLicense => Self::DrivingLicense,
            K::VehiclePhotos => Self::VehiclePhotos,
            K::Other => Self::Other,
        }
    }
}

/// Document attached to a `Contract`.
#[derive(Clone, Debug, From)]
pub struct Document(domain::contract::Document);

/// Document attached to a `Contract`.
#[graphql_object(name = "ContractDocument", context = Context)]
impl Document {
    /// Kind of the document.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.0.kind.into()
    }

    /// Public URL the document is served under.
    #[must_use]
    pub fn url(&self) -> String {
        self.0.url.to_string()
    }

    /// Storage reference of the document.
    #[must_use]
    pub fn reference(&self) -> String {
        self.0.reference.to_string()
    }

    /// Free-form description of the document.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.0.description.as_ref().map(ToString::to_string)
    }
}

/// Per-party signatures of a `Contract`.
#[derive(Clone, Debug, From)]
pub struct Signatures(domain::contract::Signatures);

/// Per-party signatures of a `Contract`.
#[graphql_object(name = "ContractSignatures", context = Context)]
impl Signatures {
    /// Signature of the vehicle owner.
    #[must_use]
    pub fn owner(&self) -> Option<Signature> {
        self.0.owner.clone().map(Into::into)
    }

    /// Signature of the renter.
    #[must_use]
    pub fn renter(&self) -> Option<Signature> {
        self.0.renter.clone().map(Into::into)
    }

    /// Indicator whether both parties have signed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.is_complete()
    }
}

/// Signature of one party on a `Contract`.
#[derive(Clone, Debug, From)]
pub struct Signature(domain::contract::Signature);

/// Signature of one party on a `Contract`.
#[graphql_object(name = "ContractSignature", context = Context)]
impl Signature {
    /// Captured signature image.
    #[must_use]
    pub fn data(&self) -> String {
        self.0.data.to_string()
    }

    /// `DateTime` when the signature was recorded.
    #[must_use]
    pub fn signed_at(&self) -> DateTime {
        self.0.signed_at.coerce()
    }

    /// Network origin the signing request came from.
    #[must_use]
    pub fn origin(&self) -> Option<String> {
        self.0.origin.as_ref().map(ToString::to_string)
    }
}

/// Payment status of a `Contract`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractPaymentStatus")]
pub enum PaymentStatus {
    /// Nothing has been paid yet.
    Pending,

    /// Part of the total amount has been paid.
    Partial,

    /// The total amount has been paid.
    Completed,

    /// The payment has been refunded.
    Refunded,
}

impl From<domain::contract::payment::Status> for PaymentStatus {
    fn from(status: domain::contract::payment::Status) -> Self {
        use domain::contract::payment::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Partial => Self::Partial,
            S::Completed => Self::Completed,
            S::Refunded => Self::Refunded,
        }
    }
}

/// Kind of a payment transaction.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractTransactionKind")]
pub enum TransactionKind {
    /// Money paid towards the contract.
    Payment,

    /// Money returned to the payer.
    Refund,
}

impl From<domain::contract::payment::transaction::Kind> for TransactionKind {
    fn from(kind: domain::contract::payment::transaction::Kind) -> Self {
        use domain::contract::payment::transaction::Kind as K;
        match kind {
            K::Payment => Self::Payment,
            K::Refund => Self::Refund,
        }
    }
}

/// Payment state of a `Contract`.
#[derive(Clone, Debug, From)]
pub struct Payment(domain::contract::Payment);

/// Payment state of a `Contract`.
#[graphql_object(name = "ContractPayment", context = Context)]
impl Payment {
    /// Status of the payment.
    #[must_use]
    pub fn status(&self) -> PaymentStatus {
        self.0.status.into()
    }

    /// Payment method used, if known.
    #[must_use]
    pub fn method(&self) -> Option<String> {
        self.0.method.as_ref().map(ToString::to_string)
    }

    /// Indicator whether the deposit has been paid.
    #[must_use]
    pub fn deposit_paid(&self) -> bool {
        self.0.deposit_paid
    }

    /// `DateTime` when the deposit was returned, if it was.
    #[must_use]
    pub fn deposit_returned_at(&self) -> Option<DateTime> {
        self.0.deposit_returned_at
    }

    /// Recorded transactions, in order of occurrence.
    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.0.transactions.iter().cloned().map(Into::into).collect()
    }
}

/// Single money movement recorded on a `Contract`.
#[derive(Clone, Debug, From)]
pub struct Transaction(domain::contract::payment::Transaction);

/// Single money movement recorded on a `Contract`.
#[graphql_object(name = "ContractTransaction", context = Context)]
impl Transaction {
    /// Kind of the transaction.
    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        self.0.kind.into()
    }

    /// Amount moved by the transaction.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// `DateTime` when the transaction occurred.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime {
        self.0.occurred_at.coerce()
    }

    /// Billing-provider reference of the transaction.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.0.reference
    }
}

/// Condition of a returned vehicle.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractVehicleCondition")]
pub enum Condition {
    /// No visible wear.
    Perfect,

    /// Normal wear.
    Good,

    /// Visible damage.
    Damaged,
}

impl From<domain::contract::return_details::Condition> for Condition {
    fn from(condition: domain::contract::return_details::Condition) -> Self {
        use domain::contract::return_details::Condition as C;
        match condition {
            C::Perfect => Self::Perfect,
            C::Good => Self::Good,
            C::Damaged => Self::Damaged,
        }
    }
}

impl From<Condition> for domain::contract::return_details::Condition {
    fn from(condition: Condition) -> Self {
        use Condition as C;
        match condition {
            C::Perfect => Self::Perfect,
            C::Good => Self::Good,
            C::Damaged => Self::Damaged,
        }
    }
}

/// Details recorded when a rented vehicle is returned.
#[derive(Clone, Debug, From)]
pub struct ReturnDetails(domain::contract::ReturnDetails);

/// Details recorded when a rented vehicle is returned.
#[graphql_object(name = "ContractReturnDetails", context = Context)]
impl ReturnDetails {
    /// `DateTime` when the vehicle was actually returned.
    #[must_use]
    pub fn returned_at(&self) -> DateTime {
        self.0.returned_at
    }

    /// Odometer reading at return, in kilometers.
    #[must_use]
    pub fn final_mileage(&self) -> i32 {
        i32::try_from(self.0.final_mileage).unwrap_or(i32::MAX)
    }

    /// Fuel level at return.
    #[must_use]
    pub fn fuel(&self) -> Percent {
        self.0.fuel
    }

    /// Condition of the returned vehicle.
    #[must_use]
    pub fn condition(&self) -> Condition {
        self.0.condition.into()
    }

    /// Free-form notes about the return.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.0.notes.as_deref()
    }

    /// Additional charges applied at return.
    #[must_use]
    pub fn additional_charges(&self) -> Vec<Charge> {
        self.0
            .additional_charges
            .iter()
            .cloned()
            .map(Into::into)
            .collect()
    }
}

/// Additional charge applied at vehicle return.
#[derive(Clone, Debug, From)]
pub struct Charge(domain::contract::return_details::Charge);

/// Additional charge applied at vehicle return.
#[graphql_object(name = "ContractCharge", context = Context)]
impl Charge {
    /// What the charge is for.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.0.description
    }

    /// Amount of the charge.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }
}

/// Renter details input.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct RenterInput {
    /// Full name of the renter.
    pub name: RenterName,

    /// Email address of the renter.
    pub email: api::user::Email,

    /// Phone number of the renter.
    pub phone: Option<api::user::Phone>,

    /// Postal address of the renter.
    pub address: Option<RenterAddress>,
}

impl From<RenterInput> for domain::contract::Renter {
    fn from(input: RenterInput) -> Self {
        Self {
            name: input.name.into(),
            email: input.email.into(),
            phone: input.phone.map(Into::into),
            address: input.address.map(Into::into),
        }
    }
}

/// Full name of a renter.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "RenterName",
    with = scalar::Via::<domain::contract::renter::Name>,
)]
pub struct RenterName(domain::contract::renter::Name);

/// Postal address of a renter.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "RenterAddress",
    with = scalar::Via::<domain::contract::renter::Address>,
)]
pub struct RenterAddress(domain::contract::renter::Address);

/// Rental period and financial terms input.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
pub struct PeriodInput {
    /// `DateTime` when the rental starts.
    pub starts_at: DateTime,

    /// `DateTime` when the rental ends.
    ///
    /// Must not precede `startsAt`.
    pub ends_at: DateTime,

    /// Odometer reading at handover, in kilometers.
    pub initial_mileage: i32,

    /// Mileage allowance included in the price, in kilometers.
    pub allowed_mileage: Option<i32>,

    /// Fuel level at handover.
    pub initial_fuel: Percent,

    /// Price per rental day.
    pub daily_rate: Money,

    /// Deposit to be paid at handover.
    pub deposit: Money,

    /// Total price of the whole rental.
    pub total_amount: Money,
}

impl TryFrom<PeriodInput> for domain::contract::Period {
    type Error = Error;

    fn try_from(input: PeriodInput) -> Result<Self, Error> {
        let initial_mileage = u32::try_from(input.initial_mileage)
            .map_err(|_| Error::from(InputError::InvalidPeriod))?;
        let allowed_mileage = input
            .allowed_mileage
            .map(u32::try_from)
            .transpose()
            .map_err(|_| Error::from(InputError::InvalidPeriod))?;

        Self::new(
            input.starts_at.coerce(),
            input.ends_at.coerce(),
            initial_mileage,
            allowed_mileage,
            input.initial_fuel,
            input.daily_rate,
            input.deposit,
            input.total_amount,
        )
        .ok_or_else(|| InputError::InvalidPeriod.into())
    }
}

/// `Contract` document input.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct DocumentInput {
    /// Kind of the document.
    pub kind: DocumentKind,

    /// Public URL the document is served under.
    pub url: DocumentUrl,

    /// Storage reference of the document.
    pub reference: DocumentReference,

    /// Free-form description of the document.
    pub description: Option<DocumentDescription>,
}

impl From<DocumentInput> for domain::contract::Document {
    fn from(input: DocumentInput) -> Self {
        Self {
            kind: input.kind.into(),
            url: input.url.into(),
            reference: input.reference.into(),
            description: input.description.map(Into::into),
        }
    }
}

/// URL of a `Contract` document.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractDocumentUrl",
    with = scalar::Via::<domain::contract::document::Url>,
)]
pub struct DocumentUrl(domain::contract::document::Url);

/// Storage reference of a `Contract` document.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractDocumentReference",
    with = scalar::Via::<domain::contract::document::Reference>,
)]
pub struct DocumentReference(domain::contract::document::Reference);

/// Description of a `Contract` document.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractDocumentDescription",
    with = scalar::Via::<domain::contract::document::Description>,
)]
pub struct DocumentDescription(domain::contract::document::Description);

/// Captured signature image.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractSignatureBlob",
    with = scalar::Via::<domain::contract::signature::Blob>,
)]
pub struct SignatureBlob(domain::contract::signature::Blob);

/// Vehicle return details input.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct ReturnDetailsInput {
    /// `DateTime` when the vehicle was actually returned.
    pub returned_at: DateTime,

    /// Odometer reading at return, in kilometers.
    pub final_mileage: i32,

    /// Fuel level at return.
    pub fuel: Percent,

    /// Condition of the returned vehicle.
    pub condition: Condition,

    /// Free-form notes about the return.
    pub notes: Option<String>,

    /// Additional charges applied at return.
    pub additional_charges: Option<Vec<ChargeInput>>,
}

impl TryFrom<ReturnDetailsInput> for domain::contract::ReturnDetails {
    type Error = Error;

    fn try_from(input: ReturnDetailsInput) -> Result<Self, Error> {
        Ok(Self {
            returned_at: input.returned_at,
            final_mileage: u32::try_from(input.final_mileage)
                .map_err(|_| Error::from(InputError::InvalidReturnDetails))?,
            fuel: input.fuel,
            condition: input.condition.into(),
            notes: input.notes,
            additional_charges: input
                .additional_charges
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
        })
    }
}

/// Additional charge input.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct ChargeInput {
    /// What the charge is for.
    pub description: String,

    /// Amount of the charge.
    pub amount: Money,
}

impl From<ChargeInput> for domain::contract::return_details::Charge {
    fn from(input: ChargeInput) -> Self {
        Self {
            description: input.description,
            amount: input.amount,
        }
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_PERIOD"]
        #[status = BAD_REQUEST]
        #[message = "Rental period is invalid: the end must not precede the \
                     start, amounts and mileage must not be negative"]
        InvalidPeriod,

        #[code = "INVALID_RETURN_DETAILS"]
        #[status = BAD_REQUEST]
        #[message = "Return details are invalid: mileage must not be \
                     negative"]
        InvalidReturnDetails,
    }
}

pub mod list {
    //! Definitions related to the [`Contract`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    #[cfg(doc)]
    use super::Contract;
    use crate::{api::scalar, define_error, AsError, Context, Error};

    /// Cursor for the `Contract` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(super::Id, read::contract::list::Cursor)]
    #[graphql(
        name = "ContractListCursor",
        with = scalar::Via::<read::contract::list::Cursor>,
    )]
    pub struct Cursor(pub read::contract::list::Cursor);

    /// Edge in the [`Contract`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::contract::list::Edge);

    /// Edge in the `Contract` list.
    #[graphql_object(name = "ContractListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `ContractListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `ContractListEdge`.
        ///
        /// # Errors
        ///
        /// Possible error codes:
        /// - `CONTRACT_NOT_EXISTS` - the `Contract` has been removed
        ///                           meanwhile.
        pub async fn node(
            &self,
            ctx: &Context,
        ) -> Result<super::Contract, Error> {
            ctx.service()
                .execute(query::contract::ById::by(self.0.node))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())?
                .ok_or_else(|| NodeError::NotExists.into())
                .map_err(ctx.error())
                .map(Into::into)
        }
    }

    define_error! {
        enum NodeError {
            #[code = "CONTRACT_NOT_EXISTS"]
            #[status = NOT_FOUND]
            #[message = "`Contract` does not exist"]
            NotExists,
        }
    }

    /// Connection of the [`Contract`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::contract::list::Connection);

    /// Connection of the `Contract` list.
    #[graphql_object(name = "ContractListConnection", context = Context)]
    impl Connection {
        /// Edges in this `ContractListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.0.page_info(),
                start_cursor: self.0.edges.first().map(|e| e.cursor.into()),
                end_cursor: self.0.edges.last().map(|e| e.cursor.into()),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::contract::list::PageInfo`].
        info: read::contract::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `ContractListConnection` page.
    #[graphql_object(name = "ContractListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> &Option<Cursor> {
            &self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> &Option<Cursor> {
            &self.end_cursor
        }

        /// Total `Contract`s count.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::contracts::TotalCount::by(()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }
}

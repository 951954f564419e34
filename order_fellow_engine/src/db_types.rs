use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mof_common::{EmailAddress, Secret};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------   TrackingStatus     ---------------------------------------------------------
/// The position of an order in the delivery lifecycle.
///
/// The variants are declared in lifecycle order, so the derived `Ord` follows the delivery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingStatus {
    /// The order has been received but not yet dispatched.
    #[default]
    Pending,
    InTransit,
    OutForDelivery,
    /// Terminal state.
    Delivered,
}

impl TrackingStatus {
    pub const ALL: [TrackingStatus; 4] =
        [TrackingStatus::Pending, TrackingStatus::InTransit, TrackingStatus::OutForDelivery, TrackingStatus::Delivered];

    /// Position in the delivery sequence, starting at zero for `Pending`.
    pub fn rank(&self) -> u8 {
        match self {
            TrackingStatus::Pending => 0,
            TrackingStatus::InTransit => 1,
            TrackingStatus::OutForDelivery => 2,
            TrackingStatus::Delivered => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Pending => "PENDING",
            TrackingStatus::InTransit => "IN_TRANSIT",
            TrackingStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            TrackingStatus::Delivered => "DELIVERED",
        }
    }
}

impl Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{0}\" is not a valid tracking status")]
pub struct InvalidTrackingStatus(pub String);

impl FromStr for TrackingStatus {
    type Err = InvalidTrackingStatus;

    /// Case-insensitive. Words may be separated by underscores, spaces or hyphens, so `"in transit"`, `"In-Transit"`
    /// and `"IN_TRANSIT"` all parse to [`TrackingStatus::InTransit`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_TRANSIT" => Ok(Self::InTransit),
            "OUT_FOR_DELIVERY" => Ok(Self::OutForDelivery),
            "DELIVERED" => Ok(Self::Delivered),
            _ => Err(InvalidTrackingStatus(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for TrackingStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//--------------------------------------       OrderId        ---------------------------------------------------------
/// Orders are keyed by a random v4 UUID so that ids cannot be enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl TryFrom<String> for OrderId {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Uuid> for OrderId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

//--------------------------------------       Customer       ---------------------------------------------------------
/// A snapshot of the customer's contact details, taken when the order was placed. Every order owns its own record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: EmailAddress,
}

//--------------------------------------         Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: Customer,
    pub address: String,
    pub item_summary: String,
    pub tracking_status: TrackingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated order that has not been stored yet. The id and status are assigned on insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer: NewCustomer,
    pub address: String,
    pub item_summary: String,
}

//--------------------------------------     StatusHistory    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StatusHistoryEntry {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub order_id: OrderId,
    pub status: TrackingStatus,
    pub created_at: DateTime<Utc>,
}

/// An effective status change, i.e. one where the new status differs from the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub from: TrackingStatus,
    pub to: TrackingStatus,
}

/// The result of an order update. `transition` is `Some` only when the tracking status actually changed.
#[derive(Debug, Clone)]
pub struct OrderUpdated {
    pub order: Order,
    pub transition: Option<StatusTransition>,
}

/// What remains of an order after it has been deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedOrder {
    pub order_id: OrderId,
    pub customer_email: String,
}

//--------------------------------------   BusinessAccount    ---------------------------------------------------------
/// A merchant that pushes orders into the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct BusinessAccount {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub kyc_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessAccount {
    /// A caller is verified once the account is active and its KYC review has been approved.
    pub fn is_verified(&self) -> bool {
        self.is_active && self.kyc_approved
    }
}

#[derive(Debug, Clone)]
pub struct NewBusinessAccount {
    pub email: EmailAddress,
    pub username: String,
}

//--------------------------------------  WebhookCredential   ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct WebhookCredential {
    pub id: i64,
    pub account_id: i64,
    #[sqlx(try_from = "String")]
    pub secret: Secret<String>,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookCredential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

//--------------------------------------       Principal      ---------------------------------------------------------
/// The business account that an authenticated request acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: i64,
    pub email: String,
}

//--------------------------------------      FieldErrors     ---------------------------------------------------------
/// Field-level validation messages, keyed by the (dotted) field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    /// `Ok(())` when no errors were collected.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = self.0.iter().map(|(k, v)| format!("{k}: {}", v.join(" "))).collect::<Vec<String>>();
        write!(f, "{}", parts.join("; "))
    }
}

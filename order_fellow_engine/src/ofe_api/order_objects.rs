use std::fmt::Display;

use mof_common::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::db_types::{FieldErrors, NewCustomer, NewOrder, OrderId, TrackingStatus};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

//--------------------------------------   OrderQueryFilter    --------------------------------------------------------
/// Criteria for listing orders. All supplied criteria must match.
///
/// Customer name, email and phone, as well as the address, match case-insensitive substrings. The id and status must
/// match exactly. A filter can be kept and re-run as often as needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub id: Option<OrderId>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub tracking_status: Option<TrackingStatus>,
    pub address: Option<String>,
}

impl OrderQueryFilter {
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_customer_name<S: Into<String>>(mut self, name: S) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_customer_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn with_status(mut self, status: TrackingStatus) -> Self {
        self.tracking_status = Some(status);
        self
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() &&
            self.customer_name.is_none() &&
            self.customer_email.is_none() &&
            self.customer_phone.is_none() &&
            self.tracking_status.is_none() &&
            self.address.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(id) = &self.id {
            write!(f, "id: {id}. ")?;
        }
        if let Some(name) = &self.customer_name {
            write!(f, "customer_name: {name}. ")?;
        }
        if let Some(email) = &self.customer_email {
            write!(f, "customer_email: {email}. ")?;
        }
        if let Some(phone) = &self.customer_phone {
            write!(f, "customer_phone: {phone}. ")?;
        }
        if let Some(status) = &self.tracking_status {
            write!(f, "tracking_status: {status}. ")?;
        }
        if let Some(address) = &self.address {
            write!(f, "address: {address}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------    Order payloads     --------------------------------------------------------
/// Customer contact details as they arrive over the wire. Nothing is validated yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CustomerDetails {
    pub fn new<S: Into<String>>(name: S, phone: S, email: S) -> Self {
        Self { name: Some(name.into()), phone: Some(phone.into()), email: Some(email.into()) }
    }
}

/// An order as submitted by a merchant. Call [`NewOrderRequest::validate`] to turn it into a [`NewOrder`].
///
/// The customer may be given under either the `customer` or the `customer_details` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrderRequest {
    #[serde(default, alias = "customer_details")]
    pub customer: Option<CustomerDetails>,
    pub address: Option<String>,
    pub item_summary: Option<String>,
}

impl NewOrderRequest {
    pub fn new<S: Into<String>>(customer: CustomerDetails, address: S, item_summary: S) -> Self {
        Self { customer: Some(customer), address: Some(address.into()), item_summary: Some(item_summary.into()) }
    }

    pub fn validate(self) -> Result<NewOrder, FieldErrors> {
        let mut errors = FieldErrors::new();
        let address = required_text("address", self.address, &mut errors);
        let item_summary = required_text("item_summary", self.item_summary, &mut errors);
        let customer = match self.customer {
            None => {
                errors.add("customer", REQUIRED);
                None
            },
            Some(c) => {
                let name = required_text("customer.name", c.name, &mut errors);
                let phone = required_text("customer.phone", c.phone, &mut errors);
                let email = required_text("customer.email", c.email, &mut errors)
                    .and_then(|e| parse_email("customer.email", &e, &mut errors));
                match (name, phone, email) {
                    (Some(name), Some(phone), Some(email)) => Some(NewCustomer { name, phone, email }),
                    _ => None,
                }
            },
        };
        match (customer, address, item_summary) {
            (Some(customer), Some(address), Some(item_summary)) if errors.is_empty() => {
                Ok(NewOrder { customer, address, item_summary })
            },
            _ => Err(errors),
        }
    }
}

/// A partial order update as it arrives over the wire. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyOrderRequest {
    #[serde(default, alias = "customer_details")]
    pub customer: Option<CustomerDetails>,
    pub address: Option<String>,
    pub item_summary: Option<String>,
    pub tracking_status: Option<String>,
}

impl ModifyOrderRequest {
    pub fn validate(self) -> Result<ModifyOrder, FieldErrors> {
        let mut errors = FieldErrors::new();
        let address = optional_text("address", self.address, &mut errors);
        let item_summary = optional_text("item_summary", self.item_summary, &mut errors);
        let customer = match self.customer {
            None => CustomerChanges::default(),
            Some(c) => CustomerChanges {
                name: optional_text("customer.name", c.name, &mut errors),
                phone: optional_text("customer.phone", c.phone, &mut errors),
                email: optional_text("customer.email", c.email, &mut errors)
                    .and_then(|e| parse_email("customer.email", &e, &mut errors)),
            },
        };
        let tracking_status = self.tracking_status.and_then(|s| match s.parse::<TrackingStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                errors.add("tracking_status", format!("\"{s}\" is not a valid choice."));
                None
            },
        });
        errors.into_result()?;
        Ok(ModifyOrder { address, item_summary, customer, tracking_status })
    }
}

/// A validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifyOrder {
    pub address: Option<String>,
    pub item_summary: Option<String>,
    pub customer: CustomerChanges,
    pub tracking_status: Option<TrackingStatus>,
}

impl ModifyOrder {
    pub fn with_status(mut self, status: TrackingStatus) -> Self {
        self.tracking_status = Some(status);
        self
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_item_summary<S: Into<String>>(mut self, item_summary: S) -> Self {
        self.item_summary = Some(item_summary.into());
        self
    }

    pub fn with_customer_name<S: Into<String>>(mut self, name: S) -> Self {
        self.customer.name = Some(name.into());
        self
    }

    /// True if the update only touches the orders table (or nothing at all).
    pub fn is_empty(&self) -> bool {
        self.address.is_none() &&
            self.item_summary.is_none() &&
            self.customer.is_empty() &&
            self.tracking_status.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<EmailAddress>,
}

impl CustomerChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none()
    }
}

fn required_text(field: &str, value: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    match value {
        None => {
            errors.add(field, REQUIRED);
            None
        },
        Some(v) => optional_text(field, Some(v), errors),
    }
}

fn optional_text(field: &str, value: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, BLANK);
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_email(field: &str, value: &str, errors: &mut FieldErrors) -> Option<EmailAddress> {
    match EmailAddress::parse(value) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.add(field, INVALID_EMAIL);
            None
        },
    }
}

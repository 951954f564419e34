use std::str::FromStr;

use order_fellow_engine::{
    db_types::{FieldErrors, OrderId, TrackingStatus},
    order_objects::OrderQueryFilter,
};
use serde::{Deserialize, Serialize};

/// Query parameters accepted by `GET /orderreceptions/`.
///
/// Everything arrives as text. [`OrderListParams::into_filter`] parses the id and status, and reports every bad value
/// as a field error. Blank values are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListParams {
    pub id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub tracking_status: Option<String>,
    pub address: Option<String>,
}

impl OrderListParams {
    pub fn into_filter(self) -> Result<OrderQueryFilter, FieldErrors> {
        let mut errors = FieldErrors::new();
        let id = parse_param::<OrderId>("id", self.id, &mut errors, "Must be a valid UUID.");
        let tracking_status = parse_param::<TrackingStatus>(
            "tracking_status",
            self.tracking_status,
            &mut errors,
            "Select a valid choice.",
        );
        errors.into_result()?;
        Ok(OrderQueryFilter {
            id,
            customer_name: non_blank(self.customer_name),
            customer_email: non_blank(self.customer_email),
            customer_phone: non_blank(self.customer_phone),
            tracking_status,
            address: non_blank(self.address),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_param<T: FromStr>(field: &str, value: Option<String>, errors: &mut FieldErrors, hint: &str) -> Option<T> {
    let value = non_blank(value)?;
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, format!("\"{value}\" is not valid. {hint}"));
            None
        },
    }
}

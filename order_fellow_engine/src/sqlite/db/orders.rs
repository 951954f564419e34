use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use super::like_pattern;
use crate::{
    db_types::{Customer, DeletedOrder, NewCustomer, NewOrder, Order, OrderId, TrackingStatus},
    order_objects::{CustomerChanges, OrderQueryFilter},
    traits::OrderStoreError,
};

const ORDER_COLUMNS: &str = r#"
    SELECT
        orders.id AS id,
        orders.address AS address,
        orders.item_summary AS item_summary,
        orders.tracking_status AS tracking_status,
        orders.created_at AS created_at,
        orders.updated_at AS updated_at,
        customers.id AS customer_id,
        customers.name AS customer_name,
        customers.phone AS customer_phone,
        customers.email AS customer_email
    FROM orders JOIN customers ON customers.id = orders.customer_id
    "#;

/// An order joined with its customer snapshot, as it comes out of the database.
#[derive(FromRow)]
struct OrderRow {
    #[sqlx(try_from = "String")]
    id: OrderId,
    address: String,
    item_summary: String,
    tracking_status: TrackingStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_id: i64,
    customer_name: String,
    customer_phone: String,
    customer_email: String,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            customer: Customer {
                id: row.customer_id,
                name: row.customer_name,
                phone: row.customer_phone,
                email: row.customer_email,
            },
            address: row.address,
            item_summary: row.item_summary,
            tracking_status: row.tracking_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

async fn insert_customer(customer: &NewCustomer, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar("INSERT INTO customers (name, phone, email) VALUES ($1, $2, $3) RETURNING id")
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.email.as_str())
        .fetch_one(conn)
        .await?;
    Ok(id)
}

/// Inserts a new customer snapshot and a new order in `Pending` status. This is not atomic. Embed this call inside a
/// transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let customer_id = insert_customer(&order.customer, conn).await?;
    let id = OrderId::random();
    sqlx::query(
        r#"
            INSERT INTO orders (id, customer_id, address, item_summary, tracking_status)
            VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id.to_string())
    .bind(customer_id)
    .bind(order.address)
    .bind(order.item_summary)
    .bind(TrackingStatus::Pending)
    .execute(&mut *conn)
    .await?;
    debug!("📝️ Order [{id}] inserted for customer #{customer_id}");
    fetch_order(&id, conn).await?.ok_or(OrderStoreError::OrderNotFound(id))
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("{ORDER_COLUMNS} WHERE orders.id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql).bind(order_id.to_string()).fetch_optional(conn).await?;
    Ok(row.map(Order::from))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order, with insertion order breaking ties.
///
/// Text filters are case-insensitive substring matches. SQLite's `LIKE` only folds ASCII letters, so a search term
/// containing any other character is matched in Rust after the query has run.
pub async fn search_orders(query: &OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let text_filters = [
        ("customers.name", query.customer_name.as_deref()),
        ("customers.email", query.customer_email.as_deref()),
        ("customers.phone", query.customer_phone.as_deref()),
        ("orders.address", query.address.as_deref()),
    ];
    let sql_terms =
        text_filters.iter().filter_map(|(column, term)| term.filter(|t| t.is_ascii()).map(|t| (*column, t)));
    let mut builder = QueryBuilder::<Sqlite>::new(ORDER_COLUMNS);
    let has_sql_filter = query.id.is_some() || query.tracking_status.is_some() || sql_terms.clone().next().is_some();
    if has_sql_filter {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(id) = &query.id {
        where_clause.push("orders.id = ");
        where_clause.push_bind_unseparated(id.to_string());
    }
    if let Some(status) = query.tracking_status {
        where_clause.push("orders.tracking_status = ");
        where_clause.push_bind_unseparated(status);
    }
    for (column, term) in sql_terms {
        where_clause.push(format!("{column} LIKE "));
        where_clause.push_bind_unseparated(like_pattern(term));
        where_clause.push_unseparated(" ESCAPE '\\'");
    }
    builder.push(" ORDER BY orders.created_at ASC, orders.rowid ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<OrderRow>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {}", rows.len());
    let orders = rows
        .into_iter()
        .map(Order::from)
        .filter(|order| {
            contains_folded(&order.customer.name, query.customer_name.as_deref())
                && contains_folded(&order.customer.email, query.customer_email.as_deref())
                && contains_folded(&order.customer.phone, query.customer_phone.as_deref())
                && contains_folded(&order.address, query.address.as_deref())
        })
        .collect();
    Ok(orders)
}

/// Matches the non-ASCII search terms that were left out of the SQL query. ASCII terms have already been applied.
fn contains_folded(value: &str, term: Option<&str>) -> bool {
    match term {
        Some(term) if !term.is_ascii() => value.to_lowercase().contains(&term.to_lowercase()),
        _ => true,
    }
}

/// Takes the database write lock and returns the order's current status, or `None` if the order does not exist.
///
/// The statement is a no-op write. Issued as the first statement of a transaction, it guarantees that no other writer
/// can change the status between this read and the end of the transaction.
pub async fn lock_order_status(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<TrackingStatus>, sqlx::Error> {
    let status: Option<TrackingStatus> = sqlx::query_scalar(
        "UPDATE orders SET tracking_status = tracking_status WHERE id = $1 RETURNING tracking_status",
    )
    .bind(order_id.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(status)
}

/// Writes whichever of the order's own fields are supplied and bumps `updated_at`.
pub async fn update_order_fields(
    order_id: &OrderId,
    address: Option<String>,
    item_summary: Option<String>,
    status: Option<TrackingStatus>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP");
    if let Some(address) = address {
        builder.push(", address = ");
        builder.push_bind(address);
    }
    if let Some(item_summary) = item_summary {
        builder.push(", item_summary = ");
        builder.push_bind(item_summary);
    }
    if let Some(status) = status {
        builder.push(", tracking_status = ");
        builder.push_bind(status);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(order_id.to_string());
    trace!("📝️ Executing query: {}", builder.sql());
    builder.build().execute(conn).await?;
    Ok(())
}

/// Applies changes to the customer snapshot owned by the order.
pub async fn update_customer_for_order(
    order_id: &OrderId,
    changes: CustomerChanges,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    if changes.is_empty() {
        return Ok(());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE customers SET updated_at = CURRENT_TIMESTAMP");
    if let Some(name) = changes.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(phone) = changes.phone {
        builder.push(", phone = ");
        builder.push_bind(phone);
    }
    if let Some(email) = changes.email {
        builder.push(", email = ");
        builder.push_bind(email.into_inner());
    }
    builder.push(" WHERE id = (SELECT customer_id FROM orders WHERE id = ");
    builder.push_bind(order_id.to_string());
    builder.push(")");
    trace!("📝️ Executing query: {}", builder.sql());
    builder.build().execute(conn).await?;
    Ok(())
}

/// Deletes the order and its customer snapshot. Returns `None` if the order does not exist.
///
/// Status history rows cascade with the order. Callers that need a count of them should call
/// [`super::history::delete_history_for_order`] first.
pub async fn delete_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<DeletedOrder>, sqlx::Error> {
    let snapshot: Option<(i64, String)> = sqlx::query_as(
        "SELECT customers.id, customers.email FROM orders JOIN customers ON customers.id = orders.customer_id WHERE \
         orders.id = $1",
    )
    .bind(order_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    let Some((customer_id, customer_email)) = snapshot else {
        return Ok(None);
    };
    sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id.to_string()).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM customers WHERE id = $1").bind(customer_id).execute(conn).await?;
    debug!("📝️ Order [{order_id}] and customer #{customer_id} deleted");
    Ok(Some(DeletedOrder { order_id: *order_id, customer_email }))
}

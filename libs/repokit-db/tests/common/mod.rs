#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use anyhow::Result;
use repokit_criteria::{Identity, Mapping, PropertyMap, Row, Scalar};
use repokit_db::{ConnectOpts, Db, SqlRepository};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub total_orders: i64,
    pub total_earnings: f64,
    pub date: String,
}

impl Customer {
    pub fn new(id: i64, name: &str, total_orders: i64, total_earnings: f64, date: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            total_orders,
            total_earnings,
            date: date.to_owned(),
        }
    }
}

impl Identity for Customer {
    fn id(&self) -> Scalar {
        Scalar::Int(self.id)
    }
}

pub struct CustomerMapping {
    map: PropertyMap,
}

impl Default for CustomerMapping {
    fn default() -> Self {
        Self {
            map: PropertyMap::new()
                .with("id", "customer_id")
                .with("name", "customer_name")
                .with("totalOrders", "total_orders")
                .with("totalEarnings", "total_earnings")
                .with("date", "created_at"),
        }
    }
}

impl Mapping for CustomerMapping {
    type Entity = Customer;

    fn name(&self) -> &str {
        "customers"
    }

    fn identity(&self) -> &str {
        "customer_id"
    }

    fn map(&self) -> &PropertyMap {
        &self.map
    }

    fn to_row(&self, c: &Customer) -> Row {
        Row::new()
            .with("customer_id", c.id)
            .with("customer_name", c.name.as_str())
            .with("total_orders", c.total_orders)
            .with("total_earnings", c.total_earnings)
            .with("created_at", c.date.as_str())
    }

    fn from_row(&self, row: &Row) -> Option<Customer> {
        Some(Customer {
            id: row.get_i64("customer_id")?,
            name: row.get_str("customer_name").unwrap_or_default().to_owned(),
            total_orders: row.get_i64("total_orders").unwrap_or_default(),
            total_earnings: row.get_f64("total_earnings").unwrap_or_default(),
            date: row.get_str("created_at").unwrap_or_default().to_owned(),
        })
    }
}

/// User whose identity is assigned by the database on insert.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: Option<i64>,
    pub username: String,
    pub active: bool,
}

impl Identity for User {
    fn id(&self) -> Scalar {
        self.user_id.into()
    }
}

pub struct UserMapping {
    map: PropertyMap,
}

impl Default for UserMapping {
    fn default() -> Self {
        Self {
            map: PropertyMap::new()
                .with("userId", "user_id")
                .with("username", "username")
                .with("active", "is_active"),
        }
    }
}

impl Mapping for UserMapping {
    type Entity = User;

    fn name(&self) -> &str {
        "users"
    }

    fn identity(&self) -> &str {
        "user_id"
    }

    fn map(&self) -> &PropertyMap {
        &self.map
    }

    fn auto_generate_id(&self) -> bool {
        true
    }

    fn to_row(&self, u: &User) -> Row {
        Row::new()
            .with("user_id", u.user_id)
            .with("username", u.username.as_str())
            .with("is_active", u.active)
    }

    fn from_row(&self, row: &Row) -> Option<User> {
        Some(User {
            user_id: Some(row.get_i64("user_id")?),
            username: row.get_str("username").unwrap_or_default().to_owned(),
            active: row.get_bool("is_active").unwrap_or_default(),
        })
    }
}

pub fn seed() -> Vec<Customer> {
    vec![
        Customer::new(1, "John Doe", 3, 5.55, "2014-12-11"),
        Customer::new(2, "Junichi Masuda", 3, 50_978.33, "2013-02-22"),
        Customer::new(3, "Shigeru Miyamoto", 5, 47_889.85, "2010-12-01"),
        Customer::new(4, "Ken Sugimori", 4, 69_158.69, "2010-12-10"),
    ]
}

/// Single-connection in-memory database; every connection would otherwise
/// see its own empty database.
pub async fn memory_db() -> Result<Db> {
    let opts = ConnectOpts {
        max_conns: Some(1),
        ..Default::default()
    };
    Ok(Db::open("sqlite::memory:", opts).await?)
}

/// Fresh database holding the four seeded customers and an empty `users` table.
pub async fn customers_db() -> Result<Db> {
    let db = memory_db().await?;
    let pool = db.handle().sqlx_sqlite().unwrap();

    sqlx::query(
        "CREATE TABLE customers (
            customer_id INTEGER PRIMARY KEY,
            customer_name TEXT,
            total_orders INTEGER,
            total_earnings REAL,
            created_at TEXT
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE users (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            is_active INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for c in seed() {
        sqlx::query(
            "INSERT INTO customers (customer_id, customer_name, total_orders, total_earnings, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(c.id)
        .bind(&c.name)
        .bind(c.total_orders)
        .bind(c.total_earnings)
        .bind(&c.date)
        .execute(pool)
        .await?;
    }
    Ok(db)
}

pub async fn customers() -> Result<SqlRepository<CustomerMapping>> {
    Ok(SqlRepository::new(
        customers_db().await?,
        CustomerMapping::default(),
    )?)
}

pub fn ids(customers: &[Customer]) -> Vec<i64> {
    let mut ids: Vec<i64> = customers.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    ids
}

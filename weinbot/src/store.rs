//! SQLite persistence for orders and the staff-notification outbox.
//!
//! Uses WAL mode; one connection behind a mutex. Order creation and its
//! outbox row are written in one transaction, so an order never exists
//! without either a staff post or a pending retry.
//!
//! Outbox rows carry a lease (`claimed_until`). Whoever holds an unexpired
//! lease is the only one allowed to post that order to staff.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::Rng;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::notify::DeliveryResult;
use crate::order::{NewOrder, Order, OrderItem, OrderNumber, OrderStatus, StaffMessageRef, Verdict};

/// Give up drawing order numbers after this many collisions in a row.
const MAX_NUMBER_DRAWS: usize = 1_000;

/// How long a claim on an outbox row lasts. Must outlive one staff post
/// including its request timeout.
pub const OUTBOX_LEASE_SECS: i64 = 60;

const ORDER_COLUMNS: &str = "order_number, requester_id, guild_id, items_json, status, created_at,
     staff_channel_id, staff_message_id, resolved_by, resolved_at, reject_reason, customer_notice";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no free order number after {0} draws")]
    NumbersExhausted(usize),
}

/// Result of a guarded status change.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved(Order),
    AlreadyResolved(OrderStatus),
    NotFound,
}

/// A staff notification still waiting to be posted.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub order_number: OrderNumber,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct OrderStore {
    db: Mutex<Connection>,
}

impl OrderStore {
    /// Open (or create) the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    fn init(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS orders (
                order_number     INTEGER PRIMARY KEY,
                requester_id     TEXT NOT NULL,
                guild_id         TEXT,
                items_json       TEXT NOT NULL,
                status           TEXT NOT NULL DEFAULT 'PENDING',
                created_at       TEXT NOT NULL,
                staff_channel_id TEXT,
                staff_message_id TEXT,
                resolved_by      TEXT,
                resolved_at      TEXT,
                reject_reason    TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
            CREATE INDEX IF NOT EXISTS idx_orders_requester ON orders(requester_id);

            CREATE TABLE IF NOT EXISTS outbox (
                order_number INTEGER PRIMARY KEY REFERENCES orders(order_number),
                attempts     INTEGER NOT NULL DEFAULT 0,
                last_error   TEXT,
                created_at   TEXT NOT NULL
            );
            ",
        )?;

        // Columns added after the first release. A "duplicate column name"
        // error means the column already exists.
        let migrations = [
            "ALTER TABLE orders ADD COLUMN customer_notice TEXT",
            "ALTER TABLE outbox ADD COLUMN claimed_until TEXT",
        ];
        for sql in &migrations {
            let _ = conn.execute(sql, []);
        }
        Ok(())
    }

    // ── Orders ─────────────────────────────────────────────────────────

    /// Persist a new PENDING order under a fresh random number, together
    /// with its outbox row. The row starts out claimed by the caller, who is
    /// expected to post the order to staff right away.
    pub fn create_order<R: Rng + ?Sized>(
        &self,
        draft: &NewOrder,
        rng: &mut R,
    ) -> Result<Order, StoreError> {
        let items_json = serde_json::to_string(&draft.items)?;
        let created_at = Utc::now();

        let mut db = self.db.lock();
        let tx = db.transaction()?;
        let number = draw_free_number(&tx, rng)?;
        tx.execute(
            "INSERT INTO orders (order_number, requester_id, guild_id, items_json, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                number.0,
                draft.requester_id,
                draft.guild_id.as_deref(),
                items_json,
                OrderStatus::Pending.as_str(),
                ts(&created_at),
            ],
        )?;
        tx.execute(
            "INSERT INTO outbox (order_number, attempts, created_at, claimed_until)
             VALUES (?1, 0, ?2, ?3)",
            params![number.0, ts(&created_at), ts(&lease_end(created_at))],
        )?;
        tx.commit()?;

        Ok(Order {
            number,
            requester_id: draft.requester_id.clone(),
            guild_id: draft.guild_id.clone(),
            items: draft.items.clone(),
            status: OrderStatus::Pending,
            created_at,
            staff_message: None,
            resolved_by: None,
            resolved_at: None,
            reject_reason: None,
            customer_notice: None,
        })
    }

    pub fn contains(&self, number: OrderNumber) -> Result<bool, StoreError> {
        let db = self.db.lock();
        Ok(number_taken(&db, number)?)
    }

    pub fn get(&self, number: OrderNumber) -> Result<Option<Order>, StoreError> {
        let db = self.db.lock();
        query_order(&db, number)
    }

    /// Remember where the staff post went and clear the outbox row.
    pub fn attach_staff_message(
        &self,
        number: OrderNumber,
        msg: &StaffMessageRef,
    ) -> Result<(), StoreError> {
        let mut db = self.db.lock();
        let tx = db.transaction()?;
        tx.execute(
            "UPDATE orders SET staff_channel_id = ?2, staff_message_id = ?3 WHERE order_number = ?1",
            params![number.0, msg.channel_id, msg.message_id],
        )?;
        tx.execute("DELETE FROM outbox WHERE order_number = ?1", params![number.0])?;
        tx.commit()?;
        Ok(())
    }

    /// Move a PENDING order to its terminal status. The update only matches
    /// PENDING rows, so a second resolution leaves the row untouched and
    /// reports the status it already has.
    pub fn resolve(
        &self,
        number: OrderNumber,
        verdict: &Verdict,
        resolver: &str,
        at: DateTime<Utc>,
    ) -> Result<ResolveOutcome, StoreError> {
        let reason = match verdict {
            Verdict::Reject { reason } => Some(reason.as_str()),
            Verdict::Accept => None,
        };

        let mut db = self.db.lock();
        let tx = db.transaction()?;
        let changed = tx.execute(
            "UPDATE orders
             SET status = ?2, resolved_by = ?3, resolved_at = ?4, reject_reason = ?5
             WHERE order_number = ?1 AND status = 'PENDING'",
            params![number.0, verdict.status().as_str(), resolver, ts(&at), reason],
        )?;
        let current = query_order(&tx, number)?;
        tx.commit()?;

        Ok(match (changed, current) {
            (_, None) => ResolveOutcome::NotFound,
            (0, Some(order)) => ResolveOutcome::AlreadyResolved(order.status),
            (_, Some(order)) => ResolveOutcome::Resolved(order),
        })
    }

    pub fn record_delivery(
        &self,
        number: OrderNumber,
        result: DeliveryResult,
    ) -> Result<(), StoreError> {
        let db = self.db.lock();
        db.execute(
            "UPDATE orders SET customer_notice = ?2 WHERE order_number = ?1",
            params![number.0, result.as_str()],
        )?;
        Ok(())
    }

    pub fn count_by_status(&self, status: OrderStatus) -> Result<usize, StoreError> {
        let db = self.db.lock();
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM orders WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Orders of one customer, newest first.
    pub fn list_by_requester(&self, requester_id: &str) -> Result<Vec<Order>, StoreError> {
        let db = self.db.lock();
        let mut stmt = db.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE requester_id = ?1
             ORDER BY created_at DESC, order_number DESC"
        ))?;
        let orders = stmt
            .query_map(params![requester_id], row_to_order)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    // ── Outbox ─────────────────────────────────────────────────────────

    /// Outbox rows created before `created_before` and not claimed at `now`,
    /// oldest first.
    pub fn due_outbox(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxEntry>, StoreError> {
        let db = self.db.lock();
        let mut stmt = db.prepare(
            "SELECT order_number, attempts, last_error, created_at FROM outbox
             WHERE created_at < ?1 AND (claimed_until IS NULL OR claimed_until < ?2)
             ORDER BY created_at ASC LIMIT ?3",
        )?;
        let entries = stmt
            .query_map(params![ts(&created_before), ts(&now), limit as i64], |row| {
                Ok(OutboxEntry {
                    order_number: OrderNumber(row.get(0)?),
                    attempts: row.get(1)?,
                    last_error: row.get(2)?,
                    created_at: parse_ts(3, row.get(3)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Take the lease on an outbox row. False when the row is gone or someone
    /// else holds an unexpired claim.
    pub fn claim_outbox(&self, number: OrderNumber, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let db = self.db.lock();
        let changed = db.execute(
            "UPDATE outbox SET claimed_until = ?3
             WHERE order_number = ?1 AND (claimed_until IS NULL OR claimed_until < ?2)",
            params![number.0, ts(&now), ts(&lease_end(now))],
        )?;
        Ok(changed == 1)
    }

    /// Count a failed attempt and release the claim so the relay retries.
    pub fn mark_outbox_failed(&self, number: OrderNumber, error: &str) -> Result<(), StoreError> {
        let db = self.db.lock();
        db.execute(
            "UPDATE outbox SET attempts = attempts + 1, last_error = ?2, claimed_until = NULL
             WHERE order_number = ?1",
            params![number.0, error],
        )?;
        Ok(())
    }

    pub fn drop_outbox(&self, number: OrderNumber) -> Result<(), StoreError> {
        let db = self.db.lock();
        db.execute("DELETE FROM outbox WHERE order_number = ?1", params![number.0])?;
        Ok(())
    }

    /// Run raw SQL against the connection, to put the store into states the
    /// API cannot reach.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) {
        self.db.lock().execute_batch(sql).unwrap();
    }
}

fn lease_end(from: DateTime<Utc>) -> DateTime<Utc> {
    from + chrono::Duration::seconds(OUTBOX_LEASE_SECS)
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn number_taken(conn: &Connection, number: OrderNumber) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = ?1)",
        params![number.0],
        |row| row.get(0),
    )
}

fn draw_free_number<R: Rng + ?Sized>(
    conn: &Connection,
    rng: &mut R,
) -> Result<OrderNumber, StoreError> {
    for _ in 0..MAX_NUMBER_DRAWS {
        let candidate = OrderNumber::random(rng);
        if !number_taken(conn, candidate)? {
            return Ok(candidate);
        }
        tracing::debug!(number = %candidate, "Order number collision, redrawing");
    }
    Err(StoreError::NumbersExhausted(MAX_NUMBER_DRAWS))
}

fn query_order(conn: &Connection, number: OrderNumber) -> Result<Option<Order>, StoreError> {
    let order = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1"),
            params![number.0],
            row_to_order,
        )
        .optional()?;
    Ok(order)
}

fn row_to_order(row: &Row) -> rusqlite::Result<Order> {
    let items_json: String = row.get(3)?;
    let items: Vec<OrderItem> = serde_json::from_str(&items_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let status: String = row.get(4)?;
    let status = OrderStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, format!("unknown status {status}").into())
    })?;

    let staff_channel: Option<String> = row.get(6)?;
    let staff_message: Option<String> = row.get(7)?;
    let staff_message = match (staff_channel, staff_message) {
        (Some(channel_id), Some(message_id)) => Some(StaffMessageRef {
            channel_id,
            message_id,
        }),
        _ => None,
    };

    let resolved_at = match row.get::<_, Option<String>>(9)? {
        Some(s) => Some(parse_ts(9, s)?),
        None => None,
    };

    Ok(Order {
        number: OrderNumber(row.get(0)?),
        requester_id: row.get(1)?,
        guild_id: row.get(2)?,
        items,
        status,
        created_at: parse_ts(5, row.get(5)?)?,
        staff_message,
        resolved_by: row.get(8)?,
        resolved_at,
        reject_reason: row.get(10)?,
        customer_notice: row
            .get::<_, Option<String>>(11)?
            .as_deref()
            .and_then(DeliveryResult::parse),
    })
}

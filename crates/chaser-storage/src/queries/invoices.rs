// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoice status projection.
//!
//! The engine does not own invoices; the surrounding application pushes
//! status updates into this projection so the cancel-if-paid guard can
//! read them locally.

use rusqlite::params;

use chaser_core::ChaserError;

use crate::database::{map_tr_err, Database};

/// Insert or update an invoice projection row.
pub async fn upsert_invoice(
    db: &Database,
    id: &str,
    recipient_id: &str,
    status: &str,
    amount_cents: i64,
    currency: &str,
) -> Result<(), ChaserError> {
    let id = id.to_string();
    let recipient_id = recipient_id.to_string();
    let status = status.to_string();
    let currency = currency.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO invoices (id, recipient_id, status, amount_cents, currency)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     recipient_id = excluded.recipient_id,
                     status = excluded.status,
                     amount_cents = excluded.amount_cents,
                     currency = excluded.currency",
                params![id, recipient_id, status, amount_cents, currency],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Update just the status of an invoice. Returns whether the row existed.
pub async fn set_invoice_status(
    db: &Database,
    id: &str,
    status: &str,
) -> Result<bool, ChaserError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE invoices SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Read an invoice's status.
pub async fn invoice_status(db: &Database, id: &str) -> Result<Option<String>, ChaserError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT status FROM invoices WHERE id = ?1",
                params![id],
                |row| row.get(0),
            );
            match result {
                Ok(status) => Ok(Some(status)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

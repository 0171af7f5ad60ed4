//! Creates the application's database tables.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, audit::create_audit_table, transaction::create_transaction_table};

/// Create the tables for the application in an SQLite database.
///
/// # Errors
/// Returns an error if the tables already exist or there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;
    create_audit_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, db::initialize, party::PartyPair};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The two people whose finances this instance tracks.
    pub parties: PartyPair,
}

impl AppState {
    /// Create a new [AppState] over `connection`, creating the application
    /// tables if the database is empty.
    pub fn new(connection: Connection, parties: PartyPair) -> Result<Self, Error> {
        let table_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'transaction'",
            (),
            |row| row.get(0),
        )?;

        if table_count == 0 {
            initialize(&connection)?;
        }

        Ok(Self {
            db_connection: Arc::new(Mutex::new(connection)),
            parties,
        })
    }
}

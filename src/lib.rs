//! Fintrack is a JSON API for tracking the shared finances of two people.
//!
//! The interesting part lives in [report]: a pure aggregation engine that
//! turns the raw transaction ledger into per-party monthly matrices, a
//! cumulative cash-flow series and per-party balance sheets. Transfers
//! between the two tracked parties are mirrored at creation time so that
//! both ledgers stay reconciled.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod actor;
mod audit;
mod db;
mod endpoints;
mod filter;
mod import;
mod party;
mod report;
mod routing;
mod state;
mod transaction;

pub use db::initialize;
pub use party::{PartyPair, PartySlot};
pub use routing::build_router;
pub use state::AppState;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A transaction was given an amount of zero.
    ///
    /// The sign of an amount carries no meaning on its own (the category
    /// decides the aggregation bucket), but a zero amount records no movement
    /// of money and is rejected.
    #[error("amount must be a non-zero number")]
    InvalidAmount,

    /// A category outside the closed Income/Expense/Transfer set was used.
    #[error("\"{0}\" is not a valid category")]
    UnknownCategory(String),

    /// A party name outside the configured pair was used where a tracked
    /// party is required.
    #[error("\"{0}\" is not a tracked party")]
    UnknownParty(String),

    /// A date string could not be parsed in any of the supported formats.
    #[error("\"{0}\" is not a valid date")]
    InvalidDateFormat(String),

    /// A required text field was empty or missing.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The actor does not hold the role the operation requires.
    #[error("this action requires the admin role")]
    Forbidden,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidAmount
            | Error::UnknownCategory(_)
            | Error::UnknownParty(_)
            | Error::InvalidDateFormat(_)
            | Error::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            // Not intended to be shown to the client.
            Error::SqlError(_) => {
                tracing::error!("An unexpected error occurred: {}", self);

                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "an internal error occurred" })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

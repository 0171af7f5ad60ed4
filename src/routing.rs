//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    audit::get_audit_log_endpoint,
    endpoints,
    filter::filtered_summary_endpoint,
    import::import_transactions_endpoint,
    report::{
        balance_sheet_endpoint, cash_flow_endpoint, monthly_report_endpoint,
        yearly_report_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, list_transactions_endpoint,
        update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::IMPORT, post(import_transactions_endpoint))
        .route(endpoints::MONTHLY_REPORT, get(monthly_report_endpoint))
        .route(endpoints::YEARLY_REPORT, get(yearly_report_endpoint))
        .route(endpoints::CASH_FLOW_REPORT, get(cash_flow_endpoint))
        .route(
            endpoints::BALANCE_SHEET_REPORT,
            get(balance_sheet_endpoint),
        )
        .route(endpoints::FILTERED_SUMMARY, get(filtered_summary_endpoint))
        .route(endpoints::AUDIT_LOG, get(get_audit_log_endpoint))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The fallback for requests that match no route.
async fn get_404_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "the requested resource could not be found" })),
    )
}

#[cfg(test)]
mod endpoint_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, PartyPair, build_router, endpoints, endpoints::format_endpoint};

    fn test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, PartyPair::new("Burimi", "Skenderi")).unwrap();

        TestServer::new(build_router(state))
    }

    fn expense(party: &str, amount: f64) -> Value {
        json!({
            "date": "2025-02-10",
            "account": "Cash",
            "category": "Expense",
            "subcategory": "Rroga",
            "party": party,
            "amount": amount,
        })
    }

    #[tokio::test]
    async fn transfer_counts_once_in_reports() {
        let server = test_server();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "date": "2025-01-02",
                "account": "Bank",
                "category": "Transfer",
                "party": "Burimi",
                "amount": 500.0,
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);

        // The hidden mirror leg stays out of the aggregations, so a single
        // 500 transfer moves each party's balance by exactly 500.
        let sheet: Value = server
            .get(endpoints::BALANCE_SHEET_REPORT)
            .await
            .json();

        assert_eq!(sheet[0]["transfers_out"], json!(500.0));
        assert_eq!(sheet[1]["transfers_out"], json!(0.0));
        assert_eq!(sheet[1]["transfers_in"], json!(500.0));
        assert_eq!(sheet[0]["balance"], json!(-500.0));
        assert_eq!(sheet[1]["balance"], json!(500.0));

        let report: Value = server.get(endpoints::MONTHLY_REPORT).await.json();

        assert_eq!(report["rows"][0]["parties"][0]["total"], json!(-500.0));
        assert_eq!(report["rows"][0]["parties"][1]["total"], json!(500.0));
        assert_eq!(report["rows"][0]["grand_total"], json!(0.0));
    }

    #[tokio::test]
    async fn create_rejects_zero_amount() {
        let server = test_server();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&expense("Burimi", 0.0))
            .await;

        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn listing_hides_incoming_transfer_leg() {
        let server = test_server();
        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "date": "2025-01-02",
                "account": "Bank",
                "category": "Transfer",
                "party": "Skenderi",
                "amount": 250.0,
            }))
            .await;

        let transactions: Value = server.get(endpoints::TRANSACTIONS).await.json();

        let listed = transactions.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["party"], json!("Skenderi"));
    }

    #[tokio::test]
    async fn delete_requires_admin_role() {
        let server = test_server();
        let created: Value = server
            .post(endpoints::TRANSACTIONS)
            .json(&expense("Burimi", 100.0))
            .await
            .json();
        let path = format_endpoint(endpoints::TRANSACTION, created["id"].as_i64().unwrap());

        let denied = server.delete(&path).await;
        denied.assert_status(axum::http::StatusCode::FORBIDDEN);

        let allowed = server
            .delete(&path)
            .add_header("x-actor-role", "admin")
            .await;
        allowed.assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let server = test_server();
        let created: Value = server
            .post(endpoints::TRANSACTIONS)
            .json(&expense("Burimi", 100.0))
            .await
            .json();
        let path = format_endpoint(endpoints::TRANSACTION, created["id"].as_i64().unwrap());

        let response = server.put(&path).json(&expense("Burimi", 150.0)).await;

        response.assert_status_ok();
        let updated: Value = response.json();
        assert_eq!(updated["amount"], json!(150.0));
    }

    #[tokio::test]
    async fn update_missing_transaction_is_not_found() {
        let server = test_server();

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, 42))
            .json(&expense("Burimi", 150.0))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn import_reports_partial_success() {
        let server = test_server();

        let response = server
            .post(endpoints::IMPORT)
            .json(&json!([
                {
                    "date": "2025-01-05",
                    "account": "Cash",
                    "category": "Income",
                    "party": "Burimi",
                    "amount": 1000,
                },
                {
                    "date": "06/01/2025",
                    "account": "Bank",
                    "category": "Expense",
                    "party": "Skenderi",
                    "amount": "200",
                },
                {
                    "date": "2025-01-07",
                    "account": "Cash",
                    "category": "Expense",
                    "party": "Alice",
                    "amount": 50,
                },
            ]))
            .await;

        response.assert_status_ok();
        let summary: Value = response.json();
        assert_eq!(summary["success"], json!(2));
        assert_eq!(summary["failed"], json!(1));
        // The failing entry is the third data row, i.e. row 4 of the
        // spreadsheet including the header.
        assert_eq!(summary["errors"][0]["row"], json!(4));
        assert_eq!(
            summary["errors"][0]["reasons"][0],
            json!("\"Alice\" is not a tracked party")
        );
    }

    #[tokio::test]
    async fn monthly_report_aggregates_created_transactions() {
        let server = test_server();
        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "date": "2025-01-02",
                "account": "Bank",
                "category": "Income",
                "subcategory": "GINGER",
                "party": "Burimi",
                "amount": 1500.0,
            }))
            .await;
        server
            .post(endpoints::TRANSACTIONS)
            .json(&expense("Skenderi", 300.0))
            .await;

        let report: Value = server.get(endpoints::MONTHLY_REPORT).await.json();

        assert_eq!(report["party_names"], json!(["Burimi", "Skenderi"]));
        assert_eq!(report["rows"][0]["label"], json!("Jan-25"));
        assert_eq!(report["rows"][0]["parties"][0]["income_shared"], json!(1500.0));
        assert_eq!(report["rows"][1]["parties"][1]["expense_other"], json!(300.0));
        assert_eq!(report["totals"]["grand_total"], json!(1200.0));
    }

    #[tokio::test]
    async fn filtered_summary_applies_query_predicates() {
        let server = test_server();
        server
            .post(endpoints::TRANSACTIONS)
            .json(&expense("Burimi", 200.0))
            .await;
        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "date": "2025-01-05",
                "account": "Cash",
                "category": "Income",
                "party": "Burimi",
                "amount": 1000.0,
            }))
            .await;

        let response = server
            .get(endpoints::FILTERED_SUMMARY)
            .add_query_param("category", "Expense")
            .add_query_param("year", "2025")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["summary"]["count"], json!(1));
        assert_eq!(body["summary"]["total"], json!(-200.0));
    }

    #[tokio::test]
    async fn mutations_are_audited_with_the_actor() {
        let server = test_server();
        server
            .post(endpoints::TRANSACTIONS)
            .add_header("x-actor", "Skenderi")
            .json(&expense("Skenderi", 75.0))
            .await;

        let entries: Value = server.get(endpoints::AUDIT_LOG).await.json();

        assert_eq!(entries[0]["action"], json!("CREATE"));
        assert_eq!(entries[0]["username"], json!("Skenderi"));
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let server = test_server();

        let response = server.get("/api/nonsense").await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert!(body["error"].is_string());
    }
}

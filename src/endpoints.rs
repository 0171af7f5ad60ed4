//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}',
//! use [format_endpoint].

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to update or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to import a batch of transactions.
pub const IMPORT: &str = "/api/transactions/import";
/// The route for the monthly matrix report.
pub const MONTHLY_REPORT: &str = "/api/reports/monthly";
/// The route for the monthly matrix grouped by year.
pub const YEARLY_REPORT: &str = "/api/reports/monthly/by-year";
/// The route for the cumulative cash-flow series.
pub const CASH_FLOW_REPORT: &str = "/api/reports/cash-flow";
/// The route for the per-party balance sheet.
pub const BALANCE_SHEET_REPORT: &str = "/api/reports/balance-sheet";
/// The route for the filtered summary.
pub const FILTERED_SUMMARY: &str = "/api/reports/summary";
/// The route for the audit trail.
pub const AUDIT_LOG: &str = "/api/audit";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

//! Summary query construction and rendering.

use crate::catalog::resolve_or_create;
use crate::models::{format_amount, Kind, SummaryIntent, SummaryRow};
use crate::store::{FinanceStore, TransactionFilter};
use crate::Result;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

/// Build the record set for a summary request.
///
/// Filter precedence: a category filter together with a kind filter
/// resolves the category (creating it when absent) and filters by its
/// id; a kind filter alone filters by kind; otherwise only the date
/// window applies. Cutoff is today minus `period_days`, inclusive.
pub async fn build_summary(
    store: &dyn FinanceStore,
    user_id: i64,
    request: &SummaryIntent,
) -> Result<Vec<SummaryRow>> {
    let cutoff = Utc::now().date_naive() - Duration::days(request.period_days);

    let mut filter = TransactionFilter {
        user_id,
        cutoff,
        category_id: None,
        kind: None,
    };

    match (&request.category_filter, request.kind_filter) {
        (Some(category_name), Some(kind)) => {
            let category = resolve_or_create(store, category_name, kind).await?;
            filter.category_id = Some(category.id);
        }
        (_, Some(kind)) => {
            filter.kind = Some(kind);
        }
        _ => {}
    }

    store.transactions_since(filter).await
}

/// Flat dump of the matched records: count plus every field per record.
/// Operator-facing; logged, never returned to the user.
pub fn describe_rows(rows: &[SummaryRow]) -> String {
    let mut out = format!("{} record(s)", rows.len());

    for row in rows {
        out.push_str(&format!(
            "\ndate={} amount={} kind={} category={} comment={}",
            row.occurred_on,
            format_amount(row.amount),
            row.kind,
            row.category_name,
            row.comment.as_deref().unwrap_or("-"),
        ));
    }

    out
}

/// User-facing narration of a summary window.
pub fn narrate(rows: &[SummaryRow], period_days: i64) -> String {
    if rows.is_empty() {
        return format!("No transactions recorded in the last {} days.", period_days);
    }

    let income: Decimal = rows
        .iter()
        .filter(|r| r.kind == Kind::Income)
        .map(|r| r.amount)
        .sum();
    let expense: Decimal = rows
        .iter()
        .filter(|r| r.kind == Kind::Expense)
        .map(|r| r.amount)
        .sum();

    format!(
        "Here is your summary for the last {} days: {} transaction(s), income ₹{}, expenses ₹{}, net ₹{}.",
        period_days,
        rows.len(),
        format_amount(income),
        format_amount(expense),
        format_amount(income - expense),
    )
}

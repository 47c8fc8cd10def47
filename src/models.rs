//! Core data models for the finance chat agent

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Kind =================
//

/// Income/Expense classification shared by categories and transactions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Kind {
    Income,
    Expense,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Income => "Income",
            Kind::Expense => "Expense",
        }
    }

    /// Parse the stored text representation.
    pub fn parse(value: &str) -> Option<Kind> {
        match value {
            "Income" => Some(Kind::Income),
            "Expense" => Some(Kind::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Rows =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: Kind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub kind: Kind,
    pub comment: Option<String>,
    pub occurred_on: NaiveDate,
}

/// Transaction fields as supplied by the dispatcher, before the store
/// assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    pub user_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub kind: Kind,
    pub comment: Option<String>,
    pub occurred_on: NaiveDate,
}

/// One matched record in a summary window, joined with its category name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRow {
    pub occurred_on: NaiveDate,
    pub amount: Decimal,
    pub kind: Kind,
    pub comment: Option<String>,
    pub category_name: String,
}

//
// ================= Classified intents =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionIntent {
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub kind: Kind,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

fn default_period_days() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryIntent {
    #[serde(default = "default_period_days")]
    pub period_days: i64,
    #[serde(default)]
    pub category_filter: Option<String>,
    #[serde(default)]
    pub kind_filter: Option<Kind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationalIntent {
    pub response: String,
}

/// Structured interpretation of one user message. Closed union: model
/// output that fits none of these shapes is a classification failure,
/// never a fourth variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum ClassifiedIntent {
    Transaction(TransactionIntent),
    Summary(SummaryIntent),
    Conversational(ConversationalIntent),
}

//
// ================= Money formatting =================
//

/// Format an amount with two decimals and comma-grouped thousands,
/// e.g. `1500` becomes `1,500.00`.
pub fn format_amount(amount: Decimal) -> String {
    let text = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{}", sign, grouped, frac_part)
}

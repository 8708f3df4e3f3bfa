//! Statement sections and their reference prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four statement sections a line item can belong to.
///
/// Sections share one dependency graph per template; the prefix form
/// (`pl:NET_INCOME`) is readable sugar for cross-section references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Profit and loss statement.
    ProfitAndLoss,
    /// Balance sheet.
    BalanceSheet,
    /// Cash flow statement.
    CashFlow,
    /// Carbon statement (emissions accounting).
    Carbon,
}

impl Section {
    /// The namespace prefix used in formulas (`pl`, `bs`, `cf`, `carbon`).
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Section::ProfitAndLoss => "pl",
            Section::BalanceSheet => "bs",
            Section::CashFlow => "cf",
            Section::Carbon => "carbon",
        }
    }

    /// Resolve a namespace prefix back to a section.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "pl" => Some(Section::ProfitAndLoss),
            "bs" => Some(Section::BalanceSheet),
            "cf" => Some(Section::CashFlow),
            "carbon" => Some(Section::Carbon),
            _ => None,
        }
    }

    /// All sections in statement order.
    #[must_use]
    pub fn all() -> [Section; 4] {
        [
            Section::ProfitAndLoss,
            Section::BalanceSheet,
            Section::CashFlow,
            Section::Carbon,
        ]
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::ProfitAndLoss => "profit_and_loss",
            Section::BalanceSheet => "balance_sheet",
            Section::CashFlow => "cash_flow",
            Section::Carbon => "carbon",
        };
        write!(f, "{}", name)
    }
}

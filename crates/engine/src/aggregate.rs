//! Totals derived from the expense list and the budget text.
//!
//! Everything here is recomputed from scratch on every call; nothing is
//! cached between snapshots. Totals always cover the whole list: the category
//! filter only narrows what is displayed.

use std::{fmt, str::FromStr};

use indexmap::{IndexMap, IndexSet};

use crate::{ExpenseRecord, MoneyCents};

/// Share of the budget already spent, rounded to one decimal.
///
/// Never NaN: an empty or non-numeric budget gives `0.0`. A zero budget with
/// something spent is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    pub const ZERO: Percent = Percent(0.0);

    fn of(total: MoneyCents, budget: MoneyCents) -> Self {
        if total.is_zero() {
            return Self::ZERO;
        }
        let raw = total.cents() as f64 / budget.cents() as f64 * 100.0;
        if raw.is_infinite() {
            return Self(raw);
        }
        Self((raw * 10.0).round() / 10.0)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Width of a progress bar, between 0 and 100.
    #[must_use]
    pub fn progress(self) -> f64 {
        self.0.clamp(0.0, 100.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_infinite() {
            let sign = if self.0 < 0.0 { "-" } else { "" };
            return write!(f, "{sign}∞");
        }
        write!(f, "{:.1}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetStatus {
    OnTrack,
    Caution,
    Overspent,
}

impl BudgetStatus {
    /// Thresholds are compared on the numeric, already rounded percentage.
    #[must_use]
    pub fn from_percent(percent: Percent) -> Self {
        match percent.value() {
            p if p < 50.0 => Self::OnTrack,
            p if p < 100.0 => Self::Caution,
            _ => Self::Overspent,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::OnTrack => "🟢 You're doing great!",
            Self::Caution => "🟡 Reminder to always keep an eye on your spending!",
            Self::Overspent => "🔴 You've gone over your budget!",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Labels and values for the pie chart, paired by position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Per-category totals in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategorySums(IndexMap<String, MoneyCents>);

impl CategorySums {
    pub fn from_expenses(expenses: &[ExpenseRecord]) -> Self {
        let mut sums = IndexMap::new();
        for expense in expenses {
            *sums
                .entry(expense.category.clone())
                .or_insert(MoneyCents::ZERO) += expense.amount;
        }
        Self(sums)
    }

    #[must_use]
    pub fn get(&self, category: &str) -> Option<MoneyCents> {
        self.0.get(category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MoneyCents)> {
        self.0.iter().map(|(label, sum)| (label.as_str(), *sum))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn chart(&self) -> ChartSeries {
        ChartSeries {
            labels: self.0.keys().cloned().collect(),
            values: self.0.values().map(|sum| sum.to_major()).collect(),
        }
    }
}

/// Everything the dashboard shows next to the expense list.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub total_spent: MoneyCents,
    pub percent_spent: Percent,
    pub remaining_budget: MoneyCents,
    pub category_sums: CategorySums,
    pub budget_status: BudgetStatus,
}

impl Summary {
    /// Computes the summary over the full, unfiltered list.
    ///
    /// `budget` is the raw text of the budget field.
    pub fn compute(expenses: &[ExpenseRecord], budget: &str) -> Self {
        let total_spent: MoneyCents = expenses.iter().map(|expense| expense.amount).sum();

        let (percent_spent, remaining_budget) = match MoneyCents::parse_lenient(budget) {
            Some(budget) => (Percent::of(total_spent, budget), budget - total_spent),
            None => (Percent::ZERO, MoneyCents::ZERO),
        };

        Self {
            total_spent,
            percent_spent,
            remaining_budget,
            category_sums: CategorySums::from_expenses(expenses),
            budget_status: BudgetStatus::from_percent(percent_spent),
        }
    }
}

/// Category filter applied to the rendered list only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    #[must_use]
    pub fn matches(&self, expense: &ExpenseRecord) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => expense.category == *category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "All" => Self::All,
            other => Self::Category(other.to_string()),
        })
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Category(category) => f.write_str(category),
        }
    }
}

pub fn visible_expenses<'a>(
    expenses: &'a [ExpenseRecord],
    filter: &'a CategoryFilter,
) -> impl Iterator<Item = &'a ExpenseRecord> {
    expenses.iter().filter(move |expense| filter.matches(expense))
}

/// Distinct categories in first-seen order, for the filter picker.
#[must_use]
pub fn category_options(expenses: &[ExpenseRecord]) -> Vec<String> {
    expenses
        .iter()
        .map(|expense| expense.category.as_str())
        .collect::<IndexSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

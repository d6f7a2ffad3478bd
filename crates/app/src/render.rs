//! Plain-text dashboard.

use std::fmt::Write as _;

use engine::{DocumentStore, ExpenseRecord, IdentityProvider, SessionController, Summary};

const BAR_WIDTH: usize = 20;

pub fn dashboard<I: IdentityProvider, S: DocumentStore>(
    controller: &SessionController<I, S>,
) -> String {
    let mut out = String::new();
    let summary = controller.summary();
    budget_section(&mut out, controller.budget(), &summary);
    categories_section(&mut out, &summary);

    let _ = writeln!(out, "\nRecent expenses ({})", controller.filter());
    let mut empty = true;
    for expense in controller.visible_expenses() {
        empty = false;
        expense_line(&mut out, expense);
    }
    if empty {
        let _ = writeln!(out, "  No expenses found.");
    }
    out
}

fn budget_section(out: &mut String, budget: &str, summary: &Summary) {
    if budget.is_empty() {
        let _ = writeln!(out, "Monthly budget: not set");
    } else {
        let _ = writeln!(out, "Monthly budget: {budget}");
    }
    let _ = writeln!(
        out,
        "Spent {} so far ({}%)",
        summary.total_spent, summary.percent_spent
    );

    let filled = (summary.percent_spent.progress() / 100.0 * BAR_WIDTH as f64).round() as usize;
    let _ = writeln!(
        out,
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    );
    let _ = writeln!(out, "Remaining budget: {}", summary.remaining_budget);
    let _ = writeln!(out, "{}", summary.budget_status);
}

fn categories_section(out: &mut String, summary: &Summary) {
    let _ = writeln!(out, "\nSpending by category");
    if summary.category_sums.is_empty() {
        let _ = writeln!(out, "  Add some expenses to see the breakdown.");
        return;
    }
    for (category, sum) in summary.category_sums.iter() {
        let _ = writeln!(out, "  {category:<20} {:>12}", sum.to_string());
    }
}

fn expense_line(out: &mut String, expense: &ExpenseRecord) {
    let _ = write!(
        out,
        "  #{} {:>10}  {}  {}",
        expense.id,
        expense.amount.to_string(),
        expense.category,
        expense.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(note) = &expense.note {
        let _ = write!(out, "  ({note})");
    }
    out.push('\n');
}

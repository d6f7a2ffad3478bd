//! Expense records and the per-user expenses document.
//!
//! The whole collection lives in one document (`users/{uid}/expenses/all`).
//! There are no per-record writes: every mutation builds a new list with the
//! helpers below and the session rewrites the document with it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{MoneyCents, timestamp};

/// Time based identifier: milliseconds since the Unix epoch at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub i64);

impl ExpenseId {
    /// Returns an id derived from `now` that no record in `existing` uses.
    ///
    /// Two additions within the same millisecond would collide on the clock
    /// alone, so the id is bumped past the largest id already present.
    #[must_use]
    pub fn next(existing: &[ExpenseRecord], now: DateTime<Utc>) -> Self {
        let from_clock = now.timestamp_millis();
        let after_existing = existing
            .iter()
            .map(|expense| expense.id.0.saturating_add(1))
            .max()
            .unwrap_or(i64::MIN);
        Self(from_clock.max(after_existing))
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub amount: MoneyCents,
    pub category: String,
    #[serde(
        default,
        serialize_with = "serialize_note",
        deserialize_with = "deserialize_note"
    )]
    pub note: Option<String>,
    #[serde(with = "timestamp::coerce")]
    pub created_at: DateTime<Utc>,
}

fn serialize_note<S: serde::Serializer>(
    note: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(note.as_deref().unwrap_or_default())
}

fn deserialize_note<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let note = Option::<String>::deserialize(deserializer)?;
    Ok(note.filter(|note| !note.is_empty()))
}

/// Raw form input for adding or editing an expense.
///
/// The amount stays text until it reaches the session, which coerces it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub amount: String,
    pub category: String,
    pub note: String,
}

impl ExpenseDraft {
    pub fn new(
        amount: impl Into<String>,
        category: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            category: category.into(),
            note: note.into(),
        }
    }

    /// Amount parsed leniently; a non-numeric amount counts as zero.
    #[must_use]
    pub fn amount(&self) -> MoneyCents {
        match MoneyCents::parse_lenient(&self.amount) {
            Some(amount) => amount,
            None => {
                tracing::warn!("expense amount {:?} is not a number, using 0", self.amount);
                MoneyCents::ZERO
            }
        }
    }

    fn note(&self) -> Option<String> {
        Some(self.note.clone()).filter(|note| !note.is_empty())
    }
}

/// Returns a new list with a record built from `draft` in front.
#[must_use]
pub fn with_added(
    expenses: &[ExpenseRecord],
    draft: &ExpenseDraft,
    now: DateTime<Utc>,
) -> (ExpenseId, Vec<ExpenseRecord>) {
    let id = ExpenseId::next(expenses, now);
    let record = ExpenseRecord {
        id,
        amount: draft.amount(),
        category: draft.category.clone(),
        note: draft.note(),
        created_at: now,
    };
    let mut updated = Vec::with_capacity(expenses.len() + 1);
    updated.push(record);
    updated.extend_from_slice(expenses);
    (id, updated)
}

/// Returns a new list with amount, category and note of `id` replaced, or
/// `None` when no record has that id.
#[must_use]
pub fn with_edited(
    expenses: &[ExpenseRecord],
    id: ExpenseId,
    draft: &ExpenseDraft,
) -> Option<Vec<ExpenseRecord>> {
    if !expenses.iter().any(|expense| expense.id == id) {
        return None;
    }
    Some(
        expenses
            .iter()
            .map(|expense| {
                if expense.id != id {
                    return expense.clone();
                }
                ExpenseRecord {
                    amount: draft.amount(),
                    category: draft.category.clone(),
                    note: draft.note(),
                    ..expense.clone()
                }
            })
            .collect(),
    )
}

/// Returns a new list without `id`, or `None` when no record has that id.
#[must_use]
pub fn without(expenses: &[ExpenseRecord], id: ExpenseId) -> Option<Vec<ExpenseRecord>> {
    let updated: Vec<_> = expenses
        .iter()
        .filter(|expense| expense.id != id)
        .cloned()
        .collect();
    (updated.len() != expenses.len()).then_some(updated)
}

/// Content of `users/{uid}/expenses/all`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensesDocument {
    #[serde(default)]
    pub items: Vec<ExpenseRecord>,
    #[serde(with = "timestamp::coerce", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ExpensesDocument {
    pub fn new(items: Vec<ExpenseRecord>) -> Self {
        Self {
            items,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn record(id: i64, amount: i64, category: &str) -> ExpenseRecord {
        ExpenseRecord {
            id: ExpenseId(id),
            amount: MoneyCents::new(amount),
            category: category.to_string(),
            note: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn next_id_follows_the_clock() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(ExpenseId::next(&[], now), ExpenseId(1_700_000_000_000));
        assert_eq!(
            ExpenseId::next(&[record(5, 100, "Food")], now),
            ExpenseId(1_700_000_000_000)
        );
    }

    #[test]
    fn next_id_never_collides_within_the_same_millisecond() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let (first, list) = with_added(&[], &ExpenseDraft::new("1", "Food", ""), now);
        let (second, list) = with_added(&list, &ExpenseDraft::new("2", "Food", ""), now);
        assert_ne!(first, second);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second);
    }

    #[test]
    fn added_record_goes_first() {
        let now = Utc::now();
        let existing = vec![record(1, 100, "Food")];
        let (id, list) = with_added(&existing, &ExpenseDraft::new("12.5", "Transport", "bus"), now);
        assert_eq!(list[0].id, id);
        assert_eq!(list[0].amount, MoneyCents::new(1250));
        assert_eq!(list[0].note.as_deref(), Some("bus"));
        assert_eq!(list[1], existing[0]);
    }

    #[test]
    fn non_numeric_amount_becomes_zero() {
        let (_, list) = with_added(&[], &ExpenseDraft::new("lots", "Food", ""), Utc::now());
        assert_eq!(list[0].amount, MoneyCents::ZERO);
        assert_eq!(list[0].note, None);
    }

    #[test]
    fn edit_keeps_id_and_creation_time() {
        let existing = vec![record(1, 100, "Food"), record(2, 200, "Rent")];
        let draft = ExpenseDraft::new("3", "Bills", "");
        let edited = with_edited(&existing, ExpenseId(2), &draft).unwrap();
        assert_eq!(edited[0], existing[0]);
        assert_eq!(edited[1].id, ExpenseId(2));
        assert_eq!(edited[1].created_at, existing[1].created_at);
        assert_eq!(edited[1].category, "Bills");
        assert_eq!(edited[1].amount, MoneyCents::new(300));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let existing = vec![record(1, 100, "Food")];
        assert!(with_edited(&existing, ExpenseId(9), &ExpenseDraft::default()).is_none());
        assert!(without(&existing, ExpenseId(9)).is_none());
        assert_eq!(without(&existing, ExpenseId(1)), Some(vec![]));
    }

    #[test]
    fn document_tolerates_raw_timestamps_and_missing_fields() {
        let doc: ExpensesDocument = serde_json::from_value(json!({
            "items": [
                { "id": 2, "amount": 50, "category": "Food", "note": "",
                  "createdAt": 1_700_000_000_000i64 },
                { "id": 1, "amount": 25.5, "category": "Transport",
                  "createdAt": { "seconds": 1_700_000_000i64, "nanoseconds": 0 } },
            ],
        }))
        .unwrap();

        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].created_at, doc.items[1].created_at);
        assert_eq!(doc.items[0].note, None);
        assert_eq!(doc.items[1].amount, MoneyCents::new(2550));

        let empty: ExpensesDocument = serde_json::from_value(json!({})).unwrap();
        assert!(empty.items.is_empty());
    }

    #[test]
    fn document_writes_native_timestamps() {
        let doc = ExpensesDocument::new(vec![record(1, 100, "Food")]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json["items"][0]["createdAt"],
            json!({ "seconds": 1_700_000_000i64, "nanoseconds": 0 })
        );
        assert_eq!(json["items"][0]["note"], json!(""));
        assert_eq!(json["items"][0]["amount"], json!(1.0));
    }
}

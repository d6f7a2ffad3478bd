//! The monthly budget setting (`users/{uid}/settings/budget`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MoneyCents, timestamp};

/// Content of the budget document.
///
/// `amount` is `None` when the user saved something that is not a number:
/// the write still happens, it just carries `null`. A missing document is a
/// different thing (no budget set at all).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSetting {
    #[serde(default)]
    pub amount: Option<MoneyCents>,
    #[serde(with = "timestamp::coerce", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl BudgetSetting {
    /// Builds the setting from raw input text, with no validation.
    pub fn from_input(input: &str, now: DateTime<Utc>) -> Self {
        Self {
            amount: MoneyCents::parse_lenient(input),
            updated_at: now,
        }
    }

    /// Text to put back in the budget field after a load: the plain number,
    /// without trailing zero decimals (`1500`, `12.5`).
    #[must_use]
    pub fn input_text(&self) -> String {
        let Some(amount) = self.amount else {
            return String::new();
        };
        amount
            .to_string()
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_numeric_input_is_stored_as_null() {
        let setting = BudgetSetting::from_input("abc", Utc::now());
        assert_eq!(setting.amount, None);
        let json = serde_json::to_value(&setting).unwrap();
        assert_eq!(json["amount"], json!(null));
        assert!(json["updatedAt"]["seconds"].is_i64());
    }

    #[test]
    fn input_text_round_trips_through_the_document() {
        let setting = BudgetSetting::from_input("1500", Utc::now());
        let json = serde_json::to_value(&setting).unwrap();
        assert_eq!(json["amount"], json!(1500.0));

        let back: BudgetSetting = serde_json::from_value(json).unwrap();
        assert_eq!(back.input_text(), "1500");
    }

    #[test]
    fn input_text_keeps_significant_decimals() {
        let text = |input| BudgetSetting::from_input(input, Utc::now()).input_text();
        assert_eq!(text("12.50"), "12.5");
        assert_eq!(text("12.34"), "12.34");
        assert_eq!(text("100"), "100");
        assert_eq!(text("-75"), "-75");
        assert_eq!(text("abc"), "");
    }

    #[test]
    fn zero_is_a_budget() {
        let setting = BudgetSetting::from_input("0", Utc::now());
        assert_eq!(setting.amount, Some(MoneyCents::ZERO));
        assert_eq!(setting.input_text(), "0");
    }
}

//! Expense tracking engine.
//!
//! The engine keeps a signed-in user's expenses and monthly budget in sync
//! with two documents in a [`DocumentStore`] and derives the dashboard
//! figures ([`Summary`]) from them. Identity comes from an
//! [`IdentityProvider`]. Both boundaries have a database backed
//! implementation ([`LocalIdentity`], [`SqliteStore`]) and the store has an
//! in-process one ([`MemoryStore`]).

pub use aggregate::{
    BudgetStatus, CategoryFilter, CategorySums, ChartSeries, Percent, Summary, category_options,
    visible_expenses,
};
pub use auth::{AuthFailure, Navigation, Route};
pub use budget::BudgetSetting;
pub use error::EngineError;
pub use expenses::{ExpenseDraft, ExpenseId, ExpenseRecord, ExpensesDocument};
pub use identity::{IdentityProvider, LocalIdentity, MIN_PASSWORD_LEN, User};
pub use money::MoneyCents;
pub use session::{Session, SessionController, SessionEvent};
pub use store::{DocumentPath, DocumentStore, MemoryStore, Snapshot, SqliteStore, StoreEvent};
pub use subscription::{Subscription, Watchers};
pub use timestamp::StoreTimestamp;

pub mod aggregate;
pub mod auth;
mod budget;
mod error;
pub mod expenses;
mod identity;
mod money;
mod session;
pub mod store;
mod subscription;
pub mod timestamp;

type ResultEngine<T> = Result<T, EngineError>;

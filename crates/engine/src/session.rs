//! Session controller: keeps local dashboard state in sync with the identity
//! provider and the signed-in user's documents.
//!
//! The controller owns every piece of mutable state and is driven from a
//! single task: callers pump events with [`SessionController::next_event`]
//! (waits) or [`SessionController::settle`] (drains what is queued). The
//! expense list is never edited locally: mutations rewrite the remote
//! document and the list changes when the subscription delivers the new
//! snapshot.
//!
//! Data failures (load, save, subscribe) are logged and dropped. Mutation
//! methods only report whether the write went through.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    BudgetSetting, CategoryFilter, DocumentPath, DocumentStore, ExpenseDraft, ExpenseId,
    ExpenseRecord, ExpensesDocument, IdentityProvider, StoreEvent, Subscription, Summary, User,
    aggregate, expenses, store,
};

/// Who is signed in, and whether the provider has answered at least once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub auth_checked: bool,
}

/// What a pumped event did to the local state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(User),
    SignedOut,
    /// A snapshot replaced the expense list.
    ExpensesUpdated,
    /// A snapshot arrived but left the list as it was (missing or malformed
    /// document).
    ExpensesUnchanged,
    SubscriptionError(String),
    /// The store dropped the expenses subscription.
    ExpensesClosed,
}

enum Incoming {
    Auth(Option<Option<User>>),
    Expenses(Option<StoreEvent>),
}

pub struct SessionController<I, S> {
    identity: Arc<I>,
    store: Arc<S>,
    session: Session,
    expenses: Vec<ExpenseRecord>,
    budget: String,
    filter: CategoryFilter,
    auth_sub: Option<Subscription<Option<User>>>,
    expenses_sub: Option<Subscription<StoreEvent>>,
}

impl<I: IdentityProvider, S: DocumentStore> SessionController<I, S> {
    pub fn new(identity: Arc<I>, store: Arc<S>) -> Self {
        Self {
            identity,
            store,
            session: Session::default(),
            expenses: Vec::new(),
            budget: String::new(),
            filter: CategoryFilter::All,
            auth_sub: None,
            expenses_sub: None,
        }
    }

    /// Subscribes to auth state (once) and applies the first callback.
    pub async fn start(&mut self) -> Option<SessionEvent> {
        if self.auth_sub.is_some() {
            return None;
        }
        self.auth_sub = Some(self.identity.subscribe());
        self.next_event().await
    }

    /// Releases the auth and expenses subscriptions. Local state is kept.
    pub fn shutdown(&mut self) {
        if let Some(sub) = self.auth_sub.take() {
            sub.unsubscribe();
        }
        self.release_expenses();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `true` until the identity provider has answered once.
    pub fn is_loading(&self) -> bool {
        !self.session.auth_checked
    }

    pub fn expenses(&self) -> &[ExpenseRecord] {
        &self.expenses
    }

    pub fn budget(&self) -> &str {
        &self.budget
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    /// Aggregates over the full list, whatever the filter.
    pub fn summary(&self) -> Summary {
        Summary::compute(&self.expenses, &self.budget)
    }

    pub fn visible_expenses(&self) -> impl Iterator<Item = &ExpenseRecord> {
        aggregate::visible_expenses(&self.expenses, &self.filter)
    }

    pub fn category_options(&self) -> Vec<String> {
        aggregate::category_options(&self.expenses)
    }

    fn uid(&self) -> Option<String> {
        self.session.user.as_ref().map(|user| user.uid.clone())
    }

    /// Waits for the next auth or expenses event and applies it.
    ///
    /// Returns `None` when not started or once the auth stream has ended.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let incoming = {
            let auth = self.auth_sub.as_mut()?;
            match self.expenses_sub.as_mut() {
                Some(expenses) => tokio::select! {
                    biased;
                    user = auth.recv() => Incoming::Auth(user),
                    event = expenses.recv() => Incoming::Expenses(event),
                },
                None => Incoming::Auth(auth.recv().await),
            }
        };
        self.apply(incoming).await
    }

    /// Applies every event already queued, auth first. Returns how many.
    pub async fn settle(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let user = self.auth_sub.as_mut().and_then(Subscription::try_recv);
            let incoming = if let Some(user) = user {
                Incoming::Auth(Some(user))
            } else if let Some(event) =
                self.expenses_sub.as_mut().and_then(Subscription::try_recv)
            {
                Incoming::Expenses(Some(event))
            } else {
                return applied;
            };
            self.apply(incoming).await;
            applied += 1;
        }
    }

    async fn apply(&mut self, incoming: Incoming) -> Option<SessionEvent> {
        match incoming {
            Incoming::Auth(Some(user)) => Some(self.handle_auth_change(user).await),
            Incoming::Auth(None) => {
                tracing::warn!("auth state stream ended");
                self.auth_sub = None;
                None
            }
            Incoming::Expenses(Some(event)) => Some(self.handle_expenses_event(event)),
            Incoming::Expenses(None) => {
                self.expenses_sub = None;
                Some(SessionEvent::ExpensesClosed)
            }
        }
    }

    /// Reacts to an auth callback.
    ///
    /// On sign-in the budget is loaded before the expenses subscription is
    /// set up. A different user replaces the previous subscription and state.
    pub async fn handle_auth_change(&mut self, user: Option<User>) -> SessionEvent {
        self.session.auth_checked = true;

        let Some(user) = user else {
            self.release_expenses();
            self.session.user = None;
            self.expenses.clear();
            self.budget.clear();
            return SessionEvent::SignedOut;
        };

        let same_user = self.uid().as_deref() == Some(user.uid.as_str());
        if same_user && self.expenses_sub.is_some() {
            self.session.user = Some(user.clone());
            return SessionEvent::SignedIn(user);
        }

        self.release_expenses();
        if !same_user {
            self.expenses.clear();
            self.budget.clear();
        }
        self.session.user = Some(user.clone());

        self.load_budget().await;
        self.expenses_sub = self.subscribe_expenses(&user.uid).await;
        SessionEvent::SignedIn(user)
    }

    /// Applies one event of the expenses subscription.
    pub fn handle_expenses_event(&mut self, event: StoreEvent) -> SessionEvent {
        let snapshot = match event {
            StoreEvent::Snapshot(snapshot) => snapshot,
            StoreEvent::Error(err) => {
                tracing::error!("Error listening to expenses: {err}");
                return SessionEvent::SubscriptionError(err);
            }
        };

        let expected = self.uid().map(|uid| DocumentPath::expenses(&uid));
        if expected.as_ref() != Some(&snapshot.path) {
            tracing::debug!("ignoring snapshot for {}", snapshot.path);
            return SessionEvent::ExpensesUnchanged;
        }

        match snapshot.decode::<ExpensesDocument>() {
            Ok(Some(document)) => {
                self.expenses = document.items;
                SessionEvent::ExpensesUpdated
            }
            Ok(None) => SessionEvent::ExpensesUnchanged,
            Err(err) => {
                tracing::error!("Error reading expenses: {err}");
                SessionEvent::ExpensesUnchanged
            }
        }
    }

    async fn subscribe_expenses(&self, uid: &str) -> Option<Subscription<StoreEvent>> {
        match self.store.subscribe(&DocumentPath::expenses(uid)).await {
            Ok(sub) => Some(sub),
            Err(err) => {
                tracing::error!("Error setting up expenses listener: {err}");
                None
            }
        }
    }

    fn release_expenses(&mut self) {
        if let Some(sub) = self.expenses_sub.take() {
            sub.unsubscribe();
        }
    }

    /// Reads the budget document once. A missing document leaves the budget
    /// unset.
    pub async fn load_budget(&mut self) {
        let Some(uid) = self.uid() else {
            return;
        };
        match store::read::<BudgetSetting>(&*self.store, &DocumentPath::budget(&uid)).await {
            Ok(Some(setting)) => self.budget = setting.input_text(),
            Ok(None) => tracing::debug!("no budget set for {uid}"),
            Err(err) => tracing::error!("Error loading budget: {err}"),
        }
    }

    /// Stores the raw budget text locally and overwrites the remote setting.
    ///
    /// Called on every change of the budget field; nothing is validated.
    pub async fn save_budget(&mut self, input: &str) -> bool {
        self.budget = input.to_string();
        let Some(uid) = self.uid() else {
            return false;
        };
        let setting = BudgetSetting::from_input(input, Utc::now());
        match store::write(&*self.store, &DocumentPath::budget(&uid), &setting).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Error saving budget: {err}");
                false
            }
        }
    }

    /// Overwrites the expenses document with `expenses`.
    pub async fn replace_all(&self, expenses: Vec<ExpenseRecord>) -> bool {
        let Some(uid) = self.uid() else {
            return false;
        };
        let document = ExpensesDocument::new(expenses);
        match store::write(&*self.store, &DocumentPath::expenses(&uid), &document).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Error saving expenses: {err}");
                false
            }
        }
    }

    pub async fn add_expense(&self, draft: &ExpenseDraft) -> Option<ExpenseId> {
        self.session.user.as_ref()?;
        let (id, updated) = expenses::with_added(&self.expenses, draft, Utc::now());
        self.replace_all(updated).await.then_some(id)
    }

    pub async fn edit_expense(&self, id: ExpenseId, draft: &ExpenseDraft) -> bool {
        let Some(updated) = expenses::with_edited(&self.expenses, id, draft) else {
            tracing::debug!("no expense {id} to edit");
            return false;
        };
        self.replace_all(updated).await
    }

    pub async fn delete_expense(&self, id: ExpenseId) -> bool {
        let Some(updated) = expenses::without(&self.expenses, id) else {
            tracing::debug!("no expense {id} to delete");
            return false;
        };
        self.replace_all(updated).await
    }
}

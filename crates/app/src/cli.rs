use clap::{Args, Parser, Subcommand};
use engine::{
    CategoryFilter, DocumentStore, ExpenseDraft, ExpenseId, IdentityProvider, SessionController,
};

use crate::{
    error::{AppError, Result},
    render,
};

#[derive(Parser, Debug)]
#[command(name = "spent")]
#[command(about = "Track expenses against a monthly budget")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    pub config: Option<String>,
    /// Override the account email.
    #[arg(long)]
    pub email: Option<String>,
    /// Override the SQLite database path.
    #[arg(long)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the account, then show the (empty) dashboard.
    SignUp,
    /// Show totals, the category breakdown and the expense list.
    Summary {
        /// Only list expenses of this category ("All" lists everything).
        #[arg(long)]
        category: Option<CategoryFilter>,
    },
    /// Set the monthly budget.
    Budget { amount: String },
    Add(ExpenseArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        expense: ExpenseArgs,
    },
    Delete { id: i64 },
}

#[derive(Args, Debug)]
pub struct ExpenseArgs {
    #[arg(long)]
    amount: String,
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    note: String,
}

impl From<ExpenseArgs> for ExpenseDraft {
    fn from(args: ExpenseArgs) -> Self {
        ExpenseDraft::new(args.amount, args.category, args.note)
    }
}

/// Runs `command` against a started session and prints the dashboard.
pub async fn execute<I: IdentityProvider, S: DocumentStore>(
    controller: &mut SessionController<I, S>,
    command: Command,
) -> Result<()> {
    match command {
        Command::SignUp => {}
        Command::Summary { category } => {
            if let Some(filter) = category {
                controller.set_filter(filter);
            }
        }
        Command::Budget { amount } => {
            if !controller.save_budget(&amount).await {
                return Err(AppError::NotSaved("budget"));
            }
        }
        Command::Add(expense) => {
            let id = controller
                .add_expense(&expense.into())
                .await
                .ok_or(AppError::NotSaved("expense"))?;
            tracing::info!("added expense {id}");
        }
        Command::Edit { id, expense } => {
            if !controller.edit_expense(ExpenseId(id), &expense.into()).await {
                return Err(AppError::NotSaved("expense"));
            }
        }
        Command::Delete { id } => {
            if !controller.delete_expense(ExpenseId(id)).await {
                return Err(AppError::NotSaved("expense"));
            }
        }
    }

    controller.settle().await;
    print!("{}", render::dashboard(controller));
    Ok(())
}

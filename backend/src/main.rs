//! `expense-tracker` command-line entry point.
//!
//! Wires the Diesel adapters into the domain services and prints every
//! result as JSON on stdout. Failures are printed as the JSON error payload
//! on stderr with a non-zero exit status.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use mockable::{DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use expense_tracker::cap_fs;
use expense_tracker::config::AppSettings;
use expense_tracker::domain::ports::LoginService;
use expense_tracker::domain::{
    AccessMediator, AccountManager, Argon2CredentialStore, BuildMode, Error, ExpenseId,
    ExpenseImporter, ExpenseLedger, ExpensePayload, ImportBatch, ListFilterParams,
    LoginCredentials, PasswordLoginService, RegistrationPayload, TokenService, UserPayload,
    token_settings_from_env,
};
use expense_tracker::outbound::persistence::{
    DbPool, DieselExpenseRepository, DieselUserRepository,
};

/// `expense-tracker` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "expense-tracker",
    about = "Register, log in and manage personal expenses",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct TokenArg {
    /// Bearer token returned by `login`.
    #[arg(long, env = "EXPENSE_TRACKER_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "EXPENSE_TRACKER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Exchange credentials for a bearer token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "EXPENSE_TRACKER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Record an expense.
    AddExpense {
        #[command(flatten)]
        auth: TokenArg,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: Option<String>,
        /// Defaults to today (UTC).
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// List expenses, newest first.
    ListExpenses {
        #[command(flatten)]
        auth: TokenArg,
        /// `last_week`, `last_month` or `last_3_months`; wins over dates.
        #[arg(long)]
        period: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<String>,
    },
    /// Permanently delete an expense.
    DeleteExpense {
        #[command(flatten)]
        auth: TokenArg,
        #[arg(long)]
        id: i64,
    },
    /// Delete the account and all of its expenses.
    DeleteAccount {
        #[command(flatten)]
        auth: TokenArg,
    },
    /// Import accounts and expenses from a JSON batch file.
    Import {
        #[arg(value_name = "path")]
        path: PathBuf,
    },
}

type Users = DieselUserRepository;
type Expenses = DieselExpenseRepository;

struct Services {
    accounts: AccountManager<Users>,
    ledger: ExpenseLedger<Expenses>,
}

impl Services {
    async fn connect(settings: &AppSettings) -> Result<Self, Error> {
        let pool = DbPool::new(settings.pool_config())
            .await
            .map_err(|err| Error::service_unavailable(format!("database unavailable: {err}")))?;
        let credentials = Argon2CredentialStore::new(settings.hashing_cost())
            .map_err(|err| Error::internal(format!("invalid hashing parameters: {err}")))?;
        Ok(Self {
            accounts: AccountManager::new(
                Arc::new(DieselUserRepository::new(pool.clone())),
                Arc::new(credentials),
            ),
            ledger: ExpenseLedger::new(
                Arc::new(DieselExpenseRepository::new(pool)),
                Arc::new(DefaultClock),
            ),
        })
    }

    fn tokens() -> Result<Arc<TokenService>, Error> {
        let env = DefaultEnv::new();
        let settings = token_settings_from_env(&env, BuildMode::from_debug_assertions())
            .map_err(|err| Error::internal(format!("token configuration invalid: {err}")))?;
        Ok(Arc::new(TokenService::new(&settings, Arc::new(DefaultClock))))
    }

    fn mediator(&self) -> Result<AccessMediator<Users, Expenses>, Error> {
        Ok(AccessMediator::new(
            self.accounts.clone(),
            self.ledger.clone(),
            Self::tokens()?,
        ))
    }
}

fn main() -> ExitCode {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let outcome = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| Error::internal(format!("create Tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(cli.command)));

    match outcome {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{}", json!({ "error": error }));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<Value, Error> {
    let settings = AppSettings::load_from_iter([OsString::from("expense-tracker")])
        .map_err(|err| Error::internal(format!("load configuration: {err}")))?;
    let services = Services::connect(&settings).await?;

    match command {
        Command::Register {
            email,
            name,
            password,
        } => {
            let user = services
                .accounts
                .register(&RegistrationPayload::new(&email, &password, &name))
                .await?;
            to_json(&UserPayload::from(user))
        }
        Command::Login { email, password } => {
            let login = PasswordLoginService::new(services.accounts.clone(), Services::tokens()?);
            let response = login
                .login(&LoginCredentials::new(&email, &password))
                .await?;
            to_json(&response)
        }
        Command::AddExpense {
            auth,
            amount,
            description,
            category,
            date,
            currency,
        } => {
            let payload = ExpensePayload {
                amount: Some(amount),
                description: Some(description),
                category,
                date,
                currency,
            };
            let view = services
                .mediator()?
                .create_expense(&auth.token, &payload)
                .await?;
            to_json(&view)
        }
        Command::ListExpenses {
            auth,
            period,
            from,
            to,
        } => {
            let params = ListFilterParams {
                period,
                from_date: from,
                to_date: to,
            };
            let views = services
                .mediator()?
                .list_expenses(&auth.token, &params)
                .await?;
            to_json(&views)
        }
        Command::DeleteExpense { auth, id } => {
            let view = services
                .mediator()?
                .delete_expense(&auth.token, ExpenseId::new(id))
                .await?;
            to_json(&view)
        }
        Command::DeleteAccount { auth } => {
            services.mediator()?.delete_account(&auth.token).await?;
            Ok(json!({ "deleted": true }))
        }
        Command::Import { path } => {
            let raw = cap_fs::read_file_to_string(&path).map_err(|err| {
                Error::invalid_request(format!("read {}: {err}", path.display()))
            })?;
            let batch: ImportBatch = serde_json::from_str(&raw).map_err(|err| {
                Error::invalid_request(format!("parse {}: {err}", path.display()))
            })?;
            let report = ExpenseImporter::new(services.accounts, services.ledger)
                .import(&batch)
                .await?;
            to_json(&report)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| Error::internal(format!("encode output: {err}")))
}

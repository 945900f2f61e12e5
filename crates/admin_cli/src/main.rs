use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, Money, NewAccount, NewStockItem, Quantity, StockKind, StockPlace};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub password: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "household_admin")]
#[command(about = "Admin utilities for the household service (bootstrap users, accounts, stock)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./household.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Account(Account),
    Stock(Stock),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// Prompted for when absent.
    #[arg(long, env = "HOUSEHOLD_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    Balance(AccountBalanceArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    name: String,
    /// Owning user; the account is shared when absent.
    #[arg(long)]
    owner: Option<String>,
    #[arg(long, default_value = "0", value_parser = parse_money)]
    starting_balance: Money,
    #[arg(long)]
    rejects_negative: bool,
}

#[derive(Args, Debug)]
struct AccountBalanceArgs {
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct Stock {
    #[command(subcommand)]
    command: StockCommand,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    Add(StockAddArgs),
    Low(StockLowArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Household,
    Pet,
    Personal,
}

impl From<KindArg> for StockKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Household => StockKind::Household,
            KindArg::Pet => StockKind::Pet,
            KindArg::Personal => StockKind::Personal,
        }
    }
}

#[derive(Args, Debug)]
struct StockAddArgs {
    /// User recorded as the actor in the stock history.
    #[arg(long)]
    actor: String,
    #[arg(long)]
    name: String,
    #[arg(long, value_enum)]
    kind: KindArg,
    #[arg(long, value_parser = parse_quantity)]
    quantity: Quantity,
    #[arg(long)]
    unit: Option<String>,
    #[arg(long, value_parser = parse_quantity)]
    min: Option<Quantity>,
    /// Household only.
    #[arg(long)]
    room: Option<String>,
    /// Household only.
    #[arg(long)]
    spot: Option<String>,
    /// Required for pet stock.
    #[arg(long)]
    pet: Option<String>,
    /// Required for personal stock.
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Args, Debug)]
struct StockLowArgs {
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse().map_err(|err: engine::EngineError| err.to_string())
}

fn parse_quantity(raw: &str) -> Result<Quantity, String> {
    raw.parse().map_err(|err: engine::EngineError| err.to_string())
}

fn stock_place(args: &StockAddArgs) -> Result<StockPlace, String> {
    match args.kind {
        KindArg::Household => Ok(StockPlace::Household {
            room: args.room.clone(),
            spot: args.spot.clone(),
        }),
        KindArg::Pet => args
            .pet
            .clone()
            .map(|pet| StockPlace::Pet { pet })
            .ok_or_else(|| "--pet is required for pet stock".to_string()),
        KindArg::Personal => args
            .owner
            .clone()
            .map(|owner| StockPlace::Personal { owner })
            .ok_or_else(|| "--owner is required for personal stock".to_string()),
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db.clone()).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = match args.password {
                Some(password) if !password.is_empty() => password,
                _ => prompt_password_twice()?,
            };

            if users::Entity::find_by_id(args.username.clone())
                .one(&db)
                .await?
                .is_some()
            {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }

            let user = users::ActiveModel {
                username: Set(args.username.clone()),
                password: Set(password),
            };
            users::Entity::insert(user).exec(&db).await?;

            println!("created user: {}", args.username);
        }
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let mut cmd = NewAccount::new(&args.name)
                .starting_balance(args.starting_balance)
                .rejects_negative(args.rejects_negative);
            if let Some(owner) = args.owner {
                cmd = cmd.owner(owner);
            }
            let account_id = engine.new_account(cmd).await?;
            println!("created account: {} ({account_id})", args.name);
        }
        Command::Account(Account {
            command: AccountCommand::Balance(args),
        }) => {
            let account = engine.account(args.id).await?;
            let balance = engine.balance(args.id).await?;
            println!("{}: {balance}", account.name);
        }
        Command::Stock(Stock {
            command: StockCommand::Add(args),
        }) => {
            let place = match stock_place(&args) {
                Ok(place) => place,
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            };
            let mut item = NewStockItem::new(&args.name, place, args.quantity);
            item.unit = args.unit.clone();
            item.min_quantity = args.min;
            let handle = engine.add_stock_item(item, &args.actor).await?;
            println!("added stock: {} ({handle})", args.name);
        }
        Command::Stock(Stock {
            command: StockCommand::Low(args),
        }) => {
            for item in engine.low_stock(args.kind.map(StockKind::from)).await? {
                let min = item.min_quantity.unwrap_or(Quantity::ZERO);
                println!(
                    "{}\t{}\t{} / {}",
                    item.name,
                    item.place.label(),
                    item.quantity,
                    min
                );
            }
        }
    }

    Ok(())
}

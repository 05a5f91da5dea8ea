//! Demo terminal binary
//!
//! Replays the reference ATM session (wrong PIN, right PIN, balance,
//! deposit, withdrawal, an over-limit withdrawal, eject) against in-memory
//! collaborators stocked from `ATM_*` environment variables.

mod config;

use anyhow::{Context, Result, bail};
use atm_core::{AccountId, Amount, Pin, SessionError};
use atm_runtime::SessionController;
use atm_testing::ReferenceTerminal;
use config::TerminalConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atm_terminal=info,atm_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = TerminalConfig::from_env().context("Failed to load terminal configuration")?;
    tracing::info!(?config, "Terminal configured");

    println!("=== ATM Session Demo ===\n");

    let terminal = ReferenceTerminal::custom(
        &config.card_id,
        &config.pin,
        &config.account_id,
        config.opening_balance,
        config.cash_reserve,
    );
    let mut atm = SessionController::new(terminal.environment());
    let account = AccountId::new(config.account_id.as_str());

    let card = atm.insert_card();
    println!("Card inserted: {card}");

    let wrong_pin = if config.pin == "0000" { "9999" } else { "0000" };
    let accepted = atm.enter_pin(&Pin::new(wrong_pin))?;
    println!("PIN {wrong_pin}: {}", if accepted { "accepted" } else { "rejected" });

    if !atm.enter_pin(&Pin::new(config.pin.as_str()))? {
        bail!("Configured PIN was rejected for card {card}");
    }
    println!("PIN accepted");

    atm.select_account(account.clone())?;
    println!("Selected account {account}");
    println!("Balance: {}", atm.balance()?);

    atm.deposit(Amount::new(50))?;
    println!("\nDeposited 50, balance: {}", atm.balance()?);

    match atm.withdraw(Amount::new(70)) {
        Ok(()) => println!("Withdrew 70, balance: {}", atm.balance()?),
        Err(error) if error.is_precondition() => println!("Withdrawal of 70 refused: {error}"),
        Err(error) => return Err(error).context("Withdrawal left the terminal inconsistent"),
    }

    let balance = atm.balance()?;
    let over_limit = balance
        .checked_add(Amount::new(1))
        .context("Balance too large for the over-limit demo")?;
    println!("\nAttempting to withdraw {over_limit} (balance {balance})...");
    match atm.withdraw(over_limit) {
        Err(
            error @ (SessionError::InsufficientFunds { .. }
            | SessionError::InsufficientCash { .. }),
        ) => {
            println!("Refused as expected: {error}");
        }
        Err(error) => return Err(error).context("Unexpected failure on over-limit withdrawal"),
        Ok(()) => bail!("Over-limit withdrawal of {over_limit} was not refused"),
    }
    println!("Balance unchanged: {}", atm.balance()?);
    println!("Cash left in machine: {}", terminal.cash().reserve());

    println!("\nSession before eject:");
    println!("{}", serde_json::to_string_pretty(&atm.snapshot())?);

    atm.eject_card();
    println!("\nCard ejected, stage: {}", atm.stage());

    println!("\n=== Demo Complete ===");
    Ok(())
}

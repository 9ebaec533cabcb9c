//! Transaction example
//!
//! This example demonstrates transaction management including:
//! - Closure-scoped transactions that commit on success
//! - Rolling back when a statement fails
//! - Implicit rollback when a transaction is dropped
//!
//! Run with: cargo run --example transactions

use rust_database_pool::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Rust Database Pool - Transaction Example ===\n");

    let dir = tempfile::tempdir()?;
    let config = ConnectionConfig::new()
        .with_database(dir.path().join("transactions.db").to_string_lossy())
        .with_pool_size(2)
        .with_max_pool_size(2);
    let db = Database::sqlite(config)?;

    println!("1. Setting up accounts table...");
    db.execute(
        "CREATE TABLE accounts (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            balance REAL NOT NULL CHECK(balance >= 0)
        )",
    )?;
    let accounts = vec![
        vec![1.into(), "Alice".into(), 1000.0.into()],
        vec![2.into(), "Bob".into(), 500.0.into()],
        vec![3.into(), DatabaseValue::from("Charlie"), 750.0.into()],
    ];
    db.batch_insert("accounts", &["id", "name", "balance"], &accounts)?;
    println!("   ✓ Accounts created\n");
    print_balances(&db)?;

    println!("\n2. Successful transfer (Alice -> Bob: $100)");
    match db.transaction(|tx| transfer(tx, 1, 2, 100.0)) {
        Ok(()) => println!("   ✓ Transaction committed"),
        Err(e) => println!("   ✗ Transaction rolled back: {}", e),
    }
    print_balances(&db)?;

    println!("\n3. Failing transfer (Bob -> Charlie: $10000)");
    match db.transaction(|tx| transfer(tx, 2, 3, 10_000.0)) {
        Ok(()) => println!("   ✓ Transaction committed"),
        Err(e) => println!("   ✗ Transaction rolled back: {}", e),
    }
    print_balances(&db)?;

    println!("\n4. Abandoned transaction (dropped without commit)");
    {
        let tx = db.begin_transaction()?;
        tx.execute("UPDATE accounts SET balance = 0 WHERE id = 3")?;
        println!("   Charlie zeroed inside the transaction, dropping it...");
    }
    print_balances(&db)?;

    println!("\n5. Explicit commit");
    let tx = db.begin_transaction()?;
    tx.execute_with_params(
        "INSERT INTO accounts (id, name, balance) VALUES (?, ?, ?)",
        &[4.into(), "Diana".into(), 250.0.into()],
    )?;
    tx.commit()?;
    print_balances(&db)?;

    println!("\n=== Example completed successfully! ===");
    Ok(())
}

fn transfer(tx: &Transaction<'_>, from: i32, to: i32, amount: f64) -> Result<()> {
    tx.execute_with_params(
        "UPDATE accounts SET balance = balance - ? WHERE id = ?",
        &[amount.into(), from.into()],
    )?;
    tx.execute_with_params(
        "UPDATE accounts SET balance = balance + ? WHERE id = ?",
        &[amount.into(), to.into()],
    )?;
    Ok(())
}

fn print_balances(db: &Database) -> Result<()> {
    println!("   Current balances:");
    for row in db.query("SELECT name, balance FROM accounts ORDER BY id")? {
        println!(
            "   - {}: ${:.2}",
            row.value("name")?.as_string(),
            row.get_as::<f64>("balance")?
        );
    }
    Ok(())
}

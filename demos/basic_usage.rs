//! Basic database usage example
//!
//! This example demonstrates basic pool operations including:
//! - Opening a pooled SQLite database
//! - Creating tables and inserting with bound parameters
//! - Batch inserts
//! - Querying and decoding typed values
//! - Asynchronous queries through the worker threads
//!
//! Run with: cargo run --example basic_usage
//! Set `RUST_LOG=rust_database_pool=debug` to see pool activity.

use rust_database_pool::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Rust Database Pool - Basic Usage Example ===\n");

    // Every pooled connection opens the same file, so they all see the same data
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("basic_usage.db");

    println!("1. Opening pool...");
    let config = ConnectionConfig::new()
        .with_database(path.to_string_lossy())
        .with_pool_size(4)
        .with_max_pool_size(8)
        .with_worker_threads(2);
    let db = Database::sqlite(config)?;
    println!("   ✓ {:?}\n", db.stats());

    println!("2. Creating table...");
    db.execute(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL,
            age INT,
            balance REAL
        )",
    )?;
    println!("   ✓ Table created\n");

    println!("3. Inserting data...");
    let affected = db.execute_with_params(
        "INSERT INTO users (username, email, age, balance) VALUES (?, ?, ?, ?)",
        &[
            "alice".into(),
            "alice@example.com".into(),
            30.into(),
            1500.50.into(),
        ],
    )?;
    println!("   ✓ Inserted {} row(s)", affected);

    let rows = vec![
        vec!["bob".into(), "bob@example.com".into(), 25.into(), 2300.75.into()],
        vec!["charlie".into(), "charlie@example.com".into(), 35.into(), 980.25.into()],
        vec!["diana".into(), "diana@example.com".into(), DatabaseValue::Null, 3200.00.into()],
    ];
    let affected = db.batch_insert("users", &["username", "email", "age", "balance"], &rows)?;
    println!("   ✓ Batch inserted {} row(s)\n", affected);

    println!("4. Querying all users...");
    let results = db.query("SELECT * FROM users ORDER BY id")?;
    println!("   Found {} users:", results.len());
    for row in &results {
        let id = row.get_as::<i64>("id")?;
        let username = row.value("username")?.as_string();
        let age = row.get_as::<Option<i32>>("age")?;
        let balance = row.get_as::<f64>("balance")?;
        println!(
            "   - User #{}: {} - Age: {}, Balance: ${:.2}",
            id,
            username,
            age.map_or_else(|| "unknown".to_string(), |a| a.to_string()),
            balance
        );
    }
    println!();

    println!("5. Prepared statement reused with new bindings...");
    {
        let conn = db.pool().get()?;
        let mut stmt = conn.prepare("SELECT username FROM users WHERE balance > ? ORDER BY id")?;
        for threshold in [1000.0, 2000.0] {
            stmt.reset()?;
            let rows = stmt.bind(threshold).execute_query()?;
            println!("   Balance > {:.0}: {} user(s)", threshold, rows.len());
        }
    }
    println!();

    println!("6. Asynchronous queries...");
    let handles: Vec<_> = ["alice", "bob", "charlie"]
        .iter()
        .map(|name| {
            db.query_with_params_async(
                "SELECT balance FROM users WHERE username = ?",
                vec![(*name).into()],
            )
        })
        .collect::<Result<_>>()?;
    for (name, handle) in ["alice", "bob", "charlie"].iter().zip(handles) {
        let rows = handle.wait()?;
        println!("   - {}: ${:.2}", name, rows[0].get_as::<f64>("balance")?);
    }
    println!();

    println!("7. Updating data...");
    let affected = db.execute("UPDATE users SET balance = balance + 100.0 WHERE age < 30")?;
    println!("   ✓ Updated {} row(s)\n", affected);

    println!("8. Final user count...");
    let results = db.query("SELECT COUNT(*) AS count FROM users")?;
    println!("   Remaining users: {}\n", results[0].get_as::<i64>("count")?);

    println!("9. Shutting down...");
    db.shutdown();
    println!("   ✓ Closed");

    println!("\n=== Example completed successfully! ===");

    Ok(())
}

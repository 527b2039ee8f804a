//! Basic usage example for `fieldcrypt`.
//!
//! Wires the plugin into a callback chain and walks one entity through the
//! create, query and read paths.

use fieldcrypt::prelude::*;
use std::sync::Arc;

#[derive(Entity, Debug, Default)]
#[entity(table = "users")]
struct User {
    id: u64,
    name: String,
    #[crypto("aes")]
    email: String,
    #[crypto("chacha20")]
    notes: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("fieldcrypt Basic Usage Example");
    println!("==============================\n");

    // Register strategies once at startup
    let registry = Arc::new(StrategyRegistry::new());
    registry.register(AesStrategy::new("1234567890123456")?);
    registry.register(ChaChaStrategy::new("1234567890123456")?);
    println!("✓ Registered strategies: {:?}\n", registry.names());

    // Install the plugin into the host's callbacks
    let mut chain = CallbackChain::new();
    chain.use_plugin(&CryptoPlugin::new(registry))?;
    println!("✓ Installed callbacks: {chain:?}\n");

    // Create: tagged fields are encrypted in place
    let mut user = User {
        id: 1,
        name: "User1".to_string(),
        email: "user1@example.com".to_string(),
        notes: Some("prefers email contact".to_string()),
    };
    chain.run(Hook::BeforeCreate, &mut Statement::new(Dest::model(&mut user)))?;
    println!("Stored row:");
    println!("  name:  {}", user.name);
    println!("  email: {}", user.email);
    println!("  notes: {:?}\n", user.notes);

    // Query: literals compared against encrypted columns are encrypted too
    let mut query = Statement::new(Dest::None)
        .with_schema(User::SCHEMA)
        .filter(Expr::eq("email", "user1@example.com"))
        .filter(Expr::raw(
            "email = ?",
            vec![CryptoValue::new("email", "user1@example.com").into()],
        ));
    chain.run(Hook::BeforeQuery, &mut query)?;
    println!("Rewritten WHERE clause:");
    for expr in query.where_clause.iter().flat_map(|w| &w.exprs) {
        println!("  {expr:?}");
    }
    println!();

    // Read: rows scanned back are decrypted in place
    chain.run(Hook::AfterQuery, &mut Statement::new(Dest::model(&mut user)))?;
    println!("Loaded entity:");
    println!("  email: {}", user.email);
    println!("  notes: {:?}", user.notes);

    println!("\n✓ Example completed successfully!");
    Ok(())
}

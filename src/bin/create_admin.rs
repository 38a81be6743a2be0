//! Seeds an admin account. Admin-only routes (product/showroom management)
//! require a user created here.

use anyhow::{bail, Result};
use std::env;
use tracing_subscriber::EnvFilter;

use showroom_ar::catalog::{auth, models::Role, DocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: create_admin <name> <email> <password>");
        std::process::exit(1);
    }
    let (name, email, password) = (&args[1], &args[2], &args[3]);

    let url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store = DocumentStore::connect(&url).await?;

    if store.user_by_email(email).await?.is_some() {
        bail!("user {email} already exists");
    }

    let digest = auth::hash_password(password)?;
    let user = store.create_user(name, email, &digest, Role::Admin).await?;
    println!("admin created: {} (id {})", user.email, user.id);

    Ok(())
}

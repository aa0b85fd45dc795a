//! Print the Argon2 hash for a password, for seeding `users.password_hash`.
//!
//! Usage: `hash-password <password>`

use tasklist_service::utils::{hash_password, Password};

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: hash-password <password>"))?;

    let hash = hash_password(&Password::new(password))?;
    println!("{}", hash.as_str());

    Ok(())
}

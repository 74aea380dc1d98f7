//! Create admin command handler

use anyhow::{Context, bail};
use std::io::{self, BufRead, Write};

use crate::config::Config;
use crate::db::{Store, hash_password};
use crate::domain::Role;
use crate::models::user::NewUser;
use crate::services::fields;
use crate::services::passwords::check_new_password;

fn prompt_password() -> anyhow::Result<String> {
    print!("Password: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_create_admin(
    config: &Config,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let email = fields::normalize_email(email).map_err(anyhow::Error::msg)?;

    let store = Store::new(&config.general.database_path).await?;
    if store.email_exists(&email).await? {
        bail!("A user with the email \"{email}\" already exists.");
    }

    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    check_new_password("", &password, config.security.min_password_length)
        .map_err(anyhow::Error::msg)?;

    let security = config.security.clone();
    let password_hash =
        tokio::task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

    let user = store
        .create_user(NewUser {
            email,
            password_hash,
            first_name: fields::title_case(first_name.trim()),
            last_name: fields::title_case(last_name.trim()),
            department: String::new(),
            position: String::new(),
            role: Role::Admin,
            is_active: true,
            is_superuser: true,
            must_change_password: false,
        })
        .await?;

    println!("Created admin {} (ID: {})", user.email, user.id);
    Ok(())
}

//! Expire certificates command handler

use crate::config::Config;
use crate::db::Store;
use crate::domain::expiry::today;

pub async fn cmd_expire_certificates(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let today = today();
    let expired = store.expire_overdue_certificates(today).await?;

    if expired == 0 {
        println!("No overdue certificates as of {today}.");
    } else {
        println!("Marked {expired} certificate(s) as expired as of {today}.");
    }

    Ok(())
}

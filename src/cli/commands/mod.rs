mod admin;
mod expire;
mod migrate;

pub use admin::cmd_create_admin;
pub use expire::cmd_expire_certificates;
pub use migrate::cmd_migrate;

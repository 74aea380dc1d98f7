pub mod category;
pub mod certificate;
pub mod provider;
pub mod stats;
pub mod user;

pub mod catalog;
pub mod certificate;
pub mod user;

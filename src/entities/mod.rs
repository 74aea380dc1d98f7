pub mod prelude;

pub mod certificate_categories;
pub mod certificate_providers;
pub mod certificates;
pub mod users;

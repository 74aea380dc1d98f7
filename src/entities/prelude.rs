pub use super::certificate_categories::Entity as CertificateCategories;
pub use super::certificate_providers::Entity as CertificateProviders;
pub use super::certificates::Entity as Certificates;
pub use super::users::Entity as Users;

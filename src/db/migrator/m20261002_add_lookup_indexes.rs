use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (index name, table, columns)
const INDEXES: &[(&str, &str, &[&str])] = &[
    ("idx_users_email", "users", &["email"]),
    ("idx_users_role", "users", &["role"]),
    (
        "idx_certificates_user_status",
        "certificates",
        &["user_id", "status"],
    ),
    ("idx_certificates_provider", "certificates", &["provider_id"]),
    ("idx_certificates_category", "certificates", &["category_id"]),
    ("idx_certificates_status", "certificates", &["status"]),
    ("idx_certificates_expiry_date", "certificates", &["expiry_date"]),
    ("idx_certificates_issue_date", "certificates", &["issue_date"]),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, columns) in INDEXES {
            let mut index = Index::create();
            index.name(*name).table(Alias::new(*table)).if_not_exists();
            for column in *columns {
                index.col(Alias::new(*column));
            }
            manager.create_index(index.to_owned()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _) in INDEXES {
            manager
                .drop_index(
                    Index::drop()
                        .name(*name)
                        .table(Alias::new(*table))
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}

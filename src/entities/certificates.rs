use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "certificates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub provider_id: i32,
    pub category_id: i32,
    pub name: String,
    pub certification_id: String,
    pub issue_date: Date,
    /// `None` for lifetime certifications.
    pub expiry_date: Option<Date>,
    /// `ACTIVE`, `EXPIRED` or `REVOKED`
    pub status: String,
    pub certificate_file: Option<String>,
    pub verification_url: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::certificate_providers::Entity",
        from = "Column::ProviderId",
        to = "super::certificate_providers::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    CertificateProviders,
    #[sea_orm(
        belongs_to = "super::certificate_categories::Entity",
        from = "Column::CategoryId",
        to = "super::certificate_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    CertificateCategories,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::certificate_providers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CertificateProviders.def()
    }
}

impl Related<super::certificate_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CertificateCategories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

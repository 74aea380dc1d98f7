use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Login identifier, always stored lower-cased.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub position: String,

    /// `ADMIN` or `EMPLOYEE`
    pub role: String,

    pub is_active: bool,
    pub is_superuser: bool,

    /// Set for accounts created with a temporary password.
    pub must_change_password: bool,

    /// Path relative to the upload root.
    pub profile_image: Option<String>,

    pub date_joined: String,
    pub last_login: Option<String>,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::certificates::Entity")]
    Certificates,
}

impl Related<super::certificates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Certificates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use std::collections::HashMap;

use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter, QuerySelect, QueryTrait,
    RelationTrait,
};

use crate::domain::CertificateStatus;
use crate::entities::{certificate_categories, certificate_providers, certificates};
use crate::models::certificate::{CertificateCounts, NamedCount};

use super::certificate::Scope;

/// Category bucket, carrying the category's chart color.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub color: String,
    pub count: u64,
}

/// Grouped certificate counts computed in the database.
pub struct StatsRepository {
    conn: DatabaseConnection,
}

fn count_expr() -> sea_orm::sea_query::SimpleExpr {
    Expr::col((certificates::Entity, certificates::Column::Id)).count()
}

fn to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn sort_desc<T>(rows: &mut [T], key: impl Fn(&T) -> (u64, &str)) {
    rows.sort_by(|a, b| {
        let (ca, na) = key(a);
        let (cb, nb) = key(b);
        cb.cmp(&ca).then_with(|| na.cmp(nb))
    });
}

impl StatsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn scoped(scope: Scope) -> sea_orm::Select<certificates::Entity> {
        certificates::Entity::find()
            .select_only()
            .apply_if(scope.user_id(), |q, id| {
                q.filter(certificates::Column::UserId.eq(id))
            })
    }

    pub async fn counts_by_status(&self, scope: Scope) -> Result<CertificateCounts> {
        let rows: Vec<(String, i64)> = Self::scoped(scope)
            .column(certificates::Column::Status)
            .column_as(count_expr(), "count")
            .group_by(certificates::Column::Status)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count certificates by status")?;

        let mut counts = CertificateCounts::default();
        for (status, count) in rows {
            let status: CertificateStatus = status.parse()?;
            counts.add(status, to_u64(count));
        }
        Ok(counts)
    }

    /// Status tallies for every user with at least one certificate.
    pub async fn counts_by_user(&self) -> Result<HashMap<i32, CertificateCounts>> {
        let rows: Vec<(i32, String, i64)> = certificates::Entity::find()
            .select_only()
            .column(certificates::Column::UserId)
            .column(certificates::Column::Status)
            .column_as(count_expr(), "count")
            .group_by(certificates::Column::UserId)
            .group_by(certificates::Column::Status)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count certificates by user")?;

        let mut map: HashMap<i32, CertificateCounts> = HashMap::new();
        for (user_id, status, count) in rows {
            let status: CertificateStatus = status.parse()?;
            map.entry(user_id).or_default().add(status, to_u64(count));
        }
        Ok(map)
    }

    /// Provider buckets, largest first.
    pub async fn counts_by_provider(&self, scope: Scope) -> Result<Vec<NamedCount>> {
        let rows: Vec<(String, i64)> = Self::scoped(scope)
            .column_as(certificate_providers::Column::Name, "name")
            .column_as(count_expr(), "count")
            .join(
                JoinType::InnerJoin,
                certificates::Relation::CertificateProviders.def(),
            )
            .group_by(certificate_providers::Column::Name)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count certificates by provider")?;

        let mut buckets: Vec<NamedCount> = rows
            .into_iter()
            .map(|(name, count)| NamedCount {
                name,
                count: to_u64(count),
            })
            .collect();
        sort_desc(&mut buckets, |b| (b.count, b.name.as_str()));
        Ok(buckets)
    }

    pub async fn counts_by_category(&self, scope: Scope) -> Result<Vec<CategoryCount>> {
        let rows: Vec<(String, String, i64)> = Self::scoped(scope)
            .column_as(certificate_categories::Column::Name, "name")
            .column_as(certificate_categories::Column::Color, "color")
            .column_as(count_expr(), "count")
            .join(
                JoinType::InnerJoin,
                certificates::Relation::CertificateCategories.def(),
            )
            .group_by(certificate_categories::Column::Name)
            .group_by(certificate_categories::Column::Color)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count certificates by category")?;

        let mut buckets: Vec<CategoryCount> = rows
            .into_iter()
            .map(|(name, color, count)| CategoryCount {
                name,
                color,
                count: to_u64(count),
            })
            .collect();
        sort_desc(&mut buckets, |b| (b.count, b.name.as_str()));
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_desc_breaks_ties_by_name() {
        let mut rows = vec![
            NamedCount {
                name: "b".into(),
                count: 2,
            },
            NamedCount {
                name: "a".into(),
                count: 2,
            },
            NamedCount {
                name: "c".into(),
                count: 5,
            },
        ];
        sort_desc(&mut rows, |r| (r.count, r.name.as_str()));
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }
}

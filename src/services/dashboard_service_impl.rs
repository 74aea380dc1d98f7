//! `SeaORM` implementation of the `DashboardService` trait.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};

use crate::db::{Scope, SearchFields, Store};
use crate::domain::CertificateStatus;
use crate::domain::expiry::today;
use crate::models::user::UserSummary;
use crate::services::certificate_service::TopEmployee;
use crate::services::dashboard_service::{
    Dashboard, DashboardError, DashboardKpis, DashboardService, MonthBucket, StatusSlice,
};

const TOP_PROVIDER_LIMIT: usize = 10;
const TOP_EMPLOYEE_LIMIT: usize = 5;
const RECENT_LIMIT: u64 = 5;
const EXPIRING_PREVIEW: usize = 5;
const TIMELINE_DAYS: i64 = 365;

pub struct SeaOrmDashboardService {
    store: Store,
    expiring_soon_days: i64,
}

impl SeaOrmDashboardService {
    #[must_use]
    pub const fn new(store: Store, expiring_soon_days: i64) -> Self {
        Self {
            store,
            expiring_soon_days,
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Buckets `issue_dates` by month, from the month containing
/// `today - 365 days` through the current month. Months without issues
/// are kept with a zero count.
pub fn monthly_timeline(issue_dates: &[NaiveDate], today: NaiveDate) -> Vec<MonthBucket> {
    let start = first_of_month(today - Duration::days(TIMELINE_DAYS));
    let end = first_of_month(today);

    let mut buckets = Vec::new();
    let mut cursor = Some(start);
    while let Some(month) = cursor
        && month <= end
    {
        let count = issue_dates
            .iter()
            .filter(|d| d.year() == month.year() && d.month() == month.month())
            .count() as u64;
        buckets.push(MonthBucket {
            month: month.format("%b %Y").to_string(),
            count,
        });
        cursor = next_month(month);
    }
    buckets
}

#[async_trait]
impl DashboardService for SeaOrmDashboardService {
    async fn dashboard(&self) -> Result<Dashboard, DashboardError> {
        let today = today();
        let threshold = self.expiring_soon_days;

        let counts = self.store.certificate_counts(Scope::Company).await?;
        let expiring = self
            .store
            .list_expiring_certificates(Scope::Company, today, threshold, None)
            .await?;

        let kpis = DashboardKpis {
            active_employees: self.store.count_active_users().await?,
            total_certificates: counts.total,
            active_certificates: counts.active,
            expired_certificates: counts.expired,
            expiring_soon: expiring.len() as u64,
        };

        let status_distribution = CertificateStatus::ALL
            .into_iter()
            .map(|status| StatusSlice {
                status,
                label: status.label(),
                count: match status {
                    CertificateStatus::Active => counts.active,
                    CertificateStatus::Expired => counts.expired,
                    CertificateStatus::Revoked => counts.revoked,
                },
                color: status.chart_color(),
            })
            .filter(|slice| slice.count > 0)
            .collect();

        let mut top_providers = self
            .store
            .certificate_counts_by_provider(Scope::Company)
            .await?;
        top_providers.truncate(TOP_PROVIDER_LIMIT);

        let since = today - Duration::days(TIMELINE_DAYS);
        let issue_dates = self.store.list_issue_dates_since(since).await?;
        let timeline = monthly_timeline(&issue_dates, today);

        let per_user = self.store.certificate_counts_by_user().await?;
        let mut top_employees: Vec<TopEmployee> = self
            .store
            .list_users(true, None, SearchFields::NameAndEmail)
            .await?
            .iter()
            .filter_map(|user| {
                let total = per_user.get(&user.id)?.total;
                (total > 0).then(|| TopEmployee {
                    employee: UserSummary::from(user),
                    certificate_count: total,
                })
            })
            .collect();
        top_employees.sort_by(|a, b| b.certificate_count.cmp(&a.certificate_count));
        top_employees.truncate(TOP_EMPLOYEE_LIMIT);

        let recent = self
            .store
            .list_recent_certificates(Scope::Company, RECENT_LIMIT)
            .await?;
        let preview: Vec<_> = expiring.into_iter().take(EXPIRING_PREVIEW).collect();

        Ok(Dashboard {
            kpis,
            status_distribution,
            top_providers,
            timeline,
            top_employees,
            recent_certificates: self.store.certificate_views(recent, today, threshold).await?,
            expiring_soon: self.store.certificate_views(preview, today, threshold).await?,
        })
    }
}

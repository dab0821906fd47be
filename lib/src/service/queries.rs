// lib/src/service/queries.rs

//! Listing, sorting, pagination and the upcoming-visit buckets.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use models::errors::FieldError;
use models::medical::{Visit, VisitPriority, VisitStatus, VisitType};

use crate::scheduling::validator::{non_blank, parse_field};

/// Raw list parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitQuery {
    /// Comma-separated list of statuses.
    pub status: Option<String>,
    pub visit_type: Option<String>,
    pub priority: Option<String>,
    pub assigned_doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub department_id: Option<String>,
    pub location: Option<String>,
    /// `YYYY-MM-DD` (clinic-local day) or RFC 3339.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        PageLimits {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitPage {
    pub visits: Vec<Visit>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    ScheduledDateTime,
    CreatedAt,
    UpdatedAt,
    Priority,
    Status,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduledDateTime" => Ok(SortKey::ScheduledDateTime),
            "createdAt" => Ok(SortKey::CreatedAt),
            "updatedAt" => Ok(SortKey::UpdatedAt),
            "priority" => Ok(SortKey::Priority),
            "status" => Ok(SortKey::Status),
            other => Err(format!("invalid sortBy: {}", other)),
        }
    }
}

#[derive(Debug, Default)]
struct Filter {
    statuses: Vec<VisitStatus>,
    visit_type: Option<VisitType>,
    priority: Option<VisitPriority>,
    assigned_doctor_id: Option<String>,
    patient_id: Option<String>,
    department_id: Option<String>,
    location: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl Filter {
    fn matches(&self, visit: &Visit) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&visit.status) {
            return false;
        }
        if self.visit_type.is_some_and(|t| t != visit.visit_type)
            || self.priority.is_some_and(|p| p != visit.priority)
        {
            return false;
        }
        let eq = |want: &Option<String>, have: Option<&str>| {
            want.as_deref().is_none_or(|w| have == Some(w))
        };
        if !eq(&self.assigned_doctor_id, visit.assigned_doctor_id.as_deref())
            || !eq(&self.patient_id, Some(visit.patient_id.as_str()))
            || !eq(&self.department_id, visit.department_id.as_deref())
        {
            return false;
        }
        if let Some(location) = &self.location {
            if !visit
                .location
                .as_deref()
                .is_some_and(|l| l.trim().eq_ignore_ascii_case(location))
            {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(at) = visit.scheduled_date_time else {
                return false;
            };
            if self.from.is_some_and(|from| at < from) || self.to.is_some_and(|to| at >= to) {
                return false;
            }
        }
        true
    }
}

/// Parses a date bound. Plain dates cover the whole clinic-local day: a lower
/// bound starts at local midnight, an upper bound ends at the next one.
fn parse_bound(
    field: &str,
    raw: &str,
    offset: &FixedOffset,
    upper: bool,
) -> Result<DateTime<Utc>, FieldError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        let at = at.with_timezone(&Utc);
        return Ok(if upper { at + Duration::nanoseconds(1) } else { at });
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        FieldError::new(field, format!("{} must be YYYY-MM-DD or RFC 3339", field))
    })?;
    let day = if upper { date.succ_opt().unwrap_or(date) } else { date };
    start_of_day(day, offset)
        .ok_or_else(|| FieldError::new(field, format!("{} is out of range", field)))
}

pub(crate) fn start_of_day(date: NaiveDate, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()
        .map(|d| d.with_timezone(&Utc))
}

fn compare(key: SortKey, a: &Visit, b: &Visit) -> Ordering {
    match key {
        // Unscheduled visits sort after scheduled ones.
        SortKey::ScheduledDateTime => match (a.scheduled_date_time, b.scheduled_date_time) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

/// Filters out soft-deleted visits, then applies the query.
pub fn list_visits(
    visits: Vec<Visit>,
    query: &VisitQuery,
    offset: &FixedOffset,
    limits: PageLimits,
) -> Result<VisitPage, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut filter = Filter::default();

    if let Some(raw) = non_blank(query.status.as_deref()) {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match parse_field::<VisitStatus>("status", part) {
                Ok(status) => filter.statuses.push(status),
                Err(e) => errors.push(e),
            }
        }
    }
    if let Some(raw) = non_blank(query.visit_type.as_deref()) {
        match parse_field::<VisitType>("visitType", &raw) {
            Ok(t) => filter.visit_type = Some(t),
            Err(e) => errors.push(e),
        }
    }
    if let Some(raw) = non_blank(query.priority.as_deref()) {
        match parse_field::<VisitPriority>("priority", &raw) {
            Ok(p) => filter.priority = Some(p),
            Err(e) => errors.push(e),
        }
    }
    filter.assigned_doctor_id = non_blank(query.assigned_doctor_id.as_deref());
    filter.patient_id = non_blank(query.patient_id.as_deref());
    filter.department_id = non_blank(query.department_id.as_deref());
    filter.location = non_blank(query.location.as_deref());
    if let Some(raw) = non_blank(query.date_from.as_deref()) {
        match parse_bound("dateFrom", &raw, offset, false) {
            Ok(at) => filter.from = Some(at),
            Err(e) => errors.push(e),
        }
    }
    if let Some(raw) = non_blank(query.date_to.as_deref()) {
        match parse_bound("dateTo", &raw, offset, true) {
            Ok(at) => filter.to = Some(at),
            Err(e) => errors.push(e),
        }
    }

    let sort_key = match non_blank(query.sort_by.as_deref()) {
        Some(raw) => raw.parse::<SortKey>().unwrap_or_else(|msg| {
            errors.push(FieldError::new("sortBy", msg));
            SortKey::CreatedAt
        }),
        None => SortKey::CreatedAt,
    };
    let descending = match non_blank(query.sort_order.as_deref()).as_deref() {
        None | Some("desc") => true,
        Some("asc") => false,
        Some(other) => {
            errors.push(FieldError::new("sortOrder", format!("invalid sortOrder: {}", other)));
            true
        }
    };
    if query.page == Some(0) {
        errors.push(FieldError::new("page", "page must be at least 1"));
    }
    if query.limit == Some(0) {
        errors.push(FieldError::new("limit", "limit must be at least 1"));
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut matched: Vec<Visit> = visits
        .into_iter()
        .filter(|v| !v.is_deleted() && filter.matches(v))
        .collect();
    matched.sort_by(|a, b| {
        let ord = compare(sort_key, a, b).then_with(|| a.id.cmp(&b.id));
        if descending { ord.reverse() } else { ord }
    });

    let page = query.page.unwrap_or(1);
    let limit = query
        .limit
        .unwrap_or(limits.default_limit)
        .min(limits.max_limit);
    let total = matched.len();
    let total_pages = total.div_ceil(limit as usize);
    let visits = matched
        .into_iter()
        .skip((page as usize - 1) * limit as usize)
        .take(limit as usize)
        .collect();

    Ok(VisitPage {
        visits,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingVisits {
    pub today: Vec<Visit>,
    pub tomorrow: Vec<Visit>,
    pub this_week: Vec<Visit>,
    pub next_week: Vec<Visit>,
    pub overdue: Vec<Visit>,
}

/// Buckets live scheduled visits by clinic-local day. Weeks run Monday to
/// Sunday; `thisWeek` holds the rest of the current week after tomorrow.
/// Overdue visits started in the past without anyone checking them in.
pub fn upcoming_visits(visits: Vec<Visit>, now: DateTime<Utc>, offset: &FixedOffset) -> UpcomingVisits {
    let today = now.with_timezone(offset).date_naive();
    let tomorrow = today + Duration::days(1);
    let days_to_sunday = 6 - i64::from(today.weekday().num_days_from_monday());
    let end_of_week = today + Duration::days(days_to_sunday);
    let end_of_next_week = end_of_week + Duration::days(7);

    let mut buckets = UpcomingVisits::default();
    let mut live: Vec<Visit> = visits
        .into_iter()
        .filter(|v| !v.is_deleted() && !v.status.is_terminal() && v.scheduled_date_time.is_some())
        .collect();
    live.sort_by_key(|v| (v.scheduled_date_time, v.id));

    for visit in live {
        let Some(at) = visit.scheduled_date_time else {
            continue;
        };
        if at < now {
            if matches!(
                visit.status,
                VisitStatus::Pending | VisitStatus::Scheduled | VisitStatus::Rescheduled
            ) {
                buckets.overdue.push(visit);
            }
            continue;
        }
        let day = at.with_timezone(offset).date_naive();
        if day == today {
            buckets.today.push(visit);
        } else if day == tomorrow {
            buckets.tomorrow.push(visit);
        } else if day <= end_of_week {
            buckets.this_week.push(visit);
        } else if day <= end_of_next_week {
            buckets.next_week.push(visit);
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn visit(at: Option<DateTime<Utc>>, status: VisitStatus, priority: VisitPriority) -> Visit {
        let created = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        Visit {
            id: Uuid::new_v4(),
            patient_id: "p-1".into(),
            assigned_doctor_id: Some("d-1".into()),
            visit_type: VisitType::Routine,
            priority,
            status,
            scheduled_date_time: at,
            duration: at.map(|_| 30),
            location: Some("Room 1".into()),
            department_id: None,
            check_in_date_time: None,
            check_out_date_time: None,
            reason_for_visit: "checkup".into(),
            notes: None,
            vitals: None,
            outcome: None,
            follow_up_required: None,
            follow_up_date: None,
            discharge_instructions: None,
            created_at: created,
            updated_at: created,
            created_by: "u-1".into(),
            updated_by: None,
            deleted_at: None,
        }
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, d, h, 0, 0).unwrap()
    }

    #[test]
    fn filters_sorts_and_paginates() {
        let mut visits = vec![
            visit(Some(day(8, 9)), VisitStatus::Pending, VisitPriority::Low),
            visit(Some(day(8, 11)), VisitStatus::Scheduled, VisitPriority::Urgent),
            visit(Some(day(9, 9)), VisitStatus::Cancelled, VisitPriority::High),
            visit(None, VisitStatus::Pending, VisitPriority::Medium),
        ];
        visits[3].deleted_at = Some(day(1, 0));

        let query = VisitQuery {
            status: Some("pending,scheduled".into()),
            sort_by: Some("priority".into()),
            sort_order: Some("desc".into()),
            limit: Some(1),
            ..VisitQuery::default()
        };
        let page = list_visits(visits.clone(), &query, &utc(), PageLimits::default()).unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.visits[0].priority, VisitPriority::Urgent);

        let by_day = VisitQuery {
            date_from: Some("2030-01-09".into()),
            date_to: Some("2030-01-09".into()),
            ..VisitQuery::default()
        };
        let page = list_visits(visits, &by_day, &utc(), PageLimits::default()).unwrap();
        assert_eq!(page.visits.len(), 1);
        assert_eq!(page.visits[0].status, VisitStatus::Cancelled);
    }

    #[test]
    fn clamps_limit_and_rejects_bad_parameters() {
        let query = VisitQuery {
            limit: Some(1000),
            ..VisitQuery::default()
        };
        let page = list_visits(Vec::new(), &query, &utc(), PageLimits::default()).unwrap();
        assert_eq!(page.pagination.limit, 100);
        assert_eq!(page.pagination.total_pages, 0);

        let bad = VisitQuery {
            status: Some("pending,bogus".into()),
            sort_by: Some("name".into()),
            date_from: Some("yesterday".into()),
            ..VisitQuery::default()
        };
        let errors = list_visits(Vec::new(), &bad, &utc(), PageLimits::default()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["status", "dateFrom", "sortBy"]);
    }

    #[test]
    fn buckets_upcoming_visits_by_local_day() {
        // Wednesday 2030-01-09 08:00.
        let now = day(9, 8);
        let visits = vec![
            visit(Some(day(9, 7)), VisitStatus::Scheduled, VisitPriority::Low),
            visit(Some(day(9, 7)), VisitStatus::InProgress, VisitPriority::Low),
            visit(Some(day(9, 15)), VisitStatus::Pending, VisitPriority::Low),
            visit(Some(day(10, 9)), VisitStatus::Scheduled, VisitPriority::Low),
            visit(Some(day(12, 9)), VisitStatus::Scheduled, VisitPriority::Low),
            visit(Some(day(13, 9)), VisitStatus::Scheduled, VisitPriority::Low),
            visit(Some(day(14, 9)), VisitStatus::Scheduled, VisitPriority::Low),
            visit(Some(day(20, 9)), VisitStatus::Scheduled, VisitPriority::Low),
            visit(Some(day(21, 9)), VisitStatus::Scheduled, VisitPriority::Low),
            visit(Some(day(11, 9)), VisitStatus::Completed, VisitPriority::Low),
        ];
        let buckets = upcoming_visits(visits, now, &utc());
        assert_eq!(buckets.overdue.len(), 1);
        assert_eq!(buckets.today.len(), 1);
        assert_eq!(buckets.tomorrow.len(), 1);
        assert_eq!(buckets.this_week.len(), 2);
        assert_eq!(buckets.next_week.len(), 2);
    }
}

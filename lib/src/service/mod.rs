// lib/src/service/mod.rs

pub mod queries;
pub mod visit_service;

pub use queries::{
    list_visits, upcoming_visits, PageLimits, Pagination, UpcomingVisits, VisitPage, VisitQuery,
};
pub use visit_service::{Availability, MutationOutcome, VisitDetails, VisitService};

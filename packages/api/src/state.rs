// ABOUTME: Shared application state for API handlers
// ABOUTME: Wires every service manager over one SQLite pool

use std::sync::Arc;

use sqlx::SqlitePool;

use cartshift_comments::{CommentManager, CommentStorage};
use cartshift_consultations::{CalendarProvider, ConsultationManager, ConsultationStorage};
use cartshift_organizations::OrganizationStorage;
use cartshift_pricing::{PricingManager, PricingOfferStorage};
use cartshift_requests::{RequestManager, RequestStorage};

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub organizations: Arc<OrganizationStorage>,
    pub requests: Arc<RequestManager>,
    pub comments: Arc<CommentManager>,
    pub pricing: Arc<PricingManager>,
    pub consultations: Arc<ConsultationManager>,
}

impl AppState {
    /// Build the full service stack from a pool and a calendar collaborator
    pub fn new(pool: SqlitePool, calendar: Arc<dyn CalendarProvider>) -> Self {
        Self::with_channel_capacity(pool, calendar, 200)
    }

    /// Like `new`, with an explicit snapshot channel capacity
    pub fn with_channel_capacity(
        pool: SqlitePool,
        calendar: Arc<dyn CalendarProvider>,
        channel_capacity: usize,
    ) -> Self {
        let organizations = Arc::new(OrganizationStorage::new(pool.clone()));
        let requests = Arc::new(RequestManager::with_capacity(
            Arc::new(RequestStorage::new(pool.clone())),
            channel_capacity,
        ));
        let comments = Arc::new(CommentManager::with_capacity(
            Arc::new(CommentStorage::new(pool.clone())),
            channel_capacity,
        ));
        let pricing = Arc::new(PricingManager::with_capacity(
            Arc::new(PricingOfferStorage::new(pool.clone())),
            requests.clone(),
            channel_capacity,
        ));
        let consultations = Arc::new(ConsultationManager::with_capacity(
            Arc::new(ConsultationStorage::new(pool.clone())),
            calendar,
            channel_capacity,
        ));

        Self {
            pool,
            organizations,
            requests,
            comments,
            pricing,
            consultations,
        }
    }
}

// ABOUTME: Pricing offer service layer with validation and real-time snapshots
// ABOUTME: Keeps request-list subscribers fresh when bundling changes links

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::warn;

use cartshift_core::Actor;
use cartshift_requests::RequestManager;

use crate::error::{PricingError, PricingResult};
use crate::storage::PricingOfferStorage;
use crate::types::{
    PricingOffer, PricingOfferCreateInput, PricingOfferStatus, PricingOfferUpdateInput,
};
use crate::validator::{validate_offer_create, validate_offer_update};

const DEFAULT_CHANNEL_CAPACITY: usize = 200;

pub struct PricingManager {
    storage: Arc<PricingOfferStorage>,
    requests: Arc<RequestManager>,
    /// Per-organization snapshot channels
    org_channels: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<PricingOffer>>>>>,
    /// Agency-wide snapshot channel
    all_channel: broadcast::Sender<Vec<PricingOffer>>,
    channel_capacity: usize,
}

impl PricingManager {
    pub fn new(storage: Arc<PricingOfferStorage>, requests: Arc<RequestManager>) -> Self {
        Self::with_capacity(storage, requests, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(
        storage: Arc<PricingOfferStorage>,
        requests: Arc<RequestManager>,
        channel_capacity: usize,
    ) -> Self {
        let (all_channel, _) = broadcast::channel(channel_capacity);
        Self {
            storage,
            requests,
            org_channels: Arc::new(RwLock::new(HashMap::new())),
            all_channel,
            channel_capacity,
        }
    }

    /// Agency-wide stream of every offer, newest first
    pub fn subscribe_all(&self) -> broadcast::Receiver<Vec<PricingOffer>> {
        self.all_channel.subscribe()
    }

    /// Per-organization stream. Draft filtering for client-role callers is
    /// the caller's responsibility, as it is in the source system.
    pub async fn subscribe_for_org(&self, org_id: &str) -> broadcast::Receiver<Vec<PricingOffer>> {
        let mut channels = self.org_channels.write().await;
        channels
            .entry(org_id.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe()
    }

    async fn broadcast(&self, org_id: &str) -> PricingResult<()> {
        if self.all_channel.receiver_count() > 0 {
            let all = self.storage.list_all().await?;
            if self.all_channel.send(all).is_err() {
                warn!("Failed to broadcast agency-wide offer snapshot");
            }
        }

        let tx = {
            let channels = self.org_channels.read().await;
            channels.get(org_id).cloned()
        };
        if let Some(tx) = tx {
            if tx.receiver_count() > 0 {
                let snapshot = self.storage.list_for_org(org_id, false).await?;
                if tx.send(snapshot).is_err() {
                    warn!("Failed to broadcast offer snapshot for org {}", org_id);
                }
            }
        }
        Ok(())
    }

    pub async fn create(
        &self,
        org_id: &str,
        actor: &Actor,
        input: PricingOfferCreateInput,
    ) -> PricingResult<PricingOffer> {
        let errors = validate_offer_create(&input);
        if !errors.is_empty() {
            return Err(PricingError::Validation(errors));
        }

        let offer = self
            .storage
            .create_offer(org_id, &actor.user_id, &actor.user_name, input)
            .await?;

        self.broadcast(org_id).await?;
        if !offer.request_ids.is_empty() {
            if let Err(e) = self.requests.refresh_org(org_id).await {
                warn!("Failed to refresh request snapshots for org {}: {}", org_id, e);
            }
        }
        Ok(offer)
    }

    pub async fn get(&self, id: &str) -> PricingResult<Option<PricingOffer>> {
        self.storage.get_offer(id).await
    }

    pub async fn list_all(&self) -> PricingResult<Vec<PricingOffer>> {
        self.storage.list_all().await
    }

    pub async fn list_for_org(
        &self,
        org_id: &str,
        exclude_drafts: bool,
    ) -> PricingResult<Vec<PricingOffer>> {
        self.storage.list_for_org(org_id, exclude_drafts).await
    }

    pub async fn update(
        &self,
        id: &str,
        input: PricingOfferUpdateInput,
    ) -> PricingResult<PricingOffer> {
        let errors = validate_offer_update(&input);
        if !errors.is_empty() {
            return Err(PricingError::Validation(errors));
        }

        let bundle_changed = input.request_ids.is_some();
        let offer = self.storage.update_offer(id, input).await?;

        self.broadcast(&offer.org_id).await?;
        if bundle_changed {
            if let Err(e) = self.requests.refresh_org(&offer.org_id).await {
                warn!(
                    "Failed to refresh request snapshots for org {}: {}",
                    offer.org_id, e
                );
            }
        }
        Ok(offer)
    }

    pub async fn send(&self, id: &str) -> PricingResult<PricingOffer> {
        let offer = self.storage.send_offer(id).await?;
        self.broadcast(&offer.org_id).await?;
        Ok(offer)
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: PricingOfferStatus,
    ) -> PricingResult<PricingOffer> {
        let offer = self.storage.update_status(id, status).await?;
        self.broadcast(&offer.org_id).await?;
        Ok(offer)
    }

    pub async fn delete(&self, id: &str) -> PricingResult<bool> {
        let offer = self.storage.get_offer(id).await?;
        let Some(offer) = offer else {
            return Ok(false);
        };

        let deleted = self.storage.delete_offer(id).await?;
        if deleted {
            self.broadcast(&offer.org_id).await?;
            if !offer.request_ids.is_empty() {
                if let Err(e) = self.requests.refresh_org(&offer.org_id).await {
                    warn!(
                        "Failed to refresh request snapshots for org {}: {}",
                        offer.org_id, e
                    );
                }
            }
        }
        Ok(deleted)
    }
}

/// Drop drafts from a snapshot before delivering it to a client-role caller
pub fn without_drafts(offers: &[PricingOffer]) -> Vec<PricingOffer> {
    offers
        .iter()
        .filter(|offer| offer.status != PricingOfferStatus::Draft)
        .cloned()
        .collect()
}

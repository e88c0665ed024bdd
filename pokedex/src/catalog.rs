//! One data-access surface over both transports.
//!
//! The catalog keeps a single cached listing (not keyed by query; there is
//! only ever one listing query) and coalesces concurrent listing requests
//! into one upstream call.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{GraphqlTransport, RestTransport, Transport, TransportKind};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::state::{CachedPayload, CreatureDetail, MoveDetail, SpeciesDetail};

pub type ListingResult = Result<Arc<CachedPayload>, CatalogError>;

type PendingListing = Shared<BoxFuture<'static, ListingResult>>;

struct CatalogSlot {
    transport: TransportKind,
    /// Bumped on every invalidation; a request only writes back into the
    /// generation it was issued under.
    generation: u64,
    cached: Option<Arc<CachedPayload>>,
    in_flight: Option<PendingListing>,
}

pub struct Catalog {
    rest: Arc<dyn Transport>,
    graphql: Arc<dyn Transport>,
    listing_limit: usize,
    ttl: Duration,
    slot: Arc<Mutex<CatalogSlot>>,
    transport_tx: watch::Sender<TransportKind>,
}

impl Catalog {
    pub fn new(config: &CatalogConfig) -> Self {
        let rest = Arc::new(RestTransport::new(config.rest_base()));
        let graphql = Arc::new(GraphqlTransport::new(
            config.graphql_url.clone(),
            config.rest_base(),
        ));
        Self::with_transports(rest, graphql, config)
    }

    pub fn with_transports(
        rest: Arc<dyn Transport>,
        graphql: Arc<dyn Transport>,
        config: &CatalogConfig,
    ) -> Self {
        let (transport_tx, _) = watch::channel(config.transport);
        Self {
            rest,
            graphql,
            listing_limit: config.listing_limit,
            ttl: config.cache_ttl,
            slot: Arc::new(Mutex::new(CatalogSlot {
                transport: config.transport,
                generation: 0,
                cached: None,
                in_flight: None,
            })),
            transport_tx,
        }
    }

    pub fn transport(&self) -> TransportKind {
        lock(&self.slot).transport
    }

    /// Notified whenever the active transport actually changes.
    pub fn subscribe(&self) -> watch::Receiver<TransportKind> {
        self.transport_tx.subscribe()
    }

    /// Returns `true` if the transport changed. Switching drops the cached
    /// listing and abandons any in-flight listing request.
    pub fn set_transport(&self, kind: TransportKind) -> bool {
        self.switch_transport(|_| kind).1
    }

    pub fn toggle_transport(&self) -> TransportKind {
        self.switch_transport(TransportKind::toggled).0
    }

    /// Read, switch and publish all happen under the slot lock.
    fn switch_transport(
        &self,
        next: impl FnOnce(TransportKind) -> TransportKind,
    ) -> (TransportKind, bool) {
        let mut slot = lock(&self.slot);
        let kind = next(slot.transport);
        if slot.transport == kind {
            return (kind, false);
        }
        slot.transport = kind;
        reset(&mut slot);
        self.transport_tx.send_replace(kind);
        drop(slot);
        info!(transport = %kind, "transport switched");
        (kind, true)
    }

    pub fn invalidate(&self) {
        reset(&mut lock(&self.slot));
        debug!("listing cache invalidated");
    }

    /// The cached listing if still fresh, without touching the network.
    pub fn cached(&self) -> Option<Arc<CachedPayload>> {
        self.fresh_payload(&lock(&self.slot))
    }

    pub async fn list_summaries(&self) -> ListingResult {
        let pending = {
            let mut slot = lock(&self.slot);
            if let Some(payload) = self.fresh_payload(&slot) {
                debug!(transport = %slot.transport, "listing served from cache");
                return Ok(payload);
            }
            match slot.in_flight.clone() {
                Some(pending) => {
                    debug!(transport = %slot.transport, "joining in-flight listing request");
                    pending
                }
                None => {
                    let pending = self.start_listing(&slot);
                    slot.in_flight = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    /// Drops the cache and fetches a new listing.
    pub async fn refresh(&self) -> ListingResult {
        self.invalidate();
        self.list_summaries().await
    }

    pub async fn get_detail(&self, name: &str) -> Result<CreatureDetail, CatalogError> {
        let transport = self.active();
        debug!(transport = %transport.kind(), %name, "fetching detail");
        transport.fetch_detail(name).await
    }

    pub async fn get_species_detail(
        &self,
        species_url: &str,
    ) -> Result<SpeciesDetail, CatalogError> {
        let transport = self.active();
        debug!(transport = %transport.kind(), %species_url, "fetching species");
        transport.fetch_species(species_url).await
    }

    pub async fn get_move_detail(&self, name: &str) -> Result<MoveDetail, CatalogError> {
        let transport = self.active();
        debug!(transport = %transport.kind(), %name, "fetching move");
        transport.fetch_move(name).await
    }

    /// Looks up every move `detail` can learn, one request per distinct
    /// name, all in flight at once. Moves that fail to load are left out.
    pub async fn learnable_moves(&self, detail: &CreatureDetail) -> Vec<MoveDetail> {
        let transport = self.active();
        let mut seen = HashSet::new();
        let names: Vec<&str> = detail
            .moves
            .iter()
            .map(|entry| entry.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect();
        debug!(
            transport = %transport.kind(),
            creature = %detail.name,
            count = names.len(),
            "fetching learnable moves"
        );

        let results = join_all(names.iter().map(|name| transport.fetch_move(name))).await;
        names
            .into_iter()
            .zip(results)
            .filter_map(|(name, result)| match result {
                Ok(found) => Some(found),
                Err(err) => {
                    warn!(move_name = %name, error = %err, "skipping move that failed to load");
                    None
                }
            })
            .collect()
    }

    /// Serves the detail from a cached full listing when there is one,
    /// otherwise asks the transport.
    pub async fn resolve_detail(&self, name: &str) -> Result<CreatureDetail, CatalogError> {
        if let Some(detail) = self
            .cached()
            .and_then(|payload| payload.find_detail(name).cloned())
        {
            debug!(%name, "detail served from cached listing");
            return Ok(detail);
        }
        self.get_detail(name).await
    }

    /// Detail with `species_details` filled in, fetching the species only
    /// when the transport did not already include it.
    pub async fn get_detail_with_species(
        &self,
        name: &str,
    ) -> Result<CreatureDetail, CatalogError> {
        let mut detail = self.resolve_detail(name).await?;
        if detail.species_details.is_none() {
            let species = self.get_species_detail(&detail.species.url).await?;
            detail.species_details = Some(species);
        }
        Ok(detail)
    }

    fn fresh_payload(&self, slot: &CatalogSlot) -> Option<Arc<CachedPayload>> {
        slot.cached
            .as_ref()
            .filter(|payload| payload.transport == slot.transport && payload.is_fresh(self.ttl))
            .cloned()
    }

    fn active(&self) -> Arc<dyn Transport> {
        self.transport_for(self.transport())
    }

    fn transport_for(&self, kind: TransportKind) -> Arc<dyn Transport> {
        match kind {
            TransportKind::Rest => Arc::clone(&self.rest),
            TransportKind::Graphql => Arc::clone(&self.graphql),
        }
    }

    fn start_listing(&self, slot: &CatalogSlot) -> PendingListing {
        let kind = slot.transport;
        let generation = slot.generation;
        let transport = self.transport_for(kind);
        let limit = self.listing_limit;
        let state = Arc::clone(&self.slot);
        debug!(transport = %transport.kind(), limit, "fetching listing");

        async move {
            let result = transport
                .fetch_listing(limit)
                .await
                .map(|listing| Arc::new(CachedPayload::new(kind, listing)));

            let mut slot = lock(&state);
            if slot.generation == generation && slot.transport == kind {
                slot.in_flight = None;
                if let Ok(payload) = &result {
                    slot.cached = Some(Arc::clone(payload));
                }
            } else {
                warn!(transport = %kind, "discarding listing from a stale request");
            }
            result
        }
        .boxed()
        .shared()
    }
}

fn reset(slot: &mut CatalogSlot) {
    slot.generation += 1;
    slot.cached = None;
    slot.in_flight = None;
}

fn lock(slot: &Mutex<CatalogSlot>) -> MutexGuard<'_, CatalogSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

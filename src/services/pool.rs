use crate::core::archetype::{ArchetypeCode, ArchetypeRegistry};
use crate::core::clock::Clock;
use crate::core::exchange::{open_session, ExchangeRules};
use crate::core::filters::{check_candidate, validate_filter, validate_preferred_date, MatchingWindow};
use crate::core::matcher::MatchResult;
use crate::error::{ExchangeError, MatchRejection};
use crate::models::{
    CompanionRequest, CompatibilityResult, ExchangeSession, MatchFilter, NotificationEvent,
    OpenRequestRequest, ParticipantProfile, RequestStatus,
};
use crate::services::cache::CompatibilityCache;
use crate::services::directory::{ArtworkCatalog, DirectoryError, ProfileDirectory};
use crate::services::notifier::{dispatch, Notifier};
use crate::services::store::{ExchangeStore, StoreError};
use chrono::{Duration, Weekday};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Matching rules for companion requests
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub request_lifetime: Duration,
    pub window: MatchingWindow,
    /// Empty means any day
    pub preferred_days: Vec<Weekday>,
    pub min_compatibility_floor: u8,
    pub min_compatibility_ceiling: u8,
    pub candidate_limit: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            request_lifetime: Duration::hours(24),
            window: MatchingWindow::always_open(),
            preferred_days: Vec::new(),
            min_compatibility_floor: 40,
            min_compatibility_ceiling: 80,
            candidate_limit: 20,
        }
    }
}

/// Owns the companion request lifecycle
///
/// Matching is single-winner: the Open to Matched transition is a
/// compare-and-set in the store, and the session is persisted only after
/// that transition was won.
pub struct MatchingPool {
    store: Arc<dyn ExchangeStore>,
    profiles: Arc<dyn ProfileDirectory>,
    artworks: Arc<dyn ArtworkCatalog>,
    notifier: Arc<dyn Notifier>,
    scores: Arc<CompatibilityCache>,
    clock: Arc<dyn Clock>,
    settings: PoolSettings,
    exchange_rules: ExchangeRules,
}

impl MatchingPool {
    pub fn new(
        store: Arc<dyn ExchangeStore>,
        profiles: Arc<dyn ProfileDirectory>,
        artworks: Arc<dyn ArtworkCatalog>,
        notifier: Arc<dyn Notifier>,
        scores: Arc<CompatibilityCache>,
        clock: Arc<dyn Clock>,
        settings: PoolSettings,
        exchange_rules: ExchangeRules,
    ) -> Self {
        Self {
            store,
            profiles,
            artworks,
            notifier,
            scores,
            clock,
            settings,
            exchange_rules,
        }
    }

    async fn profile(&self, user_id: &str) -> Result<ParticipantProfile, ExchangeError> {
        self.profiles
            .get_profile(user_id)
            .await
            .map_err(|e| e.into_profile_error(user_id))
    }

    fn ensure_window_open(&self) -> Result<(), ExchangeError> {
        if !self.settings.window.is_open(self.clock.now()) {
            return Err(ExchangeError::MatchingWindowClosed);
        }
        Ok(())
    }

    /// Open a companion request for an exhibition
    pub async fn open_request(&self, body: OpenRequestRequest) -> Result<CompanionRequest, ExchangeError> {
        let now = self.clock.now();
        self.ensure_window_open()?;

        let registry = ArchetypeRegistry::global();
        let allowed_archetypes = body
            .allowed_archetypes
            .iter()
            .map(|code| registry.lookup(code).map(|a| a.code))
            .collect::<Result<BTreeSet<ArchetypeCode>, _>>()?;

        let filter = MatchFilter {
            allowed_archetypes,
            min_compatibility: body.min_compatibility,
        };
        validate_filter(
            &filter,
            self.settings.min_compatibility_floor,
            self.settings.min_compatibility_ceiling,
        )?;
        validate_preferred_date(body.preferred_date, now.date_naive(), &self.settings.preferred_days)?;

        let host = self.profile(&body.host_user_id).await?;
        // Sessions spawned from this request are anchored to the artwork
        self.artworks
            .get_artwork_summary(&body.artwork_id)
            .await
            .map_err(|e| e.into_artwork_error(&body.artwork_id))?;

        let request = CompanionRequest {
            id: Uuid::new_v4(),
            host_user_id: body.host_user_id,
            host_archetype: host.archetype,
            exhibition_id: body.exhibition_id,
            artwork_id: body.artwork_id,
            preferred_date: body.preferred_date,
            time_slot: body.time_slot,
            filter,
            status: RequestStatus::Open,
            matched_user_id: None,
            session_id: None,
            created_at: now,
            expires_at: now + self.settings.request_lifetime,
        };

        let mut inserted = self.store.insert_request(&request).await;
        // The blocking request may only be open on paper; expire and retry once
        if matches!(inserted, Err(StoreError::Conflict(_))) && self.expire_stale_requests().await? > 0 {
            inserted = self.store.insert_request(&request).await;
        }
        match inserted {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(ExchangeError::DuplicateOpenRequest(request.exhibition_id));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "Request {} opened by {} for exhibition {}",
            request.id, request.host_user_id, request.exhibition_id
        );
        Ok(request)
    }

    /// Flip an Open request past its deadline to Expired
    async fn refresh(&self, request: CompanionRequest) -> Result<CompanionRequest, ExchangeError> {
        if !request.is_past_deadline(self.clock.now()) {
            return Ok(request);
        }

        let mut expired = request.clone();
        expired.status = RequestStatus::Expired;
        if self.store.transition_request(&expired, RequestStatus::Open).await? {
            info!("Request {} expired", expired.id);
            return Ok(expired);
        }

        // Someone else moved it first; report what they wrote
        self.store
            .load_request(request.id)
            .await?
            .ok_or(ExchangeError::RequestNotFound(request.id))
    }

    pub async fn get_request(&self, id: Uuid) -> Result<CompanionRequest, ExchangeError> {
        let request = self
            .store
            .load_request(id)
            .await?
            .ok_or(ExchangeError::RequestNotFound(id))?;
        self.refresh(request).await
    }

    /// Open requests for an exhibition, oldest first
    pub async fn list_open_requests(&self, exhibition_id: &str) -> Result<Vec<CompanionRequest>, ExchangeError> {
        let candidates = self
            .store
            .list_requests(exhibition_id, Some(RequestStatus::Open))
            .await?;

        let mut open = Vec::with_capacity(candidates.len());
        for request in candidates {
            let request = self.refresh(request).await?;
            if request.status == RequestStatus::Open {
                open.push(request);
            }
        }
        Ok(open)
    }

    /// A host's own requests in every state, newest first
    ///
    /// The status filter applies after lazy expiry, so an Open request past
    /// its deadline is listed as Expired.
    pub async fn list_my_requests(
        &self,
        host_user_id: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CompanionRequest>, ExchangeError> {
        let stored = self.store.requests_for_host(host_user_id, None).await?;

        let mut requests = Vec::with_capacity(stored.len());
        for request in stored {
            let request = self.refresh(request).await?;
            if status.map_or(true, |s| request.status == s) {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    /// Cancel an Open request; only its host may do so
    pub async fn cancel_request(&self, id: Uuid, user_id: &str) -> Result<CompanionRequest, ExchangeError> {
        let request = self.get_request(id).await?;

        if request.host_user_id != user_id {
            return Err(ExchangeError::NotRequestHost);
        }
        if request.status != RequestStatus::Open {
            return Err(ExchangeError::RequestNotOpen(request.status));
        }

        let mut cancelled = request.clone();
        cancelled.status = RequestStatus::Cancelled;
        if !self.store.transition_request(&cancelled, RequestStatus::Open).await? {
            let current = self.get_request(id).await?;
            return Err(ExchangeError::RequestNotOpen(current.status));
        }

        info!("Request {} cancelled by host", id);
        Ok(cancelled)
    }

    fn closed_rejection(status: RequestStatus) -> ExchangeError {
        match status {
            RequestStatus::Matched => ExchangeError::MatchRejected(MatchRejection::AlreadyMatched),
            status => ExchangeError::MatchRejected(MatchRejection::RequestClosed { status }),
        }
    }

    /// Try to pair a candidate with an open request
    ///
    /// On success the request is Matched and exactly one session exists in
    /// phase 1. Concurrent losers get `AlreadyMatched`.
    pub async fn attempt_match(
        &self,
        request_id: Uuid,
        candidate_user_id: &str,
    ) -> Result<(CompanionRequest, ExchangeSession), ExchangeError> {
        let request = self.get_request(request_id).await?;
        if request.status != RequestStatus::Open {
            return Err(Self::closed_rejection(request.status));
        }
        self.ensure_window_open()?;

        if request.host_user_id == candidate_user_id {
            return Err(ExchangeError::MatchRejected(MatchRejection::SelfMatch));
        }

        let candidate = self.profile(candidate_user_id).await?;
        let compatibility = self.scores.score(request.host_archetype, candidate.archetype).await;
        if let Err(reason) = check_candidate(&request.filter, candidate.archetype, &compatibility) {
            debug!("Match on {} rejected for {}: {}", request_id, candidate_user_id, reason);
            return Err(ExchangeError::MatchRejected(reason));
        }

        let now = self.clock.now();
        let session = open_session(
            Some(request.id),
            &request.artwork_id,
            &request.host_user_id,
            candidate_user_id,
            now,
            &self.exchange_rules,
        );

        let mut matched = request.clone();
        matched.status = RequestStatus::Matched;
        matched.matched_user_id = Some(candidate_user_id.to_string());
        matched.session_id = Some(session.id);

        if !self.store.transition_request(&matched, RequestStatus::Open).await? {
            let current = self.get_request(request_id).await?;
            debug!("Lost match race on {} ({})", request_id, current.status);
            return Err(Self::closed_rejection(current.status));
        }

        if let Err(e) = self.store.insert_session(&session).await {
            tracing::error!("Failed to persist session for request {}: {}", request_id, e);
            match self.store.transition_request(&request, RequestStatus::Matched).await {
                Ok(true) => warn!("Rolled request {} back to open", request_id),
                Ok(false) => warn!("Rollback of request {} found it already moved", request_id),
                Err(rollback) => tracing::error!("Rollback of request {} failed: {}", request_id, rollback),
            }
            return Err(e.into());
        }

        info!(
            "Request {} matched {} with {} (score {}), session {}",
            request_id,
            request.host_user_id,
            candidate_user_id,
            compatibility.overall_score,
            session.id
        );

        let event = NotificationEvent::RequestMatched {
            request_id,
            session_id: session.id,
        };
        dispatch(&self.notifier, &session.participant_a, event.clone());
        dispatch(&self.notifier, &session.participant_b, event);

        Ok((matched, session))
    }

    /// Score and order candidates for an open request
    pub async fn rank_candidates(
        &self,
        request_id: Uuid,
        candidate_user_ids: &[String],
        limit: Option<usize>,
    ) -> Result<MatchResult, ExchangeError> {
        let request = self.get_request(request_id).await?;
        if request.status != RequestStatus::Open {
            return Err(ExchangeError::RequestNotOpen(request.status));
        }

        let mut profiles = Vec::with_capacity(candidate_user_ids.len());
        for user_id in candidate_user_ids {
            match self.profiles.get_profile(user_id).await {
                Ok(profile) => profiles.push(profile),
                Err(DirectoryError::NotFound(_)) | Err(DirectoryError::UnknownArchetype(_)) => {
                    debug!("Skipping candidate {} without a usable profile", user_id);
                }
                Err(e) => return Err(e.into_profile_error(user_id)),
            }
        }

        let limit = limit
            .unwrap_or(self.settings.candidate_limit)
            .min(self.settings.candidate_limit);

        Ok(self.scores.matcher().rank_candidates(
            &request.host_user_id,
            request.host_archetype,
            &request.filter,
            profiles,
            limit,
        ))
    }

    /// Compatibility preview between two free-form archetype codes
    pub async fn preview(&self, a: &str, b: &str) -> Result<CompatibilityResult, ExchangeError> {
        let registry = ArchetypeRegistry::global();
        let a = registry.lookup(a)?.code;
        let b = registry.lookup(b)?.code;
        Ok(self.scores.score(a, b).await)
    }

    /// Expire every Open request past its deadline; returns how many flipped
    pub async fn expire_stale_requests(&self) -> Result<usize, ExchangeError> {
        let stale = self.store.requests_past_deadline(self.clock.now()).await?;
        let mut expired = 0;
        for request in stale {
            if self.refresh(request).await?.status == RequestStatus::Expired {
                expired += 1;
            }
        }
        Ok(expired)
    }
}

//! Fan-out/fan-in over the data sources
//!
//! Every city is planned concurrently. Within a city the attraction lookups,
//! the weather forecast and the air quality forecast run concurrently; once
//! all of them have settled the narrator is called with whatever succeeded.
//! Each call gets its own timeout and retry budget, and a failure is recorded
//! in the city's status map instead of aborting the run. The exceptions are
//! rejected credentials and cancellation, which end the whole run.

use futures::future::try_join_all;
use rand::RngExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::assembler::{CityOutcome, assemble};
use crate::error::{OrchestrationError, SourceError, SourceErrorKind};
use crate::models::{AttractionRecord, CityStop, Itinerary, ItineraryRequest, SourceStatus};
use crate::sources::{Adapters, CityDraft, CityWindow, PlaceQuery, Source, SourceAdapter};

/// Timeout, retry and concurrency policy for adapter calls
#[derive(Debug, Clone, PartialEq)]
pub struct CallPolicy {
    /// Upper bound for a single attempt
    pub call_timeout: Duration,
    /// Retries after the first attempt, for rate limits and timeouts only
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Calls in flight at once across the whole run
    pub max_concurrent_calls: usize,
    /// Fail the run with `AllSourcesFailed` when no call succeeded at all
    pub reject_empty_itinerary: bool,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            max_retries: 2,
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
            max_concurrent_calls: 8,
            reject_empty_itinerary: false,
        }
    }
}

impl CallPolicy {
    /// Delay before retry number `retry` (zero-based), with ±10% jitter
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let delay = self.base_backoff.saturating_mul(factor).min(self.max_backoff);
        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        delay.mul_f64(jitter)
    }
}

/// Result of one call after retries
#[derive(Debug)]
struct CallOutcome<T> {
    result: Result<T, SourceError>,
    retries: u32,
}

impl<T> CallOutcome<T> {
    fn failed(error: SourceError) -> Self {
        Self {
            result: Err(error),
            retries: 0,
        }
    }

    fn status(&self) -> SourceStatus {
        match &self.result {
            Ok(_) => SourceStatus::Succeeded {
                retries: self.retries,
            },
            Err(err) => SourceStatus::Failed {
                error: err.kind,
                message: err.message.clone(),
                retries: self.retries,
            },
        }
    }

    fn into_value(self) -> Option<T> {
        self.result.ok()
    }
}

/// Status of a source that made one call per attraction
fn aggregate_status<T>(outcomes: &[CallOutcome<T>]) -> SourceStatus {
    if outcomes.is_empty() {
        return SourceStatus::Skipped;
    }

    let retries = outcomes.iter().map(|o| o.retries).sum();
    let errors: Vec<&SourceError> = outcomes.iter().filter_map(|o| o.result.as_ref().err()).collect();
    let succeeded = outcomes.len() - errors.len();

    match errors.first() {
        None => SourceStatus::Succeeded { retries },
        Some(err) if succeeded == 0 => SourceStatus::Failed {
            error: err.kind,
            message: err.message.clone(),
            retries,
        },
        Some(err) => SourceStatus::Partial {
            succeeded,
            failed: errors.len(),
            error: err.kind,
            retries,
        },
    }
}

/// Plans itineraries against an injected set of adapters
pub struct Orchestrator {
    adapters: Adapters,
    policy: CallPolicy,
    permits: Arc<Semaphore>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(adapters: Adapters, policy: CallPolicy) -> Self {
        let permits = Arc::new(Semaphore::new(policy.max_concurrent_calls.max(1)));
        Self {
            adapters,
            policy,
            permits,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    /// Plan the whole trip
    ///
    /// Returns a complete itinerary, possibly with per-city gaps recorded in
    /// the status maps, or a single error if the run as a whole failed. When
    /// `cancel` fires, every in-flight call is dropped and
    /// [`OrchestrationError::Cancelled`] is returned.
    pub async fn plan(
        &self,
        request: &ItineraryRequest,
        cancel: &CancellationToken,
    ) -> Result<Itinerary, OrchestrationError> {
        request
            .validate()
            .map_err(OrchestrationError::InvalidRequest)?;

        info!(cities = request.cities.len(), "Planning itinerary");

        let cities = request
            .cities
            .iter()
            .enumerate()
            .map(|(index, stop)| self.plan_city(index, stop));

        let outcomes = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Planning cancelled, dropping in-flight calls");
                return Err(OrchestrationError::Cancelled);
            }
            outcomes = try_join_all(cities) => outcomes?,
        };

        let itinerary = assemble(request, outcomes)?;

        if self.policy.reject_empty_itinerary && !itinerary.has_enrichment() {
            warn!("No data source succeeded for any city");
            return Err(OrchestrationError::AllSourcesFailed);
        }

        info!(
            cities = itinerary.cities.len(),
            degraded = itinerary.degraded_cities().len(),
            masks = itinerary.masks_needed(),
            "Itinerary planned"
        );
        Ok(itinerary)
    }

    async fn plan_city(&self, index: usize, stop: &CityStop) -> Result<CityOutcome, OrchestrationError> {
        let span = info_span!("city", city = %stop.name, index);

        async move {
            let window = CityWindow::new(stop.name.as_str(), stop.arrival, stop.departure);

            let places = try_join_all(stop.attractions.iter().map(|attraction| {
                let query = PlaceQuery::new(attraction.name.as_str(), stop.name.as_str());
                async move { self.call(Source::Places, self.adapters.places.as_ref(), &query).await }
            }));
            let weather = self.call_window(Source::Weather, self.adapters.weather.as_ref(), &window);
            let air_quality =
                self.call_window(Source::AirQuality, self.adapters.air_quality.as_ref(), &window);

            let (places, weather, air_quality) = tokio::try_join!(places, weather, air_quality)?;

            let mut status = BTreeMap::new();
            status.insert(Source::Places, aggregate_status(&places));
            status.insert(Source::Weather, weather.status());
            status.insert(Source::AirQuality, air_quality.status());

            let unavailable: Vec<(Source, SourceErrorKind)> = status
                .iter()
                .filter(|(_, s)| s.is_failed())
                .filter_map(|(source, s)| s.error_kind().map(|kind| (*source, kind)))
                .collect();

            let attractions: Vec<AttractionRecord> = stop
                .attractions
                .iter()
                .zip(places)
                .map(|(stub, outcome)| AttractionRecord::resolved(stub, outcome.into_value()))
                .collect();

            let draft = CityDraft {
                stop: stop.clone(),
                attractions,
                forecasts: weather.into_value().unwrap_or_default(),
                air_quality: air_quality.into_value().unwrap_or_default(),
                unavailable,
            };

            let narrative = self
                .call(Source::Narrator, self.adapters.narrator.as_ref(), &draft)
                .await?;
            status.insert(Source::Narrator, narrative.status());

            debug!(?status, "City settled");

            Ok::<_, OrchestrationError>(CityOutcome {
                index,
                city: stop.name.clone(),
                attractions: draft.attractions,
                forecasts: draft.forecasts,
                air_quality: draft.air_quality,
                narrative: narrative.into_value(),
                status,
            })
        }
        .instrument(span)
        .await
    }

    async fn call_window<T: Send>(
        &self,
        source: Source,
        adapter: &dyn SourceAdapter<Query = CityWindow, Output = T>,
        window: &Result<CityWindow, SourceError>,
    ) -> Result<CallOutcome<T>, OrchestrationError> {
        match window {
            Ok(window) => self.call(source, adapter, window).await,
            Err(err) => Ok(CallOutcome::failed(err.clone())),
        }
    }

    /// One adapter call under the timeout and retry policy
    ///
    /// Rejected credentials are escalated to the whole run; every other
    /// failure is returned as a failed outcome.
    async fn call<Q, T>(
        &self,
        source: Source,
        adapter: &dyn SourceAdapter<Query = Q, Output = T>,
        query: &Q,
    ) -> Result<CallOutcome<T>, OrchestrationError>
    where
        Q: Send + Sync,
        T: Send,
    {
        let mut retries = 0;

        loop {
            let attempt = {
                // The semaphore is never closed
                let _permit = self.permits.acquire().await.ok();
                match tokio::time::timeout(self.policy.call_timeout, adapter.fetch(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::timeout(format!(
                        "{source} call exceeded {}ms",
                        self.policy.call_timeout.as_millis()
                    ))),
                }
            };

            match attempt {
                Ok(value) => {
                    debug!(%source, retries, "Call succeeded");
                    return Ok(CallOutcome {
                        result: Ok(value),
                        retries,
                    });
                }
                Err(err) if err.kind == SourceErrorKind::Unauthorized => {
                    let api = err.api.unwrap_or(source);
                    error!(%source, %api, error = %err, "Credentials rejected, aborting run");
                    return Err(OrchestrationError::Unauthorized {
                        api,
                        message: err.message,
                    });
                }
                Err(err) if err.is_retryable() && retries < self.policy.max_retries => {
                    let delay = self.policy.backoff(retries);
                    warn!(
                        %source,
                        error = %err,
                        attempt = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying call"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(err) => {
                    warn!(%source, error = %err, retries, "Call failed");
                    return Ok(CallOutcome {
                        result: Err(err),
                        retries,
                    });
                }
            }
        }
    }
}

//! In-memory forecast sessions
//!
//! Sessions live only as long as the process. A session untouched for longer
//! than the idle timeout is treated as gone and is swept when new sessions
//! are created. The store lock is never held across the weather fetch;
//! transitions are re-checked when results are written back, so a concurrent
//! reset wins over an in-flight analysis.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    parse_case_history, Advisory, CollectedInput, LocationSource, SessionContext, SessionError,
    SessionStage,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::forecast::{CaseCountInput, ForecastService};

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Input for analyzing a session
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region_code: Option<i32>,
    pub date: Option<NaiveDate>,
    pub source: Option<LocationSource>,
    #[serde(default)]
    pub recent_cases: Vec<CaseCountInput>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    fn is_idle(&self, session: &SessionContext, now: DateTime<Utc>) -> bool {
        (now - session.updated_at)
            .to_std()
            .map(|idle| idle > self.idle_timeout)
            .unwrap_or(false)
    }

    pub async fn create(&self) -> SessionContext {
        let session = SessionContext::new();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, s| !self.is_idle(s, now));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "expired idle sessions");
        }

        sessions.insert(session.id, session.clone());
        tracing::debug!(session_id = %session.id, "session created");
        session
    }

    pub async fn get(&self, id: Uuid) -> AppResult<SessionContext> {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|s| !self.is_idle(s, now))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        let now = Utc::now();
        self.sessions
            .write()
            .await
            .remove(&id)
            .filter(|s| !self.is_idle(s, now))
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !self.is_idle(s, now))
            .count()
    }

    /// Run a transition on a stored session and return the updated copy.
    async fn update<F>(&self, id: Uuid, f: F) -> AppResult<SessionContext>
    where
        F: FnOnce(&mut SessionContext) -> Result<(), SessionError>,
    {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&id)
            .is_some_and(|s| self.is_idle(s, Utc::now()))
        {
            sessions.remove(&id);
        }
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        f(session)?;
        Ok(session.clone())
    }

    /// `AwaitingInput -> WeatherFetched -> Predicted` in one request.
    ///
    /// A session holding a finished analysis is reset first, so asking again
    /// replaces the previous result.
    pub async fn analyze(
        &self,
        forecast: &ForecastService,
        id: Uuid,
        input: AnalyzeInput,
    ) -> AppResult<SessionContext> {
        let current = self.get(id).await?;
        let restart = matches!(
            current.stage,
            SessionStage::Predicted | SessionStage::Displayed
        );
        if !restart && current.stage != SessionStage::AwaitingInput {
            return Err(SessionError {
                from: current.stage,
                action: "record weather",
            }
            .into());
        }
        let observed_at = current.updated_at;

        let mut notes = Vec::new();
        let mut placement =
            forecast.place(input.latitude, input.longitude, input.region_code, &mut notes)?;
        if let Some(source) = input.source {
            placement.source = source;
        }
        let target = forecast.target(input.date)?;
        let history = if input.recent_cases.is_empty() {
            None
        } else {
            let raw: Vec<String> = input.recent_cases.iter().map(CaseCountInput::as_text).collect();
            Some(parse_case_history(&raw)?)
        };

        let weather = forecast
            .weather_for(placement.coordinates, target, &mut notes)
            .await;
        let (_, result) = forecast.predict(
            &placement.region,
            target.month,
            &weather,
            history.as_deref(),
            &mut notes,
        )?;

        let collected = CollectedInput {
            coordinates: placement.coordinates,
            source: placement.source,
            target_date: target.date,
        };

        self.update(id, move |session| {
            // Only the analysis we started from is discarded; anything newer wins.
            if restart && session.updated_at == observed_at {
                session.reset();
            }
            session.record_weather(collected, placement.region, weather)?;
            session.record_prediction(result)?;
            for note in notes {
                session.add_note(note);
            }
            Ok(())
        })
        .await
    }

    /// `Predicted -> Displayed`, returning the advisory for the result.
    pub async fn display(&self, id: Uuid) -> AppResult<(SessionContext, Advisory)> {
        let session = self.update(id, SessionContext::mark_displayed).await?;
        let advisory = session
            .result
            .as_ref()
            .map(|r| r.risk_tier.advisory())
            .ok_or_else(|| AppError::Internal("displayed session has no result".to_string()))?;
        Ok((session, advisory))
    }

    pub async fn reset(&self, id: Uuid) -> AppResult<SessionContext> {
        self.update(id, |session| {
            session.reset();
            Ok(())
        })
        .await
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{
        FeatureVector, PredictionError, PredictionModel, RegionCatalog, RiskThresholds,
    };

    struct Fixed(f64);

    impl PredictionModel for Fixed {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
            Ok(self.0)
        }
    }

    fn forecast_service() -> ForecastService {
        ForecastService::new(
            Arc::new(RegionCatalog::builtin()),
            Arc::new(Fixed(75.0)),
            RiskThresholds::DEFAULT,
        )
    }

    #[tokio::test]
    async fn full_walk_and_reset() {
        let store = SessionStore::default();
        let svc = forecast_service();
        let session = store.create().await;

        let analyzed = store
            .analyze(
                &svc,
                session.id,
                AnalyzeInput {
                    latitude: Some(14.5995),
                    longitude: Some(120.9842),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(analyzed.stage, SessionStage::Predicted);
        assert_eq!(
            analyzed.region.as_ref().unwrap().canonical_name,
            "National Capital Region"
        );
        assert!(analyzed.weather.as_ref().unwrap().is_synthetic);
        assert!(!analyzed.notes.is_empty());

        let (displayed, advisory) = store.display(session.id).await.unwrap();
        assert_eq!(displayed.stage, SessionStage::Displayed);
        assert_eq!(advisory, shared::RiskTier::High.advisory());

        let reset = store.reset(session.id).await.unwrap();
        assert_eq!(reset.stage, SessionStage::AwaitingInput);
        assert!(reset.result.is_none());
        assert!(reset.notes.is_empty());
    }

    #[tokio::test]
    async fn illegal_transitions_are_rejected() {
        let store = SessionStore::default();
        let svc = forecast_service();
        let session = store.create().await;

        assert!(matches!(
            store.display(session.id).await,
            Err(AppError::InvalidStateTransition(_))
        ));

        let input = AnalyzeInput {
            region_code: Some(3),
            ..Default::default()
        };
        store.analyze(&svc, session.id, input).await.unwrap();
        store.display(session.id).await.unwrap();
        assert!(matches!(
            store.display(session.id).await,
            Err(AppError::InvalidStateTransition(e)) if e.from == SessionStage::Displayed
        ));
    }

    #[tokio::test]
    async fn new_analysis_replaces_previous_result() {
        let store = SessionStore::default();
        let svc = forecast_service();
        let session = store.create().await;

        let first = AnalyzeInput {
            region_code: Some(3),
            ..Default::default()
        };
        store.analyze(&svc, session.id, first).await.unwrap();
        store.display(session.id).await.unwrap();

        let second = AnalyzeInput {
            region_code: Some(9),
            date: NaiveDate::from_ymd_opt(2022, 2, 10),
            ..Default::default()
        };
        let again = store.analyze(&svc, session.id, second).await.unwrap();
        assert_eq!(again.stage, SessionStage::Predicted);
        assert_eq!(again.region.as_ref().unwrap().canonical_name, "Region IX");
        assert_eq!(
            again.input.as_ref().unwrap().target_date,
            NaiveDate::from_ymd_opt(2022, 2, 10)
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
        let stale = store.create().await;
        let fresh = store.create().await;

        store
            .sessions
            .write()
            .await
            .get_mut(&stale.id)
            .unwrap()
            .updated_at -= chrono::Duration::minutes(5);

        assert!(matches!(store.get(stale.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.reset(stale.id).await, Err(AppError::NotFound(_))));
        assert!(store.get(fresh.id).await.is_ok());
        assert_eq!(store.len().await, 1);

        // Creating a session sweeps the expired ones out of the map.
        store
            .sessions
            .write()
            .await
            .get_mut(&fresh.id)
            .unwrap()
            .updated_at -= chrono::Duration::minutes(5);
        let newest = store.create().await;
        let sessions = store.sessions.read().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&newest.id));
    }

    #[tokio::test]
    async fn failed_analysis_leaves_session_untouched() {
        let store = SessionStore::default();
        let svc = forecast_service();
        let session = store.create().await;

        let result = store
            .analyze(
                &svc,
                session.id,
                AnalyzeInput {
                    region_code: Some(3),
                    date: NaiveDate::from_ymd_opt(1999, 1, 1),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert_eq!(
            store.get(session.id).await.unwrap().stage,
            SessionStage::AwaitingInput
        );
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = SessionStore::default();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        let session = store.create().await;
        store.remove(session.id).await.unwrap();
        assert!(matches!(store.remove(session.id).await, Err(AppError::NotFound(_))));
        assert_eq!(store.len().await, 0);
    }
}

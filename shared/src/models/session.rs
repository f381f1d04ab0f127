//! Per-user forecast session
//!
//! A session walks `AwaitingInput -> WeatherFetched -> Predicted -> Displayed`.
//! `reset` returns it to `AwaitingInput` from any stage and discards
//! everything collected so far.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{PredictionResult, Region, WeatherReading};
use crate::types::{GpsCoordinates, LocationSource};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    AwaitingInput,
    WeatherFetched,
    Predicted,
    Displayed,
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStage::AwaitingInput => write!(f, "awaiting_input"),
            SessionStage::WeatherFetched => write!(f, "weather_fetched"),
            SessionStage::Predicted => write!(f, "predicted"),
            SessionStage::Displayed => write!(f, "displayed"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {action} while session is {from}")]
pub struct SessionError {
    pub from: SessionStage,
    pub action: &'static str,
}

/// What the user supplied for the current analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedInput {
    pub coordinates: GpsCoordinates,
    pub source: LocationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub id: Uuid,
    pub stage: SessionStage,
    pub input: Option<CollectedInput>,
    pub region: Option<Region>,
    pub weather: Option<WeatherReading>,
    pub result: Option<PredictionResult>,
    /// Disclosures about approximated data for the current analysis
    pub notes: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: SessionStage::AwaitingInput,
            input: None,
            region: None,
            weather: None,
            result: None,
            notes: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// `AwaitingInput -> WeatherFetched`
    pub fn record_weather(
        &mut self,
        input: CollectedInput,
        region: Region,
        weather: WeatherReading,
    ) -> Result<(), SessionError> {
        self.require_stage(SessionStage::AwaitingInput, "record weather")?;
        self.input = Some(input);
        self.region = Some(region);
        self.weather = Some(weather);
        self.advance(SessionStage::WeatherFetched);
        Ok(())
    }

    /// `WeatherFetched -> Predicted`
    pub fn record_prediction(&mut self, result: PredictionResult) -> Result<(), SessionError> {
        self.require_stage(SessionStage::WeatherFetched, "record a prediction")?;
        self.result = Some(result);
        self.advance(SessionStage::Predicted);
        Ok(())
    }

    /// `Predicted -> Displayed`
    pub fn mark_displayed(&mut self) -> Result<(), SessionError> {
        self.require_stage(SessionStage::Predicted, "display results")?;
        self.advance(SessionStage::Displayed);
        Ok(())
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Back to `AwaitingInput`, dropping collected data.
    pub fn reset(&mut self) {
        self.input = None;
        self.region = None;
        self.weather = None;
        self.result = None;
        self.notes.clear();
        self.advance(SessionStage::AwaitingInput);
    }

    fn require_stage(&self, stage: SessionStage, action: &'static str) -> Result<(), SessionError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(SessionError {
                from: self.stage,
                action,
            })
        }
    }

    fn advance(&mut self, stage: SessionStage) {
        self.stage = stage;
        self.updated_at = Utc::now();
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

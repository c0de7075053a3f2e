use std::time::Duration;

use serde::Deserialize;

use crate::args::HttpMethod;
use crate::args::parsers::parse_duration_value;
use crate::error::ValidationError;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub data: Option<String>,
    pub method: Option<HttpMethod>,
    pub workers: Option<usize>,
    pub jobs_per_worker: Option<u64>,
    pub pacing: Option<u64>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub insecure: Option<bool>,
    pub json: Option<bool>,
}

/// Durations in config files are either bare seconds or a string with a unit
/// suffix, e.g. `timeout = 5` or `timeout = "500ms"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}

use std::str::FromStr;

use chrono::{Days, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Radar product requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadarParameter {
    RadolanCdc,
    Rw,
    Ry,
    Sf,
}

impl RadarParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadarParameter::RadolanCdc => "radolan_cdc",
            RadarParameter::Rw => "rw",
            RadarParameter::Ry => "ry",
            RadarParameter::Sf => "sf",
        }
    }
}

impl FromStr for RadarParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radolan_cdc" => Ok(RadarParameter::RadolanCdc),
            "rw" => Ok(RadarParameter::Rw),
            "ry" => Ok(RadarParameter::Ry),
            "sf" => Ok(RadarParameter::Sf),
            other => Err(format!("unknown radar parameter '{other}'")),
        }
    }
}

/// Temporal resolution of the radar composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadarResolution {
    Minute5,
    Hourly,
    Daily,
}

impl RadarResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadarResolution::Minute5 => "minute_5",
            RadarResolution::Hourly => "hourly",
            RadarResolution::Daily => "daily",
        }
    }
}

impl FromStr for RadarResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute_5" => Ok(RadarResolution::Minute5),
            "hourly" => Ok(RadarResolution::Hourly),
            "daily" => Ok(RadarResolution::Daily),
            other => Err(format!("unknown radar resolution '{other}'")),
        }
    }
}

/// Archive class of the radar composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadarPeriod {
    Historical,
    Recent,
    Now,
}

impl RadarPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadarPeriod::Historical => "historical",
            RadarPeriod::Recent => "recent",
            RadarPeriod::Now => "now",
        }
    }
}

impl FromStr for RadarPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "historical" => Ok(RadarPeriod::Historical),
            "recent" => Ok(RadarPeriod::Recent),
            "now" => Ok(RadarPeriod::Now),
            other => Err(format!("unknown radar period '{other}'")),
        }
    }
}

/// The canonical request tuple identifying one cacheable raster stack.
///
/// Two requests are the same stack iff every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RadarRequest {
    pub parameter: RadarParameter,
    pub resolution: RadarResolution,
    pub period: RadarPeriod,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

impl Default for RadarRequest {
    /// The last ten days of hourly RADOLAN-CDC composites.
    fn default() -> Self {
        let today = Utc::now().date_naive().and_time(NaiveTime::MIN);
        Self {
            parameter: RadarParameter::RadolanCdc,
            resolution: RadarResolution::Hourly,
            period: RadarPeriod::Recent,
            start_date: today - Days::new(10),
            end_date: today,
        }
    }
}

impl RadarRequest {
    /// Merge a partial update into this request.
    pub fn apply(&mut self, update: RadarRequestUpdate) {
        if let Some(parameter) = update.parameter {
            self.parameter = parameter;
        }
        if let Some(resolution) = update.resolution {
            self.resolution = resolution;
        }
        if let Some(period) = update.period {
            self.period = period;
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = end_date;
        }
    }

    fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.parameter.as_str(),
            self.resolution.as_str(),
            self.period.as_str(),
            self.start_date,
            self.end_date,
        )
    }

    /// Hex SHA-256 over the canonical field encoding.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Partial field set merged into a [`RadarRequest`] by
/// [`RadarCache::set_parameters`](crate::radar::RadarCache::set_parameters).
#[derive(Debug, Clone, Default)]
pub struct RadarRequestUpdate {
    pub parameter: Option<RadarParameter>,
    pub resolution: Option<RadarResolution>,
    pub period: Option<RadarPeriod>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl RadarRequestUpdate {
    pub fn period(period: RadarPeriod) -> Self {
        Self {
            period: Some(period),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_tracks_every_field() {
        let base = RadarRequest::default();
        let mut changed = base.clone();
        changed.period = RadarPeriod::Historical;
        assert_ne!(base.fingerprint(), changed.fingerprint());
        assert_eq!(base.fingerprint(), base.clone().fingerprint());
    }

    #[test]
    fn apply_merges_only_supplied_fields() {
        let mut request = RadarRequest::default();
        let before = request.clone();
        request.apply(RadarRequestUpdate::period(RadarPeriod::Historical));
        assert_eq!(request.parameter, before.parameter);
        assert_eq!(request.start_date, before.start_date);
        assert_eq!(request.period, RadarPeriod::Historical);
    }

    #[test]
    fn axis_parsing_is_case_insensitive() {
        assert_eq!(
            "RADOLAN_CDC".parse::<RadarParameter>().unwrap(),
            RadarParameter::RadolanCdc
        );
        assert_eq!("Daily".parse::<RadarResolution>().unwrap(), RadarResolution::Daily);
        assert!("weekly".parse::<RadarResolution>().is_err());
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// pt-BR short date and short time, e.g. `19/10/2026, 14:05`.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M";

/// A Brazilian postal code: exactly eight ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cep(String);

impl Cep {
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(LookupError::InvalidCep(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Cep {
    type Error = LookupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Cep::parse(&value)
    }
}

impl From<Cep> for String {
    fn from(cep: Cep) -> Self {
        cep.0
    }
}

/// What the address service knows about a CEP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub locality: String,
    pub state: Option<String>,
}

/// Current conditions for a locality.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub temperature_c: f64,
}

/// One lookup result, as returned by the API and kept in the history cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub cep: Cep,
    pub location: Option<String>,
    #[serde(default)]
    pub local_state: Option<String>,
    pub temp: Option<f64>,
    pub timestamp: String,
}

impl SearchRecord {
    pub fn new<Tz>(cep: Cep, address: Address, weather: CurrentWeather, at: DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            cep,
            location: Some(address.locality),
            local_state: address.state,
            temp: Some(weather.temperature_c),
            timestamp: format_timestamp(&at),
        }
    }

    /// The search time read back from `timestamp`, if it is in the usual format.
    pub fn searched_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }
}

pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parse_accepts_eight_digits() {
        let cep = Cep::parse("01001000").expect("valid cep");
        assert_eq!(cep.as_str(), "01001000");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for raw in ["", "1234567", "123456789", "01001-000", " 01001000", "0100100a", "０１００１０００"] {
            let err = Cep::parse(raw).unwrap_err();
            assert!(matches!(err, LookupError::InvalidCep(_)), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn timestamp_uses_short_brazilian_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(format_timestamp(&at), "07/03/2026, 09:05");
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap();
        let record = SearchRecord::new(
            Cep::parse("01001000").unwrap(),
            Address { locality: "São Paulo".into(), state: Some("SP".into()) },
            CurrentWeather { temperature_c: 21.5 },
            at,
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["cep"], "01001000");
        assert_eq!(json["location"], "São Paulo");
        assert_eq!(json["localState"], "SP");
        assert_eq!(json["temp"], 21.5);
        assert_eq!(json["timestamp"], "07/03/2026, 09:05");
    }

    #[test]
    fn searched_at_reads_back_the_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap();
        let record = SearchRecord::new(
            Cep::parse("01001000").unwrap(),
            Address { locality: "São Paulo".into(), state: None },
            CurrentWeather { temperature_c: 21.5 },
            at,
        );

        assert_eq!(record.searched_at(), Some(at.naive_utc()));

        let garbled = SearchRecord { timestamp: "ontem".into(), ..record };
        assert_eq!(garbled.searched_at(), None);
    }

    #[test]
    fn record_rejects_invalid_cep_on_decode() {
        let raw = r#"{"cep":"abc","location":null,"temp":null,"timestamp":""}"#;
        assert!(serde_json::from_str::<SearchRecord>(raw).is_err());
    }
}

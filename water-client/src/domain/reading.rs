use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date, Month};

use super::lenient;

const READING_DATE: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:none]-[day padding:none]");

/// A volume reported both in liters and in cubic meters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub litre: Option<i64>,
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub m3: Option<f64>,
}

/// One daily reading as exported by the utility.
///
/// `index` is the cumulative meter index at the reading date, `consumption` the
/// volume used that day. Reliability flags are free-form provider strings
/// (e.g. measured vs estimated).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    #[serde(
        rename = "date_releve",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub index: Measure,
    #[serde(rename = "consommation", default, deserialize_with = "lenient::object")]
    pub consumption: Measure,
    #[serde(
        rename = "fiabilite_index",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub index_reliability: Option<String>,
    #[serde(
        rename = "fiabilite_conso",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub consumption_reliability: Option<String>,
}

impl DailyReading {
    /// The reading date, or `None` when absent or not `YYYY-MM-DD`.
    pub fn reading_date(&self) -> Option<Date> {
        self.date.as_deref().and_then(parse_reading_date)
    }
}

/// One monthly reading, keyed by calendar year and month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReading {
    #[serde(
        rename = "annee",
        default,
        deserialize_with = "lenient::int",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i32>,
    #[serde(
        rename = "mois",
        default,
        deserialize_with = "lenient::int",
        skip_serializing_if = "Option::is_none"
    )]
    pub month: Option<u8>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub index: Measure,
    #[serde(rename = "consommation", default, deserialize_with = "lenient::object")]
    pub consumption: Measure,
    #[serde(
        rename = "fiabilite_index",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub index_reliability: Option<String>,
    #[serde(
        rename = "fiabilite_conso",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub consumption_reliability: Option<String>,
}

impl MonthlyReading {
    /// First day of the reading's month.
    ///
    /// A zero year or month counts as absent, as does a month outside 1..=12.
    pub fn period_start(&self) -> Option<Date> {
        let year = self.year.filter(|y| *y != 0)?;
        let month = self.month.filter(|m| *m != 0)?;
        let month = Month::try_from(month).ok()?;
        Date::from_calendar_date(year, month, 1).ok()
    }
}

/// Parse a provider date (`YYYY-MM-DD`, unpadded month/day accepted).
pub fn parse_reading_date(s: &str) -> Option<Date> {
    // `[year]` accepts an explicit sign, the provider never sends one.
    if s.starts_with(['+', '-']) {
        return None;
    }
    Date::parse(s, READING_DATE).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn daily_reading_parses_provider_payload() {
        let reading: DailyReading = serde_json::from_value(json!({
            "date_releve": "2024-01-04",
            "index": {"litre": 103000, "m3": 103.0},
            "consommation": {"litre": 40, "m3": 0.04},
            "fiabilite_index": "MESURE",
            "fiabilite_conso": "MESURE"
        }))
        .unwrap();

        assert_eq!(reading.reading_date(), Some(date!(2024 - 01 - 04)));
        assert_eq!(reading.index.m3, Some(103.0));
        assert_eq!(reading.consumption.litre, Some(40));
        assert_eq!(reading.index_reliability.as_deref(), Some("MESURE"));
    }

    #[test]
    fn malformed_fields_degrade_to_none() {
        let reading: DailyReading = serde_json::from_value(json!({
            "date_releve": 20240104,
            "index": "broken",
            "consommation": {"litre": "n/a", "m3": "0.5"}
        }))
        .unwrap();

        assert!(reading.date.is_none());
        assert_eq!(reading.index, Measure::default());
        assert_eq!(reading.consumption.litre, None);
        assert_eq!(reading.consumption.m3, Some(0.5));
    }

    #[test]
    fn reading_date_rejects_garbage() {
        assert_eq!(parse_reading_date("not-a-date"), None);
        assert_eq!(parse_reading_date("2024-02-30"), None);
        assert_eq!(parse_reading_date("2024-01-01T00:00"), None);
        assert_eq!(parse_reading_date("24-01-01"), None);
        assert_eq!(parse_reading_date(""), None);
        assert_eq!(parse_reading_date("+2024-01-01"), None);
        assert_eq!(parse_reading_date("2024-001-01"), None);
        assert_eq!(parse_reading_date("2024-12-31"), Some(date!(2024 - 12 - 31)));
        assert_eq!(parse_reading_date("2024-1-5"), Some(date!(2024 - 01 - 05)));
    }

    #[test]
    fn monthly_period_start_requires_year_and_month() {
        let ok = MonthlyReading {
            year: Some(2024),
            month: Some(2),
            ..Default::default()
        };
        assert_eq!(ok.period_start(), Some(date!(2024 - 02 - 01)));

        let missing_month = MonthlyReading {
            year: Some(2024),
            ..Default::default()
        };
        assert_eq!(missing_month.period_start(), None);

        let bad_month = MonthlyReading {
            year: Some(2024),
            month: Some(13),
            ..Default::default()
        };
        assert_eq!(bad_month.period_start(), None);
    }
}

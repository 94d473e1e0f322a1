use serde::{Deserialize, Serialize};

use super::{lenient, AlertSettings, DailyReading, MonthlyReading};

/// Account snapshot handed over by the fetch collaborator.
///
/// Reading series are kept in provider order. Absent or malformed arrays
/// decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(
        rename = "id_abonnement",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub daily_consumption: Vec<DailyReading>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub monthly_consumption: Vec<MonthlyReading>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub alert_settings: AlertSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_series_decode_as_empty() {
        let data: AccountData = serde_json::from_str(r#"{"id_abonnement": "A-1"}"#).unwrap();
        assert_eq!(data.subscription_id.as_deref(), Some("A-1"));
        assert!(data.daily_consumption.is_empty());
        assert!(data.monthly_consumption.is_empty());
        assert_eq!(data.alert_settings, AlertSettings::default());
    }

    #[test]
    fn non_record_entries_are_dropped() {
        let data: AccountData = serde_json::from_str(
            r#"{
                "daily_consumption": [
                    {"date_releve": "2024-01-01", "consommation": {"litre": 50}},
                    42,
                    "garbage",
                    {"date_releve": "2024-01-02"}
                ],
                "monthly_consumption": null
            }"#,
        )
        .unwrap();

        assert_eq!(data.daily_consumption.len(), 2);
        assert_eq!(data.daily_consumption[0].consumption.litre, Some(50));
        assert!(data.monthly_consumption.is_empty());
    }
}

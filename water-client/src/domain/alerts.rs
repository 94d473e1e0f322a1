use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::lenient;

const DAILY_THRESHOLD_LITERS: RangeInclusive<u32> = 100..=10_000;
const MONTHLY_THRESHOLD_M3: RangeInclusive<u32> = 1..=1_000;

/// Consumption alert configuration held by the utility account.
///
/// A daily alert enabled with a zero threshold is the provider's encoding of
/// the "unoccupied home" alert: any consumption at all triggers it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSettings {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub daily_enabled: bool,
    /// Liters per day.
    #[serde(default, deserialize_with = "lenient::int_or_zero")]
    pub daily_threshold: u32,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub daily_notif_email: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub daily_notif_sms: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub monthly_enabled: bool,
    /// Cubic meters per month.
    #[serde(default, deserialize_with = "lenient::int_or_zero")]
    pub monthly_threshold: u32,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub monthly_notif_email: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub monthly_notif_sms: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum AlertCommand {
    SetDailyThreshold(String),
    SetMonthlyThreshold(String),
    DailySms(bool),
    MonthlySms(bool),
    UnoccupiedAlert(bool),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertSettingsError {
    #[error("invalid daily threshold '{0}': expected 0 or 100..=10000 liters")]
    InvalidDailyThreshold(String),
    #[error("invalid monthly threshold '{0}': expected 0 or 1..=1000 m3")]
    InvalidMonthlyThreshold(String),
}

impl AlertSettings {
    pub fn unoccupied_alert_active(&self) -> bool {
        self.daily_enabled && self.daily_threshold == 0
    }

    /// Alert indicators and threshold entries are hidden while the
    /// unoccupied alert owns the daily slot.
    pub fn thresholds_available(&self) -> bool {
        !self.unoccupied_alert_active()
    }

    pub fn daily_sms_available(&self) -> bool {
        !self.unoccupied_alert_active() && self.daily_enabled
    }

    pub fn monthly_sms_available(&self) -> bool {
        !self.unoccupied_alert_active() && self.monthly_enabled
    }

    /// Apply a command. On error the settings are left untouched.
    pub fn apply(&mut self, command: &AlertCommand) -> Result<(), AlertSettingsError> {
        match command {
            AlertCommand::SetDailyThreshold(value) => {
                let threshold = parse_threshold(value, DAILY_THRESHOLD_LITERS)
                    .ok_or_else(|| AlertSettingsError::InvalidDailyThreshold(value.clone()))?;
                if threshold == 0 {
                    self.daily_enabled = false;
                } else {
                    self.daily_enabled = true;
                    self.daily_threshold = threshold;
                    self.daily_notif_email = true;
                    self.daily_notif_sms = false;
                }
            }
            AlertCommand::SetMonthlyThreshold(value) => {
                let threshold = parse_threshold(value, MONTHLY_THRESHOLD_M3)
                    .ok_or_else(|| AlertSettingsError::InvalidMonthlyThreshold(value.clone()))?;
                if threshold == 0 {
                    self.monthly_enabled = false;
                } else {
                    self.monthly_enabled = true;
                    self.monthly_threshold = threshold;
                    self.monthly_notif_email = true;
                    self.monthly_notif_sms = false;
                }
            }
            AlertCommand::DailySms(on) => self.daily_notif_sms = *on,
            AlertCommand::MonthlySms(on) => self.monthly_notif_sms = *on,
            AlertCommand::UnoccupiedAlert(true) => {
                self.daily_enabled = true;
                self.daily_threshold = 0;
                self.daily_notif_sms = true;
                self.daily_notif_email = true;
            }
            AlertCommand::UnoccupiedAlert(false) => self.daily_enabled = false,
        }
        Ok(())
    }
}

/// `0` or a value in `range`, written without sign, padding or leading zeros.
fn parse_threshold(value: &str, range: RangeInclusive<u32>) -> Option<u32> {
    if value.is_empty() || value.len() > 5 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.len() > 1 && value.starts_with('0') {
        return None;
    }
    let n: u32 = value.parse().ok()?;
    (n == 0 || range.contains(&n)).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_threshold_accepts_only_allowed_values() {
        for ok in ["0", "100", "999", "9999", "10000"] {
            assert!(parse_threshold(ok, DAILY_THRESHOLD_LITERS).is_some(), "{ok}");
        }
        for bad in ["", "5", "99", "10001", "0100", "-100", "1e3", " 100"] {
            assert!(parse_threshold(bad, DAILY_THRESHOLD_LITERS).is_none(), "{bad}");
        }
    }

    #[test]
    fn monthly_threshold_accepts_only_allowed_values() {
        for ok in ["0", "1", "42", "999", "1000"] {
            assert!(parse_threshold(ok, MONTHLY_THRESHOLD_M3).is_some(), "{ok}");
        }
        for bad in ["1001", "01", "abc"] {
            assert!(parse_threshold(bad, MONTHLY_THRESHOLD_M3).is_none(), "{bad}");
        }
    }

    #[test]
    fn setting_daily_threshold_enables_email_and_disables_sms() {
        let mut settings = AlertSettings {
            daily_notif_sms: true,
            ..Default::default()
        };
        settings
            .apply(&AlertCommand::SetDailyThreshold("250".to_string()))
            .unwrap();

        assert!(settings.daily_enabled);
        assert_eq!(settings.daily_threshold, 250);
        assert!(settings.daily_notif_email);
        assert!(!settings.daily_notif_sms);
    }

    #[test]
    fn zero_threshold_disables_alert_but_keeps_previous_value() {
        let mut settings = AlertSettings {
            monthly_enabled: true,
            monthly_threshold: 12,
            ..Default::default()
        };
        settings
            .apply(&AlertCommand::SetMonthlyThreshold("0".to_string()))
            .unwrap();

        assert!(!settings.monthly_enabled);
        assert_eq!(settings.monthly_threshold, 12);
    }

    #[test]
    fn invalid_threshold_leaves_settings_unchanged() {
        let mut settings = AlertSettings {
            daily_enabled: true,
            daily_threshold: 300,
            ..Default::default()
        };
        let before = settings.clone();
        let err = settings
            .apply(&AlertCommand::SetDailyThreshold("50".to_string()))
            .unwrap_err();

        assert_eq!(err, AlertSettingsError::InvalidDailyThreshold("50".to_string()));
        assert_eq!(settings, before);
    }

    #[test]
    fn unoccupied_alert_takes_over_daily_slot() {
        let mut settings = AlertSettings {
            daily_enabled: true,
            daily_threshold: 300,
            monthly_enabled: true,
            ..Default::default()
        };
        assert!(settings.daily_sms_available());

        settings.apply(&AlertCommand::UnoccupiedAlert(true)).unwrap();
        assert!(settings.unoccupied_alert_active());
        assert!(settings.daily_notif_sms && settings.daily_notif_email);
        assert!(!settings.thresholds_available());
        assert!(!settings.daily_sms_available());
        assert!(!settings.monthly_sms_available());

        settings.apply(&AlertCommand::UnoccupiedAlert(false)).unwrap();
        assert!(!settings.unoccupied_alert_active());
        assert!(settings.monthly_sms_available());
    }

    #[test]
    fn command_wire_format() {
        let cmd: AlertCommand =
            serde_json::from_str(r#"{"command": "set_daily_threshold", "value": "150"}"#).unwrap();
        assert_eq!(cmd, AlertCommand::SetDailyThreshold("150".to_string()));

        let cmd: AlertCommand =
            serde_json::from_str(r#"{"command": "monthly_sms", "value": true}"#).unwrap();
        assert_eq!(cmd, AlertCommand::MonthlySms(true));
    }
}

//! Entity states exposed to the host: consumption sensors plus the alert
//! indicators, switches and threshold entries.

use serde::Serialize;
use serde_json::{json, Map, Value};
use water_client::domain::{UNIT_CUBIC_METERS, UNIT_LITERS};

use crate::model::ConsumptionModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
    Switch,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub key: &'static str,
    pub platform: Platform,
    pub state: Value,
    pub available: bool,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_display_precision: Option<u8>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    fn new(entry_id: &str, key: &'static str, platform: Platform, state: Value, icon: &'static str) -> Self {
        Self {
            unique_id: format!("{entry_id}_{key}"),
            key,
            platform,
            state,
            available: true,
            icon,
            unit_of_measurement: None,
            state_class: None,
            suggested_display_precision: None,
            attributes: Map::new(),
        }
    }

    fn water(mut self, unit: &'static str, state_class: StateClass, precision: u8) -> Self {
        self.unit_of_measurement = Some(unit);
        self.state_class = Some(state_class);
        self.suggested_display_precision = Some(precision);
        self
    }

    fn attribute(mut self, name: &str, value: Value) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn is_on(&self) -> Option<bool> {
        self.state.as_bool()
    }
}

fn bell(on: bool) -> &'static str {
    if on {
        "mdi:bell-check"
    } else {
        "mdi:bell-cancel"
    }
}

fn comment(on: bool) -> &'static str {
    if on {
        "mdi:comment-check"
    } else {
        "mdi:comment-off"
    }
}

/// All entity states for one model, unique ids prefixed by `entry_id`.
pub fn entity_states(model: &ConsumptionModel, entry_id: &str) -> Vec<EntityState> {
    let c = &model.computed;
    let alerts = &model.alert_settings;
    let last_report = json!(c.last_date.map(|d| d.to_string()));
    let unoccupied = alerts.unoccupied_alert_active();
    let thresholds_available = alerts.thresholds_available();

    vec![
        EntityState::new(entry_id, "last_index", Platform::Sensor, json!(c.last_index_m3), "mdi:counter")
            .water(UNIT_CUBIC_METERS, StateClass::TotalIncreasing, 3)
            .attribute("data_type", json!(c.daily_reliability))
            .attribute("last_report", last_report.clone()),
        EntityState::new(entry_id, "daily_consumption", Platform::Sensor, json!(c.today_liters), "mdi:water")
            .water(UNIT_LITERS, StateClass::Measurement, 0)
            .attribute("data_type", json!(c.today_reliability))
            .attribute("last_report", last_report),
        EntityState::new(
            entry_id,
            "monthly_consumption",
            Platform::Sensor,
            json!(c.monthly_latest_m3),
            "mdi:water",
        )
        .water(UNIT_CUBIC_METERS, StateClass::Total, 3)
        .attribute("data_type", json!(c.monthly_reliability)),
        EntityState::new(
            entry_id,
            "annual_consumption",
            Platform::Sensor,
            json!(c.annual_total_m3),
            "mdi:water",
        )
        .water(UNIT_CUBIC_METERS, StateClass::Total, 3),
        EntityState::new(
            entry_id,
            "last_date",
            Platform::Sensor,
            json!(c.last_date.map(|d| d.to_string())),
            "mdi:calendar",
        ),
        EntityState::new(
            entry_id,
            "daily_alert_binary_sensor",
            Platform::BinarySensor,
            json!(alerts.daily_enabled),
            bell(alerts.daily_enabled),
        )
        .available(thresholds_available),
        EntityState::new(
            entry_id,
            "monthly_alert_binary_sensor",
            Platform::BinarySensor,
            json!(alerts.monthly_enabled),
            bell(alerts.monthly_enabled),
        )
        .available(thresholds_available),
        EntityState::new(
            entry_id,
            "unoccupied_alert_binary_sensor",
            Platform::BinarySensor,
            json!(unoccupied),
            bell(unoccupied),
        ),
        EntityState::new(
            entry_id,
            "daily_sms_alert_switch",
            Platform::Switch,
            json!(alerts.daily_notif_sms),
            comment(alerts.daily_notif_sms),
        )
        .available(alerts.daily_sms_available()),
        EntityState::new(
            entry_id,
            "monthly_sms_alert_switch",
            Platform::Switch,
            json!(alerts.monthly_notif_sms),
            comment(alerts.monthly_notif_sms),
        )
        .available(alerts.monthly_sms_available()),
        EntityState::new(
            entry_id,
            "unoccupied_alert_switch",
            Platform::Switch,
            json!(unoccupied),
            comment(unoccupied),
        ),
        EntityState::new(
            entry_id,
            "daily_threshold_text",
            Platform::Text,
            json!(alerts.daily_threshold.to_string()),
            "mdi:water-alert",
        )
        .available(thresholds_available),
        EntityState::new(
            entry_id,
            "monthly_threshold_text",
            Platform::Text,
            json!(alerts.monthly_threshold.to_string()),
            "mdi:water-alert",
        )
        .available(thresholds_available),
    ]
}

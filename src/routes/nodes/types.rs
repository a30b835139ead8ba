use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{nodes, readings};

/// Alert range for one metric. Both bounds are optional; an unset bound
/// never trips an alert.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct SensorRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Node representation returned to the dashboard. The storage id stays
/// internal; nodes are addressed by `uid` everywhere.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    pub uid: String,
    pub location: String,
    pub machine_name: String,
    /// Owning username
    pub user: String,
    pub is_temperature: Option<bool>,
    pub is_humidity: Option<bool>,
    #[serde(rename = "isCO2")]
    pub is_co2: Option<bool>,
    pub temperature_range: SensorRange,
    pub humidity_range: SensorRange,
    pub co2_range: SensorRange,
}

impl From<nodes::Model> for NodeResponse {
    fn from(node: nodes::Model) -> Self {
        Self {
            uid: node.uid,
            location: node.location,
            machine_name: node.machine_name,
            user: node.owner,
            is_temperature: node.is_temperature,
            is_humidity: node.is_humidity,
            is_co2: node.is_co2,
            temperature_range: SensorRange {
                min: node.temperature_min,
                max: node.temperature_max,
            },
            humidity_range: SensorRange {
                min: node.humidity_min,
                max: node.humidity_max,
            },
            co2_range: SensorRange {
                min: node.co2_min,
                max: node.co2_max,
            },
        }
    }
}

/// Reading representation for dashboard queries and the registration seed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingResponse {
    pub uid: String,
    pub user: Option<String>,
    pub datetime: DateTime<Utc>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub temperature: Option<f64>,
}

impl From<readings::Model> for ReadingResponse {
    fn from(reading: readings::Model) -> Self {
        Self {
            uid: reading.uid,
            user: reading.owner,
            datetime: reading.datetime.with_timezone(&Utc),
            pressure: reading.pressure,
            humidity: reading.humidity,
            co2: reading.co2,
            temperature: reading.temperature,
        }
    }
}

/// Body for node registration. The owning user always comes from the token;
/// a client-supplied `user` field is ignored.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeBody {
    pub uid: String,
    pub location: String,
    pub machine_name: String,
    #[serde(rename = "isTemp")]
    pub is_temp: Option<bool>,
    #[serde(rename = "isHum")]
    pub is_hum: Option<bool>,
    #[serde(rename = "isCO2")]
    pub is_co2: Option<bool>,
    #[serde(default)]
    pub temperature_range: Option<SensorRange>,
    #[serde(default)]
    pub humidity_range: Option<SensorRange>,
    #[serde(default)]
    pub co2_range: Option<SensorRange>,
}

/// Partial update for a registered node, keyed by `uid`. Only the listed
/// fields may change; unknown fields are rejected rather than silently
/// persisted, and `uid` and the owning user are immutable. A supplied range
/// replaces both bounds of that range.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModifyNodeBody {
    pub uid: String,
    pub location: Option<String>,
    pub machine_name: Option<String>,
    pub is_temperature: Option<bool>,
    pub is_humidity: Option<bool>,
    #[serde(rename = "isCO2")]
    pub is_co2: Option<bool>,
    pub temperature_range: Option<SensorRange>,
    pub humidity_range: Option<SensorRange>,
    pub co2_range: Option<SensorRange>,
}

/// Response for a successful registration: the node plus its seed reading.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredResponse {
    pub node: NodeResponse,
    pub reading: ReadingResponse,
}

/// Response for a successful partial update, carrying the updated node.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModifiedResponse {
    pub node: NodeResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

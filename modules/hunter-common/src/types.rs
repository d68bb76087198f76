use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::HunterError;
use crate::schema;

// --- Campaign ---

/// Lifecycle state of a campaign. This worker only ever moves
/// `Searching -> Analyzing`; every later state belongs to downstream stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CampaignState {
    Searching,
    Analyzing,
    Other(String),
}

impl CampaignState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Searching => "buscando",
            Self::Analyzing => "analizando",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for CampaignState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "buscando" => Self::Searching,
            "analizando" => Self::Analyzing,
            _ => Self::Other(s),
        }
    }
}

impl From<CampaignState> for String {
    fn from(state: CampaignState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the campaign sells, to whom, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(rename = "que_vendes", default, deserialize_with = "null_as_empty")]
    pub what_is_sold: String,
    #[serde(rename = "cliente_ideal", default, deserialize_with = "null_as_empty")]
    pub ideal_customer: String,
    #[serde(rename = "ubicacion", default, deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(rename = "cantidad", default, deserialize_with = "clamped_count")]
    pub desired_leads: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    #[serde(flatten)]
    pub criteria: SearchCriteria,
    #[serde(rename = "estado")]
    pub state: CampaignState,
}

impl Campaign {
    /// Decode a campaign from a store row.
    pub fn from_row(row: serde_json::Value) -> Result<Self, HunterError> {
        serde_json::from_value(row).map_err(|e| HunterError::MalformedRow {
            table: schema::CAMPAIGNS_TABLE,
            reason: e.to_string(),
        })
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// The store column is a plain integer owned by other stages. Null and
/// negative counts read as 0; counts above `u32::MAX` saturate.
fn clamped_count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let raw = Option::<i64>::deserialize(d)?.unwrap_or_default();
    Ok(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}

// --- Harvested places ---

/// A place as returned by the crawling backend. Consumed once by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPlaceRecord {
    pub name: Option<String>,
    pub map_url: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// --- Prospect ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProspectStatus {
    /// Freshly harvested, not yet analyzed.
    #[serde(rename = "cazado")]
    Hunted,
}

/// A persisted lead. Serializes to the `prospectos` row shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    #[serde(rename = "campana_id")]
    pub campaign_id: i64,
    #[serde(rename = "nombre_negocio")]
    pub business_name: Option<String>,
    #[serde(rename = "url_google_maps")]
    pub map_url: Option<String>,
    #[serde(rename = "url_sitio_web")]
    pub website_url: Option<String>,
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    #[serde(rename = "email_contacto")]
    pub email: Option<String>,
    #[serde(rename = "estado_prospecto")]
    pub status: ProspectStatus,
}

impl Prospect {
    pub fn from_place(place: RawPlaceRecord, campaign_id: i64) -> Self {
        Self {
            campaign_id,
            business_name: place.name,
            map_url: place.map_url,
            website_url: place.website,
            phone: place.phone,
            email: place.email,
            status: ProspectStatus::Hunted,
        }
    }

    /// Name used in log lines.
    pub fn label(&self) -> &str {
        self.business_name
            .as_deref()
            .or(self.map_url.as_deref())
            .unwrap_or("<unnamed>")
    }
}

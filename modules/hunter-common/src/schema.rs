//! Table and column names of the record store.
//!
//! The store is shared with the downstream stages, which own the schema; the
//! names are Spanish because that is what those stages read.

pub const CAMPAIGNS_TABLE: &str = "campanas";
pub const PROSPECTS_TABLE: &str = "prospectos";

pub mod campaign {
    pub const ID: &str = "id";
    pub const WHAT_IS_SOLD: &str = "que_vendes";
    pub const IDEAL_CUSTOMER: &str = "cliente_ideal";
    pub const LOCATION: &str = "ubicacion";
    pub const DESIRED_LEADS: &str = "cantidad";
    pub const STATE: &str = "estado";
}

pub mod prospect {
    pub const CAMPAIGN_ID: &str = "campana_id";
    pub const BUSINESS_NAME: &str = "nombre_negocio";
    pub const MAP_URL: &str = "url_google_maps";
    pub const WEBSITE_URL: &str = "url_sitio_web";
    pub const PHONE: &str = "telefono";
    pub const EMAIL: &str = "email_contacto";
    pub const STATUS: &str = "estado_prospecto";
}

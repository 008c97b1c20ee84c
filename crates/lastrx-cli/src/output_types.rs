use serde::Serialize;
use tabled::Tabled;

/// One row of `config show`
#[derive(Debug, Serialize, Tabled)]
pub struct SettingRow {
    #[tabled(rename = "Setting")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

/// Output for config init
#[derive(Debug, Serialize)]
pub struct ConfigInitOutput {
    pub path: String,
    pub settings_path: Option<String>,
    pub origin: String,
    pub destination: String,
    pub max_workers: usize,
}

/// One side of a validated transform configuration
#[derive(Debug, Serialize)]
pub struct ReferenceOutput {
    pub reference: String,
    pub decimal_epoch: f64,
    pub crs: String,
    pub epsg: Option<u16>,
    pub compound: bool,
}

/// Output for config validate
#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    pub path: String,
    pub origin: ReferenceOutput,
    pub destination: ReferenceOutput,
    pub max_workers: usize,
    pub identity: bool,
    pub transformer: String,
    pub issues: Vec<String>,
}

/// One metadata record of an inspected file
#[derive(Debug, Serialize, Tabled)]
pub struct RecordRow {
    #[tabled(rename = "User ID")]
    pub user_id: String,
    #[tabled(rename = "Record")]
    pub record_id: u16,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Bytes")]
    pub length: usize,
    #[tabled(rename = "CRS")]
    pub crs: bool,
    #[tabled(rename = "Extended")]
    pub extended: bool,
}

/// One decoded GeoTIFF key
#[derive(Debug, Serialize, Tabled)]
pub struct GeoKeyRow {
    #[tabled(rename = "Key")]
    pub id: u16,
    #[tabled(rename = "Location")]
    pub location: u16,
    #[tabled(rename = "Count")]
    pub count: u16,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Output for inspect
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub path: String,
    pub version: String,
    pub point_format: Option<u8>,
    pub compressed: bool,
    pub point_count: u64,
    pub scales: [f64; 3],
    pub offsets: [f64; 3],
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub system_identifier: String,
    pub generating_software: String,
    pub records: Vec<RecordRow>,
    pub geokeys: Vec<GeoKeyRow>,
    pub citations: Vec<String>,
}

/// Output for doctor
#[derive(Debug, Serialize)]
pub struct DoctorOutput {
    pub version: String,
    pub cpus: usize,
    pub proj_backend: bool,
    pub transformer: String,
    pub formats: Vec<String>,
    pub settings_file: Option<String>,
    pub settings: Vec<SettingRow>,
    pub checks_passed: usize,
    pub total_checks: usize,
}

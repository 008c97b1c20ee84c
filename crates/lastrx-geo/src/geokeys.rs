//! GeoTIFF key directory and citation records
//!
//! Output files describe their CRS with two records: a GeoKeyDirectory (34735) holding
//! model type, type codes, and citation keys, and a GeoAsciiParams (34737) table holding the
//! `|`-terminated citation strings the keys point into.

use lastrx_core::error::{LastrxError, Result};
use lastrx_core::ports::{MetadataRecord, CRS_RECORD_USER_ID};

use crate::crs::{CrsDescriptor, HorizontalKind};

pub const GEO_KEY_DIRECTORY_RECORD_ID: u16 = 34735;
pub const GEO_DOUBLE_PARAMS_RECORD_ID: u16 = 34736;
pub const GEO_ASCII_PARAMS_RECORD_ID: u16 = 34737;

pub const GEO_KEY_DIRECTORY_DESCRIPTION: &str = "GeoTIFF GeoKeyDirectoryTag";
pub const GEO_ASCII_PARAMS_DESCRIPTION: &str = "GeoTIFF GeoAsciiParamsTag";

// Key ids
pub const GT_MODEL_TYPE: u16 = 1024;
pub const GT_CITATION: u16 = 1026;
pub const GEODETIC_CRS: u16 = 2048;
pub const GEODETIC_CITATION: u16 = 2049;
pub const GEOG_ANGULAR_UNITS: u16 = 2054;
pub const PROJECTED_CRS: u16 = 3072;
pub const PROJ_LINEAR_UNITS: u16 = 3076;
pub const VERTICAL_CS_TYPE: u16 = 4096;
pub const VERTICAL_CITATION: u16 = 4097;
pub const VERTICAL_UNITS: u16 = 4099;

// Model types
const MODEL_PROJECTED: u16 = 1;
const MODEL_GEOGRAPHIC: u16 = 2;
const MODEL_GEOCENTRIC: u16 = 3;

// Unit codes
const UNIT_DEGREE: u16 = 9102;
const UNIT_METRE: u16 = 9001;

/// One entry of the key directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKey {
    pub id: u16,
    /// 0 when the value is stored inline, otherwise the record id holding it
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKey {
    fn short(id: u16, value: u16) -> Self {
        Self {
            id,
            tiff_tag_location: 0,
            count: 1,
            value_offset: value,
        }
    }
}

/// Key directory plus the citation strings it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoKeys {
    pub keys: Vec<GeoKey>,
    pub citations: Vec<String>,
}

impl GeoKeys {
    /// Build the keys describing a CRS.
    ///
    /// Citations are laid out in the order geodetic, projection, vertical, and each citation
    /// key points at its own string in that table.
    pub fn from_crs(crs: &CrsDescriptor) -> Result<Self> {
        let mut keys = Vec::new();
        let mut citations = Vec::new();
        let mut offset: usize = 0;

        let mut cite = |id: u16, text: &str, keys: &mut Vec<GeoKey>| -> Result<()> {
            if !text.is_ascii() || text.contains('|') {
                return Err(LastrxError::Transform(format!(
                    "citation '{}' cannot be stored as GeoTIFF ASCII",
                    text
                )));
            }
            let count = text.len() + 1;
            keys.push(GeoKey {
                id,
                tiff_tag_location: GEO_ASCII_PARAMS_RECORD_ID,
                count: to_u16(count)?,
                value_offset: to_u16(offset)?,
            });
            citations.push(text.to_string());
            offset += count;
            Ok(())
        };

        cite(GEODETIC_CITATION, &crs.geodetic_name, &mut keys)?;

        if let HorizontalKind::Projected { .. } = crs.horizontal.kind {
            let projection = crs
                .horizontal
                .name
                .split_once(" / ")
                .map(|(_, projection)| projection)
                .unwrap_or(crs.horizontal.name.as_str());
            cite(GT_CITATION, projection, &mut keys)?;
        }

        if let Some(vertical) = &crs.vertical {
            cite(VERTICAL_CITATION, &vertical.name, &mut keys)?;
            if let Some(code) = vertical.epsg {
                keys.push(GeoKey::short(VERTICAL_CS_TYPE, code));
            }
            keys.push(GeoKey::short(VERTICAL_UNITS, UNIT_METRE));
        }

        match crs.horizontal.kind {
            HorizontalKind::Projected { .. } => {
                keys.push(GeoKey::short(GT_MODEL_TYPE, MODEL_PROJECTED));
                if let Some(code) = crs.horizontal.epsg {
                    keys.push(GeoKey::short(PROJECTED_CRS, code));
                }
                keys.push(GeoKey::short(PROJ_LINEAR_UNITS, UNIT_METRE));
            }
            HorizontalKind::Geographic => {
                keys.push(GeoKey::short(GT_MODEL_TYPE, MODEL_GEOGRAPHIC));
                keys.push(GeoKey::short(GEOG_ANGULAR_UNITS, UNIT_DEGREE));
                if let Some(code) = crs.horizontal.epsg {
                    keys.push(GeoKey::short(GEODETIC_CRS, code));
                }
            }
            HorizontalKind::Geocentric => {
                keys.push(GeoKey::short(GT_MODEL_TYPE, MODEL_GEOCENTRIC));
            }
        }

        keys.sort_by_key(|key| key.id);
        Ok(Self { keys, citations })
    }

    pub fn key(&self, id: u16) -> Option<&GeoKey> {
        self.keys.iter().find(|key| key.id == id)
    }

    /// Citation string a key points into
    pub fn citation(&self, id: u16) -> Option<String> {
        let key = self.key(id)?;
        if key.tiff_tag_location != GEO_ASCII_PARAMS_RECORD_ID {
            return None;
        }
        let table = self.ascii_params();
        let start = usize::from(key.value_offset);
        let end = start + usize::from(key.count).saturating_sub(1);
        String::from_utf8(table.get(start..end)?.to_vec()).ok()
    }

    /// GeoKeyDirectory payload: header `(1, 1, 0, n)` then `n` entries, all little-endian u16
    pub fn directory_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(8 * (self.keys.len() + 1));
        for value in [1u16, 1, 0, self.keys.len() as u16] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        for key in &self.keys {
            for value in [key.id, key.tiff_tag_location, key.count, key.value_offset] {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        data
    }

    /// GeoAsciiParams payload: every citation followed by `|`, then a NUL byte
    pub fn ascii_params(&self) -> Vec<u8> {
        let mut data: Vec<u8> = self
            .citations
            .iter()
            .flat_map(|citation| citation.bytes().chain(std::iter::once(b'|')))
            .collect();
        data.push(0);
        data
    }

    /// Records to append to an output header, ASCII params first
    pub fn to_records(&self) -> Vec<MetadataRecord> {
        vec![
            MetadataRecord::new(
                CRS_RECORD_USER_ID,
                GEO_ASCII_PARAMS_RECORD_ID,
                GEO_ASCII_PARAMS_DESCRIPTION,
                self.ascii_params(),
            ),
            MetadataRecord::new(
                CRS_RECORD_USER_ID,
                GEO_KEY_DIRECTORY_RECORD_ID,
                GEO_KEY_DIRECTORY_DESCRIPTION,
                self.directory_bytes(),
            ),
        ]
    }

    /// Decode the two records back, for inspection of existing files
    pub fn from_records(records: &[MetadataRecord]) -> Option<Self> {
        let directory = records.iter().find(|r| {
            r.user_id == CRS_RECORD_USER_ID && r.record_id == GEO_KEY_DIRECTORY_RECORD_ID
        })?;
        let keys = parse_directory(&directory.data)?;

        let citations = records
            .iter()
            .find(|r| r.user_id == CRS_RECORD_USER_ID && r.record_id == GEO_ASCII_PARAMS_RECORD_ID)
            .map(|r| parse_ascii_params(&r.data))
            .unwrap_or_default();

        Some(Self { keys, citations })
    }
}

/// Records describing a CRS, ready to append to a header
pub fn crs_records(crs: &CrsDescriptor) -> Result<Vec<MetadataRecord>> {
    Ok(GeoKeys::from_crs(crs)?.to_records())
}

fn parse_directory(data: &[u8]) -> Option<Vec<GeoKey>> {
    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let declared = usize::from(*words.get(3)?);
    let available = words.len().saturating_sub(4) / 4;

    Some(
        words[4..]
            .chunks_exact(4)
            .take(declared.min(available))
            .map(|entry| GeoKey {
                id: entry[0],
                tiff_tag_location: entry[1],
                count: entry[2],
                value_offset: entry[3],
            })
            .collect(),
    )
}

fn parse_ascii_params(data: &[u8]) -> Vec<String> {
    let text = data.split(|b| *b == 0).next().unwrap_or_default();
    let owned = String::from_utf8_lossy(text);
    let text = owned.strip_suffix('|').unwrap_or(owned.as_ref());
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('|').map(str::to_string).collect()
    }
}

fn to_u16(value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| LastrxError::Transform("GeoTIFF citation table exceeds 65535 bytes".into()))
}

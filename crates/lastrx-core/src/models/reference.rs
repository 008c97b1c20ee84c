use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::epoch::{decimal_year, EpochInput};
use crate::error::{LastrxError, Result};

/// Geodetic reference frame of one side of a transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceFrame {
    #[serde(rename = "NAD83(CSRS)")]
    Nad83Csrs,
    #[serde(rename = "WGS84")]
    Wgs84,
    #[serde(rename = "ITRF2020")]
    Itrf2020,
    #[serde(rename = "ITRF2014")]
    Itrf2014,
    #[serde(rename = "ITRF2008")]
    Itrf2008,
    #[serde(rename = "ITRF2005")]
    Itrf2005,
    #[serde(rename = "ITRF2000")]
    Itrf2000,
    #[serde(rename = "ITRF97")]
    Itrf97,
    #[serde(rename = "ITRF96")]
    Itrf96,
    #[serde(rename = "ITRF94")]
    Itrf94,
    #[serde(rename = "ITRF93")]
    Itrf93,
    #[serde(rename = "ITRF92")]
    Itrf92,
    #[serde(rename = "ITRF91")]
    Itrf91,
    #[serde(rename = "ITRF90")]
    Itrf90,
    #[serde(rename = "ITRF89")]
    Itrf89,
    #[serde(rename = "ITRF88")]
    Itrf88,
}

impl ReferenceFrame {
    pub const ALL: [ReferenceFrame; 16] = [
        ReferenceFrame::Nad83Csrs,
        ReferenceFrame::Wgs84,
        ReferenceFrame::Itrf2020,
        ReferenceFrame::Itrf2014,
        ReferenceFrame::Itrf2008,
        ReferenceFrame::Itrf2005,
        ReferenceFrame::Itrf2000,
        ReferenceFrame::Itrf97,
        ReferenceFrame::Itrf96,
        ReferenceFrame::Itrf94,
        ReferenceFrame::Itrf93,
        ReferenceFrame::Itrf92,
        ReferenceFrame::Itrf91,
        ReferenceFrame::Itrf90,
        ReferenceFrame::Itrf89,
        ReferenceFrame::Itrf88,
    ];

    /// Canonical label, as written in saved configurations
    pub fn label(&self) -> &'static str {
        match self {
            ReferenceFrame::Nad83Csrs => "NAD83(CSRS)",
            ReferenceFrame::Wgs84 => "WGS84",
            ReferenceFrame::Itrf2020 => "ITRF2020",
            ReferenceFrame::Itrf2014 => "ITRF2014",
            ReferenceFrame::Itrf2008 => "ITRF2008",
            ReferenceFrame::Itrf2005 => "ITRF2005",
            ReferenceFrame::Itrf2000 => "ITRF2000",
            ReferenceFrame::Itrf97 => "ITRF97",
            ReferenceFrame::Itrf96 => "ITRF96",
            ReferenceFrame::Itrf94 => "ITRF94",
            ReferenceFrame::Itrf93 => "ITRF93",
            ReferenceFrame::Itrf92 => "ITRF92",
            ReferenceFrame::Itrf91 => "ITRF91",
            ReferenceFrame::Itrf90 => "ITRF90",
            ReferenceFrame::Itrf89 => "ITRF89",
            ReferenceFrame::Itrf88 => "ITRF88",
        }
    }
}

impl fmt::Display for ReferenceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReferenceFrame {
    type Err = LastrxError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        ReferenceFrame::ALL
            .iter()
            .copied()
            .find(|frame| frame.label().eq_ignore_ascii_case(wanted))
            .or_else(|| match wanted.to_ascii_uppercase().as_str() {
                "NAD83CSRS" | "NAD83" => Some(ReferenceFrame::Nad83Csrs),
                _ => None,
            })
            .ok_or_else(|| LastrxError::ConfigInvalid {
                key: "ref_frame".to_string(),
                reason: format!("unknown reference frame '{}'", s),
            })
    }
}

/// Vertical datum of the heights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalDatum {
    #[serde(rename = "WGS84")]
    Wgs84,
    #[serde(rename = "GRS80")]
    Grs80,
    #[serde(rename = "CGVD2013/CGG2013a")]
    Cgg2013a,
    #[serde(rename = "CGVD2013/CGG2013")]
    Cgg2013,
    #[serde(rename = "CGVD28/HT2_2010v70")]
    Ht2_2010v70,
}

impl VerticalDatum {
    pub const ALL: [VerticalDatum; 5] = [
        VerticalDatum::Wgs84,
        VerticalDatum::Grs80,
        VerticalDatum::Cgg2013a,
        VerticalDatum::Cgg2013,
        VerticalDatum::Ht2_2010v70,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VerticalDatum::Wgs84 => "WGS84",
            VerticalDatum::Grs80 => "GRS80",
            VerticalDatum::Cgg2013a => "CGVD2013/CGG2013a",
            VerticalDatum::Cgg2013 => "CGVD2013/CGG2013",
            VerticalDatum::Ht2_2010v70 => "CGVD28/HT2_2010v70",
        }
    }

    /// Datums offered for a reference frame when building a configuration interactively
    pub fn options_for(frame: ReferenceFrame) -> &'static [VerticalDatum] {
        match frame {
            ReferenceFrame::Nad83Csrs => &[
                VerticalDatum::Grs80,
                VerticalDatum::Cgg2013a,
                VerticalDatum::Cgg2013,
                VerticalDatum::Ht2_2010v70,
            ],
            ReferenceFrame::Wgs84 => &[VerticalDatum::Wgs84],
            _ => &[VerticalDatum::Grs80],
        }
    }

    /// Whether heights in this datum can be attached to the given frame.
    ///
    /// The WGS84 datum pairs only with the WGS84 frame and the reverse.
    pub fn is_compatible_with(&self, frame: ReferenceFrame) -> bool {
        match (self, frame) {
            (VerticalDatum::Wgs84, ReferenceFrame::Wgs84) => true,
            (VerticalDatum::Wgs84, _) | (_, ReferenceFrame::Wgs84) => false,
            _ => true,
        }
    }

    /// Ellipsoidal heights carry no separate vertical system
    pub fn is_ellipsoidal(&self) -> bool {
        matches!(self, VerticalDatum::Wgs84 | VerticalDatum::Grs80)
    }
}

impl fmt::Display for VerticalDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VerticalDatum {
    type Err = LastrxError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        VerticalDatum::ALL
            .iter()
            .copied()
            .find(|vd| vd.label().eq_ignore_ascii_case(wanted))
            .or_else(|| match wanted.to_ascii_uppercase().as_str() {
                "CGG2013A" => Some(VerticalDatum::Cgg2013a),
                "CGG2013" => Some(VerticalDatum::Cgg2013),
                "HT2_2010V70" | "CGVD28" => Some(VerticalDatum::Ht2_2010v70),
                _ => None,
            })
            .ok_or_else(|| LastrxError::ConfigInvalid {
                key: "vd".to_string(),
                reason: format!("unknown vertical datum '{}'", s),
            })
    }
}

/// UTM zone number, northern hemisphere, within 3..=23
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtmZone(u8);

impl UtmZone {
    pub const MIN: u8 = 3;
    pub const MAX: u8 = 23;

    pub fn new(zone: i64) -> Result<Self> {
        if zone < i64::from(Self::MIN) || zone > i64::from(Self::MAX) {
            return Err(LastrxError::UtmZoneOutOfRange { zone });
        }
        Ok(Self(zone as u8))
    }

    pub fn number(&self) -> u8 {
        self.0
    }
}

/// Representation of the coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CoordType {
    Cartesian,
    Geographic,
    Utm(UtmZone),
}

impl CoordType {
    pub fn utm(zone: i64) -> Result<Self> {
        UtmZone::new(zone).map(CoordType::Utm)
    }

    pub fn utm_zone(&self) -> Option<UtmZone> {
        match self {
            CoordType::Utm(zone) => Some(*zone),
            _ => None,
        }
    }

    /// Every representation, UTM zones in ascending order
    pub fn all() -> Vec<CoordType> {
        let mut all = vec![CoordType::Cartesian, CoordType::Geographic];
        all.extend((UtmZone::MIN..=UtmZone::MAX).map(|z| CoordType::Utm(UtmZone(z))));
        all
    }
}

impl fmt::Display for CoordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordType::Cartesian => f.write_str("Cartesian"),
            CoordType::Geographic => f.write_str("Geographic"),
            CoordType::Utm(zone) => write!(f, "UTM{}", zone.number()),
        }
    }
}

impl FromStr for CoordType {
    type Err = LastrxError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        let upper = wanted.to_ascii_uppercase();
        match upper.as_str() {
            "CARTESIAN" | "CART" => return Ok(CoordType::Cartesian),
            "GEOGRAPHIC" | "GEOG" => return Ok(CoordType::Geographic),
            _ => {}
        }

        if let Some(zone) = upper.strip_prefix("UTM") {
            let zone = zone.trim().parse::<i64>().map_err(|_| LastrxError::ConfigInvalid {
                key: "coord_type".to_string(),
                reason: format!("'{}' does not name a UTM zone", s),
            })?;
            return CoordType::utm(zone);
        }

        Err(LastrxError::ConfigInvalid {
            key: "coord_type".to_string(),
            reason: format!(
                "unknown coordinate type '{}': expected Cartesian, Geographic, or UTM3..UTM23",
                s
            ),
        })
    }
}

impl TryFrom<String> for CoordType {
    type Error = LastrxError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CoordType> for String {
    fn from(value: CoordType) -> Self {
        value.to_string()
    }
}

/// One side (origin or destination) of a transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawReferenceConfig")]
pub struct ReferenceConfig {
    pub ref_frame: ReferenceFrame,
    pub epoch: NaiveDate,
    #[serde(rename = "vd")]
    pub vertical_datum: VerticalDatum,
    pub coord_type: CoordType,
}

impl ReferenceConfig {
    /// Build a reference configuration, rejecting frame/datum pairs that cannot be combined
    pub fn new(
        ref_frame: ReferenceFrame,
        epoch: NaiveDate,
        vertical_datum: VerticalDatum,
        coord_type: CoordType,
    ) -> Result<Self> {
        if !vertical_datum.is_compatible_with(ref_frame) {
            return Err(LastrxError::UnsupportedCombination {
                ref_frame: ref_frame.label().to_string(),
                vertical_datum: vertical_datum.label().to_string(),
            });
        }

        Ok(Self {
            ref_frame,
            epoch,
            vertical_datum,
            coord_type,
        })
    }

    /// Parameters handed to the coordinate transformer
    pub fn to_params(&self) -> ReferenceParams {
        ReferenceParams {
            ref_frame: self.ref_frame,
            epoch: decimal_year(self.epoch),
            vertical_datum: self.vertical_datum,
            coord_type: self.coord_type,
        }
    }
}

impl fmt::Display for ReferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} / {} / {}",
            self.ref_frame, self.epoch, self.vertical_datum, self.coord_type
        )
    }
}

#[derive(Deserialize)]
struct RawReferenceConfig {
    ref_frame: ReferenceFrame,
    epoch: EpochInput,
    vd: VerticalDatum,
    coord_type: CoordType,
}

impl TryFrom<RawReferenceConfig> for ReferenceConfig {
    type Error = LastrxError;

    fn try_from(raw: RawReferenceConfig) -> Result<Self> {
        ReferenceConfig::new(raw.ref_frame, raw.epoch.to_date()?, raw.vd, raw.coord_type)
    }
}

/// Reference configuration with the epoch resolved to a decimal year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceParams {
    pub ref_frame: ReferenceFrame,
    pub epoch: f64,
    pub vertical_datum: VerticalDatum,
    pub coord_type: CoordType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_frame_labels_round_trip() {
        for frame in ReferenceFrame::ALL {
            assert_eq!(frame.label().parse::<ReferenceFrame>().unwrap(), frame);
            let json = serde_json::to_string(&frame).unwrap();
            assert_eq!(json, format!("\"{}\"", frame.label()));
        }
        assert_eq!("nad83csrs".parse::<ReferenceFrame>().unwrap(), ReferenceFrame::Nad83Csrs);
        assert!("ITRF2099".parse::<ReferenceFrame>().is_err());
    }

    #[test]
    fn test_vertical_datum_labels() {
        for vd in VerticalDatum::ALL {
            assert_eq!(vd.label().parse::<VerticalDatum>().unwrap(), vd);
        }
        assert_eq!("cgg2013a".parse::<VerticalDatum>().unwrap(), VerticalDatum::Cgg2013a);
    }

    #[test]
    fn test_coord_type_parsing() {
        assert_eq!("Cartesian".parse::<CoordType>().unwrap(), CoordType::Cartesian);
        assert_eq!("geog".parse::<CoordType>().unwrap(), CoordType::Geographic);
        assert_eq!("UTM10".parse::<CoordType>().unwrap(), CoordType::utm(10).unwrap());
        assert_eq!(CoordType::utm(23).unwrap().to_string(), "UTM23");
        assert!(matches!(
            "UTM2".parse::<CoordType>(),
            Err(LastrxError::UtmZoneOutOfRange { zone: 2 })
        ));
        assert!(matches!(
            CoordType::utm(24),
            Err(LastrxError::UtmZoneOutOfRange { zone: 24 })
        ));
        assert_eq!(CoordType::all().len(), 23);
    }

    #[test]
    fn test_vertical_datum_options() {
        assert_eq!(VerticalDatum::options_for(ReferenceFrame::Nad83Csrs).len(), 4);
        assert_eq!(
            VerticalDatum::options_for(ReferenceFrame::Wgs84),
            &[VerticalDatum::Wgs84]
        );
        assert_eq!(
            VerticalDatum::options_for(ReferenceFrame::Itrf2014),
            &[VerticalDatum::Grs80]
        );

        for frame in ReferenceFrame::ALL {
            for vd in VerticalDatum::options_for(frame) {
                assert!(vd.is_compatible_with(frame));
            }
        }
    }

    #[test]
    fn test_incompatible_datum_rejected() {
        let err = ReferenceConfig::new(
            ReferenceFrame::Nad83Csrs,
            ymd(2010, 1, 1),
            VerticalDatum::Wgs84,
            CoordType::Geographic,
        )
        .unwrap_err();
        assert!(matches!(err, LastrxError::UnsupportedCombination { .. }));
        assert!(err.to_string().contains("NAD83(CSRS)"));

        assert!(ReferenceConfig::new(
            ReferenceFrame::Wgs84,
            ymd(2010, 1, 1),
            VerticalDatum::Grs80,
            CoordType::Geographic,
        )
        .is_err());
    }

    #[test]
    fn test_deserialize_decimal_epoch() {
        let json = r#"{"ref_frame":"ITRF2014","epoch":2010.0,"vd":"GRS80","coord_type":"Geographic"}"#;
        let config: ReferenceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.epoch, ymd(2010, 1, 1));
        assert_eq!(config.to_params().epoch, 2010.0);
    }

    #[test]
    fn test_deserialize_rejects_bad_combination() {
        let json = r#"{"ref_frame":"ITRF2014","epoch":"2010-01-01","vd":"WGS84","coord_type":"UTM10"}"#;
        assert!(serde_json::from_str::<ReferenceConfig>(json).is_err());
    }
}

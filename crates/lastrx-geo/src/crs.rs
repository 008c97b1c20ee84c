//! Coordinate reference system derivation
//!
//! Maps one side of a transformation (frame, coordinate type, vertical datum) to the CRS that
//! is written into output file metadata and used to build the coordinate transformer.

use lastrx_core::error::{LastrxError, Result};
use lastrx_core::models::{CoordType, ReferenceConfig, ReferenceFrame, VerticalDatum};
use serde::Serialize;
use std::fmt;

/// Horizontal component kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HorizontalKind {
    Geographic,
    Geocentric,
    Projected { utm_zone: u8 },
}

/// Horizontal (or geocentric) part of a CRS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HorizontalCrs {
    pub kind: HorizontalKind,
    pub name: String,
    pub epsg: Option<u16>,
    /// Definition PROJ accepts, an `EPSG:` code when one exists
    pub proj_definition: String,
}

/// Vertical part of a compound CRS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerticalCrs {
    pub name: String,
    pub epsg: Option<u16>,
}

/// Derived coordinate reference system
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrsDescriptor {
    pub name: String,
    /// Code of the whole CRS, compound when a vertical part is present
    pub epsg: Option<u16>,
    /// Name of the underlying geodetic datum, e.g. `NAD83(CSRS)`
    pub geodetic_name: String,
    pub horizontal: HorizontalCrs,
    pub vertical: Option<VerticalCrs>,
}

impl CrsDescriptor {
    /// Derive the CRS for one side of a transformation.
    ///
    /// Geographic systems become 3D when no vertical part applies. A vertical datum is dropped
    /// for geocentric (cartesian) coordinates.
    pub fn from_reference(reference: &ReferenceConfig) -> Result<Self> {
        let frame = reference.ref_frame;
        let vd = reference.vertical_datum;

        if !vd.is_compatible_with(frame) {
            return Err(LastrxError::UnsupportedCombination {
                ref_frame: frame.label().to_string(),
                vertical_datum: vd.label().to_string(),
            });
        }

        let geodetic_name = geodetic_name(frame).to_string();
        let vertical = match reference.coord_type {
            CoordType::Cartesian => None,
            _ => vertical_crs(vd),
        };

        let horizontal = match reference.coord_type {
            CoordType::Cartesian => HorizontalCrs {
                kind: HorizontalKind::Geocentric,
                name: geodetic_name.clone(),
                epsg: Some(geocentric_epsg(frame)),
                proj_definition: format!("EPSG:{}", geocentric_epsg(frame)),
            },
            CoordType::Geographic => {
                let epsg = if vertical.is_some() {
                    geographic_2d_epsg(frame)
                } else {
                    geographic_3d_epsg(frame)
                };
                HorizontalCrs {
                    kind: HorizontalKind::Geographic,
                    name: geodetic_name.clone(),
                    epsg: Some(epsg),
                    proj_definition: format!("EPSG:{}", geographic_2d_epsg(frame)),
                }
            }
            CoordType::Utm(zone) => {
                let zone = zone.number();
                let epsg = utm_epsg(frame, zone);
                let proj_definition = match epsg {
                    Some(code) => format!("EPSG:{}", code),
                    None => format!(
                        "+proj=utm +zone={} +ellps={} +units=m +no_defs +type=crs",
                        zone,
                        ellipsoid(frame)
                    ),
                };
                HorizontalCrs {
                    kind: HorizontalKind::Projected { utm_zone: zone },
                    name: format!("{} / UTM zone {}N", geodetic_name, zone),
                    epsg,
                    proj_definition,
                }
            }
        };

        let (name, epsg) = match &vertical {
            Some(v) => (
                format!("{} + {}", horizontal.name, v.name),
                compound_epsg(frame, reference.coord_type, vd),
            ),
            None => (horizontal.name.clone(), horizontal.epsg),
        };

        Ok(Self {
            name,
            epsg,
            geodetic_name,
            horizontal,
            vertical,
        })
    }

    /// Canonical identifier: the EPSG code when one exists, the name otherwise
    pub fn identifier(&self) -> String {
        match self.epsg {
            Some(code) => format!("EPSG:{}", code),
            None => self.name.clone(),
        }
    }

    pub fn is_compound(&self) -> bool {
        self.vertical.is_some()
    }

    pub fn is_projected(&self) -> bool {
        matches!(self.horizontal.kind, HorizontalKind::Projected { .. })
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self.horizontal.kind, HorizontalKind::Geographic)
    }

    pub fn is_geocentric(&self) -> bool {
        matches!(self.horizontal.kind, HorizontalKind::Geocentric)
    }
}

impl fmt::Display for CrsDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "{} (EPSG:{})", self.name, code),
            None => f.write_str(&self.name),
        }
    }
}

/// Name of the geodetic datum as registered by EPSG
pub fn geodetic_name(frame: ReferenceFrame) -> &'static str {
    match frame {
        ReferenceFrame::Wgs84 => "WGS 84",
        other => other.label(),
    }
}

/// Geographic 2D code of the frame
pub fn geographic_2d_epsg(frame: ReferenceFrame) -> u16 {
    match frame {
        ReferenceFrame::Nad83Csrs => 4617,
        ReferenceFrame::Wgs84 => 4326,
        ReferenceFrame::Itrf2020 => 9990,
        ReferenceFrame::Itrf2014 => 9000,
        ReferenceFrame::Itrf2008 => 8999,
        ReferenceFrame::Itrf2005 => 8998,
        ReferenceFrame::Itrf2000 => 8997,
        ReferenceFrame::Itrf97 => 8996,
        ReferenceFrame::Itrf96 => 8995,
        ReferenceFrame::Itrf94 => 8994,
        ReferenceFrame::Itrf93 => 8993,
        ReferenceFrame::Itrf92 => 8992,
        ReferenceFrame::Itrf91 => 8991,
        ReferenceFrame::Itrf90 => 8990,
        ReferenceFrame::Itrf89 => 8989,
        ReferenceFrame::Itrf88 => 8988,
    }
}

/// Geographic 3D code of the frame
pub fn geographic_3d_epsg(frame: ReferenceFrame) -> u16 {
    match frame {
        ReferenceFrame::Nad83Csrs => 4955,
        ReferenceFrame::Wgs84 => 4979,
        ReferenceFrame::Itrf2020 => 9989,
        ReferenceFrame::Itrf2014 => 7912,
        ReferenceFrame::Itrf2008 => 7911,
        ReferenceFrame::Itrf2005 => 7910,
        ReferenceFrame::Itrf2000 => 7909,
        ReferenceFrame::Itrf97 => 7908,
        ReferenceFrame::Itrf96 => 7907,
        ReferenceFrame::Itrf94 => 7906,
        ReferenceFrame::Itrf93 => 7905,
        ReferenceFrame::Itrf92 => 7904,
        ReferenceFrame::Itrf91 => 7903,
        ReferenceFrame::Itrf90 => 7902,
        ReferenceFrame::Itrf89 => 7901,
        ReferenceFrame::Itrf88 => 7900,
    }
}

/// Geocentric code of the frame
pub fn geocentric_epsg(frame: ReferenceFrame) -> u16 {
    match frame {
        ReferenceFrame::Nad83Csrs => 4954,
        ReferenceFrame::Wgs84 => 4978,
        ReferenceFrame::Itrf2020 => 9988,
        ReferenceFrame::Itrf2014 => 7789,
        ReferenceFrame::Itrf2008 => 5332,
        ReferenceFrame::Itrf2005 => 4896,
        ReferenceFrame::Itrf2000 => 4919,
        ReferenceFrame::Itrf97 => 4918,
        ReferenceFrame::Itrf96 => 4917,
        ReferenceFrame::Itrf94 => 4916,
        ReferenceFrame::Itrf93 => 4915,
        ReferenceFrame::Itrf92 => 4914,
        ReferenceFrame::Itrf91 => 4913,
        ReferenceFrame::Itrf90 => 4912,
        ReferenceFrame::Itrf89 => 4911,
        ReferenceFrame::Itrf88 => 4910,
    }
}

/// Registered UTM projection codes, northern hemisphere
pub fn utm_epsg(frame: ReferenceFrame, zone: u8) -> Option<u16> {
    match frame {
        ReferenceFrame::Nad83Csrs => match zone {
            7..=10 => Some(3154 + u16::from(zone - 7)),
            11..=13 => Some(2955 + u16::from(zone - 11)),
            14..=16 => Some(3158 + u16::from(zone - 14)),
            17..=21 => Some(2958 + u16::from(zone - 17)),
            22 => Some(3761),
            _ => None,
        },
        ReferenceFrame::Wgs84 => Some(32600 + u16::from(zone)),
        _ => None,
    }
}

fn compound_epsg(frame: ReferenceFrame, coord_type: CoordType, vd: VerticalDatum) -> Option<u16> {
    match (frame, vd) {
        // CGG2013a has no registered vertical CRS, so only CGG2013 compounds are coded
        (ReferenceFrame::Nad83Csrs, VerticalDatum::Cgg2013) => {
            match coord_type {
                CoordType::Geographic => Some(6649),
                CoordType::Utm(zone) if (7..=22).contains(&zone.number()) => {
                    Some(6650 + u16::from(zone.number() - 7))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn vertical_crs(vd: VerticalDatum) -> Option<VerticalCrs> {
    match vd {
        VerticalDatum::Wgs84 | VerticalDatum::Grs80 => None,
        VerticalDatum::Cgg2013 => Some(VerticalCrs {
            name: "CGVD2013(CGG2013) height".to_string(),
            epsg: Some(6647),
        }),
        VerticalDatum::Cgg2013a => Some(VerticalCrs {
            name: "CGVD2013(CGG2013a) height".to_string(),
            epsg: None,
        }),
        VerticalDatum::Ht2_2010v70 => Some(VerticalCrs {
            name: "CGVD28 height".to_string(),
            epsg: Some(5713),
        }),
    }
}

fn ellipsoid(frame: ReferenceFrame) -> &'static str {
    match frame {
        ReferenceFrame::Wgs84 => "WGS84",
        _ => "GRS80",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn reference(frame: ReferenceFrame, vd: VerticalDatum, coord_type: CoordType) -> ReferenceConfig {
        ReferenceConfig::new(
            frame,
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            vd,
            coord_type,
        )
        .unwrap()
    }

    fn crs(frame: ReferenceFrame, vd: VerticalDatum, coord_type: CoordType) -> CrsDescriptor {
        CrsDescriptor::from_reference(&reference(frame, vd, coord_type)).unwrap()
    }

    #[test]
    fn test_nad83_geographic_ellipsoidal() {
        let c = crs(ReferenceFrame::Nad83Csrs, VerticalDatum::Grs80, CoordType::Geographic);
        assert_eq!(c.epsg, Some(4955));
        assert_eq!(c.name, "NAD83(CSRS)");
        assert!(!c.is_compound());
    }

    #[test]
    fn test_nad83_compound_codes() {
        let c = crs(ReferenceFrame::Nad83Csrs, VerticalDatum::Cgg2013, CoordType::Geographic);
        assert_eq!(c.epsg, Some(6649));
        assert_eq!(c.name, "NAD83(CSRS) + CGVD2013(CGG2013) height");
        assert_eq!(c.horizontal.epsg, Some(4617));
        assert_eq!(c.vertical.as_ref().and_then(|v| v.epsg), Some(6647));

        for (zone, expected) in [(9, 6652), (10, 6653), (11, 6654)] {
            let c = crs(
                ReferenceFrame::Nad83Csrs,
                VerticalDatum::Cgg2013,
                CoordType::utm(zone).unwrap(),
            );
            assert_eq!(c.epsg, Some(expected));
        }
    }

    #[test]
    fn test_cgg2013a_compound_is_unregistered() {
        let c = crs(ReferenceFrame::Nad83Csrs, VerticalDatum::Cgg2013a, CoordType::Geographic);
        assert_eq!(c.epsg, None);
        assert_eq!(c.name, "NAD83(CSRS) + CGVD2013(CGG2013a) height");
        assert_eq!(c.identifier(), "NAD83(CSRS) + CGVD2013(CGG2013a) height");
        assert_eq!(c.horizontal.epsg, Some(4617));
        assert_eq!(c.vertical.as_ref().and_then(|v| v.epsg), None);

        let c = crs(
            ReferenceFrame::Nad83Csrs,
            VerticalDatum::Cgg2013a,
            CoordType::utm(10).unwrap(),
        );
        assert_eq!(c.epsg, None);
        assert_eq!(c.horizontal.epsg, Some(3157));
    }

    #[test]
    fn test_nad83_utm_cgvd28_name() {
        let c = crs(
            ReferenceFrame::Nad83Csrs,
            VerticalDatum::Ht2_2010v70,
            CoordType::utm(9).unwrap(),
        );
        assert_eq!(c.name, "NAD83(CSRS) / UTM zone 9N + CGVD28 height");
        assert_eq!(c.horizontal.epsg, Some(3156));
        assert_eq!(c.vertical.as_ref().and_then(|v| v.epsg), Some(5713));
    }

    #[test]
    fn test_cartesian_drops_vertical() {
        let c = crs(ReferenceFrame::Nad83Csrs, VerticalDatum::Cgg2013, CoordType::Cartesian);
        assert!(c.is_geocentric());
        assert!(c.vertical.is_none());
        assert_eq!(c.epsg, Some(4954));
        assert_eq!(c.name, "NAD83(CSRS)");
    }

    #[test]
    fn test_itrf_codes() {
        let c = crs(ReferenceFrame::Itrf2014, VerticalDatum::Grs80, CoordType::Geographic);
        assert_eq!(c.epsg, Some(7912));

        let c = crs(ReferenceFrame::Itrf2020, VerticalDatum::Grs80, CoordType::Geographic);
        assert_eq!(c.epsg, Some(9989));
        assert_eq!(geographic_3d_epsg(ReferenceFrame::Itrf2020), 9989);
        assert_eq!(geographic_2d_epsg(ReferenceFrame::Itrf2020), 9990);
        assert_eq!(geocentric_epsg(ReferenceFrame::Itrf2020), 9988);

        let c = crs(ReferenceFrame::Itrf2014, VerticalDatum::Cgg2013, CoordType::Geographic);
        assert_eq!(c.name, "ITRF2014 + CGVD2013(CGG2013) height");
        assert_eq!(c.epsg, None);
        assert_eq!(c.identifier(), "ITRF2014 + CGVD2013(CGG2013) height");

        let c = crs(ReferenceFrame::Itrf2008, VerticalDatum::Grs80, CoordType::utm(5).unwrap());
        assert_eq!(c.epsg, None);
        assert!(c.horizontal.proj_definition.contains("+zone=5"));
    }

    #[test]
    fn test_wgs84_utm() {
        let c = crs(ReferenceFrame::Wgs84, VerticalDatum::Wgs84, CoordType::utm(10).unwrap());
        assert_eq!(c.epsg, Some(32610));
        assert_eq!(c.name, "WGS 84 / UTM zone 10N");
    }

    #[test]
    fn test_incompatible_datum_is_error() {
        let mut r = reference(ReferenceFrame::Nad83Csrs, VerticalDatum::Grs80, CoordType::Geographic);
        r.vertical_datum = VerticalDatum::Wgs84;
        let err = CrsDescriptor::from_reference(&r).unwrap_err();
        assert!(matches!(err, LastrxError::UnsupportedCombination { .. }));
    }

    fn valid_reference() -> impl Strategy<Value = ReferenceConfig> {
        let frames = prop::sample::select(ReferenceFrame::ALL.to_vec());
        let coord_types = prop::sample::select(CoordType::all());
        (frames, coord_types, any::<prop::sample::Index>()).prop_map(|(frame, coord_type, idx)| {
            let options = VerticalDatum::ALL
                .iter()
                .copied()
                .filter(|vd| vd.is_compatible_with(frame))
                .collect::<Vec<_>>();
            let vd = options[idx.index(options.len())];
            reference(frame, vd, coord_type)
        })
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(r in valid_reference()) {
            let a = CrsDescriptor::from_reference(&r).unwrap();
            let b = CrsDescriptor::from_reference(&r).unwrap();
            prop_assert_eq!(a.identifier(), b.identifier());
            prop_assert_eq!(a, b);
        }
    }
}

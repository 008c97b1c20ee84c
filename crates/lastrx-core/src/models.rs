pub mod epoch;
pub mod reference;
pub mod transform;

pub use epoch::{date_from_decimal_year, decimal_year, days_in_year, parse_epoch, EpochInput};
pub use reference::{
    CoordType, ReferenceConfig, ReferenceFrame, ReferenceParams, UtmZone, VerticalDatum,
};
pub use transform::{ConfigIssue, TransformConfig, TransformParams};

//! Dataset infrastructure - Request body decoding

mod csv;
mod params;

pub use self::csv::parse_csv;
pub use self::params::parse_params;

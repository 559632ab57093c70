//! IP geolocation over local geo databases.
//!
//! - [`Ip2RegionSearcher`] - region strings for IPv4 from an ip2region `xdb` file
//! - [`MaxmindDatabase`] - GeoLite2 City and ASN lookups
//! - [`IpLocator`] - combines both with a private-address short circuit and caching
//! - [`ProxyDetector`] - proxy/anycast check against ipinfo.io

mod ip2region;
mod location;
mod locator;
mod maxmind;
mod proxy;

pub use ip2region::{Ip2RegionSearcher, RegionSearcher};
pub use location::IpLocation;
pub use locator::{IpLocator, is_private_ip};
pub use maxmind::{ASN_DB_FILE, CITY_DB_FILE, MaxmindDatabase};
pub use proxy::{ProxyDetector, ProxyError};

#[cfg(test)]
pub use ip2region::MockRegionSearcher;

use std::net::IpAddr;
use thiserror::Error;

/// ip2region database file name inside the data directory.
pub const REGION_DB_FILE: &str = "ip2region.xdb";

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("address not found")]
    AddressNotFound,

    #[error("geo database error: {0}")]
    Database(String),

    #[error("geo database io error: {0}")]
    Io(#[from] std::io::Error),
}

/// City-level lookup result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityRecord {
    pub country: Option<String>,
    pub city: Option<String>,
    pub time_zone: Option<String>,
}

/// Autonomous system lookup result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsnRecord {
    pub number: Option<u32>,
    pub organization: Option<String>,
}

/// City and ASN lookups.
#[cfg_attr(test, mockall::automock)]
pub trait GeoDatabase: Send + Sync {
    fn city(&self, ip: IpAddr) -> Result<CityRecord, GeoError>;

    fn asn(&self, ip: IpAddr) -> Result<AsnRecord, GeoError>;

    /// Whether both databases are available.
    fn is_loaded(&self) -> bool;
}

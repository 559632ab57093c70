//! GeoLite2 City and ASN lookups.

use maxminddb::{MaxMindDBError, Reader, geoip2};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use tracing::{info, warn};

use super::{AsnRecord, CityRecord, GeoDatabase, GeoError};

pub const CITY_DB_FILE: &str = "GeoLite2-City.mmdb";
pub const ASN_DB_FILE: &str = "GeoLite2-ASN.mmdb";

/// City and ASN readers over MaxMind `.mmdb` files.
///
/// Either reader may be absent; lookups against a missing database report
/// [`GeoError::AddressNotFound`] so callers fall back the same way.
pub struct MaxmindDatabase {
    city: Option<Reader<Vec<u8>>>,
    asn: Option<Reader<Vec<u8>>>,
    language: String,
}

impl MaxmindDatabase {
    /// Opens `GeoLite2-City.mmdb` and `GeoLite2-ASN.mmdb` from `data_dir`.
    pub fn open(data_dir: &Path, language: &str) -> Self {
        Self {
            city: open_reader(&data_dir.join(CITY_DB_FILE)),
            asn: open_reader(&data_dir.join(ASN_DB_FILE)),
            language: language.to_string(),
        }
    }

    fn pick_name(&self, names: Option<&BTreeMap<&str, &str>>) -> Option<String> {
        let names = names?;
        names
            .get(self.language.as_str())
            .or_else(|| names.get("en"))
            .map(|s| s.to_string())
    }
}

fn open_reader(path: &Path) -> Option<Reader<Vec<u8>>> {
    match Reader::open_readfile(path) {
        Ok(reader) => {
            info!("Loaded geo database {}", path.display());
            Some(reader)
        }
        Err(e) => {
            warn!("Geo database {} unavailable: {}", path.display(), e);
            None
        }
    }
}

impl From<MaxMindDBError> for GeoError {
    fn from(e: MaxMindDBError) -> Self {
        match e {
            MaxMindDBError::AddressNotFoundError(_) => GeoError::AddressNotFound,
            other => GeoError::Database(other.to_string()),
        }
    }
}

impl GeoDatabase for MaxmindDatabase {
    fn city(&self, ip: IpAddr) -> Result<CityRecord, GeoError> {
        let reader = self.city.as_ref().ok_or(GeoError::AddressNotFound)?;
        let city: geoip2::City = reader.lookup(ip)?;

        Ok(CityRecord {
            country: self.pick_name(city.country.as_ref().and_then(|c| c.names.as_ref())),
            city: self.pick_name(city.city.as_ref().and_then(|c| c.names.as_ref())),
            time_zone: city
                .location
                .as_ref()
                .and_then(|l| l.time_zone)
                .map(str::to_string),
        })
    }

    fn asn(&self, ip: IpAddr) -> Result<AsnRecord, GeoError> {
        let reader = self.asn.as_ref().ok_or(GeoError::AddressNotFound)?;
        let asn: geoip2::Asn = reader.lookup(ip)?;

        Ok(AsnRecord {
            number: asn.autonomous_system_number,
            organization: asn.autonomous_system_organization.map(str::to_string),
        })
    }

    fn is_loaded(&self) -> bool {
        self.city.is_some() && self.asn.is_some()
    }
}

//! IP geolocation with fallback and caching.

use moka::sync::Cache;
use std::cell::OnceCell;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    AsnRecord, CityRecord, GeoDatabase, GeoError, Ip2RegionSearcher, IpLocation, MaxmindDatabase,
    REGION_DB_FILE, RegionSearcher,
};

const CACHE_CAPACITY: u64 = 10_000;
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Whether an address is loopback, private, link-local or unspecified.
///
/// IPv4-mapped IPv6 addresses are judged by their IPv4 form.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_v4(v4);
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.is_unspecified()
}

/// Resolves IP addresses to locations, networks and time zones.
pub struct IpLocator {
    region: Option<Arc<dyn RegionSearcher>>,
    geo: Arc<dyn GeoDatabase>,
    default_time_zone: String,
    cache: Cache<IpAddr, IpLocation>,
}

impl IpLocator {
    pub fn new(
        region: Option<Arc<dyn RegionSearcher>>,
        geo: Arc<dyn GeoDatabase>,
        default_time_zone: impl Into<String>,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            region,
            geo,
            default_time_zone: default_time_zone.into(),
            cache,
        }
    }

    /// Opens the region and MaxMind databases found in `data_dir`.
    ///
    /// Missing files are logged; lookups then fall back to empty results.
    pub fn load(data_dir: &Path, language: &str, default_time_zone: &str) -> Self {
        let region_path = data_dir.join(REGION_DB_FILE);
        let region: Option<Arc<dyn RegionSearcher>> = match Ip2RegionSearcher::open(&region_path)
        {
            Ok(searcher) => Some(Arc::new(searcher)),
            Err(e) => {
                warn!("Region database {} unavailable: {}", region_path.display(), e);
                None
            }
        };

        let geo = Arc::new(MaxmindDatabase::open(data_dir, language));
        Self::new(region, geo, default_time_zone)
    }

    /// Whether every geo database is loaded.
    pub fn is_loaded(&self) -> bool {
        self.region.is_some() && self.geo.is_loaded()
    }

    /// Resolves the location of an address.
    pub fn locate(&self, ip: IpAddr) -> IpLocation {
        if is_private_ip(ip) {
            return IpLocation::new(Some("Intranet"), None, None, Some("Intranet IP"), None);
        }

        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            v4 => v4,
        };

        if let Some(hit) = self.cache.get(&ip) {
            return hit;
        }

        let location = self.resolve(ip);
        self.cache.insert(ip, location.clone());
        location
    }

    /// Parses and resolves an address; unparsable input yields an unknown location.
    pub fn locate_str(&self, ip: &str) -> IpLocation {
        match ip.trim().parse::<IpAddr>() {
            Ok(addr) => self.locate(addr),
            Err(_) => {
                debug!("Unparsable IP address {:?}", ip);
                IpLocation::default()
            }
        }
    }

    /// Autonomous system of an address; empty for private addresses and misses.
    pub fn asn(&self, ip: IpAddr) -> AsnRecord {
        if is_private_ip(ip) {
            return AsnRecord::default();
        }
        or_fallback(self.geo.asn(ip), "ASN")
    }

    /// IANA time zone of an address, or the configured default.
    pub fn client_time_zone(&self, ip: IpAddr) -> String {
        if is_private_ip(ip) {
            return self.default_time_zone.clone();
        }
        self.city(ip)
            .time_zone
            .unwrap_or_else(|| self.default_time_zone.clone())
    }

    fn city(&self, ip: IpAddr) -> CityRecord {
        or_fallback(self.geo.city(ip), "City")
    }

    fn resolve(&self, ip: IpAddr) -> IpLocation {
        if let IpAddr::V4(v4) = ip
            && let Some(region) = self.region.as_ref().and_then(|r| r.search(v4))
        {
            let parts: Vec<&str> = region.split('|').collect();
            if parts.len() >= 5 {
                return self.from_region(ip, &parts);
            }
        }

        let city = self.city(ip);
        let asn = self.asn(ip);
        IpLocation::new(
            city.country.as_deref(),
            None,
            city.city.as_deref(),
            asn.organization.as_deref(),
            asn.number,
        )
    }

    fn from_region(&self, ip: IpAddr, parts: &[&str]) -> IpLocation {
        let asn = self.asn(ip);
        let organization = asn.organization.clone().unwrap_or_default();
        let isp = parts[parts.len() - 1];
        let network = if isp == "0" {
            organization
        } else {
            format!("{}({})", isp, organization)
        };

        let city_cell = OnceCell::new();
        let city = || city_cell.get_or_init(|| self.city(ip));

        let country = if parts[0] != "0" {
            Some(parts[0].to_string())
        } else {
            city().country.clone()
        };
        let city_name = if parts[3] != "0" {
            Some(parts[3].to_string())
        } else {
            city().city.clone()
        };

        IpLocation::new(
            country.as_deref(),
            Some(parts[2]),
            city_name.as_deref(),
            Some(&network),
            asn.number,
        )
    }
}

fn or_fallback<T: Default>(result: Result<T, GeoError>, what: &str) -> T {
    match result {
        Ok(record) => record,
        Err(GeoError::AddressNotFound) => T::default(),
        Err(e) => {
            warn!("{} lookup failed: {}", what, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::geo::{MockGeoDatabase, MockRegionSearcher};

    fn google_asn() -> AsnRecord {
        AsnRecord {
            number: Some(15169),
            organization: Some("Google LLC".to_string()),
        }
    }

    #[test]
    fn test_is_private_ip() {
        for ip in [
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.1",
            "192.168.1.1",
            "169.254.0.1",
            "0.0.0.0",
            "::1",
            "fd00::1",
            "fe80::1",
            "::ffff:192.168.0.1",
        ] {
            assert!(is_private_ip(ip.parse().unwrap()), "{ip} should be private");
        }
        for ip in ["8.8.8.8", "1.0.0.1", "2001:4860:4860::8888", "::ffff:8.8.8.8"] {
            assert!(!is_private_ip(ip.parse().unwrap()), "{ip} should be public");
        }
    }

    #[test]
    fn test_private_ip_short_circuits() {
        let geo = MockGeoDatabase::new();
        let locator = IpLocator::new(None, Arc::new(geo), "Asia/Shanghai");

        let loc = locator.locate("192.168.1.10".parse().unwrap());
        assert_eq!(loc.country, "Intranet");
        assert_eq!(loc.isp, "Intranet IP");
        assert_eq!(locator.client_time_zone("10.0.0.1".parse().unwrap()), "Asia/Shanghai");
    }

    #[test]
    fn test_region_hit_uses_region_fields_and_asn() {
        let mut region = MockRegionSearcher::new();
        region
            .expect_search()
            .returning(|_| Some("China|0|Fujian|Fuzhou|Telecom".to_string()));
        let mut geo = MockGeoDatabase::new();
        geo.expect_asn().returning(|_| {
            Ok(AsnRecord {
                number: Some(4134),
                organization: Some("Chinanet".to_string()),
            })
        });
        geo.expect_city().never();

        let locator = IpLocator::new(Some(Arc::new(region)), Arc::new(geo), "Asia/Shanghai");
        let loc = locator.locate("1.0.0.1".parse().unwrap());

        assert_eq!(loc.country, "China");
        assert_eq!(loc.province, "Fujian");
        assert_eq!(loc.city, "Fuzhou");
        assert_eq!(loc.isp, "Telecom(Chinanet)");
        assert_eq!(loc.to_string(), "ChinaFujianFuzhou|Telecom(Chinanet)(AS4134)");
    }

    #[test]
    fn test_region_unknown_fields_fall_back_to_city_db_once() {
        let mut region = MockRegionSearcher::new();
        region
            .expect_search()
            .returning(|_| Some("0|0|California|0|0".to_string()));
        let mut geo = MockGeoDatabase::new();
        geo.expect_asn().returning(|_| Ok(google_asn()));
        geo.expect_city().times(1).returning(|_| {
            Ok(CityRecord {
                country: Some("United States".to_string()),
                city: Some("Mountain View".to_string()),
                time_zone: None,
            })
        });

        let locator = IpLocator::new(Some(Arc::new(region)), Arc::new(geo), "Asia/Shanghai");
        let loc = locator.locate("8.8.8.8".parse().unwrap());

        assert_eq!(loc.country, "United States");
        assert_eq!(loc.city, "Mountain View");
        assert_eq!(loc.isp, "Google LLC");
        assert_eq!(loc.asn, Some(15169));
    }

    #[test]
    fn test_ipv6_uses_maxmind_and_caches() {
        let mut geo = MockGeoDatabase::new();
        geo.expect_city().times(1).returning(|_| {
            Ok(CityRecord {
                country: Some("United States".to_string()),
                city: None,
                time_zone: Some("America/Chicago".to_string()),
            })
        });
        geo.expect_asn().times(1).returning(|_| Ok(google_asn()));

        let locator = IpLocator::new(None, Arc::new(geo), "Asia/Shanghai");
        let ip: IpAddr = "2001:4860:4860::8888".parse().unwrap();

        let first = locator.locate(ip);
        let second = locator.locate(ip);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "United States|Google LLC(AS15169)");
    }

    #[test]
    fn test_not_found_falls_back_to_unknown() {
        let mut geo = MockGeoDatabase::new();
        geo.expect_city().returning(|_| Err(GeoError::AddressNotFound));
        geo.expect_asn()
            .returning(|_| Err(GeoError::Database("corrupt".to_string())));

        let locator = IpLocator::new(None, Arc::new(geo), "Asia/Shanghai");
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        assert_eq!(locator.locate(ip).to_string(), "Unknown area|Unknown network");
        assert_eq!(locator.asn(ip), AsnRecord::default());
        assert_eq!(locator.client_time_zone(ip), "Asia/Shanghai");
    }

    #[test]
    fn test_locate_str_rejects_garbage() {
        let locator = IpLocator::new(None, Arc::new(MockGeoDatabase::new()), "UTC");
        assert_eq!(locator.locate_str("not-an-ip"), IpLocation::default());
    }
}

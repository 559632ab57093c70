//! Resolved IP location.

use serde::Serialize;
use std::fmt;

/// Where an IP address lives and which network announces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpLocation {
    pub country: String,
    pub province: String,
    pub city: String,
    pub isp: String,
    pub asn: Option<u32>,
}

impl IpLocation {
    /// Builds a location, stripping the `'0'` placeholders the region database
    /// uses for unknown fields.
    pub fn new(
        country: Option<&str>,
        province: Option<&str>,
        city: Option<&str>,
        isp: Option<&str>,
        asn: Option<u32>,
    ) -> Self {
        let clean = |s: Option<&str>| s.map(|v| v.trim_matches('0').to_string()).unwrap_or_default();
        Self {
            country: clean(country),
            province: clean(province),
            city: clean(city),
            isp: isp.unwrap_or_default().to_string(),
            asn,
        }
    }

    /// Country, province and city with empties and repeats removed.
    pub fn location(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        for part in [&self.country, &self.province, &self.city] {
            if !part.is_empty() && !parts.contains(&part.as_str()) {
                parts.push(part);
            }
        }
        parts.concat()
    }

    /// The ISP, suffixed with `(AS<n>)` when the ASN is known.
    pub fn network(&self) -> String {
        match self.asn {
            Some(asn) => format!("{}(AS{})", self.isp, asn),
            None => self.isp.clone(),
        }
    }
}

impl fmt::Display for IpLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.location();
        let network = self.network();
        let location = if location.trim().is_empty() {
            "Unknown area"
        } else {
            location.as_str()
        };
        let network = if network.trim().is_empty() {
            "Unknown network"
        } else {
            network.as_str()
        };
        write!(f, "{}|{}", location, network)
    }
}

//! Firewall decisions: deny lists, deny areas and brute-force reporting.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::infrastructure::cache::CacheService;
use crate::infrastructure::firewall::{FirewallReporter, FirewallRules};
use crate::infrastructure::geo::IpLocator;
use crate::infrastructure::settings::{SETTING_DENY_AREA, SystemSettings};

const LOGIN_ERROR_TTL: Duration = Duration::from_secs(24 * 3600);

/// Cache key counting failed logins of an address.
pub fn login_error_key(ip: IpAddr) -> String {
    format!("LoginError:{}", ip)
}

pub struct FirewallService {
    rules: Arc<FirewallRules>,
    locator: Arc<IpLocator>,
    settings: Arc<SystemSettings>,
    cache: Arc<dyn CacheService>,
    reporter: Arc<dyn FirewallReporter>,
    login_error_threshold: i64,
}

impl FirewallService {
    pub fn new(
        rules: Arc<FirewallRules>,
        locator: Arc<IpLocator>,
        settings: Arc<SystemSettings>,
        cache: Arc<dyn CacheService>,
        reporter: Arc<dyn FirewallReporter>,
        login_error_threshold: i64,
    ) -> Self {
        Self {
            rules,
            locator,
            settings,
            cache,
            reporter,
            login_error_threshold,
        }
    }

    pub fn rules(&self) -> &FirewallRules {
        &self.rules
    }

    pub fn locator(&self) -> &IpLocator {
        &self.locator
    }

    /// Whether the address is on the deny list or in a deny range.
    pub fn is_denied(&self, ip: IpAddr) -> bool {
        self.rules.is_denied(ip)
    }

    /// Deny areas from the `DenyArea` setting.
    pub fn deny_areas(&self) -> Vec<String> {
        self.settings
            .get_or_empty(SETTING_DENY_AREA)
            .split([',', '，'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether the first of a comma separated address list resolves to a deny area.
    ///
    /// With deny areas configured, unknown locations and unknown networks
    /// count as denied too. Unparsable addresses are not denied.
    pub fn is_in_deny_area(&self, ips: &str) -> bool {
        let areas = self.deny_areas();
        if areas.is_empty() {
            return false;
        }

        let Some(first) = ips.split(',').map(str::trim).find(|s| !s.is_empty()) else {
            return false;
        };
        let Ok(ip) = first.parse::<IpAddr>() else {
            return false;
        };

        let location = self.locator.locate(ip);
        let display = location.to_string();
        location.location().trim().is_empty()
            || location.network().trim().is_empty()
            || areas.iter().any(|area| display.contains(area.as_str()))
            || display.split('|').any(|part| areas.iter().any(|a| a == part))
    }

    /// Denied addresses and deny areas; whitelisted addresses always pass.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        if self.rules.is_whitelisted(ip) {
            return false;
        }
        self.is_denied(ip) || self.is_in_deny_area(&ip.to_string())
    }

    /// Counts a failed login. Above the threshold the address is reported in the
    /// background. Returns the current failure count.
    pub async fn record_login_failure(&self, ip: IpAddr) -> i64 {
        let count = match self.cache.incr(&login_error_key(ip), LOGIN_ERROR_TTL).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count login error for {}: {}", ip, e);
                return 0;
            }
        };

        if count > self.login_error_threshold {
            let reporter = self.reporter.clone();
            tokio::spawn(async move {
                let comment = "Repeated failed logins, suspected brute force";
                match reporter.report(ip, comment).await {
                    Ok(()) => info!(
                        %ip,
                        reporter = reporter.name(),
                        "Repeated wrong username or password, suspected brute force; address reported"
                    ),
                    Err(e) => warn!(%ip, "Failed to report address: {}", e),
                }
            });
        }

        count
    }
}

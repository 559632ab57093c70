//! Rule files with change-driven reload.

use parking_lot::{Mutex, RwLock};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AccessList, WordFilter};

pub const WHITELIST_FILE: &str = "whitelist.txt";
pub const DENY_IP_FILE: &str = "denyip.txt";
pub const DENY_RANGE_FILE: &str = "DenyIPRange.txt";
pub const BAN_WORDS_FILE: &str = "ban.txt";
pub const MOD_WORDS_FILE: &str = "mod.txt";

const RULE_FILES: [&str; 5] = [
    WHITELIST_FILE,
    DENY_IP_FILE,
    DENY_RANGE_FILE,
    BAN_WORDS_FILE,
    MOD_WORDS_FILE,
];

#[derive(Debug, Clone, Default)]
struct RuleSet {
    access: AccessList,
    words: WordFilter,
}

/// Current firewall rules, reloaded from the data directory when any rule
/// file's modification time changes.
pub struct FirewallRules {
    dir: Option<PathBuf>,
    rules: RwLock<RuleSet>,
    stamps: Mutex<Vec<Option<SystemTime>>>,
}

impl FirewallRules {
    /// Loads the rule files from `dir`. Missing files mean empty rules.
    pub fn load(dir: &Path) -> Self {
        let stamps = modification_times(dir);
        let rules = read_rules(dir);
        let (white, deny, ranges) = rules.access.counts();
        info!(
            whitelist = white,
            denied = deny,
            ranges,
            "Firewall rules loaded from {}",
            dir.display()
        );

        Self {
            dir: Some(dir.to_path_buf()),
            rules: RwLock::new(rules),
            stamps: Mutex::new(stamps),
        }
    }

    /// Fixed rules that never reload.
    pub fn fixed(access: AccessList, words: WordFilter) -> Self {
        Self {
            dir: None,
            rules: RwLock::new(RuleSet { access, words }),
            stamps: Mutex::new(Vec::new()),
        }
    }

    pub fn is_denied(&self, ip: IpAddr) -> bool {
        self.rules.read().access.is_denied(ip)
    }

    pub fn is_whitelisted(&self, ip: IpAddr) -> bool {
        self.rules.read().access.is_whitelisted(ip)
    }

    pub fn is_banned(&self, text: &str) -> bool {
        self.rules.read().words.is_banned(text)
    }

    pub fn needs_review(&self, text: &str) -> bool {
        self.rules.read().words.needs_review(text)
    }

    /// Re-reads the rule files when any modification time changed.
    ///
    /// Returns `true` when the rules were reloaded.
    pub fn reload_if_changed(&self) -> bool {
        let Some(dir) = &self.dir else {
            return false;
        };

        let current = modification_times(dir);
        {
            let mut stamps = self.stamps.lock();
            if *stamps == current {
                return false;
            }
            *stamps = current;
        }

        let rules = read_rules(dir);
        *self.rules.write() = rules;
        info!("Firewall rules reloaded");
        true
    }

    /// Polls the rule files on `interval` until the runtime shuts down.
    pub fn spawn_watcher(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let rules = self.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || rules.reload_if_changed()).await
                {
                    warn!("Firewall rule reload panicked: {}", e);
                }
            }
        })
    }
}

fn modification_times(dir: &Path) -> Vec<Option<SystemTime>> {
    RULE_FILES
        .iter()
        .map(|name| {
            std::fs::metadata(dir.join(name))
                .and_then(|m| m.modified())
                .ok()
        })
        .collect()
}

fn read_file(dir: &Path, name: &str) -> String {
    match std::fs::read_to_string(dir.join(name)) {
        Ok(text) => text,
        Err(e) => {
            debug!("Rule file {} not read: {}", name, e);
            String::new()
        }
    }
}

fn read_rules(dir: &Path) -> RuleSet {
    RuleSet {
        access: AccessList::parse(
            &read_file(dir, WHITELIST_FILE),
            &read_file(dir, DENY_IP_FILE),
            &read_file(dir, DENY_RANGE_FILE),
        ),
        words: WordFilter::parse(
            &read_file(dir, BAN_WORDS_FILE),
            &read_file(dir, MOD_WORDS_FILE),
        ),
    }
}

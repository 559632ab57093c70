//! IP access control and content word rules.
//!
//! Rule files live in the data directory:
//!
//! - `whitelist.txt` - addresses that are never denied
//! - `denyip.txt` - denied addresses
//! - `DenyIPRange.txt` - denied ranges, `start end` or CIDR per line
//! - `ban.txt` / `mod.txt` - banned and moderated word patterns

mod access_list;
mod reporter;
mod rules;
mod word_filter;

pub use access_list::{AccessList, IpRange};
pub use reporter::{AbuseIpDbReporter, FirewallReporter, NullReporter, ReportError};
pub use rules::FirewallRules;
pub use word_filter::WordFilter;

#[cfg(test)]
pub use reporter::MockFirewallReporter;

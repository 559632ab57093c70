//! In-memory searcher over an ip2region `xdb` file.
//!
//! Layout: a 256-byte header, a 256x256 vector index of `(start, end)` u32 LE
//! segment pointers keyed by the first two octets, then 14-byte segment records
//! `start_ip u32, end_ip u32, data_len u16, data_ptr u32` pointing at UTF-8
//! region strings `country|area|province|city|isp`.

use std::net::Ipv4Addr;
use std::path::Path;

use super::GeoError;

const HEADER_LEN: usize = 256;
const VECTOR_COLS: usize = 256;
const VECTOR_ENTRY_LEN: usize = 8;
const SEGMENT_LEN: usize = 14;
const VECTOR_INDEX_LEN: usize = VECTOR_COLS * VECTOR_COLS * VECTOR_ENTRY_LEN;

/// Looks up the region string of an IPv4 address.
#[cfg_attr(test, mockall::automock)]
pub trait RegionSearcher: Send + Sync {
    /// Returns the raw region string, or `None` when no segment covers the address.
    fn search(&self, ip: Ipv4Addr) -> Option<String>;
}

/// Region searcher holding the whole xdb file in memory.
pub struct Ip2RegionSearcher {
    buffer: Vec<u8>,
}

impl Ip2RegionSearcher {
    /// Loads an xdb file into memory.
    pub fn open(path: &Path) -> Result<Self, GeoError> {
        let buffer = std::fs::read(path)?;
        Self::from_bytes(buffer)
    }

    /// Wraps an already loaded xdb buffer.
    pub fn from_bytes(buffer: Vec<u8>) -> Result<Self, GeoError> {
        if buffer.len() < HEADER_LEN + VECTOR_INDEX_LEN {
            return Err(GeoError::Database(format!(
                "xdb buffer too short: {} bytes",
                buffer.len()
            )));
        }
        Ok(Self { buffer })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.buffer.get(offset..offset + 4)?;
        Some(u32::from_le_bytes(bytes.try_into().ok()?))
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes = self.buffer.get(offset..offset + 2)?;
        Some(u16::from_le_bytes(bytes.try_into().ok()?))
    }
}

impl RegionSearcher for Ip2RegionSearcher {
    fn search(&self, ip: Ipv4Addr) -> Option<String> {
        let ip = u32::from(ip);
        let il0 = (ip >> 24) as usize;
        let il1 = ((ip >> 16) & 0xFF) as usize;
        let idx = HEADER_LEN + il0 * VECTOR_COLS * VECTOR_ENTRY_LEN + il1 * VECTOR_ENTRY_LEN;

        let s_ptr = self.u32_at(idx)? as usize;
        let e_ptr = self.u32_at(idx + 4)? as usize;
        if s_ptr == 0 || e_ptr < s_ptr {
            return None;
        }

        let mut low: i64 = 0;
        let mut high: i64 = ((e_ptr - s_ptr) / SEGMENT_LEN) as i64;
        while low <= high {
            let mid = (low + high) >> 1;
            let p = s_ptr + mid as usize * SEGMENT_LEN;
            let start_ip = self.u32_at(p)?;
            if ip < start_ip {
                high = mid - 1;
                continue;
            }
            let end_ip = self.u32_at(p + 4)?;
            if ip > end_ip {
                low = mid + 1;
                continue;
            }
            let data_len = self.u16_at(p + 8)? as usize;
            let data_ptr = self.u32_at(p + 10)? as usize;
            let data = self.buffer.get(data_ptr..data_ptr + data_len)?;
            return String::from_utf8(data.to_vec()).ok();
        }
        None
    }
}

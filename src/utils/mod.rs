//! Request helpers, HTML post-processing and media utilities.
//!
//! - [`client_ip`] - Client address extraction
//! - [`redirect`] - Local redirect validation
//! - [`html`] - Image attribute rewriting, summaries, query trimming
//! - [`watermark`] - Image watermarking
//! - [`timezone`] - Time zone conversion
//! - [`fonts`] - Font discovery

pub mod client_ip;
pub mod fonts;
pub mod html;
pub mod redirect;
pub mod timezone;
pub mod watermark;

pub use client_ip::ClientIp;

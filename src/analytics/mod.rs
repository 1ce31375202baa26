//! Session-scoped visitor analytics
//!
//! One aggregate row per session, fed from uncoordinated call sites:
//! page views on load, clicks on interaction, and periodic time-spent
//! heartbeats. The click ledger is the source of truth for the
//! unique-destination count.

pub mod ip_extractor;
pub mod recorder;
pub mod sniffer;
pub mod tracker;

pub use ip_extractor::extract_client_ip;
pub use recorder::{distinct_destinations, AnalyticsRecorder};
pub use sniffer::{EnvironmentSniffer, UNKNOWN_COUNTRY, UNKNOWN_IP};
pub use tracker::{Clock, SystemClock, TrackerRegistry};

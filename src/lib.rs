//! Covidash Core - data reconciliation and request orchestration for a
//! COVID-19 statistics dashboard.
//!
//! This crate provides:
//! - Fuzzy country matching between the structured country list and the
//!   free-text statistics feed, producing bidirectional index maps
//! - Normalized Levenshtein similarity scoring
//! - A per-key serialized request gate with latest-wins coalescing
//! - A timeout-bounded, retrying HTTP fetch wrapper
//! - Time-windowed historical series retrieval with daily-delta transforms
//! - Session startup orchestration with offline snapshot fallback
//!
//! Rendering, charting and page plumbing consume this crate's outputs; none
//! of that lives here.

pub mod clients;
pub mod config;
pub mod fetch;
pub mod gate;
pub mod history;
pub mod matching;
pub mod models;
pub mod session;
pub mod utils;

pub use config::CoreConfig;
pub use fetch::{fetch_with_policy, FetchError, FetchPolicy, SuccessPolicy};
pub use gate::RequestGate;
pub use history::{
    CountrySelector, HistoryBundle, HistoryError, HistoryResolver, HistorySeries,
    HistoryTransport, HistoryWindow, HttpHistoryTransport, ResolveOptions,
};
pub use matching::{match_countries, MatchIndex};
pub use models::{CountryName, CountryRecord, StatRecord};
pub use session::{DashboardSession, SessionError};
pub use utils::similarity::similarity;

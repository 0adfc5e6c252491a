//! [Airtable](https://airtable.com) backend for [`RecordStore`](exposr_store::RecordStore).
//!
//! Analyses and feedback live in two tables of one base. Field names follow
//! the base layout the service has always used (`Analysis_ID`, `Verdict`,
//! `Feedback_Type`, ...), see [`fields`].

pub mod config;
pub mod fields;
mod store;

pub use config::AirtableConfig;
pub use store::AirtableRecordStore;

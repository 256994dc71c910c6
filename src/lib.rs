// Trendfold: duplicate topic folding and entity extraction for trend feeds
//
// This is the library root. `topics` holds the dedupe pipeline, `entities`
// the two-tier entity resolver.

pub mod config;
pub mod entities;
pub mod error;
pub mod output;
pub mod topics;

//! Rule-driven BibTeX cleanup.
//!
//! Loads a BibTeX database, runs every entry through an ordered list of
//! configured rules and global settings, and writes a smaller, consistent
//! database:
//!
//! - Whitespace cleanup, lower-casing and acronym protection
//! - Field filtering (allow/deny lists), renaming, truncation, substitution
//! - Type aliases and `optX` field expansion
//! - Mandatory field checks and lint warnings
//! - Author list truncation with *et al.*
//! - Duplicate citation key detection
//!
//! ## Configuration Example
//!
//! ```yaml
//! settings:
//!   deny_fields: [abstract, note]
//! rules:
//!   - name: "protect-acronyms"
//!     match:
//!       field: { pattern: "*title", type: glob }
//!     action:
//!       protect_acronyms: { acronyms: [NASA, DRAM] }
//! ```

pub mod bbl;
pub mod bibtex;
pub mod checks;
pub mod config;
pub mod context;
pub mod entry;
pub mod matcher;
pub mod report;
pub mod rule;
pub mod sweeper;
pub mod transformer;

pub use bibtex::{read_entries, write_entries, BibError};
pub use config::SweepConfig;
pub use entry::Entry;
pub use report::{SweepReport, Warning};
pub use rule::{RuleEngine, RuleError};
pub use sweeper::{Sweeper, SweeperError};

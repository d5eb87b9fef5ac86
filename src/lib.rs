#![deny(missing_docs)]

//! This crate compiles the IANA time-zone database (the "tz database",
//! distributed as `tzdata<version>.tar.gz`) into a compact binary repository
//! answering offset and transition queries for every named zone.
//!
//! The sources are cleaned and classified into typed [`RuleLine`]s,
//! [`ZoneLine`]s, [`LinkLine`]s and [`LeapLine`]s; the synthesis core then
//! walks the ordered eras of each zone, interleaves them with the matching
//! rule families, materialises the full sequence of [`ZonalTransition`]s
//! over historical time and retains open-ended rules as recurring
//! [`DaylightSavingRule`] patterns. The validated [`TransitionHistory`] of
//! each zone is serialised into the repository together with the resolved
//! alias table and the leap-second table.
//!
//! # Usage
//!
//! ```rust
//! # fn main() -> Result<(), tzrepo::Error> {
//! use tzrepo::{synthesize, SourceParser};
//!
//! let mut parser = SourceParser::new();
//! parser.feed(
//!     "etcetera",
//!     "# Comments and whitespace runs are stripped\n\
//!      Zone Etc/UTC 0:00 - UTC\n\
//!      Link Etc/UTC Etc/Universal\n",
//! )?;
//! let source = parser.finish();
//!
//! let history = synthesize("Etc/UTC", &source.zones["Etc/UTC"], &source.rules, false)?;
//! assert_eq!(history.initial_offset(), 0);
//! assert!(history.transitions().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! Whole releases are compiled through [`Compiler`], which discovers the
//! newest `tzdata<version>` subdirectory or `tzdata<version>.tar.gz` archive
//! in its working directory and writes the repository next to it.

#![warn(unreachable_pub)]

mod cursor;
mod datetime;
mod error;
mod history;
mod repository;
mod synthesis;
mod tzdb;

pub use error::Error;
pub use history::{TransitionHistory, ZonalTransition};
pub use repository::{Compiler, Version};
pub use synthesis::synthesize;
pub use tzdb::{
    DaylightSavingRule, LeapLine, LinkLine, OffsetIndicator, RuleDay, RuleLine, RulePolicy,
    SourceParser, TzSource, ZoneLine,
};

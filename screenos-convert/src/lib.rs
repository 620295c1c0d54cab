//! ScreenOS firewall configuration conversion.
//!
//! This library turns the parsed statements of a ScreenOS (SSG/NetScreen)
//! configuration into a normalized zone-based policy model: named network
//! and service objects, a policy package with one sub-policy layer per zone
//! pair, and address translation rules. Whatever cannot be carried over
//! faithfully is reported as an incident tied to its configuration line.
//!
//! Parsing lives in `screenos-core`; everything that decides what the
//! target model looks like lives here.
//!
//! # Architecture
//!
//! ## Conversion
//!
//! - [`convert`]: Stage pipeline from parsed commands to a [`model::ConversionResult`]
//! - [`store`]: Ordered object store with per-kind lookups
//! - [`naming`]: Name construction and the case-insensitive name registry
//! - [`knowledge`]: Predefined service tables, embedded or loaded from TOML
//!
//! ## Output
//!
//! - [`model`]: Objects, layers, rules, NAT rules, incidents
//! - [`stats`]: Post-conversion summary statistics
//! - [`report`]: Terminal-friendly colored rendering
//!
//! # Examples
//!
//! ```ignore
//! use screenos_convert::convert::{convert, ConvertOptions};
//! use screenos_convert::knowledge::default_knowledge;
//!
//! let parsed = screenos_core::parse_file("ssg.cfg".as_ref())?;
//! let result = convert(&parsed, &default_knowledge(), &ConvertOptions::default());
//! println!("rules: {}", result.package.rules().count());
//! ```

pub mod convert;
pub mod knowledge;
pub mod model;
pub mod naming;
pub mod report;
pub mod stats;
pub mod store;

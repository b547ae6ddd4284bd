//! Parameter parsing and expansion
//!
//! Axes of variation arrive either as already-expanded token lists or as a
//! compact textual spec:
//!
//! ```text
//! "10"            -> ["10"]
//! "10, 20,30"     -> ["10", "20", "30"]
//! "1-10:2"        -> ["1", "3", "5", "7", "9"]
//! "1-3:1 + 9,10"  -> ["1", "2", "3", "9", "10"]
//! ```
//!
//! Tokens stay textual until a generator casts them for the axis that
//! consumes them ([`cast_int`], [`cast_float`]).
//!
//! ## Usage
//!
//! ```rust
//! use repro_capsule::params::{parse_input, Axes};
//!
//! let axes = Axes::new()
//!     .with("core_count", parse_input("4,8"))
//!     .with("memory_size", parse_input("1000"));
//!
//! // Index-aligned: 2 variants, memory only set on the first
//! let zipped: Vec<_> = axes.index_aligned().collect();
//! assert_eq!(zipped.len(), 2);
//! assert_eq!(zipped[1].get("memory_size"), None);
//!
//! // Cartesian: 2 x 1 combinations
//! assert_eq!(axes.cartesian().len(), 2);
//! ```

mod expand;
mod parse;
mod selection;

pub use expand::{iteration_count, Assignment, Axes, ExpansionMode, IndexAligned};
pub use parse::{cast_float, cast_int, frange, parse_input};
pub use selection::{clean_selection, filter_by_keyword, list_json_files, KEEP_ORIGINAL, SELECT_ALL};

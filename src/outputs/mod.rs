//! Output generation for harvested opinions.
//!
//! # Submodules
//!
//! - [`opinion`]: one text file per opinion, named after the case title
//! - [`json`]: the `links.json` manifest of a search run
//!
//! # Output Structure
//!
//! ```text
//! save_dir/
//! ├── Miranda_v._Arizona.txt
//! ├── Dickerson_v._United_States.txt
//! └── links.json
//! ```

pub mod json;
pub mod opinion;

//! Data layer: validation, format readers/writers, and dispatch.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .xlsx / .xls / http(s) csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ validate  │  path exists? required columns present?
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐     ┌──────────┐
//!   │  loader   │────▶│  excel    │  calamine ⇄ arrow ⇄ rust_xlsxwriter
//!   └──────────┘     └──────────┘
//!        │                ▲
//!        ▼                │
//!   ┌──────────┐     ┌──────────┐
//!   │  model    │     │  writer   │  Table → file, save_auto dispatch
//!   └──────────┘     └──────────┘
//!   Table, Format, options, preview
//! ```

mod excel;
pub mod loader;
pub mod model;
pub mod scan;
pub mod validate;
pub mod writer;

//! Nutrition helpers
//!
//! Adequacy bands and summary derivations over backend reports.

pub mod adequacy;

pub use adequacy::{
    display_name, rounded_percentage, top_nutrients, AdequacyStatus, DASHBOARD_TOP_N,
    REFERENCE_LINE,
};

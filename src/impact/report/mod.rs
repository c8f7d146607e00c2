//! report — data-level presentation of a run.
//!
//! Converts effect estimates and point forecasts into the per-time-point
//! inference table, the fixed-schema summary, a verbal report, and panel
//! series for plotting. Nothing here draws or writes files.

pub mod inferences;
pub mod narrative;
pub mod panels;
pub mod summary;

pub use self::inferences::{InferenceRow, Inferences, RowPeriod};
pub use self::narrative::verbal_report;
pub use self::panels::{Panel, PanelKind, build_panels, parse_panels};
pub use self::summary::ImpactSummary;

//! Plot-ready panel data.
//!
//! Three panels can be requested by name: `"original"` (actual vs.
//! counterfactual prediction), `"pointwise"` (point effects) and
//! `"cumulative"` (cumulative effects). Each panel carries the x-axis, a
//! centre line with its band, and the first post-period index for the
//! intervention marker. Rendering is left to the caller.
use crate::impact::{
    errors::{ValidationError, ValidationResult},
    report::inferences::{InferenceRow, Inferences},
};
use chrono::NaiveDateTime;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Original,
    Pointwise,
    Cumulative,
}

impl PanelKind {
    pub const ALL: [PanelKind; 3] =
        [PanelKind::Original, PanelKind::Pointwise, PanelKind::Cumulative];

    pub fn name(&self) -> &'static str {
        match self {
            PanelKind::Original => "original",
            PanelKind::Pointwise => "pointwise",
            PanelKind::Cumulative => "cumulative",
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PanelKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(PanelKind::Original),
            "pointwise" => Ok(PanelKind::Pointwise),
            "cumulative" => Ok(PanelKind::Cumulative),
            _ => Err(ValidationError::UnknownPanel { name: s.to_string() }),
        }
    }
}

/// Parse panel names; an empty selection means all three. Duplicates are
/// dropped, first occurrence wins.
pub fn parse_panels<S: AsRef<str>>(names: &[S]) -> ValidationResult<Vec<PanelKind>> {
    if names.is_empty() {
        return Ok(PanelKind::ALL.to_vec());
    }
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        let kind: PanelKind = name.as_ref().parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Series for one plot panel, aligned with the inference rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind: PanelKind,
    pub index: Vec<usize>,
    pub timestamps: Option<Vec<NaiveDateTime>>,
    /// Observed response, `original` panel only.
    pub observed: Option<Vec<f64>>,
    pub center: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// Series index of the first post-period point.
    pub intervention_index: usize,
}

impl Panel {
    fn build(kind: PanelKind, inferences: &Inferences, intervention_index: usize) -> Self {
        let rows = inferences.rows();
        let pick = |f: fn(&InferenceRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
        let (center, lower, upper) = match kind {
            PanelKind::Original => (
                pick(|r| r.predicted),
                pick(|r| r.predicted_lower),
                pick(|r| r.predicted_upper),
            ),
            PanelKind::Pointwise => (
                pick(|r| r.point_effect),
                pick(|r| r.point_effect_lower),
                pick(|r| r.point_effect_upper),
            ),
            PanelKind::Cumulative => (
                pick(|r| r.cumulative_effect),
                pick(|r| r.cumulative_effect_lower),
                pick(|r| r.cumulative_effect_upper),
            ),
        };
        let timestamps: Option<Vec<NaiveDateTime>> = rows.iter().map(|r| r.timestamp).collect();
        Self {
            kind,
            index: rows.iter().map(|r| r.index).collect(),
            timestamps,
            observed: (kind == PanelKind::Original).then(|| pick(|r| r.actual)),
            center,
            lower,
            upper,
            intervention_index,
        }
    }
}

/// Build the requested panels in request order.
pub fn build_panels(
    inferences: &Inferences, kinds: &[PanelKind], intervention_index: usize,
) -> Vec<Panel> {
    kinds.iter().map(|k| Panel::build(*k, inferences, intervention_index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Panel name parsing and panel construction.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Names parse case-insensitively; unknown names are validation errors.
    //
    // Given
    // -----
    // - An empty list, a list with a duplicate, and an unknown name.
    //
    // Expect
    // ------
    // - All three panels; de-duplicated order; `UnknownPanel`.
    fn panel_names_parse() {
        let none: [&str; 0] = [];
        assert_eq!(parse_panels(&none).unwrap(), PanelKind::ALL.to_vec());
        assert_eq!(
            parse_panels(&["Cumulative", "original", "cumulative"]).unwrap(),
            vec![PanelKind::Cumulative, PanelKind::Original]
        );
        assert_eq!(
            parse_panels(&["pointwise", "residuals"]),
            Err(ValidationError::UnknownPanel { name: "residuals".into() })
        );
    }
}

//! Per-cycle correction state machine.

use std::fmt;

use serde::Serialize;

use super::CorrectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CorrectionPhase {
    Measured,
    Analyzed,
    Feasible,
    Infeasible,
    Amended,
    Predicted,
    Reported,
}

impl CorrectionPhase {
    fn can_advance_to(self, next: CorrectionPhase) -> bool {
        use CorrectionPhase::*;
        matches!(
            (self, next),
            (Measured, Analyzed)
                | (Analyzed, Feasible)
                | (Analyzed, Infeasible)
                | (Feasible, Amended)
                | (Amended, Predicted)
                | (Infeasible, Reported)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CorrectionPhase::Predicted | CorrectionPhase::Reported)
    }
}

impl fmt::Display for CorrectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered record of the phases one correction cycle went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhaseTrail(Vec<CorrectionPhase>);

impl PhaseTrail {
    pub fn new() -> Self {
        Self(vec![CorrectionPhase::Measured])
    }

    pub fn current(&self) -> CorrectionPhase {
        self.0.last().copied().unwrap_or(CorrectionPhase::Measured)
    }

    pub fn advance(&mut self, next: CorrectionPhase) -> Result<(), CorrectionError> {
        let from = self.current();
        if !from.can_advance_to(next) {
            return Err(CorrectionError::InvalidTransition { from, to: next });
        }
        self.0.push(next);
        Ok(())
    }

    pub fn phases(&self) -> &[CorrectionPhase] {
        &self.0
    }
}

impl Default for PhaseTrail {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CorrectionPhase::*;

    #[test]
    fn test_feasible_path() {
        let mut trail = PhaseTrail::new();
        for p in [Analyzed, Feasible, Amended, Predicted] {
            trail.advance(p).unwrap();
        }
        assert!(trail.current().is_terminal());
        assert_eq!(trail.phases().len(), 5);
    }

    #[test]
    fn test_infeasible_path() {
        let mut trail = PhaseTrail::new();
        trail.advance(Analyzed).unwrap();
        trail.advance(Infeasible).unwrap();
        trail.advance(Reported).unwrap();
        assert_eq!(trail.current(), Reported);
    }

    #[test]
    fn test_rejects_skips() {
        let mut trail = PhaseTrail::new();
        assert_eq!(
            trail.advance(Feasible),
            Err(CorrectionError::InvalidTransition {
                from: Measured,
                to: Feasible
            })
        );
        trail.advance(Analyzed).unwrap();
        trail.advance(Infeasible).unwrap();
        assert!(trail.advance(Amended).is_err());
    }

    #[test]
    fn test_serializes_as_list() {
        let mut trail = PhaseTrail::new();
        trail.advance(Analyzed).unwrap();
        assert_eq!(
            serde_json::to_string(&trail).unwrap(),
            r#"["measured","analyzed"]"#
        );
    }
}

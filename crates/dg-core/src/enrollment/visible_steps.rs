use serde::Serialize;

use super::{EnrollmentStep, StepFlags};

/// One slot of the "step X of Y" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndicatorEntry {
    Step(EnrollmentStep),
    /// The whole MFA subtree occupies a single slot.
    Mfa,
}

impl IndicatorEntry {
    fn anchor(self) -> EnrollmentStep {
        match self {
            Self::Step(step) => step,
            Self::Mfa => EnrollmentStep::MfaChoice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepIndicator {
    pub current: usize,
    pub total: usize,
}

/// Indicator entries for one set of session flags.
///
/// Computed once when the flags change, not on every render.
///
/// 预先计算的可见步骤列表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleSteps {
    flags: StepFlags,
    entries: Vec<IndicatorEntry>,
}

impl VisibleSteps {
    pub fn compute(flags: StepFlags) -> Self {
        let mut entries = vec![
            IndicatorEntry::Step(EnrollmentStep::Welcome),
            IndicatorEntry::Step(EnrollmentStep::DataVerification),
            IndicatorEntry::Step(EnrollmentStep::Password),
        ];
        if !flags.vpn_optional {
            entries.push(IndicatorEntry::Step(EnrollmentStep::Device));
        }
        if flags.mfa_required {
            entries.push(IndicatorEntry::Mfa);
        }
        entries.push(IndicatorEntry::Step(EnrollmentStep::Finish));
        Self { flags, entries }
    }

    pub fn flags(&self) -> StepFlags {
        self.flags
    }

    pub fn entries(&self) -> &[IndicatorEntry] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Position of `step` among the visible entries.
    ///
    /// Steps that are not themselves visible report the last visible entry
    /// before them. The result always lies in `1..=total`.
    pub fn indicator(&self, step: EnrollmentStep) -> StepIndicator {
        let total = self.total();
        let passed = self
            .entries
            .iter()
            .filter(|entry| entry.anchor() <= step)
            .count();
        StepIndicator {
            current: passed.clamp(1, total.max(1)),
            total,
        }
    }
}

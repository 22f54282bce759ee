//! The fixed approval pipeline: secretary -> employee -> admin -> payroll.
//! Pure data, no storage access. The state machine validates every
//! transition against this table.

use strum_macros::{Display, IntoStaticStr};

use crate::model::timecard::{ApprovalStage, TimeCardStatus};

impl ApprovalStage {
    /// The stage that acts after `self`, or `None` past payroll.
    pub fn next(self) -> Option<ApprovalStage> {
        match self {
            ApprovalStage::Secretary => Some(ApprovalStage::Employee),
            ApprovalStage::Employee => Some(ApprovalStage::Admin),
            ApprovalStage::Admin => Some(ApprovalStage::Payroll),
            ApprovalStage::Payroll => None,
        }
    }
}

/// The five named transitions of the approval pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Transition {
    Submit,
    ApproveByEmployee,
    ApproveByAdmin,
    ProcessByPayroll,
    Reject,
}

impl Transition {
    /// The stage a card must be at for this transition. `None` for reject,
    /// which is valid from any non-terminal stage.
    pub fn expected_stage(self) -> Option<ApprovalStage> {
        match self {
            Transition::Submit => Some(ApprovalStage::Secretary),
            Transition::ApproveByEmployee => Some(ApprovalStage::Employee),
            Transition::ApproveByAdmin => Some(ApprovalStage::Admin),
            Transition::ProcessByPayroll => Some(ApprovalStage::Payroll),
            Transition::Reject => None,
        }
    }

    /// The status a card must hold for this transition. `None` for reject,
    /// which only requires a non-terminal status.
    pub fn expected_status(self) -> Option<TimeCardStatus> {
        match self {
            Transition::Submit => Some(TimeCardStatus::Draft),
            Transition::ApproveByEmployee => Some(TimeCardStatus::SecretarySubmitted),
            Transition::ApproveByAdmin => Some(TimeCardStatus::EmployeeApproved),
            Transition::ProcessByPayroll => Some(TimeCardStatus::AdminApproved),
            Transition::Reject => None,
        }
    }

    pub fn resulting_status(self) -> TimeCardStatus {
        match self {
            Transition::Submit => TimeCardStatus::SecretarySubmitted,
            Transition::ApproveByEmployee => TimeCardStatus::EmployeeApproved,
            Transition::ApproveByAdmin => TimeCardStatus::AdminApproved,
            Transition::ProcessByPayroll => TimeCardStatus::PayrollProcessed,
            Transition::Reject => TimeCardStatus::Rejected,
        }
    }

    /// The stage after this transition. Payroll processing and rejection
    /// leave the stage as-is: it marks where in the pipeline the record
    /// stopped, for audit.
    pub fn resulting_stage(self, current: ApprovalStage) -> ApprovalStage {
        match self {
            Transition::Submit => ApprovalStage::Employee,
            Transition::ApproveByEmployee => ApprovalStage::Admin,
            Transition::ApproveByAdmin => ApprovalStage::Payroll,
            Transition::ProcessByPayroll | Transition::Reject => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_fixed_order() {
        assert_eq!(ApprovalStage::Secretary.next(), Some(ApprovalStage::Employee));
        assert_eq!(ApprovalStage::Employee.next(), Some(ApprovalStage::Admin));
        assert_eq!(ApprovalStage::Admin.next(), Some(ApprovalStage::Payroll));
        assert_eq!(ApprovalStage::Payroll.next(), None);
    }

    #[test]
    fn forward_transitions_move_one_step() {
        for t in [
            Transition::Submit,
            Transition::ApproveByEmployee,
            Transition::ApproveByAdmin,
        ] {
            let from = t.expected_stage().unwrap();
            assert_eq!(t.resulting_stage(from), from.next().unwrap());
        }
    }

    #[test]
    fn payroll_processing_freezes_the_stage() {
        let t = Transition::ProcessByPayroll;
        assert_eq!(t.resulting_stage(ApprovalStage::Payroll), ApprovalStage::Payroll);
        assert!(t.resulting_status().is_terminal());
    }

    #[test]
    fn reject_is_stage_agnostic_and_terminal() {
        assert_eq!(Transition::Reject.expected_stage(), None);
        assert_eq!(Transition::Reject.expected_status(), None);
        assert!(Transition::Reject.resulting_status().is_terminal());
        for stage in [
            ApprovalStage::Secretary,
            ApprovalStage::Employee,
            ApprovalStage::Admin,
            ApprovalStage::Payroll,
        ] {
            assert_eq!(Transition::Reject.resulting_stage(stage), stage);
        }
    }

    #[test]
    fn expected_and_resulting_statuses_chain() {
        assert_eq!(
            Transition::ApproveByEmployee.expected_status(),
            Some(Transition::Submit.resulting_status())
        );
        assert_eq!(
            Transition::ApproveByAdmin.expected_status(),
            Some(Transition::ApproveByEmployee.resulting_status())
        );
        assert_eq!(
            Transition::ProcessByPayroll.expected_status(),
            Some(Transition::ApproveByAdmin.resulting_status())
        );
    }
}

//! Proposal (spec.md §4.10).
//!
//! Grounded verbatim on `examples/original_source/layers/proposal.py`'s
//! `select_best_solution`/`create_proposal`: argmax on
//! `pros - cons + complexity_score`, auto-promotion of the driving Problem
//! from Candidate to Proposed, and an explicit error when no solution can
//! be selected (never a silent null).

use crate::error::{Result, SiaError};
use crate::problem::Problem;
use crate::state_machine;
use crate::types::{Proposal, ProposalStatus, Solution};

/// `argmax(|pros| - |cons| + complexity_score)` over `solutions`
/// (spec.md §4.10). `None` iff `solutions` is empty. Ties keep the
/// earliest-listed solution, matching `select_best_solution`'s
/// `score > best_score` original.
pub fn select_best_solution(solutions: &[Solution]) -> Option<&Solution> {
    let score = |s: &Solution| s.pros.len() as i32 - s.cons.len() as i32 + s.complexity.score();
    let mut iter = solutions.iter();
    let mut best = iter.next()?;
    let mut best_score = score(best);
    for solution in iter {
        let s = score(solution);
        if s > best_score {
            best = solution;
            best_score = s;
        }
    }
    Some(best)
}

/// Builds a Proposal from an interpreted Problem and its explored
/// Solutions, promoting the Problem Candidate → Proposed as a side effect.
/// Errors if no solution can be selected, rather than returning a proposal
/// with no recommendation.
pub fn create_proposal(mut problem: Problem, solutions: Vec<Solution>) -> Result<Proposal> {
    let recommended = select_best_solution(&solutions)
        .cloned()
        .ok_or_else(|| SiaError::ParseError("no solution could be selected from an empty solution list".into()))?;

    if problem.status == crate::state_machine::ProblemStatus::Candidate {
        state_machine::promote_candidate_to_proposed(&mut problem)?;
    }

    let alternative_solutions = solutions.into_iter().filter(|s| s.id != recommended.id).collect();

    Ok(Proposal {
        id: format!("proposal_{}", problem.id),
        problem,
        recommended_solution: recommended,
        alternative_solutions,
        status: ProposalStatus::Pending,
    })
}

/// Applies the user's decision to the Proposal's driving Problem: approve
/// confirms it, reject rejects it, snooze re-snoozes it. The corresponding
/// audit entry is the caller's responsibility (spec.md §4.10/§4.17).
pub fn apply_user_decision(proposal: &mut Proposal, decision: &str, reason: Option<String>, snooze_days: i64) -> Result<()> {
    match decision {
        "approve" => {
            state_machine::confirm_problem(&mut proposal.problem, "approve")?;
            proposal.status = ProposalStatus::Approved;
        }
        "reject" => {
            state_machine::reject_problem(&mut proposal.problem, reason)?;
            proposal.status = ProposalStatus::Rejected;
        }
        "snooze" => {
            state_machine::snooze_problem(&mut proposal.problem, snooze_days)?;
            proposal.status = ProposalStatus::Snoozed;
        }
        other => {
            return Err(SiaError::ParseError(format!("unknown proposal decision `{other}`")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Domain, RiskLevel, Severity};
    use crate::types::Complexity;

    fn solution(id: &str, pros: usize, cons: usize, complexity: Complexity) -> Solution {
        Solution {
            id: id.into(),
            name: id.into(),
            description: "desc".into(),
            pros: (0..pros).map(|i| format!("pro_{i}")).collect(),
            cons: (0..cons).map(|i| format!("con_{i}")).collect(),
            complexity,
            risk_level: RiskLevel::Low,
            required_tools: vec![],
        }
    }

    fn problem() -> Problem {
        Problem::new_candidate(
            "problem_1".into(),
            "gap_1".into(),
            Domain::Email,
            "name".into(),
            "desc".into(),
            "cause".into(),
            "impact".into(),
            Severity::High,
            vec![],
            0.7,
        )
    }

    #[test]
    fn selects_highest_scoring_solution() {
        let solutions = vec![
            solution("low_score", 1, 2, Complexity::High),
            solution("high_score", 3, 0, Complexity::Low),
        ];
        let best = select_best_solution(&solutions).unwrap();
        assert_eq!(best.id, "high_score");
    }

    #[test]
    fn empty_solutions_yields_none() {
        assert!(select_best_solution(&[]).is_none());
    }

    #[test]
    fn create_proposal_promotes_candidate_and_lists_alternatives() {
        let solutions = vec![solution("sol_a", 2, 0, Complexity::Medium), solution("sol_b", 0, 2, Complexity::Low)];
        let proposal = create_proposal(problem(), solutions).unwrap();
        assert_eq!(proposal.recommended_solution.id, "sol_a");
        assert_eq!(proposal.alternative_solutions.len(), 1);
        assert_eq!(proposal.problem.status, crate::state_machine::ProblemStatus::Proposed);
    }

    #[test]
    fn create_proposal_errors_on_no_solutions() {
        assert!(create_proposal(problem(), vec![]).is_err());
    }

    #[test]
    fn apply_user_decision_approve_confirms_problem() {
        let solutions = vec![solution("sol_a", 1, 0, Complexity::Low)];
        let mut proposal = create_proposal(problem(), solutions).unwrap();
        apply_user_decision(&mut proposal, "approve", None, 7).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Approved);
        assert_eq!(proposal.problem.status, crate::state_machine::ProblemStatus::Confirmed);
    }
}

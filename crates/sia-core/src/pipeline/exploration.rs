//! Exploration (spec.md §4.9).
//!
//! Grounded verbatim on `examples/original_source/layers/exploration.py`'s
//! per-domain/per-problem solution template table, capped at three
//! solutions; LLM path preferred when available.

use crate::domain::{Domain, RiskLevel};
use crate::ports::LlmPort;
use crate::problem::Problem;
use crate::types::{Complexity, Solution};

fn solution(
    id: &str,
    name: &str,
    description: &str,
    pros: &[&str],
    cons: &[&str],
    complexity: Complexity,
    required_tools: &[&str],
    risk_level: RiskLevel,
) -> Solution {
    Solution {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        pros: pros.iter().map(|s| s.to_string()).collect(),
        cons: cons.iter().map(|s| s.to_string()).collect(),
        complexity,
        risk_level,
        required_tools: required_tools.iter().map(|s| s.to_string()).collect(),
    }
}

fn templates_for(domain: Domain, problem_name: &str) -> Vec<Solution> {
    match (domain, problem_name) {
        (Domain::Email, "important mail visibility problem") => vec![
            solution(
                "sol_1",
                "automatic classification system",
                "classifies important mail by sender/keyword pattern and surfaces it at the top",
                &["fixes the root cause", "keeps working once set up", "no notification fatigue"],
                &["needs initial setup", "classifier accuracy takes time to learn"],
                Complexity::Medium,
                &["email_reader", "classifier", "label_applier"],
                RiskLevel::Low,
            ),
            solution(
                "sol_2",
                "real-time important mail alert",
                "sends an immediate alert the moment an important email arrives",
                &["immediately applicable", "simple to implement"],
                &["can increase notification fatigue", "not a root-cause fix"],
                Complexity::Low,
                &["email_reader", "notification"],
                RiskLevel::Low,
            ),
            solution(
                "sol_3",
                "morning summary report",
                "generates a daily morning digest of important mail",
                &["non-intrusive", "easy to scan at a glance"],
                &["not real-time", "report generation takes time"],
                Complexity::Medium,
                &["email_reader", "summarizer", "report_generator"],
                RiskLevel::Low,
            ),
        ],
        (Domain::Email, "important mail response delay problem") => vec![solution(
            "sol_4",
            "priority-based sorting",
            "automatically sorts the inbox by priority so important mail stays on top",
            &["immediate effect", "minimal user intervention"],
            &["needs a priority-scoring rule"],
            Complexity::Medium,
            &["email_reader", "priority_scorer", "sorter"],
            RiskLevel::Low,
        )],
        (Domain::Github, "PR review delay problem") => vec![
            solution(
                "sol_github_1",
                "PR review alert system",
                "automatically detects PRs awaiting review and notifies the team",
                &["immediately applicable", "prevents review delay"],
                &["possible notification fatigue"],
                Complexity::Low,
                &["pr_reader", "notifier"],
                RiskLevel::Low,
            ),
            solution(
                "sol_github_2",
                "automatic PR priority classification",
                "automatically judges PR importance (release, hotfix, etc.) and assigns priority",
                &["fixes the root cause", "improves review throughput"],
                &["needs a priority-scoring rule"],
                Complexity::Medium,
                &["pr_reader", "reviewer", "priority_scorer"],
                RiskLevel::Low,
            ),
        ],
        (Domain::Health, "sleep deficit problem") => vec![
            solution(
                "sol_health_1",
                "sleep pattern analysis and alert",
                "analyzes sleep patterns and alerts when the nightly target is missed",
                &["raises awareness", "supports health management"],
                &["possible notification fatigue"],
                Complexity::Low,
                &["health_reader", "analyzer", "notifier"],
                RiskLevel::Low,
            ),
            solution(
                "sol_health_2",
                "sleep goal tracking system",
                "sets a daily sleep goal and tracks the achievement rate",
                &["motivating", "supports long-term improvement"],
                &["requires setting a goal"],
                Complexity::Medium,
                &["health_reader", "analyzer"],
                RiskLevel::Low,
            ),
        ],
        (Domain::Finance, "excess spending problem") => vec![
            solution(
                "sol_finance_1",
                "spending limit alert",
                "alerts when per-category spending exceeds its limit",
                &["immediately applicable", "controls spending"],
                &["possible notification fatigue"],
                Complexity::Low,
                &["transaction_reader", "analyzer", "notifier"],
                RiskLevel::Low,
            ),
            solution(
                "sol_finance_2",
                "spending pattern analysis and report",
                "analyzes weekly/monthly spending patterns and produces a report",
                &["raises awareness", "supports long-term planning"],
                &["report generation takes time"],
                Complexity::Medium,
                &["transaction_reader", "analyzer", "report_generator"],
                RiskLevel::Low,
            ),
        ],
        (domain, _) => vec![solution(
            &format!("sol_default_{}", domain.as_str()),
            &format!("general {} domain remediation", domain.as_str()),
            "analyzes the problem and proposes an appropriate fix",
            &["applicable"],
            &["needs to be made concrete"],
            Complexity::Medium,
            &[],
            RiskLevel::Medium,
        )],
    }
}

/// Returns at most three Solutions for `problem`. LLM path preferred; the
/// per-domain/per-problem template table is the fallback.
pub async fn explore_solutions(problem: &Problem, llm: Option<&dyn LlmPort>) -> Vec<Solution> {
    if let Some(llm) = llm {
        let prompt = format!(
            "Propose up to three distinct solutions for this problem: {} ({}). \
             For each, give a name and a one-sentence description.",
            problem.name, problem.description
        );
        if let Ok(generated) = llm.generate(&prompt, 512).await {
            if let Some(solutions) = parse_llm_solutions(&generated, problem.domain) {
                return solutions;
            }
        }
    }

    let mut solutions = templates_for(problem.domain, &problem.name);
    solutions.truncate(3);
    solutions
}

/// Expects one `name - description` line per solution; anything else is
/// treated as unusable and the template fallback stands.
fn parse_llm_solutions(text: &str, domain: Domain) -> Option<Vec<Solution>> {
    let mut solutions = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let Some((name, description)) = line.split_once('-') else { continue };
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() || description.is_empty() {
            continue;
        }
        solutions.push(solution(
            &format!("sol_llm_{}_{idx}", domain.as_str()),
            name,
            description,
            &[],
            &[],
            Complexity::Medium,
            &[],
            RiskLevel::Low,
        ));
        if solutions.len() == 3 {
            break;
        }
    }
    if solutions.is_empty() {
        None
    } else {
        Some(solutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    fn problem(domain: Domain, name: &str) -> Problem {
        Problem::new_candidate(
            "problem_1".into(),
            "gap_1".into(),
            domain,
            name.into(),
            "desc".into(),
            "cause".into(),
            "impact".into(),
            Severity::High,
            vec![],
            0.7,
        )
    }

    #[tokio::test]
    async fn known_problem_returns_its_template_solutions() {
        let solutions = explore_solutions(&problem(Domain::Email, "important mail visibility problem"), None).await;
        assert_eq!(solutions.len(), 3);
        assert_eq!(solutions[0].id, "sol_1");
    }

    #[tokio::test]
    async fn unknown_problem_falls_back_to_generic_solution() {
        let solutions = explore_solutions(&problem(Domain::Email, "never seen before"), None).await;
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn result_is_capped_at_three() {
        let solutions = explore_solutions(&problem(Domain::Email, "important mail visibility problem"), None).await;
        assert!(solutions.len() <= 3);
    }
}

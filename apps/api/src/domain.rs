//! Decision domain: weighted pros/cons rating.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use verdict_core::{AppError, Logger, Scope};

/// The submitted problem has no options to rate.
pub const ERR_CODE_DECISION_NO_OPTIONS: &str = "DEC-001";

#[derive(Debug, Clone)]
pub struct Quality {
    pub id: String,
    pub name: String,
    pub importance: f64,
    pub probability: f64,
}

#[derive(Debug, Clone)]
pub struct ProblemOption {
    pub id: String,
    pub name: String,
    pub pros: Vec<Quality>,
    pub cons: Vec<Quality>,
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub id: String,
    pub name: String,
    pub options: Vec<ProblemOption>,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionResult {
    pub options_rating: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub id: String,
    pub problem_id: String,
    pub user_id: String,
    pub result: DecisionResult,
}

#[async_trait]
pub trait DecisionService: Send + Sync {
    /// Rates every option of the problem and records the decision.
    async fn make_decision(
        &self,
        scope: &Scope,
        user_id: &str,
        problem: &Problem,
    ) -> Result<Decision, AppError>;
}

/// Rates an option as the ratio of its weighted pros to its weighted cons.
pub struct WeightedDecisionService {
    logger: Arc<Logger>,
}

impl WeightedDecisionService {
    pub fn new(logger: Arc<Logger>) -> Arc<Self> {
        Arc::new(Self { logger })
    }
}

fn weight(qualities: &[Quality]) -> f64 {
    qualities
        .iter()
        .map(|q| q.importance * q.probability)
        .sum()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl DecisionService for WeightedDecisionService {
    async fn make_decision(
        &self,
        scope: &Scope,
        user_id: &str,
        problem: &Problem,
    ) -> Result<Decision, AppError> {
        if problem.options.is_empty() {
            return Err(
                AppError::builder(ERR_CODE_DECISION_NO_OPTIONS, "problem has no options")
                    .business()
                    .with_field("problemId", problem.id.clone())
                    .with_scope(scope)
                    .http_status(400)
                    .build(),
            );
        }

        let mut result = DecisionResult::default();
        for option in &problem.options {
            let pros = weight(&option.pros);
            let cons = weight(&option.cons);
            // A zero cons weight leaves the pros weight unscaled.
            let rating = if cons == 0.0 { pros } else { pros / cons };
            result.options_rating.insert(option.id.clone(), round2(rating));
        }

        let decision = Decision {
            id: Uuid::new_v4().to_string(),
            problem_id: problem.id.clone(),
            user_id: user_id.to_string(),
            result,
        };

        self.logger
            .scoped()
            .component("decision")
            .method("make-decision")
            .with_scope(scope)
            .trace_object("decision", &decision.result.options_rating);
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_core::LogConfig;

    fn service() -> Arc<WeightedDecisionService> {
        WeightedDecisionService::new(Arc::new(Logger::new(LogConfig::default()).unwrap()))
    }

    fn quality(importance: f64, probability: f64) -> Quality {
        Quality {
            id: Uuid::new_v4().to_string(),
            name: "q".into(),
            importance,
            probability,
        }
    }

    fn problem(options: Vec<ProblemOption>) -> Problem {
        Problem {
            id: "p-1".into(),
            name: "which".into(),
            options,
        }
    }

    #[tokio::test]
    async fn rates_options_by_weighted_ratio() {
        let p = problem(vec![ProblemOption {
            id: "o-1".into(),
            name: "first".into(),
            pros: vec![quality(2.0, 0.5), quality(3.0, 1.0)], // 4.0
            cons: vec![quality(1.0, 0.5), quality(2.0, 0.5)], // 1.5
        }]);
        let decision = service()
            .make_decision(&Scope::root(), "u-1", &p)
            .await
            .unwrap();
        assert_eq!(decision.problem_id, "p-1");
        assert_eq!(decision.user_id, "u-1");
        assert_eq!(decision.result.options_rating["o-1"], 2.67);
    }

    #[tokio::test]
    async fn zero_cons_weight_keeps_pros_unscaled() {
        let p = problem(vec![ProblemOption {
            id: "o-1".into(),
            name: "only".into(),
            pros: vec![quality(2.0, 0.5)],
            cons: vec![],
        }]);
        let decision = service()
            .make_decision(&Scope::root(), "u-1", &p)
            .await
            .unwrap();
        assert_eq!(decision.result.options_rating["o-1"], 1.0);
    }

    #[tokio::test]
    async fn empty_problem_is_a_business_error() {
        let err = service()
            .make_decision(&Scope::root(), "u-1", &problem(vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ERR_CODE_DECISION_NO_OPTIONS);
        assert_eq!(err.http_status(), Some(400));
    }

    #[tokio::test]
    async fn rates_every_option() {
        let p = problem(vec![
            ProblemOption {
                id: "a".into(),
                name: "a".into(),
                pros: vec![quality(1.0, 1.0)],
                cons: vec![quality(2.0, 1.0)],
            },
            ProblemOption {
                id: "b".into(),
                name: "b".into(),
                pros: vec![quality(4.0, 1.0)],
                cons: vec![quality(2.0, 1.0)],
            },
        ]);
        let decision = service()
            .make_decision(&Scope::root(), "u-1", &p)
            .await
            .unwrap();
        assert_eq!(decision.result.options_rating["a"], 0.5);
        assert_eq!(decision.result.options_rating["b"], 2.0);
    }
}

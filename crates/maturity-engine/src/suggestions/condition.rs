use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::RuleValidationError;

const EQ_TOLERANCE: f64 = 1e-9;

/// Comparison applied between a metric's current value and the rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

impl ComparisonOperator {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lt" | "<" => Some(Self::Lt),
            "lte" | "<=" => Some(Self::Lte),
            "gt" | ">" => Some(Self::Gt),
            "gte" | ">=" => Some(Self::Gte),
            "eq" | "==" | "=" => Some(Self::Eq),
            _ => None,
        }
    }

    pub fn apply(self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => observed < threshold,
            Self::Lte => observed <= threshold,
            Self::Gt => observed > threshold,
            Self::Gte => observed >= threshold,
            Self::Eq => (observed - threshold).abs() <= EQ_TOLERANCE,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Eq => "==",
        }
    }
}

/// Named metric values a condition can be evaluated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricContext {
    values: BTreeMap<String, f64>,
}

impl MetricContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: &str, value: f64) -> Self {
        self.insert(metric, value);
        self
    }

    pub fn insert(&mut self, metric: &str, value: f64) {
        self.values.insert(metric.to_string(), value);
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `metric <operator> threshold`, validated when the rule is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: String,
    pub operator: ComparisonOperator,
    pub threshold: f64,
}

/// Metric reading that satisfied a condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionMatch {
    pub metric: String,
    pub observed: f64,
}

impl Condition {
    pub fn new(metric: &str, operator: ComparisonOperator, threshold: f64) -> Self {
        Self {
            metric: metric.to_string(),
            operator,
            threshold,
        }
    }

    /// A metric missing from the context never matches.
    pub fn matches(&self, context: &MetricContext) -> bool {
        self.evaluate(context).is_some()
    }

    pub fn evaluate(&self, context: &MetricContext) -> Option<ConditionMatch> {
        let observed = context.get(&self.metric)?;
        self.operator
            .apply(observed, self.threshold)
            .then(|| ConditionMatch {
                metric: self.metric.clone(),
                observed,
            })
    }

    /// Accepts `{"metric": "percentage", "operator": "lt", "threshold": 60}` (`value` is an
    /// alias for `threshold`) and the shorthand `{"percentage": {"lt": 60}}`.
    pub fn from_json(raw: &Value) -> Result<Self, RuleValidationError> {
        let object = raw.as_object().ok_or(RuleValidationError::ConditionShape)?;

        if let Some(metric) = object.get("metric") {
            let metric = metric
                .as_str()
                .filter(|metric| !metric.trim().is_empty())
                .ok_or(RuleValidationError::MissingMetric)?;
            let operator = object
                .get("operator")
                .and_then(Value::as_str)
                .ok_or_else(|| RuleValidationError::UnknownOperator(String::new()))?;
            let threshold = object
                .get("threshold")
                .or_else(|| object.get("value"))
                .ok_or(RuleValidationError::MissingThreshold)?;
            return Self::build(metric, operator, threshold);
        }

        let mut entries = object.iter();
        let (Some((metric, comparison)), None) = (entries.next(), entries.next()) else {
            return Err(RuleValidationError::ConditionShape);
        };
        let comparison = comparison
            .as_object()
            .ok_or(RuleValidationError::ConditionShape)?;
        let mut comparisons = comparison.iter();
        let (Some((operator, threshold)), None) = (comparisons.next(), comparisons.next()) else {
            return Err(RuleValidationError::ConditionShape);
        };

        Self::build(metric, operator, threshold)
    }

    fn build(metric: &str, operator: &str, threshold: &Value) -> Result<Self, RuleValidationError> {
        let operator = ComparisonOperator::parse(operator)
            .ok_or_else(|| RuleValidationError::UnknownOperator(operator.to_string()))?;
        let threshold = threshold
            .as_f64()
            .filter(|value| value.is_finite())
            .ok_or_else(|| RuleValidationError::InvalidThreshold(threshold.to_string()))?;

        Ok(Self::new(metric.trim(), operator, threshold))
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.metric,
            self.operator.symbol(),
            self.threshold
        )
    }
}

/// An absent condition always matches.
pub fn matches(condition: Option<&Condition>, context: &MetricContext) -> bool {
    condition.map_or(true, |condition| condition.matches(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_less_than_excludes_threshold() {
        let condition = Condition::new("percentage", ComparisonOperator::Lt, 60.0);

        assert!(!condition.matches(&MetricContext::new().with("percentage", 60.0)));
        assert!(condition.matches(&MetricContext::new().with("percentage", 59.99)));
    }

    #[test]
    fn inclusive_operators_include_threshold() {
        let context = MetricContext::new().with("score", 10.0);

        assert!(Condition::new("score", ComparisonOperator::Lte, 10.0).matches(&context));
        assert!(Condition::new("score", ComparisonOperator::Gte, 10.0).matches(&context));
        assert!(Condition::new("score", ComparisonOperator::Eq, 10.0).matches(&context));
        assert!(!Condition::new("score", ComparisonOperator::Gt, 10.0).matches(&context));
    }

    #[test]
    fn missing_metric_never_matches() {
        let condition = Condition::new("percentage", ComparisonOperator::Gte, 0.0);
        assert!(!condition.matches(&MetricContext::new().with("score", 100.0)));
        assert!(!condition.matches(&MetricContext::new()));
    }

    #[test]
    fn absent_condition_always_matches() {
        assert!(matches(None, &MetricContext::new()));
    }

    #[test]
    fn evaluate_reports_observed_metric() {
        let condition = Condition::new("score", ComparisonOperator::Lt, 3.0);
        let hit = condition
            .evaluate(&MetricContext::new().with("score", 1.25))
            .expect("matches");
        assert_eq!(hit.metric, "score");
        assert_eq!(hit.observed, 1.25);
    }

    #[test]
    fn parses_canonical_and_shorthand_json() {
        let canonical =
            Condition::from_json(&json!({"metric": "percentage", "operator": "lt", "threshold": 60}))
                .expect("canonical");
        let aliased =
            Condition::from_json(&json!({"metric": "percentage", "operator": "<", "value": 60.0}))
                .expect("alias");
        let shorthand = Condition::from_json(&json!({"percentage": {"lt": 60}})).expect("shorthand");

        assert_eq!(canonical, Condition::new("percentage", ComparisonOperator::Lt, 60.0));
        assert_eq!(aliased, canonical);
        assert_eq!(shorthand, canonical);
        assert_eq!(canonical.to_string(), "percentage < 60");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Condition::from_json(&json!({"metric": "score", "operator": "between", "threshold": 1})),
            Err(RuleValidationError::UnknownOperator(op)) if op == "between"
        ));
        assert!(matches!(
            Condition::from_json(&json!({"metric": "score", "operator": "lt", "threshold": "high"})),
            Err(RuleValidationError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Condition::from_json(&json!({"score": {"lt": 1}, "percentage": {"gt": 2}})),
            Err(RuleValidationError::ConditionShape)
        ));
        assert!(matches!(
            Condition::from_json(&json!(["score", "lt", 1])),
            Err(RuleValidationError::ConditionShape)
        ));
        assert!(matches!(
            Condition::from_json(&json!({"metric": "score", "operator": "lt"})),
            Err(RuleValidationError::MissingThreshold)
        ));
    }
}

//! Predicates over probed metadata values

use docmeta_core::DocValue;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Test = Arc<dyn Fn(&DocValue) -> bool + Send + Sync>;

/// A named test applied to the value read at the probe path
///
/// Ordering predicates only match numbers (Int or Float, compared as f64).
/// A non-numeric value never satisfies them.
///
/// ```
/// use docmeta_core::DocValue;
/// use docmeta_engine::Predicate;
///
/// let over_15 = Predicate::greater_than(15.0);
/// assert!(over_15.evaluate(&DocValue::Int(20)));
/// assert!(!over_15.evaluate(&DocValue::Int(10)));
/// assert!(!over_15.evaluate(&DocValue::from("20")));
/// ```
#[derive(Clone)]
pub struct Predicate {
    name: String,
    test: Test,
}

impl Predicate {
    fn numeric(name: String, accept: fn(Ordering) -> bool, threshold: f64) -> Self {
        Predicate {
            name,
            test: Arc::new(move |v| v.compare_number(threshold).map_or(false, accept)),
        }
    }

    /// Value > threshold
    pub fn greater_than(threshold: f64) -> Self {
        Self::numeric(format!("> {}", threshold), |o| o == Ordering::Greater, threshold)
    }

    /// Value >= threshold
    pub fn at_least(threshold: f64) -> Self {
        Self::numeric(format!(">= {}", threshold), |o| o != Ordering::Less, threshold)
    }

    /// Value < threshold
    pub fn less_than(threshold: f64) -> Self {
        Self::numeric(format!("< {}", threshold), |o| o == Ordering::Less, threshold)
    }

    /// Value <= threshold
    pub fn at_most(threshold: f64) -> Self {
        Self::numeric(format!("<= {}", threshold), |o| o != Ordering::Greater, threshold)
    }

    /// Value equals `expected`; numbers compare numerically
    pub fn equals(expected: impl Into<DocValue>) -> Self {
        let expected = expected.into();
        Predicate {
            name: format!("== {}", expected),
            test: Arc::new(move |v| values_match(v, &expected)),
        }
    }

    /// Negation of [`Predicate::equals`]
    pub fn not_equals(expected: impl Into<DocValue>) -> Self {
        let expected = expected.into();
        Predicate {
            name: format!("!= {}", expected),
            test: Arc::new(move |v| !values_match(v, &expected)),
        }
    }

    /// Matches every value that exists
    pub fn any() -> Self {
        Predicate {
            name: "any".to_string(),
            test: Arc::new(|_| true),
        }
    }

    /// Caller-supplied test
    pub fn custom<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&DocValue) -> bool + Send + Sync + 'static,
    {
        Predicate {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    /// Apply the test
    pub fn evaluate(&self, value: &DocValue) -> bool {
        (self.test)(value)
    }

    /// Human-readable description
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn values_match(actual: &DocValue, expected: &DocValue) -> bool {
    match (actual.as_number(), expected.as_number()) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

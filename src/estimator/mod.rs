//! Estimators and strategies
//!
//! An [`Estimator`] is anything that can be fitted on a feature table and then
//! predict labels. A [`Strategy`] gives an estimator prototype the name that
//! results are grouped under; the orchestrator asks the prototype for a fresh,
//! unfitted copy for every (dataset, fold) so no state leaks between pairs.
//!
//! ```rust
//! use trueno_bench::data::FeatureTable;
//! use trueno_bench::estimator::{Estimator, MostFrequentClassifier, Strategy};
//!
//! # fn main() -> trueno_bench::Result<()> {
//! let strategy = Strategy::new("majority", MostFrequentClassifier::new());
//!
//! let x = FeatureTable::from_rows(vec![vec![0.0], vec![1.0], vec![2.0]])?;
//! let y = vec!["a".to_string(), "b".to_string(), "b".to_string()];
//!
//! let mut estimator = strategy.instantiate();
//! estimator.fit(&x, &y)?;
//! assert_eq!(estimator.predict(&x)?, vec!["b", "b", "b"]);
//! # Ok(())
//! # }
//! ```

mod dummy;
mod neighbors;

pub use dummy::MostFrequentClassifier;
pub use neighbors::NearestNeighborClassifier;

use crate::data::FeatureTable;
use crate::{Error, Result};

/// A fittable classifier.
pub trait Estimator {
    /// Algorithm name (not the strategy name).
    fn name(&self) -> &str;

    /// Fit on features and labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are inconsistent or fitting fails.
    fn fit(&mut self, features: &FeatureTable, labels: &[String]) -> Result<()>;

    /// Predict one label per row.
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before `fit`, or an error if the features do not
    /// match what the estimator was fitted on.
    fn predict(&self, features: &FeatureTable) -> Result<Vec<String>>;

    /// An unfitted copy with the same hyper-parameters.
    fn fresh(&self) -> Box<dyn Estimator>;

    /// Serialized fitted state, if this estimator supports persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Named estimator prototype.
pub struct Strategy {
    name: String,
    prototype: Box<dyn Estimator>,
}

impl Strategy {
    /// Create a strategy.
    #[must_use]
    pub fn new(name: impl Into<String>, estimator: impl Estimator + 'static) -> Self {
        Self {
            name: name.into(),
            prototype: Box::new(estimator),
        }
    }

    /// Create a strategy from a boxed estimator.
    #[must_use]
    pub fn from_boxed(name: impl Into<String>, prototype: Box<dyn Estimator>) -> Self {
        Self {
            name: name.into(),
            prototype,
        }
    }

    /// Strategy name; the results grouping key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped prototype.
    #[must_use]
    pub fn estimator(&self) -> &dyn Estimator {
        self.prototype.as_ref()
    }

    /// A fresh, unfitted estimator for one (dataset, fold).
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn Estimator> {
        self.prototype.fresh()
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("estimator", &self.prototype.name())
            .finish()
    }
}

/// Shared input validation for `fit`.
pub(crate) fn check_fit_input(features: &FeatureTable, labels: &[String]) -> Result<()> {
    if features.is_empty() {
        return Err(Error::InvalidInput("Cannot fit on zero rows".to_string()));
    }
    if features.n_rows() != labels.len() {
        return Err(Error::InvalidInput(format!(
            "{} feature rows but {} labels",
            features.n_rows(),
            labels.len()
        )));
    }
    Ok(())
}

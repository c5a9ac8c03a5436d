// Alignment gram bounds and EM training settings.

use serde::Deserialize;

use crate::CoreError;

/// Longest gram either side may use. Bounds the aligner's transition fan-out.
pub const MAX_GRAM_LEN: usize = 8;

/// How expected counts are turned into probabilities after each EM pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maximizer {
    /// `P(x, y) = c(x, y) / total`
    #[default]
    Joint,
    /// `P(y | x) = c(x, y) / c(x, *)`
    Conditional,
}

/// Gram-length bounds and training settings for the alignment engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GramOptions {
    pub min_x_gram: usize,
    pub max_x_gram: usize,
    pub min_y_gram: usize,
    pub max_y_gram: usize,
    /// Allow a grapheme gram to align with nothing (silent letters).
    pub include_x_to_epsilon: bool,
    /// Allow a phoneme gram to align with nothing (inserted sounds).
    pub include_epsilon_to_y: bool,
    pub maximizer: Maximizer,
    /// EM stops once the summed absolute probability change drops below this.
    pub prob_delta_threshold: f64,
    pub max_iterations: usize,
    /// Alignments per training pair collected during each E-step.
    pub training_k: usize,
}

impl Default for GramOptions {
    fn default() -> Self {
        Self {
            min_x_gram: 1,
            max_x_gram: 2,
            min_y_gram: 1,
            max_y_gram: 2,
            include_x_to_epsilon: true,
            include_epsilon_to_y: false,
            maximizer: Maximizer::Joint,
            prob_delta_threshold: 1e-4,
            max_iterations: 20,
            training_k: 1,
        }
    }
}

impl GramOptions {
    pub fn validate(&self) -> Result<(), CoreError> {
        check_bounds("min_x_gram", "max_x_gram", self.min_x_gram, self.max_x_gram)?;
        check_bounds("min_y_gram", "max_y_gram", self.min_y_gram, self.max_y_gram)?;
        if !(self.prob_delta_threshold > 0.0 && self.prob_delta_threshold.is_finite()) {
            return Err(CoreError::InvalidOption {
                field: "prob_delta_threshold",
                reason: format!("must be positive, got {}", self.prob_delta_threshold),
            });
        }
        if self.max_iterations == 0 {
            return Err(CoreError::InvalidOption {
                field: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.training_k == 0 {
            return Err(CoreError::InvalidOption {
                field: "training_k",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Every `(x_len, y_len)` joint transition shape, in ascending order.
    pub fn joint_steps(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.min_x_gram..=self.max_x_gram)
            .flat_map(move |i| (self.min_y_gram..=self.max_y_gram).map(move |j| (i, j)))
    }
}

fn check_bounds(
    min_field: &'static str,
    max_field: &'static str,
    min: usize,
    max: usize,
) -> Result<(), CoreError> {
    if min == 0 {
        return Err(CoreError::InvalidOption {
            field: min_field,
            reason: "must be at least 1".to_string(),
        });
    }
    if max < min {
        return Err(CoreError::InvalidOption {
            field: max_field,
            reason: format!("{max} is smaller than {min_field} ({min})"),
        });
    }
    if max > MAX_GRAM_LEN {
        return Err(CoreError::InvalidOption {
            field: max_field,
            reason: format!("{max} exceeds the limit of {MAX_GRAM_LEN}"),
        });
    }
    Ok(())
}

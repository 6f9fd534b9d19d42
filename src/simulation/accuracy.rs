/// Coarse classification of a relative error, for reporting only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyBand {
    /// Below 1%
    Excellent,
    /// Below 5%
    Good,
    /// Below 10%
    Fair,
    /// 10% or more
    Poor,
}

impl AccuracyBand {
    pub fn from_relative_error(percent: f64) -> Self {
        if percent < 1.0 {
            AccuracyBand::Excellent
        } else if percent < 5.0 {
            AccuracyBand::Good
        } else if percent < 10.0 {
            AccuracyBand::Fair
        } else {
            AccuracyBand::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccuracyBand::Excellent => "error < 1%",
            AccuracyBand::Good => "error < 5%",
            AccuracyBand::Fair => "error < 10%",
            AccuracyBand::Poor => "error >= 10%",
        }
    }

    /// Likely explanation for a large error, if there is one worth giving
    pub fn hint(self, country: &str) -> Option<String> {
        match self {
            AccuracyBand::Poor => Some(format!(
                "The boundary data for {} probably leaves out offshore islands or archipelagos",
                country
            )),
            _ => None,
        }
    }
}

/// Error of an area estimate against a reference value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorReport {
    pub estimate: f64,
    /// None when no usable (positive) reference was supplied
    pub reference: Option<f64>,
    pub absolute_error: f64,
    /// Percent of the reference
    pub relative_error: f64,
}

impl ErrorReport {
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Band for the relative error; None without a reference
    pub fn band(&self) -> Option<AccuracyBand> {
        self.reference
            .map(|_| AccuracyBand::from_relative_error(self.relative_error))
    }
}

/// Compare an estimate with a reference area in the same unit
///
/// A missing, zero or negative reference means "unknown": both errors are
/// reported as zero instead of dividing by it.
pub fn evaluate(estimate: f64, reference: Option<f64>) -> ErrorReport {
    match reference.filter(|r| *r > 0.0) {
        Some(reference) => {
            let absolute_error = (estimate - reference).abs();
            ErrorReport {
                estimate,
                reference: Some(reference),
                absolute_error,
                relative_error: absolute_error / reference * 100.0,
            }
        }
        None => ErrorReport {
            estimate,
            reference: None,
            absolute_error: 0.0,
            relative_error: 0.0,
        },
    }
}

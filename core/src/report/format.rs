//! Formatting of numbers in reports.

/// How numbers are written in reports.
///
/// By default, real numbers are written in their shortest round-trip representation, with the
/// same choice between positional and scientific notation as common dataframe libraries make, so
/// that reports can be compared textually with reports produced elsewhere. Alternatively, a
/// fixed number of decimals may be used.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NumberFormat {
    precision: Option<usize>,
}

impl NumberFormat {
    /// Creates a format with a fixed number of decimals.
    pub fn fixed(precision: usize) -> Self {
        Self {
            precision: Some(precision),
        }
    }

    /// Formats a count.
    pub fn count(&self, value: usize) -> String {
        value.to_string()
    }

    /// Formats a real number.
    pub fn real(&self, value: f64) -> String {
        match self.precision {
            Some(precision) => format!("{value:.precision$}"),
            None => shortest(value),
        }
    }
}

fn shortest(value: f64) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "inf" } else { "-inf" })
    } else if value != 0.0 && !(1e-4..1e16).contains(&value.abs()) {
        let exp = format!("{value:e}");
        match exp.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent = exponent.parse::<i32>().unwrap_or_default();
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            None => exp,
        }
    } else if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

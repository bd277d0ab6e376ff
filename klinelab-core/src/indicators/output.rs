//! Indicator results.

/// What a compute function returns.
///
/// The engine matches on this to decide which columns an indicator writes:
/// `Single` becomes one column named after the indicator, each `Multi`
/// entry becomes `{NAME}_{KEY}` with the key upper-cased.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Single(Vec<f64>),
    Multi(Vec<(String, Vec<f64>)>),
    /// A result wrapped in a container. The engine unwraps one level.
    Nested(Box<IndicatorOutput>),
}

impl IndicatorOutput {
    pub fn multi<'a>(series: impl IntoIterator<Item = (&'a str, Vec<f64>)>) -> Self {
        IndicatorOutput::Multi(
            series
                .into_iter()
                .map(|(key, values)| (key.to_string(), values))
                .collect(),
        )
    }

    pub fn nested(inner: IndicatorOutput) -> Self {
        IndicatorOutput::Nested(Box::new(inner))
    }

    /// Remove at most one `Nested` wrapper.
    pub fn unwrap_nested(self) -> Self {
        match self {
            IndicatorOutput::Nested(inner) => *inner,
            other => other,
        }
    }

    /// Column names and values for a dataset of `rows` rows, or `None` when
    /// the shape cannot be written.
    pub fn into_columns(self, name: &str, rows: usize) -> Option<Vec<(String, Vec<f64>)>> {
        match self {
            IndicatorOutput::Single(values) if values.len() == rows => {
                Some(vec![(name.to_string(), values)])
            }
            IndicatorOutput::Multi(series)
                if !series.is_empty() && series.iter().all(|(_, v)| v.len() == rows) =>
            {
                Some(
                    series
                        .into_iter()
                        .map(|(key, values)| (format!("{name}_{}", key.to_uppercase()), values))
                        .collect(),
                )
            }
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            IndicatorOutput::Single(_) => "single series",
            IndicatorOutput::Multi(_) => "multi series",
            IndicatorOutput::Nested(_) => "nested result",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_named_after_indicator() {
        let cols = IndicatorOutput::Single(vec![1.0, 2.0])
            .into_columns("SMA", 2)
            .unwrap();
        assert_eq!(cols, vec![("SMA".to_string(), vec![1.0, 2.0])]);
    }

    #[test]
    fn multi_keys_upper_cased() {
        let out = IndicatorOutput::multi([("upper", vec![1.0]), ("lower", vec![0.0])]);
        let names: Vec<String> = out.into_columns("BB", 1).unwrap().into_iter().map(|c| c.0).collect();
        assert_eq!(names, ["BB_UPPER", "BB_LOWER"]);
    }

    #[test]
    fn nested_unwraps_once() {
        let once = IndicatorOutput::nested(IndicatorOutput::Single(vec![1.0]));
        assert!(once.unwrap_nested().into_columns("X", 1).is_some());

        let twice = IndicatorOutput::nested(IndicatorOutput::nested(IndicatorOutput::Single(vec![1.0])));
        assert!(twice.unwrap_nested().into_columns("X", 1).is_none());
    }

    #[test]
    fn bad_shapes_rejected() {
        assert!(IndicatorOutput::Single(vec![1.0]).into_columns("X", 2).is_none());
        assert!(IndicatorOutput::Multi(vec![]).into_columns("X", 0).is_none());
        assert!(IndicatorOutput::multi([("a", vec![1.0]), ("b", vec![])])
            .into_columns("X", 1)
            .is_none());
    }
}

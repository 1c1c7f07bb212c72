use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::{Horizon, NormalizedTable, Observation};
use crate::options::PipelineOptions;
use crate::period::parse_period;

static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:on|for)\s+(.+)").expect("hardcoded category regex is valid")
});

/// Takes the subject of a title such as `Table 1: Perceptions on Economic Situation`.
#[must_use]
pub fn perception_category(title: &str, default_category: &str) -> String {
    CATEGORY_RE
        .captures(title)
        .and_then(|capture| capture.get(1))
        .map(|subject| subject.as_str().replace(['*', ':'], "").trim().to_string())
        .filter(|category| !category.is_empty())
        .unwrap_or_else(|| default_category.to_string())
}

/// Splits a metric column label into its horizon and response bucket.
#[must_use]
pub fn split_metric(label: &str, options: &PipelineOptions) -> (Horizon, String) {
    let horizons = [
        (options.current_phrase.as_str(), Horizon::Current),
        (options.ahead_phrase.as_str(), Horizon::OneYearAhead),
    ];
    for (phrase, horizon) in horizons {
        if let Some(rest) = label.strip_prefix(phrase) {
            let bucket = rest.trim().trim_matches('-').trim().to_string();
            return (horizon, bucket);
        }
    }
    (Horizon::NetResponse, options.net_response_label.clone())
}

fn parse_percentage(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Unpivots one wide table into observations.
///
/// Returns nothing when the first header cell is not the period column. Rows
/// with an unparseable period and cells with a non-numeric value are dropped.
#[must_use]
pub fn reshape_table(table: &NormalizedTable, options: &PipelineOptions) -> Vec<Observation> {
    if table.header.first() != Some(&options.period_label) {
        debug!(title = %table.title, "table has no period column; skipped");
        return Vec::new();
    }

    let category = perception_category(&table.title, &options.default_category);
    let metrics = table
        .header
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, label)| {
            let (horizon, bucket) = split_metric(label, options);
            (index, horizon, bucket)
        })
        .collect::<Vec<_>>();

    let mut observations = Vec::new();
    for row in &table.body {
        let Some(survey_round) = row.first().and_then(|cell| parse_period(cell)) else {
            debug!(title = %table.title, row = ?row.first(), "unparseable survey round; row dropped");
            continue;
        };

        for (index, horizon, bucket) in &metrics {
            let Some(value) = row.get(*index).and_then(|cell| parse_percentage(cell)) else {
                continue;
            };
            observations.push(Observation {
                survey_round,
                perception_category: category.clone(),
                perception_type: *horizon,
                response_category: bucket.clone(),
                response_percentage: value,
            });
        }
    }

    observations
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::{perception_category, reshape_table, split_metric};
    use crate::model::{Horizon, NormalizedTable};
    use crate::options::PipelineOptions;

    fn strings(row: &[&str]) -> Vec<String> {
        row.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn category_follows_on_or_for() {
        assert_eq!(
            perception_category("Table 1: Perceptions... on Economic Situation", "General"),
            "Economic Situation"
        );
        assert_eq!(
            perception_category("Table 4: Expectations for Prices*", "General"),
            "Prices"
        );
        assert_eq!(
            perception_category("TABLE 2: VIEWS ON Income:", "General"),
            "Income"
        );
        assert_eq!(perception_category("Summary table", "General"), "General");
        assert_eq!(perception_category("Perceptions on ", "General"), "General");
    }

    #[test]
    fn category_requires_whole_word() {
        assert_eq!(
            perception_category("Table 3: Consumption Spending", "General"),
            "General"
        );
    }

    #[test]
    fn splits_horizon_and_bucket() {
        let options = PipelineOptions::default();
        assert_eq!(
            split_metric("Current Perception -Increased", &options),
            (Horizon::Current, "Increased".to_string())
        );
        assert_eq!(
            split_metric("One year ahead Expectation- Will Increase", &options),
            (Horizon::OneYearAhead, "Will Increase".to_string())
        );
        assert_eq!(
            split_metric("Current Perception-Remained Same", &options),
            (Horizon::Current, "Remained Same".to_string())
        );
    }

    #[test]
    fn residual_labels_are_net_response() {
        let options = PipelineOptions::default();
        assert_eq!(
            split_metric("Net Response", &options),
            (Horizon::NetResponse, "Net Response".to_string())
        );
        assert_eq!(
            split_metric("current perception -Increased", &options),
            (Horizon::NetResponse, "Net Response".to_string())
        );
    }

    #[test]
    fn reshapes_wide_rows_into_observations() {
        let table = NormalizedTable {
            title: "Table 1: Perceptions on Economic Situation".to_string(),
            header: strings(&[
                "Survey Round",
                "Current Perception -Increased",
                "Net Response",
            ]),
            body: vec![
                strings(&["May-25", "40.5", "-3.2"]),
                strings(&["Jun-25", "n.a.", "1"]),
                strings(&["Total", "10", "10"]),
            ],
        };
        let observations = reshape_table(&table, &PipelineOptions::default());

        assert_eq!(observations.len(), 3);
        let first = &observations[0];
        assert_eq!(first.survey_round, NaiveDate::from_ymd_opt(2025, 5, 1).expect("date"));
        assert_eq!(first.perception_category, "Economic Situation");
        assert_eq!(first.perception_type, Horizon::Current);
        assert_eq!(first.response_category, "Increased");
        assert_eq!(first.response_percentage, 40.5);

        assert_eq!(observations[1].perception_type, Horizon::NetResponse);
        assert_eq!(observations[1].response_category, "Net Response");
        assert_eq!(observations[1].response_percentage, -3.2);

        assert_eq!(observations[2].survey_round, NaiveDate::from_ymd_opt(2025, 6, 1).expect("date"));
        assert_eq!(observations[2].response_percentage, 1.0);
    }

    #[test]
    fn table_without_period_column_is_unusable() {
        let table = NormalizedTable {
            title: "Table 1: Perceptions on Income".to_string(),
            header: strings(&["Round", "Current Perception -Increased"]),
            body: vec![strings(&["May-25", "40"])],
        };
        assert!(reshape_table(&table, &PipelineOptions::default()).is_empty());
    }

    #[test]
    fn short_rows_and_blank_values_are_skipped() {
        let table = NormalizedTable {
            title: "Table 1: Perceptions on Income".to_string(),
            header: strings(&["Survey Round", "Current Perception -Increased", "Current Perception -Same"]),
            body: vec![strings(&["May-25", ""]), strings(&["Jun-25", "nan", "inf"])],
        };
        assert!(reshape_table(&table, &PipelineOptions::default()).is_empty());
    }
}

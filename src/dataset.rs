use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use csv::WriterBuilder;

use crate::error::ExtractError;
use crate::model::{Horizon, Observation};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RowKey {
    survey_round: NaiveDate,
    perception_category: String,
    perception_type: Horizon,
    response_category: String,
    response_bits: u64,
}

impl From<&Observation> for RowKey {
    fn from(observation: &Observation) -> Self {
        // 0.0 and -0.0 are the same percentage
        let value = if observation.response_percentage == 0.0 {
            0.0_f64
        } else {
            observation.response_percentage
        };
        Self {
            survey_round: observation.survey_round,
            perception_category: observation.perception_category.clone(),
            perception_type: observation.perception_type,
            response_category: observation.response_category.clone(),
            response_bits: value.to_bits(),
        }
    }
}

/// The consolidated survey dataset, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, observations: impl IntoIterator<Item = Observation>) {
        self.observations.extend(observations);
    }

    /// Removes rows identical to an earlier row, keeping first occurrences.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.observations
            .retain(|observation| seen.insert(RowKey::from(observation)));
    }

    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<(), ExtractError> {
        let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
        for observation in &self.observations {
            writer.serialize(observation)?;
        }
        if self.observations.is_empty() {
            writer.write_record([
                "survey_round",
                "perception_category",
                "perception_type",
                "response_category",
                "response_percentage",
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path, delimiter: u8) -> Result<(), ExtractError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file, delimiter)
    }
}

impl IntoIterator for Dataset {
    type Item = Observation;
    type IntoIter = std::vec::IntoIter<Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.into_iter()
    }
}

impl FromIterator<Observation> for Dataset {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self {
            observations: iter.into_iter().collect(),
        }
    }
}

/// Concatenates per-table observations in arrival order, then drops duplicates.
#[must_use]
pub fn consolidate<I>(parts: I) -> Dataset
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = Observation>,
{
    let mut dataset = Dataset::new();
    for part in parts {
        dataset.extend(part);
    }
    dataset.dedup();
    dataset
}

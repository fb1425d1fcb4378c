use std::fmt;

use crate::query::{ComparisonQuery, Observation};

/// Printable result of one comparison query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub label: String,
    pub lines: Vec<String>,
}

impl Report {
    pub fn new(query: &ComparisonQuery, observations: &[Observation]) -> Self {
        Self {
            label: query.label.to_string(),
            lines: observations.iter().map(format_observation).collect(),
        }
    }
}

fn format_byte(byte: Option<u8>) -> String {
    byte.map_or_else(|| "-".to_string(), |b| b.to_string())
}

fn format_observation(observation: &Observation) -> String {
    format!(
        "fact.payload[0] = {}, file.payload[0] = {}",
        format_byte(observation.fact_byte()),
        format_byte(observation.file_byte())
    )
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WITHOUT_FACT_ID;

    #[test]
    fn test_report_lines() {
        let observations = vec![
            Observation {
                fact_payload: vec![1],
                file_payload: vec![2],
            },
            Observation {
                fact_payload: vec![1],
                file_payload: vec![],
            },
        ];
        let report = Report::new(&WITHOUT_FACT_ID, &observations);
        assert_eq!(
            report.to_string(),
            "excluding fact.id from the select statement\n\
             fact.payload[0] = 1, file.payload[0] = 2\n\
             fact.payload[0] = 1, file.payload[0] = -\n"
        );
    }

    #[test]
    fn test_empty_report_prints_label_only() {
        let report = Report::new(&WITHOUT_FACT_ID, &[]);
        assert_eq!(report.to_string(), "excluding fact.id from the select statement\n");
    }
}

//! Type definitions for Water Sentry
//! Readings, assessments and the records kept by the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tri-level risk status derived from the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    /// Score below the moderate threshold
    Safe,
    /// Worth a closer look
    Moderate,
    /// Likely contaminated
    High,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Safe => "SAFE",
            RiskStatus::Moderate => "MODERATE",
            RiskStatus::High => "HIGH",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskStatus::Safe => "✅",
            RiskStatus::Moderate => "🟠",
            RiskStatus::High => "🔴",
        }
    }

    /// Get color code for UI
    pub fn color_code(&self) -> &'static str {
        match self {
            RiskStatus::Safe => "#22c55e",
            RiskStatus::Moderate => "#f97316",
            RiskStatus::High => "#ef4444",
        }
    }
}

/// Contaminant elements the rules can predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    Uranium,
    Cesium,
    Radium,
}

impl Element {
    /// Fixed evaluation/reporting order
    pub const ALL: [Element; 3] = [Element::Uranium, Element::Cesium, Element::Radium];

    pub fn name(&self) -> &'static str {
        match self {
            Element::Uranium => "Uranium",
            Element::Cesium => "Cesium",
            Element::Radium => "Radium",
        }
    }
}

/// Sensor fields that may be synthesized when missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorField {
    Ph,
    Hardness,
    Nitrate,
}

impl SensorField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorField::Ph => "ph",
            SensorField::Hardness => "hardness",
            SensorField::Nitrate => "nitrate",
        }
    }
}

/// A single water sample. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub location: String,
    pub ph: f64,
    /// Total dissolved solids (mg/L)
    pub tds: f64,
    /// Hardness (mg/L)
    pub hardness: f64,
    /// Nitrate (mg/L)
    pub nitrate: f64,
    pub timestamp: DateTime<Utc>,
    /// Fields filled in by the synthesizer rather than measured
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synthesized: Vec<SensorField>,
}

impl Reading {
    /// Measured reading stamped with the current time
    pub fn new(location: impl Into<String>, ph: f64, tds: f64, hardness: f64, nitrate: f64) -> Self {
        Self {
            location: location.into(),
            ph,
            tds,
            hardness,
            nitrate,
            timestamp: Utc::now(),
            synthesized: Vec::new(),
        }
    }

    pub fn is_synthesized(&self, field: SensorField) -> bool {
        self.synthesized.contains(&field)
    }
}

/// Deviation of one parameter from its safe band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeviation {
    pub name: String,
    pub value: f64,
    /// Deviation points (0 inside the band, 100 at full scale, uncapped)
    pub deviation: f64,
    pub weight: f64,
    /// deviation * weight
    pub contribution: f64,
}

/// Result of classifying a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Overall score in [0, 100]
    pub risk_score: f64,
    pub status: RiskStatus,
    /// Predicted elements, in fixed rule order, no duplicates
    pub elements: Vec<Element>,
    /// Remediation advice matching `elements`
    pub treatments: Vec<String>,
    /// Per-parameter breakdown
    pub components: Vec<ParameterDeviation>,
}

impl Assessment {
    pub fn has_element(&self, element: Element) -> bool {
        self.elements.contains(&element)
    }

    /// One-line summary for logs and CLI output
    pub fn summary(&self) -> String {
        let elements = if self.elements.is_empty() {
            "none".to_string()
        } else {
            self.elements
                .iter()
                .map(|e| e.name())
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "{} {} | score {:.1} | elements: {}",
            self.status.emoji(),
            self.status.as_str(),
            self.risk_score,
            elements
        )
    }
}

/// A classified reading as kept by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: Uuid,
    pub reading: Reading,
    pub assessment: Assessment,
}

impl ReadingRecord {
    pub fn new(reading: Reading, assessment: Assessment) -> Self {
        Self {
            id: Uuid::new_v4(),
            reading,
            assessment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(RiskStatus::Safe < RiskStatus::Moderate);
        assert!(RiskStatus::Moderate < RiskStatus::High);
    }

    #[test]
    fn test_element_serializes_by_name() {
        let json = serde_json::to_string(&vec![Element::Uranium, Element::Radium]).unwrap();
        assert_eq!(json, r#"["Uranium","Radium"]"#);
    }

    #[test]
    fn test_synthesized_fields_skipped_when_empty() {
        let reading = Reading::new("well-1", 7.0, 100.0, 50.0, 10.0);
        let json = serde_json::to_value(&reading).unwrap();
        assert!(json.get("synthesized").is_none());
        assert_eq!(json["location"], "well-1");
    }

    #[test]
    fn test_summary_lists_elements() {
        let assessment = Assessment {
            risk_score: 42.0,
            status: RiskStatus::Moderate,
            elements: vec![Element::Cesium, Element::Radium],
            treatments: vec![],
            components: vec![],
        };
        let summary = assessment.summary();
        assert!(summary.contains("MODERATE"));
        assert!(summary.contains("Cesium, Radium"));
        assert!(summary.contains("42.0"));
    }
}

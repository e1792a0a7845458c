//! Element prediction rules and treatment lookup
//!
//! Rules are independent and not mutually exclusive: every rule that matches
//! contributes its element. Results come back in `Element::ALL` order.

use crate::models::config::ElementRules;
use crate::models::types::Element;

/// Advice returned when no element is predicted
pub const NO_TREATMENT: &str = "No treatment required";

/// Does `element`'s rule match these readings?
pub fn matches(element: Element, rules: &ElementRules, ph: f64, tds: f64, hardness: f64, nitrate: f64) -> bool {
    match element {
        Element::Uranium => ph < rules.uranium_ph_below || hardness > rules.uranium_hardness_above,
        Element::Cesium => nitrate > rules.cesium_nitrate_above && tds > rules.cesium_tds_above,
        Element::Radium => ph > rules.radium_ph_above && hardness < rules.radium_hardness_below,
    }
}

/// All elements whose rule matches, in fixed order
pub fn predict(rules: &ElementRules, ph: f64, tds: f64, hardness: f64, nitrate: f64) -> Vec<Element> {
    Element::ALL
        .into_iter()
        .filter(|e| matches(*e, rules, ph, tds, hardness, nitrate))
        .collect()
}

/// Static remediation advice per element
pub fn treatment_for(element: Element) -> &'static str {
    match element {
        Element::Uranium => "Reverse osmosis or activated alumina filtration",
        Element::Cesium => "Ion exchange or reverse osmosis",
        Element::Radium => "Lime softening or ion exchange",
    }
}

/// Treatments matching the predicted elements
pub fn treatments(elements: &[Element]) -> Vec<String> {
    if elements.is_empty() {
        return vec![NO_TREATMENT.to_string()];
    }
    elements.iter().map(|e| treatment_for(*e).to_string()).collect()
}

// lib/src/workflow/vitals.rs

use models::errors::FieldError;
use models::medical::Vitals;

const HEART_RATE: (i32, i32) = (20, 250);
const TEMPERATURE_C: (f64, f64) = (30.0, 45.0);
const MAX_WEIGHT_KG: f64 = 500.0;
const MAX_HEIGHT_CM: f64 = 300.0;

/// Plausibility checks on vitals captured at check-in.
pub fn validate_vitals(vitals: &Vitals) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Some(bp) = vitals.blood_pressure.as_deref() {
        if parse_blood_pressure(bp).is_none() {
            errors.push(FieldError::new(
                "vitals.bloodPressure",
                "blood pressure must look like 120/80",
            ));
        }
    }
    if let Some(hr) = vitals.heart_rate {
        if !(HEART_RATE.0..=HEART_RATE.1).contains(&hr) {
            errors.push(FieldError::new(
                "vitals.heartRate",
                format!("heart rate must be between {} and {} bpm", HEART_RATE.0, HEART_RATE.1),
            ));
        }
    }
    if let Some(t) = vitals.temperature {
        if !(TEMPERATURE_C.0..=TEMPERATURE_C.1).contains(&t) {
            errors.push(FieldError::new(
                "vitals.temperature",
                format!(
                    "temperature must be between {} and {} degrees Celsius",
                    TEMPERATURE_C.0, TEMPERATURE_C.1
                ),
            ));
        }
    }
    if let Some(w) = vitals.weight {
        if !(w > 0.0 && w <= MAX_WEIGHT_KG) {
            errors.push(FieldError::new(
                "vitals.weight",
                format!("weight must be positive and at most {} kg", MAX_WEIGHT_KG),
            ));
        }
    }
    if let Some(h) = vitals.height {
        if !(h > 0.0 && h <= MAX_HEIGHT_CM) {
            errors.push(FieldError::new(
                "vitals.height",
                format!("height must be positive and at most {} cm", MAX_HEIGHT_CM),
            ));
        }
    }

    errors
}

/// "systolic/diastolic", systolic above diastolic.
fn parse_blood_pressure(raw: &str) -> Option<(u16, u16)> {
    let (sys, dia) = raw.trim().split_once('/')?;
    let sys: u16 = sys.trim().parse().ok()?;
    let dia: u16 = dia.trim().parse().ok()?;
    ((40..=300).contains(&sys) && (20..=200).contains(&dia) && sys > dia).then_some((sys, dia))
}

/// Fields present in `incoming` replace those already recorded.
pub fn merge_vitals(existing: Option<&Vitals>, incoming: &Vitals) -> Vitals {
    let base = existing.cloned().unwrap_or_default();
    Vitals {
        blood_pressure: incoming.blood_pressure.clone().or(base.blood_pressure),
        heart_rate: incoming.heart_rate.or(base.heart_rate),
        temperature: incoming.temperature.or(base.temperature),
        weight: incoming.weight.or(base.weight),
        height: incoming.height.or(base.height),
    }
}

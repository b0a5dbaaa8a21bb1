/// SSM Kernel v1 — Envelope Definitions
///
/// Envelopes are pure data. They carry one posture observation and
/// its weight, tagged with a logical thread. They contain ZERO update
/// logic.
///
/// Defaults for absent optional fields: a_raw = 0.0, weight = 1.0,
/// thread_id = "main". sequence_number is mandatory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KernelError, KernelResult};

/// Thread id assigned to envelopes that do not declare one.
pub const DEFAULT_THREAD: &str = "main";

/// Default posture for envelopes without `a_raw`.
pub const DEFAULT_A_RAW: f64 = 0.0;

/// Default weight for envelopes without `weight`.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// How a hashed number was written in the source document.
///
/// The chain payload renders an integer literal without a decimal
/// point, so the form has to survive parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberForm {
    Integer,
    #[default]
    Float,
}

/// Source forms of the three hashed numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceForms {
    pub sequence_number: NumberForm,
    pub a_raw: NumberForm,
    pub weight: NumberForm,
}

impl Default for SourceForms {
    fn default() -> Self {
        Self {
            sequence_number: NumberForm::Integer,
            a_raw: NumberForm::Float,
            weight: NumberForm::Float,
        }
    }
}

/// Generator metadata carried alongside an envelope, kept as written.
/// Never read by the kernel, never hashed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Passthrough {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zeta_zero: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quero_shock: Option<Value>,
}

/// One observation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub sequence_number: i64,
    pub a_raw: f64,
    pub weight: f64,
    pub thread_id: String,
    #[serde(flatten)]
    pub meta: Passthrough,
    #[serde(skip)]
    pub forms: SourceForms,
}

impl Envelope {
    /// Build an envelope on the given thread with no passthrough metadata.
    pub fn new(sequence_number: i64, a_raw: f64, weight: f64, thread_id: &str) -> Self {
        Self {
            sequence_number,
            a_raw,
            weight,
            thread_id: thread_id.to_string(),
            meta: Passthrough::default(),
            forms: SourceForms::default(),
        }
    }

    /// Envelope on the default "main" thread.
    pub fn on_main(sequence_number: i64, a_raw: f64, weight: f64) -> Self {
        Self::new(sequence_number, a_raw, weight, DEFAULT_THREAD)
    }

    /// Parse an envelope from a serde_json::Value.
    ///
    /// `index` is the position in the source container and only feeds
    /// error messages. Missing optional fields take their defaults;
    /// missing or non-integral `sequence_number` is an error, as are
    /// non-finite posture/weight values and negative weights.
    pub fn from_value(index: usize, v: &Value) -> KernelResult<Self> {
        let obj = v.as_object().ok_or_else(|| KernelError::InvalidValue {
            index,
            field: "envelope",
            reason: "expected a JSON object".to_string(),
        })?;

        let (sequence_number, sequence_form) = match obj.get("sequence_number") {
            None | Some(Value::Null) => {
                return Err(KernelError::MissingField {
                    index,
                    field: "sequence_number",
                })
            }
            Some(s) => read_sequence(s).ok_or_else(|| KernelError::InvalidValue {
                index,
                field: "sequence_number",
                reason: format!("expected an integral number, got {}", s),
            })?,
        };

        let (a_raw, a_raw_form) = read_number(obj, index, "a_raw", DEFAULT_A_RAW)?;
        let (weight, weight_form) = read_number(obj, index, "weight", DEFAULT_WEIGHT)?;
        if weight < 0.0 {
            return Err(KernelError::InvalidValue {
                index,
                field: "weight",
                reason: format!("weight must be >= 0, got {}", weight),
            });
        }

        let thread_id = match obj.get("thread_id") {
            None | Some(Value::Null) => DEFAULT_THREAD.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(KernelError::InvalidValue {
                    index,
                    field: "thread_id",
                    reason: format!("expected a string, got {}", other),
                })
            }
        };

        let meta = Passthrough {
            band: obj.get("band").cloned(),
            manifest_id: obj.get("manifest_id").cloned(),
            zeta_zero: obj.get("zeta_zero").cloned(),
            quero_shock: obj.get("quero_shock").cloned(),
        };

        Ok(Self {
            sequence_number,
            a_raw,
            weight,
            thread_id,
            meta,
            forms: SourceForms {
                sequence_number: sequence_form,
                a_raw: a_raw_form,
                weight: weight_form,
            },
        })
    }

    /// Convert back to a serde_json::Value (defaults made explicit,
    /// numbers in their source form).
    pub fn to_value(&self) -> Value {
        let sequence_number = match self.forms.sequence_number {
            NumberForm::Integer => Value::from(self.sequence_number),
            NumberForm::Float => Value::from(self.sequence_number as f64),
        };
        let mut v = serde_json::json!({
            "sequence_number": sequence_number,
            "a_raw": number_value(self.a_raw, self.forms.a_raw),
            "weight": number_value(self.weight, self.forms.weight),
            "thread_id": self.thread_id,
        });
        if let (Value::Object(map), Ok(Value::Object(meta))) =
            (&mut v, serde_json::to_value(&self.meta))
        {
            map.extend(meta);
        }
        v
    }
}

/// Largest magnitude at which an f64 still maps exactly onto i64.
const I64_EXACT_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Integral value of `x` if it can be written as an i64 literal.
pub(crate) fn as_exact_i64(x: f64) -> Option<i64> {
    (x.is_finite() && x.fract() == 0.0 && x.abs() < I64_EXACT_LIMIT).then(|| x as i64)
}

fn read_sequence(v: &Value) -> Option<(i64, NumberForm)> {
    if let Some(n) = v.as_i64() {
        return Some((n, NumberForm::Integer));
    }
    if v.is_f64() {
        return v
            .as_f64()
            .and_then(as_exact_i64)
            .map(|n| (n, NumberForm::Float));
    }
    None
}

fn number_value(x: f64, form: NumberForm) -> Value {
    match (form, as_exact_i64(x)) {
        (NumberForm::Integer, Some(n)) => Value::from(n),
        _ => Value::from(x),
    }
}

fn read_number(
    obj: &Map<String, Value>,
    index: usize,
    field: &'static str,
    default: f64,
) -> KernelResult<(f64, NumberForm)> {
    let (x, form) = match obj.get(field) {
        None | Some(Value::Null) => return Ok((default, NumberForm::Float)),
        Some(v) => {
            let x = v.as_f64().ok_or_else(|| KernelError::InvalidValue {
                index,
                field,
                reason: format!("expected a number, got {}", v),
            })?;
            let form = if v.is_i64() || v.is_u64() {
                NumberForm::Integer
            } else {
                NumberForm::Float
            };
            (x, form)
        }
    };
    if !x.is_finite() {
        return Err(KernelError::InvalidValue {
            index,
            field,
            reason: "value must be finite".to_string(),
        });
    }
    Ok((x, form))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let env = Envelope::from_value(0, &json!({"sequence_number": 4})).unwrap();
        assert_eq!(env.sequence_number, 4);
        assert_eq!(env.a_raw, 0.0);
        assert_eq!(env.weight, 1.0);
        assert_eq!(env.thread_id, "main");
        assert_eq!(env.meta, Passthrough::default());
    }

    #[test]
    fn test_missing_sequence_is_error() {
        let err = Envelope::from_value(3, &json!({"a_raw": 0.2})).unwrap_err();
        assert_eq!(
            err,
            KernelError::MissingField {
                index: 3,
                field: "sequence_number"
            }
        );
    }

    #[test]
    fn test_passthrough_metadata_carried() {
        let env = Envelope::from_value(
            0,
            &json!({
                "sequence_number": 1,
                "a_raw": 0.32,
                "weight": 1.4,
                "thread_id": "chat",
                "band": "NEUTRAL",
                "manifest_id": "T1",
                "zeta_zero": true
            }),
        )
        .unwrap();
        assert_eq!(env.thread_id, "chat");
        assert_eq!(env.meta.band, Some(json!("NEUTRAL")));
        assert_eq!(env.meta.manifest_id, Some(json!("T1")));
        assert_eq!(env.meta.zeta_zero, Some(json!(true)));
        assert_eq!(env.meta.quero_shock, None);
    }

    #[test]
    fn test_integer_posture_accepted() {
        let env = Envelope::from_value(0, &json!({"sequence_number": 1, "a_raw": 0, "weight": 0}))
            .unwrap();
        assert_eq!(env.a_raw, 0.0);
        assert_eq!(env.weight, 0.0);
        assert_eq!(env.forms.a_raw, NumberForm::Integer);
        assert_eq!(env.forms.weight, NumberForm::Integer);
    }

    #[test]
    fn test_integral_float_sequence_accepted() {
        let env = Envelope::from_value(0, &json!({"sequence_number": 7.0})).unwrap();
        assert_eq!(env.sequence_number, 7);
        assert_eq!(env.forms.sequence_number, NumberForm::Float);

        let err = Envelope::from_value(2, &json!({"sequence_number": 7.5})).unwrap_err();
        assert!(matches!(
            err,
            KernelError::InvalidValue { index: 2, field: "sequence_number", .. }
        ));
        assert!(Envelope::from_value(0, &json!({"sequence_number": "7"})).is_err());
    }

    #[test]
    fn test_passthrough_kept_whatever_its_type() {
        let env = Envelope::from_value(
            0,
            &json!({"sequence_number": 1, "band": 3, "manifest_id": {"rev": 2}, "quero_shock": "yes"}),
        )
        .unwrap();
        assert_eq!(env.meta.band, Some(json!(3)));
        assert_eq!(env.meta.manifest_id, Some(json!({"rev": 2})));
        assert_eq!(env.meta.quero_shock, Some(json!("yes")));
        assert_eq!(env.to_value()["band"], json!(3));
    }

    #[test]
    fn test_to_value_keeps_source_forms() {
        let source = json!({"sequence_number": 3.0, "a_raw": 0, "weight": 2, "thread_id": "chat"});
        let env = Envelope::from_value(0, &source).unwrap();
        let v = env.to_value();
        assert!(v["sequence_number"].is_f64());
        assert!(v["a_raw"].is_i64());
        assert!(v["weight"].is_i64());
        assert_eq!(Envelope::from_value(0, &v).unwrap(), env);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = Envelope::from_value(0, &json!({"sequence_number": 1, "weight": -1.0}))
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidValue { field: "weight", .. }));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Envelope::from_value(0, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_to_value_round_trip() {
        let mut env = Envelope::on_main(9, -0.25, 2.0);
        env.meta.band = Some(json!("NEUTRAL"));
        let back = Envelope::from_value(0, &env.to_value()).unwrap();
        assert_eq!(back, env);
    }
}

//! Input validation for CFP sets, parts structures and trade request text.
//!
//! Validators never stop at the first problem: every violation is collected and returned as a
//! single [`Error::Validation`], so the caller sees one rejection listing all of them.

use crate::{
    errors::{Error, Result},
    models::{CfpModel, CfpType, DqrValue, PartsDraft, PartsStructureDraft, Processing},
};
use std::collections::HashSet;
use uuid::Uuid;

/// Upper bound of every CFP numeric field.
pub const CFP_VALUE_MAX: f64 = 99_999.999_99;

/// Fractional digits allowed in a CFP numeric field.
pub const CFP_FRACTION_DIGITS: usize = 5;

/// Maximum characters of a part name.
pub const PARTS_NAME_MAX_LEN: usize = 50;

/// Collects violation messages.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    /// An empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Records a violation.
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Records `message` when `ok` is false.
    pub fn check(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            self.0.push(message());
        }
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok` when nothing was recorded, otherwise all violations joined in one error.
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { violations: self.0 })
        }
    }
}

/// Checks a CFP numeric value: within `0.00000..=99999.99999` with at most five decimals.
pub fn check_cfp_number(field: &str, value: f64, violations: &mut Violations) {
    if !value.is_finite() || !(0.0..=CFP_VALUE_MAX).contains(&value) {
        violations.push(format!(
            "{field} must be within 0.00000 and 99999.99999, got {value}"
        ));
        return;
    }

    // Display of f64 is the shortest literal that round-trips, never in exponent form.
    let text = value.to_string();
    if let Some((_, fraction)) = text.split_once('.') {
        if fraction.len() > CFP_FRACTION_DIGITS {
            violations.push(format!(
                "{field} must have at most {CFP_FRACTION_DIGITS} decimal places, got {value}"
            ));
        }
    }
}

fn check_dqr_value(prefix: &str, dqr: &DqrValue, violations: &mut Violations) {
    for (name, value) in dqr.components() {
        if let Some(value) = value {
            check_cfp_number(&format!("{prefix}.dqrValue.{name}"), value, violations);
        }
    }
}

/// Validates a four-row CFP write.
///
/// Rows must be exactly one of each input type, share trace id, cfp id (all absent or all
/// equal) and declared unit, carry in-range values with a DQR type matching their CFP type, and
/// rows of the same processing stage must share one DQR triple. When a stage's DQR has a positive
/// component, the stage's emissions must add up to a positive value.
pub fn validate_cfp_set(rows: &[CfpModel]) -> Result<()> {
    let mut violations = Violations::new();

    violations.check(rows.len() == 4, || {
        format!("CFP set must contain exactly 4 rows, got {}", rows.len())
    });

    for cfp_type in CfpType::INPUTS {
        let count = rows.iter().filter(|row| row.cfp_type == cfp_type).count();
        violations.check(count == 1, || {
            format!("cfpType {cfp_type} must appear exactly once, got {count}")
        });
    }
    for row in rows.iter().filter(|row| !row.cfp_type.is_input()) {
        violations.push(format!("cfpType {} cannot be registered", row.cfp_type));
    }

    let Some(first) = rows.first() else {
        return violations.into_result();
    };

    violations.check(rows.iter().all(|row| row.trace_id == first.trace_id), || {
        "traceId must be identical across rows".to_string()
    });
    violations.check(rows.iter().all(|row| row.cfp_id == first.cfp_id), || {
        "cfpId must be absent on every row or identical across rows".to_string()
    });
    violations.check(
        rows.iter()
            .all(|row| row.ghg_declared_unit == first.ghg_declared_unit),
        || "ghgDeclaredUnit must be identical across rows".to_string(),
    );

    for row in rows {
        let prefix = row.cfp_type.as_str();
        violations.check(row.ghg_declared_unit.is_some(), || {
            format!("{prefix}.ghgDeclaredUnit is required")
        });
        if let Some(emission) = row.ghg_emission {
            check_cfp_number(&format!("{prefix}.ghgEmission"), emission, &mut violations);
        }
        check_dqr_value(prefix, &row.dqr_value, &mut violations);
        violations.check(row.dqr_type == row.cfp_type.dqr_type(), || {
            format!(
                "{prefix}.dqrType must be {}, got {}",
                row.cfp_type.dqr_type(),
                row.dqr_type
            )
        });
    }

    for processing in [Processing::Pre, Processing::Main] {
        let stage: Vec<&CfpModel> = rows
            .iter()
            .filter(|row| row.cfp_type.is_input() && row.cfp_type.processing() == processing)
            .collect();
        let label = match processing {
            Processing::Pre => "pre-processing",
            Processing::Main => "main-processing",
        };

        if let Some(head) = stage.first() {
            violations.check(
                stage.iter().all(|row| row.dqr_value == head.dqr_value),
                || format!("{label} rows must share the same dqrValue"),
            );

            let emission: f64 = stage.iter().filter_map(|row| row.ghg_emission).sum();
            violations.check(!head.dqr_value.has_positive() || emission > 0.0, || {
                format!("{label} ghgEmission must be positive when its dqrValue is positive")
            });
        }
    }

    violations.into_result()
}

/// Validates an optional free-text field against a character limit.
pub fn validate_text(field: &str, text: Option<&str>, max_len: usize) -> Result<()> {
    let mut violations = Violations::new();
    if let Some(text) = text {
        let len = text.chars().count();
        violations.check(len <= max_len, || {
            format!("{field} must be at most {max_len} characters, got {len}")
        });
    }
    violations.into_result()
}

fn check_parts_draft(
    label: &str,
    operator_id: Uuid,
    draft: &PartsDraft,
    violations: &mut Violations,
) {
    violations.check(draft.operator_id == operator_id, || {
        format!("{label}.operatorId must be the caller's operator")
    });
    violations.check(draft.plant_id.is_some(), || {
        format!("{label}.plantId is required")
    });

    let name_len = draft.parts_name.chars().count();
    violations.check(
        !draft.parts_name.trim().is_empty() && name_len <= PARTS_NAME_MAX_LEN,
        || format!("{label}.partsName must be 1 to {PARTS_NAME_MAX_LEN} characters"),
    );
    if let Some(support) = &draft.support_parts_name {
        violations.check(support.chars().count() <= PARTS_NAME_MAX_LEN, || {
            format!("{label}.supportPartsName must be at most {PARTS_NAME_MAX_LEN} characters")
        });
    }
    if let Some(amount) = draft.amount_required {
        check_cfp_number(&format!("{label}.amountRequired"), amount, violations);
    }
}

/// Validates a parts structure write for the calling operator.
pub fn validate_parts_structure(operator_id: Uuid, draft: &PartsStructureDraft) -> Result<()> {
    let mut violations = Violations::new();

    match &draft.parent {
        Some(parent) => check_parts_draft("parentPartsModel", operator_id, parent, &mut violations),
        None => violations.push("parentPartsModel is required"),
    }

    let mut seen = HashSet::new();
    if let Some(trace_id) = draft.parent.as_ref().and_then(|parent| parent.trace_id) {
        seen.insert(trace_id);
    }
    for (index, child) in draft.children.iter().enumerate() {
        let label = format!("childrenPartsModel[{index}]");
        check_parts_draft(&label, operator_id, child, &mut violations);
        if let Some(trace_id) = child.trace_id {
            violations.check(seen.insert(trace_id), || {
                format!("{label}.traceId {trace_id} appears more than once")
            });
        }
    }

    violations.into_result()
}

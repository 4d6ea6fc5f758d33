//! NON_SARGABLE_PREDICATE, SCALAR_FUNCTION_IN_PREDICATE, IMPLICIT_CONVERSION

use super::{Finding, RuleContext};
use crate::profile::{Clause, NonSargableReason};

pub(super) fn non_sargable_predicate(ctx: &RuleContext) -> Vec<Finding> {
    let expensive = ctx
        .runtime
        .is_some_and(|stats| stats.logical_reads > ctx.config.logical_reads_threshold);

    ctx.profile
        .non_sargable
        .iter()
        .map(|use_| {
            let column = use_
                .column
                .as_ref()
                .map(|key| key.to_string())
                .unwrap_or_else(|| use_.column_text.clone());
            let fix = match &use_.reason {
                NonSargableReason::FunctionWrap { function } => Some(format!(
                    "Move {} to the other side of the comparison so that {} stands alone",
                    function, use_.column_text
                )),
                NonSargableReason::Arithmetic { .. } => Some(format!(
                    "Apply the arithmetic to the compared value instead of {}",
                    use_.column_text
                )),
                NonSargableReason::TypeMismatch { column_type, .. } => Some(format!(
                    "Compare {} with a {} value",
                    use_.column_text, column_type
                )),
                NonSargableReason::LeadingWildcard => None,
            };
            let mut finding = Finding::new(use_.span)
                .arg("column", column)
                .arg("reason", use_.reason.to_string());
            finding.fix = fix;
            finding.escalate = expensive;
            finding
        })
        .collect()
}

pub(super) fn scalar_function(ctx: &RuleContext) -> Vec<Finding> {
    ctx.profile
        .udf_calls
        .iter()
        .filter(|call| matches!(call.clause, Clause::Where | Clause::Select | Clause::Join))
        .map(|call| {
            Finding::new(call.span)
                .arg("function", call.name.clone())
                .arg("clause", call.clause.name())
        })
        .collect()
}

pub(super) fn implicit_conversion(ctx: &RuleContext) -> Vec<Finding> {
    ctx.profile
        .implicit_conversions
        .iter()
        .map(|conversion| {
            Finding::new(conversion.span)
                .arg("expression", conversion.expression.clone())
                .arg("left", conversion.left.name())
                .arg("right", conversion.right.name())
        })
        .collect()
}

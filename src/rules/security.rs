//! DYNAMIC_SQL

use super::{statements_of, Finding, RuleContext};
use crate::parser::{Exec, ExecTarget, Expr, InsertSource, Statement};
use crate::profile::VariableEnv;

const FIX: &str = "Pass values as parameters to sp_executesql instead of concatenating them into the statement text";

fn check_exec(variables: &VariableEnv, exec: &Exec) -> Option<Finding> {
    let target = match &exec.target {
        ExecTarget::Dynamic(expr) => match expr.unnested() {
            Expr::Literal(_) => return None,
            // EXEC(@sql) where @sql was never built by concatenation
            Expr::Variable(name) if !variables.is_concatenated(name) => return None,
            _ => "EXEC(...)".to_string(),
        },
        ExecTarget::Procedure { name, arguments } => {
            if !name.name.eq_ignore_ascii_case("sp_executesql") {
                return None;
            }
            match arguments.first() {
                Some(statement) if variables.is_tainted(statement) => "sp_executesql".to_string(),
                _ => return None,
            }
        }
    };
    Some(Finding::new(exec.span).arg("target", target).fix(FIX))
}

pub(super) fn dynamic_sql(ctx: &RuleContext) -> Vec<Finding> {
    let mut variables = match ctx.statement {
        Statement::ProcedureDef(def) => VariableEnv::for_routine(def),
        _ => ctx.variables.clone(),
    };

    let mut findings = Vec::new();
    for statement in statements_of(ctx.statement) {
        match statement {
            Statement::Exec(exec) => findings.extend(check_exec(&variables, exec)),
            Statement::Insert(insert) => {
                if let InsertSource::Exec(exec) = &insert.source {
                    findings.extend(check_exec(&variables, exec));
                }
            }
            other => variables.apply(other),
        }
    }
    findings
}

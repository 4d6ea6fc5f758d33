//! Rule evaluation and engine-level diagnostics

use super::{render_message, RuleContext, RULES};
use crate::catalog::Catalog;
use crate::config::RuleConfig;
use crate::diagnostic::{codes, Diagnostic, Severity};
use crate::error::ParseError;
use crate::parser::{SourceSpan, Statement};
use crate::profile::{QueryProfile, ReferenceKind, VariableEnv};
use crate::runtime::RuntimeStats;

/// Run every enabled rule once against a statement
pub fn evaluate(
    statement: &Statement,
    span: SourceSpan,
    profile: &QueryProfile,
    variables: &VariableEnv,
    catalog: &Catalog,
    runtime: Option<&RuntimeStats>,
    config: &RuleConfig,
) -> Vec<Diagnostic> {
    let ctx = RuleContext {
        statement,
        span,
        profile,
        variables,
        catalog,
        runtime,
        config,
    };

    let mut diagnostics = Vec::new();
    for rule in RULES.iter().filter(|r| config.is_enabled(r.id)) {
        let severity = config.severity(rule.id, rule.default_severity);
        for finding in (rule.check)(&ctx) {
            let severity = if finding.escalate {
                Severity::Error
            } else {
                severity
            };
            let mut diagnostic = Diagnostic::new(
                rule.id,
                severity,
                finding.span,
                render_message(rule.message, &finding.args),
            )
            .with_category(rule.category);
            if let Some(fix) = finding.fix {
                diagnostic = diagnostic.with_fix(fix);
            }
            diagnostics.push(diagnostic);
        }
    }
    diagnostics
}

fn engine_diagnostic(
    code: &str,
    default: Severity,
    span: SourceSpan,
    message: String,
    config: &RuleConfig,
) -> Option<Diagnostic> {
    config
        .is_enabled(code)
        .then(|| Diagnostic::new(code, config.severity(code, default), span, message))
}

/// PARSE_ERROR for a statement that failed to parse
pub fn parse_error_diagnostic(err: &ParseError, span: SourceSpan, config: &RuleConfig) -> Option<Diagnostic> {
    let at = SourceSpan::new(err.position, err.position);
    let span = if err.position == Default::default() { span } else { at };
    engine_diagnostic(
        codes::PARSE_ERROR,
        Severity::Error,
        span,
        err.message.clone(),
        config,
    )
}

/// Diagnostics raised by the engine rather than a rule: unsupported
/// constructs, parse errors inside routine bodies and unresolved references
pub fn engine_diagnostics(
    statement: &Statement,
    span: SourceSpan,
    profile: &QueryProfile,
    config: &RuleConfig,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    let mut unsupported = |construct: &str, at: SourceSpan| {
        out.extend(engine_diagnostic(
            codes::UNSUPPORTED_CONSTRUCT,
            Severity::Info,
            at,
            format!("{} is not analyzed", construct),
            config,
        ));
    };
    match statement {
        Statement::Unsupported { construct } => unsupported(construct, span),
        Statement::ProcedureDef(def) => {
            for node in def.statements() {
                if let Statement::Unsupported { construct } = &node.statement {
                    unsupported(construct, node.span);
                }
            }
        }
        _ => {}
    }

    if let Statement::ProcedureDef(def) = statement {
        for err in def.invalid_items() {
            out.extend(parse_error_diagnostic(err, span, config));
        }
    }

    for reference in &profile.unresolved {
        let kind = match reference.kind {
            ReferenceKind::Table => "table",
            ReferenceKind::Column => "column",
        };
        out.extend(engine_diagnostic(
            codes::UNRESOLVED_REFERENCE,
            Severity::Warning,
            reference.span,
            format!("Unresolved {} reference {}", kind, reference.name),
            config,
        ));
    }

    out
}

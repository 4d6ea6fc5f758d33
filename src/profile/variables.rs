//! Variable state carried across the statements of a batch or routine body

use std::collections::{HashMap, HashSet};

use super::typing::{family_of_type, TypeFamily};
use crate::parser::{BinaryOperator, Expr, LiteralValueKind, ProcedureDef, Statement};

/// Declared variables and which of them hold a concatenated string.
///
/// Top-level statements see what earlier statements of the same batch
/// declared; a routine body starts from its parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableEnv {
    /// Lower-cased name to declared type text
    types: HashMap<String, String>,
    concatenated: HashSet<String>,
}

impl VariableEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment at the start of a routine body
    pub fn for_routine(def: &ProcedureDef) -> Self {
        let mut env = Self::new();
        for param in &def.parameters {
            env.declare(&param.name, &param.data_type);
        }
        env
    }

    pub fn declare(&mut self, name: &str, data_type: &str) {
        let name = name.to_lowercase();
        self.concatenated.remove(&name);
        self.types.insert(name, data_type.to_string());
    }

    pub fn declared_type(&self, name: &str) -> Option<&str> {
        self.types.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn family(&self, name: &str) -> Option<TypeFamily> {
        self.declared_type(name).and_then(family_of_type)
    }

    /// Record an assignment; a concatenated value taints the variable
    pub fn assign(&mut self, name: &str, value: &Expr) {
        let name = name.to_lowercase();
        if self.is_concatenation(value) {
            self.concatenated.insert(name);
        } else {
            self.concatenated.remove(&name);
        }
    }

    /// Fold the effect of one statement: DECLARE and SET @v
    pub fn apply(&mut self, statement: &Statement) {
        match statement {
            Statement::Declare(decls) => {
                for decl in decls {
                    self.declare(&decl.name, &decl.data_type);
                    if let Some(default) = &decl.default {
                        self.assign(&decl.name, default);
                    }
                }
            }
            Statement::SetVariable { variable, value } => self.assign(variable, value),
            _ => {}
        }
    }

    pub fn is_concatenated(&self, name: &str) -> bool {
        self.concatenated.contains(&name.to_lowercase())
    }

    fn is_string(&self, expr: &Expr) -> bool {
        match expr.unnested() {
            Expr::Literal(lit) => {
                matches!(lit.kind, LiteralValueKind::String | LiteralValueKind::NationalString)
            }
            Expr::Variable(name) => {
                self.is_concatenated(name)
                    || matches!(
                        self.family(name),
                        Some(TypeFamily::String | TypeFamily::UnicodeString)
                    )
            }
            Expr::Cast { data_type, .. } => matches!(
                family_of_type(data_type),
                Some(TypeFamily::String | TypeFamily::UnicodeString)
            ),
            Expr::Binary {
                op: BinaryOperator::Plus,
                left,
                right,
            } => self.is_string(left) || self.is_string(right),
            _ => false,
        }
    }

    /// A `+` with at least one string operand anywhere in the expression
    pub fn is_concatenation(&self, expr: &Expr) -> bool {
        let mut found = false;
        expr.walk(&mut |e| {
            if let Expr::Binary {
                op: BinaryOperator::Plus,
                left,
                right,
            } = e
            {
                found |= self.is_string(left) || self.is_string(right);
            }
        });
        found
    }

    /// A concatenation, or a variable that was assigned one
    pub fn is_tainted(&self, expr: &Expr) -> bool {
        match expr.unnested() {
            Expr::Variable(name) => self.is_concatenated(name),
            other => self.is_concatenation(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{tokenize, StatementParser};

    fn parse(sql: &str) -> Statement {
        StatementParser::new(tokenize(sql, 1).unwrap())
            .parse_complete()
            .unwrap()
    }

    #[test]
    fn test_declare_and_set_carry_taint() {
        let mut env = VariableEnv::new();
        env.apply(&parse("DECLARE @sql NVARCHAR(MAX) = N'SELECT * FROM t WHERE a = ' + @in"));
        assert!(env.is_concatenated("@SQL"));
        assert_eq!(env.family("@sql"), Some(TypeFamily::UnicodeString));

        env.apply(&parse("SET @sql = N'SELECT 1'"));
        assert!(!env.is_concatenated("@sql"));
    }

    #[test]
    fn test_numeric_addition_is_not_concatenation() {
        let mut env = VariableEnv::new();
        env.apply(&parse("DECLARE @i INT = 0"));
        env.apply(&parse("SET @i = @i + 1"));
        assert!(!env.is_concatenated("@i"));
    }
}

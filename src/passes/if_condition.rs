use gomorph_syntax::ast::{Expr, UnaryOp};
use gomorph_syntax::{walk_exprs, Flow, Slot};

use super::fields::{FieldResolver, Resolved};
use crate::astutil::{bitwise_check, bitwise_check_unset, PACKED_FIELD};
use crate::context::{Context, SourceUnit};
use crate::error::Result;
use crate::pass::Pass;

/// `if x.F` becomes `if (x.flags & FLAG) != 0`; `if !x.F` becomes
/// `if (x.flags & FLAG) == 0`.
///
/// Only conditions that are exactly one (possibly negated) selector are
/// handled here; anything larger is left to the read pass.
#[derive(Debug, Default)]
pub struct IfConditionToBitwise;

impl IfConditionToBitwise {
    pub const NAME: &'static str = "IfConditionToBitwise";

    pub fn new() -> Self {
        Self
    }
}

impl Pass for IfConditionToBitwise {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn alias(&self) -> &'static str {
        "if-condition"
    }

    fn priority(&self) -> i32 {
        210
    }

    fn description(&self) -> &'static str {
        "if conditions on packed bool fields become bit tests"
    }

    fn apply(&mut self, unit: &mut SourceUnit, ctx: &mut Context) -> Result<bool> {
        let resolver = FieldResolver::new(unit, ctx);
        if resolver.is_idle() {
            return Ok(false);
        }
        let info = &unit.info;
        let path = unit.path.as_path();
        let mut changed = false;

        walk_exprs(&mut unit.ast, |ast, c| {
            if c.slot != Slot::IfCond {
                return Flow::Continue;
            }
            let (selector, negated) = match c.expr(ast) {
                Expr::Selector { .. } => (c.node, false),
                Expr::Unary {
                    op: UnaryOp::Not,
                    expr,
                } if matches!(ast.arena.exprs[expr], Expr::Selector { .. }) => (expr, true),
                _ => return Flow::Continue,
            };
            match resolver.resolve(ast, info, ctx, selector) {
                Resolved::Other => Flow::Continue,
                Resolved::Skip(reason) => {
                    ctx.log_visit(Self::NAME, path);
                    ctx.log_skip(Self::NAME, path, reason);
                    Flow::Continue
                }
                Resolved::Flag(access) => {
                    ctx.log_visit(Self::NAME, path);
                    let new = if negated {
                        bitwise_check_unset(ast, access.receiver, PACKED_FIELD, &access.flag)
                    } else {
                        bitwise_check(ast, access.receiver, PACKED_FIELD, &access.flag)
                    };
                    ctx.log_change(Self::NAME, path);
                    changed = true;
                    c.replace(ast, new);
                    Flow::Continue
                }
            }
        });
        Ok(changed)
    }
}

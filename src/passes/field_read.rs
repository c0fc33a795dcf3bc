use std::collections::HashSet;

use gomorph_syntax::ast::{Expr, UnaryOp};
use gomorph_syntax::{walk_exprs, Flow, Slot};

use super::fields::{FieldResolver, Resolved};
use crate::astutil::{bitwise_check, PACKED_FIELD};
use crate::context::{Context, SourceUnit};
use crate::error::Result;
use crate::events::SkipReason;
use crate::pass::Pass;

/// Rewrites reads of packed bool fields: `x.F` becomes
/// `(x.flags & FLAG) != 0`.
///
/// Assignment targets belong to [`FieldWriteToBitwise`](super::FieldWriteToBitwise)
/// and `if x.F` / `if !x.F` to [`IfConditionToBitwise`](super::IfConditionToBitwise).
#[derive(Debug, Default)]
pub struct FieldReadToBitwise;

impl FieldReadToBitwise {
    pub const NAME: &'static str = "FieldReadToBitwise";

    pub fn new() -> Self {
        Self
    }
}

impl Pass for FieldReadToBitwise {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn alias(&self) -> &'static str {
        "field-read"
    }

    fn priority(&self) -> i32 {
        200
    }

    fn description(&self) -> &'static str {
        "reads of packed bool fields become bit tests"
    }

    fn apply(&mut self, unit: &mut SourceUnit, ctx: &mut Context) -> Result<bool> {
        let resolver = FieldResolver::new(unit, ctx);
        if resolver.is_idle() {
            return Ok(false);
        }
        let info = &unit.info;
        let path = unit.path.as_path();
        let mut changed = false;
        // operands of `if !x.F`, left to the if-condition pass
        let mut negated_conds = HashSet::new();

        walk_exprs(&mut unit.ast, |ast, c| {
            let expr = c.expr(ast);
            if c.slot == Slot::IfCond {
                if let Expr::Unary {
                    op: UnaryOp::Not,
                    expr: inner,
                } = expr
                {
                    negated_conds.insert(inner);
                }
            }
            if !matches!(expr, Expr::Selector { .. }) {
                return Flow::Continue;
            }
            let writes = matches!(c.slot, Slot::AssignLhs | Slot::IncDec | Slot::RangeLhs);
            let exact_cond = c.slot == Slot::IfCond || negated_conds.contains(&c.node);
            if writes || exact_cond {
                return Flow::Continue;
            }

            match resolver.resolve(ast, info, ctx, c.node) {
                Resolved::Other => Flow::Continue,
                Resolved::Skip(reason) => {
                    ctx.log_visit(Self::NAME, path);
                    ctx.log_skip(Self::NAME, path, reason);
                    Flow::Continue
                }
                Resolved::Flag(_) if c.slot == Slot::Unary(UnaryOp::Addr) => {
                    ctx.log_visit(Self::NAME, path);
                    ctx.log_skip(Self::NAME, path, SkipReason::AddressTaken);
                    Flow::Continue
                }
                Resolved::Flag(access) => {
                    ctx.log_visit(Self::NAME, path);
                    let new = bitwise_check(ast, access.receiver, PACKED_FIELD, &access.flag);
                    ctx.log_change(Self::NAME, path);
                    changed = true;
                    c.replace(ast, new);
                    // descend: the receiver may hold further reads, `a[b.F].G`
                    Flow::Continue
                }
            }
        });
        Ok(changed)
    }
}

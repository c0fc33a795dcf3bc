use gomorph_syntax::ast::{AssignOp, AstArena, SimpleStmt, SimpleStmtId};
use gomorph_syntax::walk::{Visitor, Walk};

use super::fields::{FieldResolver, Resolved};
use crate::astutil::{bool_literal, clear_flag, set_flag, PACKED_FIELD};
use crate::context::{Context, SourceUnit};
use crate::error::Result;
use crate::events::SkipReason;
use crate::pass::Pass;

/// `x.F = true` becomes `x.flags |= FLAG`, `x.F = false` becomes
/// `x.flags &^= FLAG`.
///
/// Other right-hand sides are reported as `non-literal-rhs` and left alone.
#[derive(Debug, Default)]
pub struct FieldWriteToBitwise;

impl FieldWriteToBitwise {
    pub const NAME: &'static str = "FieldWriteToBitwise";

    pub fn new() -> Self {
        Self
    }
}

#[derive(Default)]
struct Assignments {
    found: Vec<SimpleStmtId>,
}

impl<'ast> Visitor<'ast> for Assignments {
    fn visit_simple_stmt(&mut self, a: &'ast AstArena, id: SimpleStmtId) {
        if let SimpleStmt::Assign {
            op: AssignOp::Assign,
            ..
        } = a.simple_stmts[id]
        {
            self.found.push(id);
        }
        a.simple_stmts[id].walk(a, self);
    }
}

impl Pass for FieldWriteToBitwise {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn alias(&self) -> &'static str {
        "field-write"
    }

    fn priority(&self) -> i32 {
        220
    }

    fn description(&self) -> &'static str {
        "literal assignments to packed bool fields become bit set/clear"
    }

    fn apply(&mut self, unit: &mut SourceUnit, ctx: &mut Context) -> Result<bool> {
        let resolver = FieldResolver::new(unit, ctx);
        if resolver.is_idle() {
            return Ok(false);
        }
        let mut assigns = Assignments::default();
        unit.ast.file.walk(&unit.ast.arena, &mut assigns);

        let mut changed = false;
        for id in assigns.found {
            let SimpleStmt::Assign { lhs, rhs, .. } = unit.ast.arena.simple_stmts[id] else {
                continue;
            };
            let lhs = unit.ast.arena.exprs_list(lhs).to_vec();
            let rhs = unit.ast.arena.exprs_list(rhs).to_vec();

            // tuple assignments are never rewritten, but still reported
            let single = lhs.len() == 1 && rhs.len() == 1;
            let mut hit = None;
            for &target in &lhs {
                match resolver.resolve(&unit.ast, &unit.info, ctx, target) {
                    Resolved::Other => {}
                    Resolved::Skip(reason) => {
                        ctx.log_visit(Self::NAME, &unit.path);
                        ctx.log_skip(Self::NAME, &unit.path, reason);
                    }
                    Resolved::Flag(access) => {
                        ctx.log_visit(Self::NAME, &unit.path);
                        hit = Some(access);
                    }
                }
            }
            let Some(access) = hit else { continue };
            let value = if single {
                bool_literal(&unit.ast, &unit.info, rhs[0])
            } else {
                None
            };
            let new = match value {
                Some(true) => set_flag(&mut unit.ast, access.receiver, PACKED_FIELD, &access.flag),
                Some(false) => {
                    clear_flag(&mut unit.ast, access.receiver, PACKED_FIELD, &access.flag)
                }
                None => {
                    tracing::debug!(path = %unit.path.display(), "assignment from a non-literal left as is");
                    ctx.log_skip(Self::NAME, &unit.path, SkipReason::NonLiteralRhs);
                    continue;
                }
            };
            unit.ast.arena.simple_stmts.replace(id, new);
            ctx.log_change(Self::NAME, &unit.path);
            changed = true;
        }
        Ok(changed)
    }
}

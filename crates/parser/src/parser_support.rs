//! Helpers shared by the parser.

use crate::ast::{self, IdentName, ListRef, Span};

/// One entry of a parenthesized parameter list before grouping.
///
/// `a, b int` arrives as `[a] [b int]`; only after the whole list is read do we
/// know whether bare identifiers are names or types.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub names: Vec<IdentName>,
    pub variadic: bool,
    pub typ: Option<ast::TypeId>,
    pub span: Span,
}

/// Groups parsed parameters into fields.
///
/// When some entry has both a name and a type, leading bare names attach to the
/// next typed entry (`a, b int`). Otherwise every entry is a type, in source
/// order (`(int, error, []byte)`).
pub fn resolve_param_list(arena: &mut ast::AstArena, params: Vec<ParamDecl>) -> Vec<ast::FieldId> {
    let named = params
        .iter()
        .any(|p| !p.names.is_empty() && p.typ.is_some());
    if !named {
        return unnamed_param_list(arena, params);
    }

    let mut out = Vec::new();
    let mut pending: Vec<IdentName> = Vec::new();
    let mut pending_start: Option<u32> = None;

    for param in params {
        match param.typ {
            Some(typ) => {
                let mut names = std::mem::take(&mut pending);
                names.extend(param.names);
                let names = arena.list_ident_names(names);
                let span = Span {
                    start: pending_start.take().unwrap_or(param.span.start),
                    end: param.span.end,
                };
                let field = ast::Field {
                    names,
                    variadic: param.variadic,
                    typ,
                    tag: None,
                    embedded: false,
                };
                out.push(arena.fields.alloc(field, span));
            }
            None => {
                if pending.is_empty() {
                    pending_start = Some(param.span.start);
                }
                pending.extend(param.names);
            }
        }
    }

    for name in pending {
        let typ = named_type_from_ident(arena, name);
        let field = ast::Field {
            names: ListRef::EMPTY,
            variadic: false,
            typ,
            tag: None,
            embedded: false,
        };
        out.push(arena.fields.alloc(field, name.pos));
    }

    out
}

fn unnamed_param_list(arena: &mut ast::AstArena, params: Vec<ParamDecl>) -> Vec<ast::FieldId> {
    let mut out = Vec::new();
    for param in params {
        match param.typ {
            Some(typ) => {
                let field = ast::Field {
                    names: ListRef::EMPTY,
                    variadic: param.variadic,
                    typ,
                    tag: None,
                    embedded: false,
                };
                out.push(arena.fields.alloc(field, param.span));
            }
            None => {
                for name in param.names {
                    let typ = named_type_from_ident(arena, name);
                    let field = ast::Field {
                        names: ListRef::EMPTY,
                        variadic: false,
                        typ,
                        tag: None,
                        embedded: false,
                    };
                    out.push(arena.fields.alloc(field, name.pos));
                }
            }
        }
    }
    out
}

pub fn named_type_from_ident(arena: &mut ast::AstArena, name: IdentName) -> ast::TypeId {
    arena.types.alloc(
        ast::Type::Named {
            pkg: None,
            name,
            args: ListRef::EMPTY,
        },
        name.pos,
    )
}

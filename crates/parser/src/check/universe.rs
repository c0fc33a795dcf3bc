//! Predeclared identifiers.

use std::sync::Arc;

use super::types::{BasicKind, ConstValue, MethodTy, ObjKind, Ty};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
}

/// Universe entry for `name`.
pub(crate) enum Predeclared {
    Type(Ty),
    Const(Ty, ConstValue),
    Nil,
    Builtin(Builtin),
}

impl Predeclared {
    pub(crate) fn kind(&self) -> ObjKind {
        match self {
            Predeclared::Type(_) => ObjKind::TypeName,
            Predeclared::Const(..) => ObjKind::Const,
            Predeclared::Nil => ObjKind::Nil,
            Predeclared::Builtin(_) => ObjKind::Builtin,
        }
    }
}

pub(crate) fn lookup(name: &str) -> Option<Predeclared> {
    use BasicKind::*;
    let basic = |k| Some(Predeclared::Type(Ty::Basic(k)));
    match name {
        "bool" => basic(Bool),
        "int" => basic(Int),
        "int8" => basic(Int8),
        "int16" => basic(Int16),
        "int32" | "rune" => basic(Int32),
        "int64" => basic(Int64),
        "uint" => basic(Uint),
        "uint8" | "byte" => basic(Uint8),
        "uint16" => basic(Uint16),
        "uint32" => basic(Uint32),
        "uint64" => basic(Uint64),
        "uintptr" => basic(Uintptr),
        "float32" => basic(Float32),
        "float64" => basic(Float64),
        "complex64" => basic(Complex64),
        "complex128" => basic(Complex128),
        "string" => basic(String),
        "error" => Some(Predeclared::Type(Ty::Error)),
        "any" | "comparable" => Some(Predeclared::Type(Ty::empty_interface())),
        "true" => Some(Predeclared::Const(Ty::Basic(UntypedBool), ConstValue::Bool(true))),
        "false" => Some(Predeclared::Const(Ty::Basic(UntypedBool), ConstValue::Bool(false))),
        "nil" => Some(Predeclared::Nil),
        "append" => Some(Predeclared::Builtin(Builtin::Append)),
        "cap" => Some(Predeclared::Builtin(Builtin::Cap)),
        "clear" => Some(Predeclared::Builtin(Builtin::Clear)),
        "close" => Some(Predeclared::Builtin(Builtin::Close)),
        "complex" => Some(Predeclared::Builtin(Builtin::Complex)),
        "copy" => Some(Predeclared::Builtin(Builtin::Copy)),
        "delete" => Some(Predeclared::Builtin(Builtin::Delete)),
        "imag" => Some(Predeclared::Builtin(Builtin::Imag)),
        "len" => Some(Predeclared::Builtin(Builtin::Len)),
        "make" => Some(Predeclared::Builtin(Builtin::Make)),
        "max" => Some(Predeclared::Builtin(Builtin::Max)),
        "min" => Some(Predeclared::Builtin(Builtin::Min)),
        "new" => Some(Predeclared::Builtin(Builtin::New)),
        "panic" => Some(Predeclared::Builtin(Builtin::Panic)),
        "print" => Some(Predeclared::Builtin(Builtin::Print)),
        "println" => Some(Predeclared::Builtin(Builtin::Println)),
        "real" => Some(Predeclared::Builtin(Builtin::Real)),
        "recover" => Some(Predeclared::Builtin(Builtin::Recover)),
        _ => None,
    }
}

/// Method set of the predeclared `error` interface.
pub(crate) fn error_method(name: &str) -> Option<MethodTy> {
    (name == "Error").then(|| MethodTy {
        name: Arc::from("Error"),
        sig: Ty::Func(Arc::new(super::types::FuncTy {
            params: Vec::new(),
            results: vec![Ty::STRING],
            variadic: false,
        })),
    })
}

use std::fmt;
use std::sync::Arc;

use crate::ast::ChanDir;

/// Predeclared basic types, including the untyped constant kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub const fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub const fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
        )
    }

    pub const fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub const fn is_bool(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    /// Type an untyped constant takes when nothing else constrains it.
    pub const fn default_type(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Int32,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedString => BasicKind::String,
            k => k,
        }
    }
}

/// Reference to a named type declared in the checked package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Named {
    pub id: u32,
    pub name: Arc<str>,
    /// Declared inside a function body.
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldTy {
    pub name: Arc<str>,
    pub ty: Ty,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodTy {
    pub name: Arc<str>,
    pub sig: Ty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncTy {
    pub params: Vec<Ty>,
    pub results: Vec<Ty>,
    pub variadic: bool,
}

/// Checker type. Types of other packages are opaque (`External`).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Ty {
    #[default]
    Invalid,
    Basic(BasicKind),
    /// The predeclared `error` interface.
    Error,
    Named(Named),
    Pointer(Box<Ty>),
    Slice(Box<Ty>),
    Array(Option<u64>, Box<Ty>),
    Map(Box<Ty>, Box<Ty>),
    Chan(ChanDir, Box<Ty>),
    Struct(Arc<[FieldTy]>),
    Interface(Arc<[MethodTy]>),
    Func(Arc<FuncTy>),
    /// Multiple results of a call.
    Tuple(Arc<[Ty]>),
    TypeParam(Arc<str>),
    External { pkg: Arc<str>, name: Arc<str> },
}

impl Ty {
    pub const BOOL: Ty = Ty::Basic(BasicKind::Bool);
    pub const INT: Ty = Ty::Basic(BasicKind::Int);
    pub const STRING: Ty = Ty::Basic(BasicKind::String);

    pub fn empty_interface() -> Ty {
        Ty::Interface(Vec::new().into())
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Ty::Invalid)
    }

    pub fn basic(&self) -> Option<BasicKind> {
        match self {
            Ty::Basic(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Ty::Basic(b) if b.is_untyped())
    }

    pub fn named(&self) -> Option<&Named> {
        match self {
            Ty::Named(n) => Some(n),
            _ => None,
        }
    }

    /// Defaults an untyped basic type; other types are returned unchanged.
    pub fn defaulted(&self) -> Ty {
        match self {
            Ty::Basic(b) if *b == BasicKind::UntypedNil => Ty::Invalid,
            Ty::Basic(b) => Ty::Basic(b.default_type()),
            t => t.clone(),
        }
    }

    pub fn pointer_to(self) -> Ty {
        Ty::Pointer(Box::new(self))
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Invalid => f.write_str("invalid type"),
            Ty::Basic(b) => f.write_str(b.name()),
            Ty::Error => f.write_str("error"),
            Ty::Named(n) => f.write_str(&n.name),
            Ty::Pointer(t) => write!(f, "*{t}"),
            Ty::Slice(t) => write!(f, "[]{t}"),
            Ty::Array(Some(n), t) => write!(f, "[{n}]{t}"),
            Ty::Array(None, t) => write!(f, "[?]{t}"),
            Ty::Map(k, v) => write!(f, "map[{k}]{v}"),
            Ty::Chan(ChanDir::Both, t) => write!(f, "chan {t}"),
            Ty::Chan(ChanDir::Send, t) => write!(f, "chan<- {t}"),
            Ty::Chan(ChanDir::Recv, t) => write!(f, "<-chan {t}"),
            Ty::Struct(fields) => {
                f.write_str("struct{")?;
                for (i, fl) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if fl.embedded {
                        write!(f, "{}", fl.ty)?;
                    } else {
                        write!(f, "{} {}", fl.name, fl.ty)?;
                    }
                }
                f.write_str("}")
            }
            Ty::Interface(m) if m.is_empty() => f.write_str("interface{}"),
            Ty::Interface(_) => f.write_str("interface{...}"),
            Ty::Func(sig) => {
                f.write_str("func(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")?;
                match sig.results.as_slice() {
                    [] => Ok(()),
                    [r] => write!(f, " {r}"),
                    rs => {
                        f.write_str(" (")?;
                        for (i, r) in rs.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{r}")?;
                        }
                        f.write_str(")")
                    }
                }
            }
            Ty::Tuple(items) => write!(f, "({} values)", items.len()),
            Ty::TypeParam(n) => f.write_str(n),
            Ty::External { pkg, name } => write!(f, "{pkg}.{name}"),
        }
    }
}

/// Value of a constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(Vec<u8>),
}

impl ConstValue {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            ConstValue::Int(v) => Some(*v),
            ConstValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e30 => Some(*f as i128),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ConstValue::String(_))
    }
}

/// Kind of entity an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjKind {
    Package,
    Const,
    Var,
    Func,
    TypeName,
    Builtin,
    Nil,
}

/// Package-level named type.
#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: Arc<str>,
    pub underlying: Ty,
    pub methods: Vec<(Arc<str>, Ty, bool)>,
    pub generic: bool,
    pub local: bool,
    /// Index of the declaring file in the checked file list.
    pub file: usize,
}

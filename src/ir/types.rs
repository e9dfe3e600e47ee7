// This module defines the type system of the superword IR. Types are small recursive
// values (typed pointers, vectors and arrays box their element type) compared
// structurally, so two instructions have "identical types" exactly when their Type
// values are equal. TypeKind is the coarse classification the eligibility guard reads;
// it mirrors the usual IR kind split where the 32-bit float kind is distinct from
// double. The module also knows how to compute the element type an address computation
// lands on, which the parser needs to type getelementptr results.

//! IR types.

use std::fmt;

/// A first-class IR type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Integer of the given bit width.
    Int(u32),
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// Typed pointer to the pointee.
    Pointer(Box<Type>),
    /// Fixed-width vector: element type and lane count.
    Vector(Box<Type>, u32),
    /// Fixed-size array: element type and length.
    Array(Box<Type>, u64),
    Label,
}

/// Coarse classification of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Integer,
    Float,
    Double,
    Pointer,
    Vector,
    Array,
    Label,
}

impl Type {
    pub fn i1() -> Self {
        Type::Int(1)
    }

    pub fn i32() -> Self {
        Type::Int(32)
    }

    pub fn i64() -> Self {
        Type::Int(64)
    }

    pub fn ptr_to(pointee: Type) -> Self {
        Type::Pointer(Box::new(pointee))
    }

    pub fn vector_of(element: Type, lanes: u32) -> Self {
        Type::Vector(Box::new(element), lanes)
    }

    pub fn array_of(element: Type, len: u64) -> Self {
        Type::Array(Box::new(element), len)
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Void => TypeKind::Void,
            Type::Int(_) => TypeKind::Integer,
            Type::Float => TypeKind::Float,
            Type::Double => TypeKind::Double,
            Type::Pointer(_) => TypeKind::Pointer,
            Type::Vector(..) => TypeKind::Vector,
            Type::Array(..) => TypeKind::Array,
            Type::Label => TypeKind::Label,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Float | Type::Double)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(..))
    }

    /// Pointee of a pointer type.
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// Element type of a vector or array.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Vector(inner, _) | Type::Array(inner, _) => Some(inner),
            _ => None,
        }
    }

    /// Lane count of a vector type.
    pub fn lanes(&self) -> Option<u32> {
        match self {
            Type::Vector(_, n) => Some(*n),
            _ => None,
        }
    }

    /// Type reached by indexing into `self` with `depth` aggregate indices.
    ///
    /// The first getelementptr index steps over the pointer itself, so callers
    /// pass the pointee and the number of indices after the first.
    pub fn indexed(&self, depth: usize) -> Option<&Type> {
        let mut ty = self;
        for _ in 0..depth {
            ty = ty.element()?;
        }
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::Vector(inner, n) => write!(f, "<{} x {}>", n, inner),
            Type::Array(inner, n) => write!(f, "[{} x {}]", n, inner),
            Type::Label => write!(f, "label"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Type::i32().kind(), TypeKind::Integer);
        assert_eq!(Type::Float.kind(), TypeKind::Float);
        assert_eq!(Type::Double.kind(), TypeKind::Double);
        assert_eq!(Type::ptr_to(Type::i32()).kind(), TypeKind::Pointer);
        assert_eq!(Type::vector_of(Type::Float, 2).kind(), TypeKind::Vector);
    }

    #[test]
    fn test_display() {
        let ty = Type::ptr_to(Type::array_of(Type::vector_of(Type::i32(), 2), 4));
        assert_eq!(ty.to_string(), "[4 x <2 x i32>]*");
    }

    #[test]
    fn test_indexed() {
        let arr = Type::array_of(Type::array_of(Type::Double, 3), 4);
        assert_eq!(arr.indexed(0), Some(&arr));
        assert_eq!(arr.indexed(2), Some(&Type::Double));
        assert_eq!(arr.indexed(3), None);
    }
}

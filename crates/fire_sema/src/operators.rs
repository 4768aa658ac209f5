//! Static typing of the built-in operators. User code cannot overload them.

use fire_ast::{BinOp, TypeInfo, TypeKind, UnaryOp};

fn numeric_or_char(ty: &TypeInfo) -> bool {
    ty.is_numeric() || ty.is(TypeKind::Char)
}

/// `+ - * /` on numbers. A char widens to int only next to a real numeric.
fn arithmetic(lhs: &TypeInfo, rhs: &TypeInfo) -> Option<TypeInfo> {
    if !(numeric_or_char(lhs) && numeric_or_char(rhs)) || !(lhs.is_numeric() || rhs.is_numeric()) {
        return None;
    }
    Some(if lhs.is(TypeKind::Float) || rhs.is(TypeKind::Float) {
        TypeInfo::float()
    } else if lhs.is(TypeKind::Size) && rhs.is(TypeKind::Size) {
        TypeInfo::size()
    } else {
        TypeInfo::int()
    })
}

/// `vector<T> + U` keeps `T` only when `U` fits it; a mixed vector is `vector<any>`.
fn appended(vector: &TypeInfo, other: &TypeInfo) -> TypeInfo {
    let elem = vector.element();
    let added = if other.is(TypeKind::Vector) { other.element() } else { other.clone() };
    if elem.matches(&added) { vector.clone() } else { TypeInfo::vector(TypeInfo::any()) }
}

fn concatenation(lhs: &TypeInfo, rhs: &TypeInfo) -> Option<TypeInfo> {
    use TypeKind::{Char, String, Vector};
    match (lhs.kind, rhs.kind) {
        (Vector, _) => Some(appended(lhs, rhs)),
        (_, Vector) => Some(appended(rhs, lhs)),
        // `char + char` and `string + string` are not concatenations
        (String, Char) | (Char, String) => Some(TypeInfo::string()),
        _ => None,
    }
}

fn repetition(lhs: &TypeInfo, rhs: &TypeInfo) -> Option<TypeInfo> {
    use TypeKind::{Int, String, Vector};
    match (lhs.kind, rhs.kind) {
        (Int, String) | (String, Int) => Some(TypeInfo::string()),
        (Vector, Int) => Some(lhs.clone()),
        (Int, Vector) => Some(rhs.clone()),
        _ => None,
    }
}

/// Result type of `lhs op rhs`, or `None` if the operator does not apply.
pub fn binary_type(op: BinOp, lhs: &TypeInfo, rhs: &TypeInfo) -> Option<TypeInfo> {
    let yields_bool = matches!(
        op,
        BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq | BinOp::And | BinOp::Or
    );
    if lhs.is_any() || rhs.is_any() {
        return Some(if yields_bool { TypeInfo::bool() } else { TypeInfo::any() });
    }

    match op {
        BinOp::Add => concatenation(lhs, rhs).or_else(|| arithmetic(lhs, rhs)),
        BinOp::Mul => repetition(lhs, rhs).or_else(|| arithmetic(lhs, rhs)),
        BinOp::Sub | BinOp::Div => arithmetic(lhs, rhs),
        BinOp::Mod | BinOp::Shl | BinOp::Shr | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
            (lhs.is(TypeKind::Int) && rhs.is(TypeKind::Int)).then(TypeInfo::int)
        }
        BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => {
            (numeric_or_char(lhs) && numeric_or_char(rhs)).then(TypeInfo::bool)
        }
        // Non-bool operands of `&&` and `||` are tested for truthiness
        BinOp::Eq | BinOp::NotEq | BinOp::And | BinOp::Or => lhs.matches(rhs).then(TypeInfo::bool),
    }
}

pub fn unary_type(op: UnaryOp, operand: &TypeInfo) -> Option<TypeInfo> {
    if operand.is_any() {
        return Some(if op == UnaryOp::Not { TypeInfo::bool() } else { TypeInfo::any() });
    }
    match op {
        // A negated usize is an int
        UnaryOp::Neg if operand.is(TypeKind::Size) => Some(TypeInfo::int()),
        UnaryOp::Neg => operand.is_numeric().then(|| operand.clone()),
        UnaryOp::Not => operand.is(TypeKind::Bool).then(TypeInfo::bool),
        UnaryOp::BitNot => operand.is(TypeKind::Int).then(TypeInfo::int),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::int(), &TypeInfo::float()), Some(TypeInfo::float()));
        assert_eq!(binary_type(BinOp::Mul, &TypeInfo::size(), &TypeInfo::size()), Some(TypeInfo::size()));
        assert_eq!(binary_type(BinOp::Sub, &TypeInfo::size(), &TypeInfo::int()), Some(TypeInfo::int()));
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::char(), &TypeInfo::int()), Some(TypeInfo::int()));
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::char(), &TypeInfo::char()), None);
    }

    #[test]
    fn test_string_and_vector_operators() {
        let ints = TypeInfo::vector(TypeInfo::int());
        assert_eq!(binary_type(BinOp::Mul, &TypeInfo::string(), &TypeInfo::int()), Some(TypeInfo::string()));
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::char(), &TypeInfo::string()), Some(TypeInfo::string()));
        assert_eq!(binary_type(BinOp::Add, &ints, &TypeInfo::int()), Some(ints.clone()));
        assert_eq!(binary_type(BinOp::Add, &ints, &ints), Some(ints.clone()));
        assert_eq!(binary_type(BinOp::Mul, &TypeInfo::int(), &ints), Some(ints));
        assert_eq!(binary_type(BinOp::Sub, &TypeInfo::string(), &TypeInfo::string()), None);
    }

    #[test]
    fn test_concatenation_needs_differing_char_or_string() {
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::string(), &TypeInfo::char()), Some(TypeInfo::string()));
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::string(), &TypeInfo::string()), None);
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::char(), &TypeInfo::char()), None);
    }

    #[test]
    fn test_appending_other_type_widens_vector() {
        let ints = TypeInfo::vector(TypeInfo::int());
        let mixed = TypeInfo::vector(TypeInfo::any());
        assert_eq!(binary_type(BinOp::Add, &ints, &TypeInfo::string()), Some(mixed.clone()));
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::float(), &ints), Some(mixed.clone()));
        let strings = TypeInfo::vector(TypeInfo::string());
        assert_eq!(binary_type(BinOp::Add, &ints, &strings), Some(mixed));
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(binary_type(BinOp::Lt, &TypeInfo::char(), &TypeInfo::int()), Some(TypeInfo::bool()));
        assert_eq!(binary_type(BinOp::Eq, &TypeInfo::string(), &TypeInfo::string()), Some(TypeInfo::bool()));
        assert_eq!(binary_type(BinOp::Eq, &TypeInfo::string(), &TypeInfo::int()), None);
        assert_eq!(binary_type(BinOp::And, &TypeInfo::int(), &TypeInfo::int()), Some(TypeInfo::bool()));
        assert_eq!(binary_type(BinOp::Or, &TypeInfo::string(), &TypeInfo::string()), Some(TypeInfo::bool()));
        assert_eq!(binary_type(BinOp::And, &TypeInfo::int(), &TypeInfo::bool()), None);
        assert_eq!(binary_type(BinOp::Shl, &TypeInfo::int(), &TypeInfo::float()), None);
    }

    #[test]
    fn test_any_operands() {
        assert_eq!(binary_type(BinOp::Add, &TypeInfo::any(), &TypeInfo::int()), Some(TypeInfo::any()));
        assert_eq!(binary_type(BinOp::Lt, &TypeInfo::int(), &TypeInfo::any()), Some(TypeInfo::bool()));
        assert_eq!(unary_type(UnaryOp::Not, &TypeInfo::any()), Some(TypeInfo::bool()));
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary_type(UnaryOp::Neg, &TypeInfo::float()), Some(TypeInfo::float()));
        assert_eq!(unary_type(UnaryOp::Neg, &TypeInfo::bool()), None);
        assert_eq!(unary_type(UnaryOp::Neg, &TypeInfo::size()), Some(TypeInfo::int()));
        assert_eq!(unary_type(UnaryOp::BitNot, &TypeInfo::int()), Some(TypeInfo::int()));
    }
}

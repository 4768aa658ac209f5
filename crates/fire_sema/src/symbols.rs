//! Global function, class and enum tables.
//!
//! Entries are appended while the scope tree is built and are never removed,
//! so the ids handed out stay valid for the lifetime of the table.

use fire_ast::{ClassId, EnumId, FuncId, TypeInfo};
use fire_lexer::Span;

use crate::scope::ScopeId;

#[derive(Debug, Clone)]
pub struct ParamSymbol {
    pub name: String,
    /// Declared type; for a variadic parameter, the type of each surplus argument
    pub ty: TypeInfo,
    pub variadic: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    /// Parameters without the implicit `self`
    pub params: Vec<ParamSymbol>,
    pub ret: TypeInfo,
    pub has_self: bool,
    pub class: Option<ClassId>,
    /// Scope the function is declared in
    pub owner: ScopeId,
    /// The function's own argument scope
    pub scope: ScopeId,
    pub span: Span,
}

impl FunctionSymbol {
    /// Static type of the function used as a value.
    pub fn ty(&self) -> TypeInfo {
        let args = self.params.iter().map(|p| if p.variadic { TypeInfo::vector(p.ty.clone()) } else { p.ty.clone() });
        TypeInfo::function(self.ret.clone(), args)
    }

    /// `name(int, string...) -> bool`, used in overload notes.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| if p.variadic { format!("{}...", p.ty) } else { p.ty.to_string() })
            .collect();
        format!("{}({}) -> {}", self.name, params.join(", "), self.ret)
    }
}

#[derive(Debug, Clone)]
pub struct FieldSymbol {
    pub name: String,
    pub ty: TypeInfo,
    pub has_default: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub fields: Vec<FieldSymbol>,
    pub methods: Vec<FuncId>,
    pub owner: ScopeId,
    pub span: Span,
}

impl ClassSymbol {
    pub fn field(&self, name: &str) -> Option<(usize, &FieldSymbol)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumSymbol {
    pub name: String,
    pub enumerators: Vec<String>,
    pub owner: ScopeId,
    pub span: Span,
}

impl EnumSymbol {
    pub fn enumerator(&self, name: &str) -> Option<usize> {
        self.enumerators.iter().position(|e| e == name)
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub functions: Vec<FunctionSymbol>,
    pub classes: Vec<ClassSymbol>,
    pub enums: Vec<EnumSymbol>,
}

impl SymbolTable {
    pub fn add_function(&mut self, symbol: FunctionSymbol) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(symbol);
        id
    }

    pub fn add_class(&mut self, symbol: ClassSymbol) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(symbol);
        id
    }

    pub fn add_enum(&mut self, symbol: EnumSymbol) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(symbol);
        id
    }

    pub fn function(&self, id: FuncId) -> Option<&FunctionSymbol> {
        self.functions.get(id.index())
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassSymbol> {
        self.classes.get(id.index())
    }

    pub fn enum_symbol(&self, id: EnumId) -> Option<&EnumSymbol> {
        self.enums.get(id.index())
    }

    /// First class declared with this name, wherever it lives.
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.classes.iter().position(|c| c.name == name).map(|i| ClassId(i as u32))
    }

    pub fn enum_by_name(&self, name: &str) -> Option<EnumId> {
        self.enums.iter().position(|e| e.name == name).map(|i| EnumId(i as u32))
    }
}

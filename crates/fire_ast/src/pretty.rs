// === Pretty Printing ===

use crate::*;

impl Program {
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        for stmt in &self.body.stmts {
            out.push_str(&stmt.pretty_print(0));
        }
        out
    }
}

impl Block {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let mut out = format!("{}Block [{} slots]\n", ind, self.frame_size);
        for stmt in &self.stmts {
            out.push_str(&stmt.pretty_print(indent + 1));
        }
        out
    }
}

impl TypeExpr {
    pub fn pretty_print(&self) -> String {
        if self.args.is_empty() {
            self.name.name.clone()
        } else {
            let args: Vec<_> = self.args.iter().map(|a| a.pretty_print()).collect();
            format!("{}<{}>", self.name.name, args.join(", "))
        }
    }
}

impl Stmt {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let sub = "  ".repeat(indent + 1);
        match &self.kind {
            StmtKind::Let(l) => {
                let ty_str = l.ty.as_ref().map(|t| format!(": {}", t.pretty_print())).unwrap_or_default();
                let slot = l.slot.map(|s| format!(" @{}", s)).unwrap_or_default();
                let mut out = format!("{}Let {}{}{}", ind, l.name.name, ty_str, slot);
                if let Some(init) = &l.init {
                    out.push_str(" =\n");
                    out.push_str(&init.pretty_print_indented(indent + 1));
                } else {
                    out.push('\n');
                }
                out
            }
            StmtKind::Expr(e) => {
                let mut out = format!("{}ExprStmt\n", ind);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
            StmtKind::Block(b) => b.pretty_print(indent),
            StmtKind::If(i) => i.pretty_print(indent),
            StmtKind::While(w) => {
                let mut out = format!("{}While\n", ind);
                out.push_str(&format!("{}condition:\n", sub));
                out.push_str(&w.cond.pretty_print_indented(indent + 2));
                out.push_str(&format!("{}body:\n", sub));
                out.push_str(&w.body.pretty_print(indent + 2));
                out
            }
            StmtKind::Try(t) => {
                let mut out = format!("{}Try\n", ind);
                out.push_str(&t.body.pretty_print(indent + 1));
                for c in &t.catches {
                    let ty_str = c.ty.as_ref().map(|t| format!(": {}", t.pretty_print())).unwrap_or_default();
                    out.push_str(&format!("{}Catch {}{}\n", sub, c.name.name, ty_str));
                    out.push_str(&c.body.pretty_print(indent + 2));
                }
                out
            }
            StmtKind::Return(value) => {
                let mut out = format!("{}Return\n", ind);
                if let Some(v) = value {
                    out.push_str(&v.pretty_print_indented(indent + 1));
                }
                out
            }
            StmtKind::Throw(value) => {
                let mut out = format!("{}Throw\n", ind);
                out.push_str(&value.pretty_print_indented(indent + 1));
                out
            }
            StmtKind::Break => format!("{}Break\n", ind),
            StmtKind::Continue => format!("{}Continue\n", ind),
            StmtKind::Fn(f) => f.pretty_print(indent),
            StmtKind::Class(c) => {
                let mut out = format!("{}Class '{}'\n", ind, c.name.name);
                for field in &c.fields {
                    let ty_str = field.ty.as_ref().map(|t| t.pretty_print()).unwrap_or_else(|| "?".into());
                    out.push_str(&format!("{}field {}: {}\n", sub, field.name.name, ty_str));
                    if let Some(default) = &field.default {
                        out.push_str(&default.pretty_print_indented(indent + 2));
                    }
                }
                for m in &c.methods {
                    out.push_str(&m.pretty_print(indent + 1));
                }
                out
            }
            StmtKind::Enum(e) => {
                let variants: Vec<_> = e.variants.iter().map(|v| v.name.as_str()).collect();
                format!("{}Enum '{}' {{ {} }}\n", ind, e.name.name, variants.join(", "))
            }
            StmtKind::Namespace(n) => {
                let mut out = format!("{}Namespace '{}'\n", ind, n.name.name);
                out.push_str(&n.body.pretty_print(indent + 1));
                out
            }
        }
    }
}

impl IfStmt {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let sub = "  ".repeat(indent + 1);
        let mut out = format!("{}If\n", ind);
        out.push_str(&format!("{}condition:\n", sub));
        out.push_str(&self.cond.pretty_print_indented(indent + 2));
        out.push_str(&format!("{}then:\n", sub));
        out.push_str(&self.then_block.pretty_print(indent + 2));
        if let Some(else_br) = &self.else_branch {
            out.push_str(&format!("{}else:\n", sub));
            match else_br {
                ElseBranch::Block(b) => out.push_str(&b.pretty_print(indent + 2)),
                ElseBranch::If(i) => out.push_str(&i.pretty_print(indent + 2)),
            }
        }
        out
    }
}

impl FnDef {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let mut out = format!("{}FnDef '{}'\n", ind, self.name.name);

        if self.has_self || !self.params.is_empty() {
            out.push_str(&format!("{}  params:\n", ind));
            if self.has_self {
                out.push_str(&format!("{}    self\n", ind));
            }
            for p in &self.params {
                let ty = p.ty.as_ref().map(|t| t.pretty_print()).unwrap_or_else(|| "any".into());
                let dots = if p.variadic { "..." } else { "" };
                out.push_str(&format!("{}    {}: {}{}\n", ind, p.name.name, ty, dots));
            }
        }

        if let Some(ret) = &self.return_type {
            out.push_str(&format!("{}  returns: {}\n", ind, ret.pretty_print()));
        }

        out.push_str(&format!("{}  body:\n", ind));
        out.push_str(&self.body.pretty_print(indent + 2));
        out
    }
}

impl CallArg {
    /// Pretty print with indentation for full AST display
    pub fn pretty_print_indented(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        if let Some(name) = &self.name {
            let mut out = format!("{}NamedArg({}):\n", ind, name.name);
            out.push_str(&self.value.pretty_print_indented(indent + 1));
            out
        } else {
            self.value.pretty_print_indented(indent)
        }
    }
}

impl Expr {
    /// Pretty print with indentation for full AST display
    pub fn pretty_print_indented(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let sub = "  ".repeat(indent + 1);
        match &self.kind {
            ExprKind::IntLiteral(n) => format!("{}Int({})\n", ind, n),
            ExprKind::SizeLiteral(n) => format!("{}Size({})\n", ind, n),
            ExprKind::FloatLiteral(n) => format!("{}Float({})\n", ind, n),
            ExprKind::BoolLiteral(b) => format!("{}Bool({})\n", ind, b),
            ExprKind::CharLiteral(c) => format!("{}Char({:?})\n", ind, c),
            ExprKind::StringLiteral(s) => format!("{}String({:?})\n", ind, s),
            ExprKind::NoneLiteral => format!("{}None\n", ind),
            ExprKind::Ident(id) => format!("{}Ident({})\n", ind, id.name),
            ExprKind::ScopeResol(path) => {
                let names: Vec<_> = path.iter().map(|p| p.name.as_str()).collect();
                format!("{}ScopeResol({})\n", ind, names.join("::"))
            }
            ExprKind::Array(elems) => {
                let mut out = format!("{}Array\n", ind);
                for e in elems {
                    out.push_str(&e.pretty_print_indented(indent + 1));
                }
                out
            }
            ExprKind::Index(base, index) => {
                let mut out = format!("{}Index\n", ind);
                out.push_str(&base.pretty_print_indented(indent + 1));
                out.push_str(&index.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::Member(e, name) => {
                let mut out = format!("{}Member(.{})\n", ind, name.name);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::Call(call) => {
                let target = match call.target {
                    Some(CallTarget::Function { func, .. }) => format!(" -> fn#{}", func.0),
                    Some(CallTarget::Builtin(id)) => format!(" -> builtin#{}", id.0),
                    Some(CallTarget::Method(func)) => format!(" -> method#{}", func.0),
                    Some(CallTarget::BuiltinMethod(id)) => format!(" -> builtin method#{}", id.0),
                    Some(CallTarget::Constructor { class, .. }) => format!(" -> new class#{}", class.0),
                    Some(CallTarget::Functor) => " -> functor".to_string(),
                    None => String::new(),
                };
                let mut out = format!("{}Call{}\n", ind, target);
                out.push_str(&format!("{}callee:\n", sub));
                out.push_str(&call.callee.pretty_print_indented(indent + 2));
                if !call.args.is_empty() {
                    out.push_str(&format!("{}args:\n", sub));
                    for arg in &call.args {
                        out.push_str(&arg.pretty_print_indented(indent + 2));
                    }
                }
                out
            }
            ExprKind::Binary(l, op, r) => {
                let mut out = format!("{}Binary({})\n", ind, op);
                out.push_str(&l.pretty_print_indented(indent + 1));
                out.push_str(&r.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::Unary(op, e) => {
                let mut out = format!("{}Unary({})\n", ind, op);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::Assign(lhs, op, rhs) => {
                let op_str = op.map(|o| format!("{}=", o)).unwrap_or_else(|| "=".into());
                let mut out = format!("{}Assign({})\n", ind, op_str);
                out.push_str(&format!("{}target:\n", sub));
                out.push_str(&lhs.pretty_print_indented(indent + 2));
                out.push_str(&format!("{}value:\n", sub));
                out.push_str(&rhs.pretty_print_indented(indent + 2));
                out
            }
            ExprKind::Variable(v) => {
                format!("{}Variable({} @ distance {}, slot {})\n", ind, v.name.name, v.distance, v.index)
            }
            ExprKind::FuncRef(f) => {
                format!("{}FuncRef({} = fn#{}, env {})\n", ind, f.name.name, f.func.0, f.env_distance)
            }
            ExprKind::BuiltinRef(name, id) => format!("{}BuiltinRef({} = builtin#{})\n", ind, name.name, id.0),
            ExprKind::EnumeratorRef(e) => {
                format!("{}EnumeratorRef({}::{} = {})\n", ind, e.enum_name, e.name.name, e.index)
            }
            ExprKind::EnumName(name, id) => format!("{}EnumName({} = enum#{})\n", ind, name.name, id.0),
            ExprKind::ClassName(name, id) => format!("{}ClassName({} = class#{})\n", ind, name.name, id.0),
            ExprKind::MemberVariable(e, m) => {
                let mut out = format!("{}MemberVariable(.{} = field {})\n", ind, m.name.name, m.index);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::MemberFunction(e, m) => {
                let mut out = format!("{}MemberFunction(.{} = fn#{})\n", ind, m.name.name, m.func.0);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::BuiltinMemberVariable(e, m) | ExprKind::BuiltinMemberFunction(e, m) => {
                let mut out = format!("{}BuiltinMember(.{} = builtin#{})\n", ind, m.name.name, m.builtin.0);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
        }
    }
}

//! Prints a [`ClassModel`] as Java-like source into a [`Dumper`].

use std::borrow::Cow;
use std::io;

use crate::analysis::{ClassKind, ClassModel, MethodKind, MethodModel};
use crate::output::Dumper;
use crate::types::{JAVA_KEYWORDS, JavaType, is_java_identifier};

pub const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

const INDENT: &str = "    ";

/// What to do with member names that are not legal Java identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierPolicy {
    #[default]
    Keep,
    Rename,
}

impl IdentifierPolicy {
    pub fn apply(self, name: &str) -> Cow<'_, str> {
        if self == IdentifierPolicy::Keep || is_java_identifier(name) {
            return Cow::Borrowed(name);
        }
        let mut out: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
            .collect();
        if out.chars().next().is_none_or(|c| c.is_numeric()) {
            out.insert(0, '_');
        }
        if JAVA_KEYWORDS.contains(&out.as_str()) {
            out.push('_');
        }
        Cow::Owned(out)
    }
}

pub fn dump_class(model: &ClassModel, d: &mut dyn Dumper) -> io::Result<()> {
    let (major, minor) = model.version;
    d.print(&format!("/*\n * Decompiled with {TOOL_NAME} {TOOL_VERSION}.\n"))?;
    match &model.source_file {
        Some(source) => d.print(&format!(" * Compiled from {source} (class file version {major}.{minor}).\n */\n"))?,
        None => d.print(&format!(" * Class file version {major}.{minor}.\n */\n"))?,
    }
    if let Some(pkg) = model.ty.package() {
        d.print(&format!("package {pkg};\n\n"))?;
    }
    let imports: Vec<String> = d.type_usage().imports().map(|t| t.java_name()).collect();
    for import in &imports {
        d.print(&format!("import {import};\n"))?;
    }
    if !imports.is_empty() {
        d.print("\n")?;
    }
    dump_body(model, d, 0)
}

/// Prints a single method, as the method filter asks for.
pub fn dump_method(model: &ClassModel, method: &MethodModel, d: &mut dyn Dumper) -> io::Result<()> {
    dump_member_method(model, method, d, 0)
}

fn dump_body(model: &ClassModel, d: &mut dyn Dumper, depth: usize) -> io::Result<()> {
    let pad = INDENT.repeat(depth);
    let policy = d.identifier_policy();
    if model.anonymous {
        d.print(&format!("{pad}/* anonymous */\n"))?;
    }

    let mut header = String::new();
    for modifier in &model.modifiers {
        header.push_str(modifier);
        header.push(' ');
    }
    header.push_str(model.kind.keyword());
    header.push(' ');
    header.push_str(&policy.apply(&model.declared_name));
    if let Some(sup) = &model.super_class {
        header.push_str(" extends ");
        header.push_str(&d.type_usage().spell_type(sup));
    }
    if !model.interfaces.is_empty() {
        let keyword = match model.kind {
            ClassKind::Interface | ClassKind::Annotation => " extends ",
            ClassKind::Class | ClassKind::Enum => " implements ",
        };
        let list: Vec<String> = model
            .interfaces
            .iter()
            .map(|i| d.type_usage().spell_type(i))
            .collect();
        header.push_str(keyword);
        header.push_str(&list.join(", "));
    }
    d.print(&format!("{pad}{header} {{\n"))?;

    let mut sections = 0;
    if model.kind == ClassKind::Enum && (!model.enum_constants.is_empty() || !model.fields.is_empty() || !model.methods.is_empty()) {
        let constants: Vec<String> = model
            .enum_constants
            .iter()
            .map(|c| policy.apply(c).into_owned())
            .collect();
        let separator = format!(",\n{pad}{INDENT}");
        d.print(&format!("{pad}{INDENT}{};\n", constants.join(&separator)))?;
        sections += 1;
    }

    if !model.fields.is_empty() {
        if sections > 0 {
            d.print("\n")?;
        }
        for field in &model.fields {
            let ty = d.type_usage().spell_type(&field.ty);
            d.print(&format!(
                "{pad}{INDENT}{}{ty} {};\n",
                modifier_prefix(&field.modifiers),
                policy.apply(&field.name)
            ))?;
        }
        sections += 1;
    }

    for method in &model.methods {
        if sections > 0 {
            d.print("\n")?;
        }
        dump_member_method(model, method, d, depth + 1)?;
        sections += 1;
    }

    for inner in &model.inner {
        if sections > 0 {
            d.print("\n")?;
        }
        dump_body(inner, d, depth + 1)?;
        sections += 1;
    }

    d.print(&format!("{pad}}}\n"))
}

fn dump_member_method(owner: &ClassModel, method: &MethodModel, d: &mut dyn Dumper, depth: usize) -> io::Result<()> {
    let pad = INDENT.repeat(depth);
    let policy = d.identifier_policy();
    let body = match method.code_length {
        Some(len) => format!(" {{\n{pad}{INDENT}/* {len} bytes of bytecode */\n{pad}}}\n"),
        None => ";\n".to_string(),
    };

    if method.kind == MethodKind::StaticInitializer {
        return d.print(&format!("{pad}static{body}"));
    }

    let params: Vec<String> = method
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let spelled = if method.varargs && i + 1 == method.params.len() {
                match p {
                    JavaType::Array(component) => format!("{}...", d.type_usage().spell_type(component)),
                    other => d.type_usage().spell_type(other),
                }
            } else {
                d.type_usage().spell_type(p)
            };
            format!("{spelled} arg{i}")
        })
        .collect();

    let signature = match method.kind {
        MethodKind::Constructor => policy.apply(&owner.declared_name).into_owned(),
        _ => {
            let ret = method
                .return_type
                .as_ref()
                .map_or_else(|| "void".to_string(), |r| d.type_usage().spell_type(r));
            format!("{ret} {}", policy.apply(&method.name))
        }
    };

    d.print(&format!(
        "{pad}{}{signature}({}){body}",
        modifier_prefix(&method.modifiers),
        params.join(", ")
    ))
}

fn modifier_prefix(modifiers: &[&str]) -> String {
    modifiers.iter().map(|m| format!("{m} ")).collect()
}

//! Skeleton analysis: rebuilds declarations from a parsed class file.
//!
//! Method bodies are not reconstructed; the model only records how much
//! bytecode each one carries.

use crate::classfile::{ClassFile, Member, access};
use crate::error::AnalysisError;
use crate::naming::NamingState;
use crate::types::{JavaType, TypeName, parse_field_descriptor, parse_method_descriptor};

const OBJECT: &str = "java.lang.Object";
const ENUM: &str = "java.lang.Enum";
const ANNOTATION: &str = "java.lang.annotation.Annotation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

impl ClassKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Enum => "enum",
            ClassKind::Annotation => "@interface",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldModel {
    pub modifiers: Vec<&'static str>,
    pub ty: JavaType,
    pub name: String,
    pub original_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    StaticInitializer,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodModel {
    pub kind: MethodKind,
    pub modifiers: Vec<&'static str>,
    pub name: String,
    pub original_name: String,
    pub return_type: Option<JavaType>,
    pub params: Vec<JavaType>,
    pub varargs: bool,
    /// Bytecode length; `None` when the method has no body.
    pub code_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassModel {
    pub ty: TypeName,
    pub kind: ClassKind,
    pub modifiers: Vec<&'static str>,
    /// Name used in the declaration: the simple name, or the inner name
    /// for nested classes.
    pub declared_name: String,
    pub anonymous: bool,
    /// `SourceFile` attribute, when the compiler kept it.
    pub source_file: Option<String>,
    /// Class file `(major, minor)` version.
    pub version: (u16, u16),
    pub super_class: Option<JavaType>,
    pub interfaces: Vec<JavaType>,
    pub enum_constants: Vec<String>,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
    pub inner: Vec<ClassModel>,
}

impl ClassModel {
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodModel> {
        self.methods.iter().filter(move |m| m.original_name == name)
    }
}

/// Builds the model of `cf`, applying renames from `naming`.
///
/// `inner` holds the already analysed models of the classes nested in `cf`.
pub fn analyse_class(
    cf: &ClassFile,
    naming: &NamingState,
    inner: Vec<ClassModel>,
) -> Result<ClassModel, AnalysisError> {
    let ty = cf.this_class.clone();
    let entry = cf.inner_entry();
    // Nested classes keep static/private/protected only in their InnerClasses entry.
    let flags = entry.map_or(cf.access, |e| e.access | (cf.access & access::INTERFACE));
    let kind = if flags & access::ANNOTATION != 0 {
        ClassKind::Annotation
    } else if flags & access::INTERFACE != 0 {
        ClassKind::Interface
    } else if flags & access::ENUM != 0 {
        ClassKind::Enum
    } else {
        ClassKind::Class
    };
    let anonymous = entry.is_some_and(|e| e.simple_name.is_none());
    let declared_name = entry
        .and_then(|e| e.simple_name.clone())
        .unwrap_or_else(|| ty.simple_name().to_string());

    let super_class = cf
        .super_class
        .as_ref()
        .filter(|s| s.raw_name() != OBJECT)
        .filter(|s| !(kind == ClassKind::Enum && s.raw_name() == ENUM))
        .filter(|_| !matches!(kind, ClassKind::Interface | ClassKind::Annotation))
        .map(|s| JavaType::Object(s.clone()));
    let interfaces = cf
        .interfaces
        .iter()
        .filter(|i| !(kind == ClassKind::Annotation && i.raw_name() == ANNOTATION))
        .map(|i| JavaType::Object(i.clone()))
        .collect();

    let mut enum_constants = Vec::new();
    let mut fields = Vec::new();
    for field in &cf.fields {
        if field.has_flag(access::SYNTHETIC) {
            continue;
        }
        let name = naming
            .field_name(&ty, &field.name, &field.descriptor)
            .unwrap_or(field.name.as_str())
            .to_string();
        if kind == ClassKind::Enum && field.has_flag(access::ENUM) {
            enum_constants.push(name);
            continue;
        }
        fields.push(FieldModel {
            modifiers: field_modifiers(field.access),
            ty: parse_field_descriptor(&field.descriptor)?,
            name,
            original_name: field.name.clone(),
        });
    }

    let mut methods = Vec::new();
    for method in &cf.methods {
        if method.has_flag(access::SYNTHETIC) || method.has_flag(access::BRIDGE) {
            continue;
        }
        if kind == ClassKind::Enum && is_enum_boilerplate(method) {
            continue;
        }
        methods.push(analyse_method(&ty, kind, method, naming)?);
    }

    Ok(ClassModel {
        ty,
        kind,
        modifiers: class_modifiers(flags, kind),
        declared_name,
        anonymous,
        source_file: cf.source_file.clone(),
        version: (cf.major_version, cf.minor_version),
        super_class,
        interfaces,
        enum_constants,
        fields,
        methods,
        inner,
    })
}

fn analyse_method(
    owner: &TypeName,
    kind: ClassKind,
    method: &Member,
    naming: &NamingState,
) -> Result<MethodModel, AnalysisError> {
    let descriptor = parse_method_descriptor(&method.descriptor)?;
    let method_kind = match method.name.as_str() {
        "<init>" => MethodKind::Constructor,
        "<clinit>" => MethodKind::StaticInitializer,
        _ => MethodKind::Plain,
    };
    let name = naming
        .method_name(owner, &method.name, &method.descriptor)
        .unwrap_or(method.name.as_str())
        .to_string();

    let mut modifiers = method_modifiers(method.access);
    if matches!(kind, ClassKind::Interface | ClassKind::Annotation) {
        modifiers.retain(|m| *m != "abstract");
        if method.code.is_some() && !method.has_flag(access::STATIC) && !method.has_flag(access::PRIVATE) {
            modifiers.push("default");
        }
    }

    Ok(MethodModel {
        kind: method_kind,
        modifiers,
        name,
        original_name: method.name.clone(),
        return_type: descriptor.ret,
        params: descriptor.params,
        varargs: method.has_flag(access::VARARGS),
        code_length: method.code_length(),
    })
}

fn is_enum_boilerplate(method: &Member) -> bool {
    method.has_flag(access::STATIC)
        && ((method.name == "values" && method.descriptor.starts_with("()["))
            || (method.name == "valueOf" && method.descriptor.starts_with("(Ljava/lang/String;)")))
}

fn class_modifiers(flags: u16, kind: ClassKind) -> Vec<&'static str> {
    let mut out = visibility(flags);
    if flags & access::STATIC != 0 && kind == ClassKind::Class {
        out.push("static");
    }
    if kind == ClassKind::Class {
        if flags & access::ABSTRACT != 0 {
            out.push("abstract");
        }
        if flags & access::FINAL != 0 {
            out.push("final");
        }
    }
    out
}

fn field_modifiers(flags: u16) -> Vec<&'static str> {
    let mut out = visibility(flags);
    for (flag, word) in [
        (access::STATIC, "static"),
        (access::FINAL, "final"),
        (access::VOLATILE, "volatile"),
        (access::TRANSIENT, "transient"),
    ] {
        if flags & flag != 0 {
            out.push(word);
        }
    }
    out
}

fn method_modifiers(flags: u16) -> Vec<&'static str> {
    let mut out = visibility(flags);
    for (flag, word) in [
        (access::STATIC, "static"),
        (access::FINAL, "final"),
        (access::SYNCHRONIZED, "synchronized"),
        (access::NATIVE, "native"),
        (access::ABSTRACT, "abstract"),
    ] {
        if flags & flag != 0 {
            out.push(word);
        }
    }
    out
}

fn visibility(flags: u16) -> Vec<&'static str> {
    let mut out = Vec::new();
    if flags & access::PUBLIC != 0 {
        out.push("public");
    } else if flags & access::PROTECTED != 0 {
        out.push("protected");
    } else if flags & access::PRIVATE != 0 {
        out.push("private");
    }
    out
}

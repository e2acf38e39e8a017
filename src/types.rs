//! Type identities and JVM descriptors.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::DescriptorError;

/// A fully-qualified type name in dotted raw form, e.g. `a.b.Outer$Inner`.
///
/// This is the identity the class cache is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(dotted: impl Into<String>) -> Self {
        Self(dotted.into())
    }

    /// Builds a name from the JVM internal form (`a/b/C`).
    pub fn from_internal(internal: &str) -> Self {
        Self(internal.replace('/', "."))
    }

    /// Builds a name from an archive entry such as `a/b/C.class`.
    pub fn from_entry(entry: &str) -> Self {
        Self::from_internal(entry.trim_end_matches(".class"))
    }

    pub fn raw_name(&self) -> &str {
        &self.0
    }

    pub fn package(&self) -> Option<&str> {
        self.0.rfind('.').map(|idx| &self.0[..idx])
    }

    /// Everything after the package, `$` separators included.
    pub fn simple_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The outermost enclosing type, judged by the first `$` in the simple name.
    pub fn outermost(&self) -> TypeName {
        let simple = self.simple_name();
        match simple.find('$') {
            Some(idx) if idx > 0 => {
                let head = &simple[..idx];
                match self.package() {
                    Some(pkg) => TypeName(format!("{pkg}.{head}")),
                    None => TypeName(head.to_string()),
                }
            }
            _ => self.clone(),
        }
    }

    /// Source spelling: nested separators become dots.
    pub fn java_name(&self) -> String {
        self.0.replace('$', ".")
    }

    pub fn entry_path(&self) -> String {
        format!("{}.class", self.0.replace('.', "/"))
    }

    /// Relative path of the `.java` file this type is written to.
    pub fn source_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        if let Some(pkg) = self.package() {
            for part in pkg.split('.') {
                path.push(part);
            }
        }
        path.push(format!("{}.java", self.simple_name()));
        path
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            b'Z' => Primitive::Boolean,
            b'B' => Primitive::Byte,
            b'C' => Primitive::Char,
            b'S' => Primitive::Short,
            b'I' => Primitive::Int,
            b'J' => Primitive::Long,
            b'F' => Primitive::Float,
            b'D' => Primitive::Double,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Primitive(Primitive),
    Object(TypeName),
    Array(Box<JavaType>),
}

impl JavaType {
    pub fn object(dotted: &str) -> Self {
        JavaType::Object(TypeName::new(dotted))
    }

    /// The class or interface this type mentions, looking through arrays.
    pub fn referenced_type(&self) -> Option<&TypeName> {
        match self {
            JavaType::Primitive(_) => None,
            JavaType::Object(name) => Some(name),
            JavaType::Array(component) => component.referenced_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<JavaType>,
    /// `None` for `void`.
    pub ret: Option<JavaType>,
}

pub fn parse_field_descriptor(descriptor: &str) -> Result<JavaType, DescriptorError> {
    let bytes = descriptor.as_bytes();
    let mut pos = 0;
    let ty = parse_one(descriptor, bytes, &mut pos)?;
    if pos != bytes.len() {
        return Err(malformed(descriptor));
    }
    Ok(ty)
}

pub fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor, DescriptorError> {
    let bytes = descriptor.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(malformed(descriptor));
    }
    let mut pos = 1;
    let mut params = Vec::new();
    loop {
        match bytes.get(pos) {
            Some(b')') => {
                pos += 1;
                break;
            }
            Some(_) => params.push(parse_one(descriptor, bytes, &mut pos)?),
            None => return Err(malformed(descriptor)),
        }
    }
    let ret = if bytes.get(pos) == Some(&b'V') {
        pos += 1;
        None
    } else {
        Some(parse_one(descriptor, bytes, &mut pos)?)
    };
    if pos != bytes.len() {
        return Err(malformed(descriptor));
    }
    Ok(MethodDescriptor { params, ret })
}

/// The parameter part of a method descriptor, `(II)` in `(II)V`.
pub fn parameter_part(descriptor: &str) -> &str {
    match descriptor.find(')') {
        Some(idx) => &descriptor[..=idx],
        None => descriptor,
    }
}

fn parse_one(descriptor: &str, bytes: &[u8], pos: &mut usize) -> Result<JavaType, DescriptorError> {
    let code = *bytes.get(*pos).ok_or_else(|| malformed(descriptor))?;
    *pos += 1;
    if let Some(p) = Primitive::from_code(code) {
        return Ok(JavaType::Primitive(p));
    }
    match code {
        b'L' => {
            let rest = &descriptor[*pos..];
            let end = rest.find(';').ok_or_else(|| malformed(descriptor))?;
            if end == 0 {
                return Err(malformed(descriptor));
            }
            *pos += end + 1;
            Ok(JavaType::Object(TypeName::from_internal(&rest[..end])))
        }
        b'[' => Ok(JavaType::Array(Box::new(parse_one(descriptor, bytes, pos)?))),
        _ => Err(malformed(descriptor)),
    }
}

fn malformed(descriptor: &str) -> DescriptorError {
    DescriptorError {
        descriptor: descriptor.to_string(),
    }
}

pub const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while", "_",
];

pub fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return false;
    }
    !JAVA_KEYWORDS.contains(&name)
}

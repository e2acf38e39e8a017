//! Class file structure reader.
//!
//! Reads the constant pool, the member tables and the handful of attributes
//! the pipeline needs. Instructions are never decoded; a method's `Code`
//! attribute is kept as opaque bytes and is the heavy state a unit can drop
//! after it has been dumped.

use crate::error::ClassFormatError;
use crate::types::TypeName;

pub const MAGIC: u32 = 0xCAFE_BABE;

pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const VOLATILE: u16 = 0x0040;
    pub const BRIDGE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const VARARGS: u16 = 0x0080;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
}

#[derive(Debug, Clone)]
enum Constant {
    Unusable,
    Utf8(String),
    Class { name_index: u16 },
    Other,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    /// Raw `Code` attribute payload. `None` for abstract/native methods and
    /// after the owning unit released its heavy state.
    pub code: Option<Vec<u8>>,
}

impl Member {
    pub fn has_flag(&self, flag: u16) -> bool {
        self.access & flag != 0
    }

    /// Length of the bytecode array inside the `Code` attribute.
    pub fn code_length(&self) -> Option<u32> {
        let code = self.code.as_deref()?;
        let raw = code.get(4..8)?;
        Some(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner: TypeName,
    pub outer: Option<TypeName>,
    /// `None` for anonymous classes.
    pub simple_name: Option<String>,
    pub access: u16,
}

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: u16,
    pub this_class: TypeName,
    pub super_class: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub source_file: Option<String>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFormatError> {
        let mut r = Reader::new(bytes);
        let magic = r.u4()?;
        if magic != MAGIC {
            return Err(ClassFormatError::BadMagic(magic));
        }
        let minor_version = r.u2()?;
        let major_version = r.u2()?;
        let pool = ConstantPool::read(&mut r)?;

        let access = r.u2()?;
        let this_class = pool.class_name(r.u2()?)?;
        let super_index = r.u2()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index)?)
        };

        let interface_count = r.u2()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(r.u2()?)?);
        }

        let fields = read_members(&mut r, &pool)?;
        let methods = read_members(&mut r, &pool)?;

        let mut inner_classes = Vec::new();
        let mut source_file = None;
        let attribute_count = r.u2()?;
        for _ in 0..attribute_count {
            let name = pool.utf8(r.u2()?)?;
            let len = r.u4()? as usize;
            let body = r.take(len)?;
            match name {
                "InnerClasses" => inner_classes = read_inner_classes(body, &pool)?,
                "SourceFile" => source_file = Some(pool.utf8(Reader::new(body).u2()?)?.to_string()),
                _ => {}
            }
        }

        Ok(Self {
            minor_version,
            major_version,
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            inner_classes,
            source_file,
        })
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.access & flag != 0
    }

    /// Asks the class itself, through its `InnerClasses` table, rather than
    /// trusting a `$` in the name.
    pub fn is_inner_class(&self) -> bool {
        self.inner_entry().is_some()
    }

    /// The `InnerClasses` entry describing this class, if it is nested.
    pub fn inner_entry(&self) -> Option<&InnerClassEntry> {
        self.inner_classes.iter().find(|e| e.inner == self.this_class)
    }

    /// Classes nested directly inside this one.
    ///
    /// Anonymous and local classes carry no outer class in their entry; those
    /// are attributed by name (`This$1`).
    pub fn declared_inner_classes(&self) -> impl Iterator<Item = &InnerClassEntry> {
        let prefix = format!("{}$", self.this_class.raw_name());
        self.inner_classes.iter().filter(move |e| {
            if e.inner == self.this_class {
                return false;
            }
            match &e.outer {
                Some(outer) => *outer == self.this_class,
                None => e
                    .inner
                    .raw_name()
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('$')),
            }
        })
    }

    /// Drops every method body; declarations stay.
    pub fn release_code(&mut self) {
        for method in &mut self.methods {
            method.code = None;
        }
    }
}

fn read_members(r: &mut Reader<'_>, pool: &ConstantPool) -> Result<Vec<Member>, ClassFormatError> {
    let count = r.u2()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = r.u2()?;
        let name = pool.utf8(r.u2()?)?.to_string();
        let descriptor = pool.utf8(r.u2()?)?.to_string();
        let mut code = None;
        let attribute_count = r.u2()?;
        for _ in 0..attribute_count {
            let attr_name = pool.utf8(r.u2()?)?;
            let len = r.u4()? as usize;
            let body = r.take(len)?;
            if attr_name == "Code" {
                code = Some(body.to_vec());
            }
        }
        members.push(Member {
            access,
            name,
            descriptor,
            code,
        });
    }
    Ok(members)
}

fn read_inner_classes(body: &[u8], pool: &ConstantPool) -> Result<Vec<InnerClassEntry>, ClassFormatError> {
    let mut r = Reader::new(body);
    let count = r.u2()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let inner = pool.class_name(r.u2()?)?;
        let outer_index = r.u2()?;
        let name_index = r.u2()?;
        let access = r.u2()?;
        let outer = if outer_index == 0 {
            None
        } else {
            Some(pool.class_name(outer_index)?)
        };
        let simple_name = if name_index == 0 {
            None
        } else {
            Some(pool.utf8(name_index)?.to_string())
        };
        entries.push(InnerClassEntry {
            inner,
            outer,
            simple_name,
            access,
        });
    }
    Ok(entries)
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn read(r: &mut Reader<'_>) -> Result<Self, ClassFormatError> {
        let count = r.u2()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);
        let mut index = 1u16;
        while index < count {
            let tag = r.u1()?;
            let (constant, slots) = match tag {
                1 => {
                    let len = r.u2()? as usize;
                    (Constant::Utf8(decode_modified_utf8(r.take(len)?)), 1)
                }
                3 | 4 => {
                    r.take(4)?;
                    (Constant::Other, 1)
                }
                5 | 6 => {
                    r.take(8)?;
                    (Constant::Other, 2)
                }
                7 => (
                    Constant::Class {
                        name_index: r.u2()?,
                    },
                    1,
                ),
                8 | 16 | 19 | 20 => {
                    r.take(2)?;
                    (Constant::Other, 1)
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    r.take(4)?;
                    (Constant::Other, 1)
                }
                15 => {
                    r.take(3)?;
                    (Constant::Other, 1)
                }
                _ => return Err(ClassFormatError::UnknownConstant { tag, index }),
            };
            entries.push(constant);
            if slots == 2 {
                entries.push(Constant::Unusable);
            }
            index = index.saturating_add(slots);
        }
        Ok(Self { entries })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFormatError> {
        match self.entries.get(index as usize) {
            Some(Constant::Utf8(s)) => Ok(s),
            _ => Err(ClassFormatError::BadConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    fn class_name(&self, index: u16) -> Result<TypeName, ClassFormatError> {
        match self.entries.get(index as usize) {
            Some(Constant::Class { name_index }) => Ok(TypeName::from_internal(self.utf8(*name_index)?)),
            _ => Err(ClassFormatError::BadConstant {
                index,
                expected: "Class",
            }),
        }
    }
}

// Modified UTF-8 only differs from UTF-8 for NUL and supplementary
// characters; both are rare in names, so anything undecodable is replaced.
fn decode_modified_utf8(bytes: &[u8]) -> String {
    if bytes.windows(2).any(|w| w == [0xC0, 0x80]) {
        let mut fixed = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == 0xC0 && bytes.get(i + 1) == Some(&0x80) {
                fixed.push(0);
                i += 2;
            } else {
                fixed.push(bytes[i]);
                i += 1;
            }
        }
        return String::from_utf8_lossy(&fixed).into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFormatError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(ClassFormatError::Truncated { offset: self.pos })?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u1(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, ClassFormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, ClassFormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

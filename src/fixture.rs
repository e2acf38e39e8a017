//! Minimal class file writer for unit tests.

use std::collections::HashMap;

use crate::classfile::MAGIC;

#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Pool {
    fn utf8(&mut self, s: &str) -> u16 {
        if let Some(idx) = self.utf8.get(s) {
            return *idx;
        }
        self.count += 1;
        self.bytes.push(1);
        self.bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(s.as_bytes());
        self.utf8.insert(s.to_string(), self.count);
        self.count
    }

    fn class(&mut self, internal: &str) -> u16 {
        if let Some(idx) = self.classes.get(internal) {
            return *idx;
        }
        let name = self.utf8(internal);
        self.count += 1;
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name.to_be_bytes());
        self.classes.insert(internal.to_string(), self.count);
        self.count
    }
}

struct MemberDecl {
    access: u16,
    name: String,
    descriptor: String,
    code: Option<Vec<u8>>,
}

struct InnerDecl {
    inner: String,
    outer: Option<String>,
    name: Option<String>,
    access: u16,
}

pub struct ClassBuilder {
    name: String,
    access: u16,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<MemberDecl>,
    methods: Vec<MemberDecl>,
    inner: Vec<InnerDecl>,
    source_file: Option<String>,
}

impl ClassBuilder {
    pub fn new(internal_name: &str) -> Self {
        Self {
            name: internal_name.to_string(),
            access: 0x0021,
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner: Vec::new(),
            source_file: None,
        }
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn super_class(mut self, internal: &str) -> Self {
        self.super_class = Some(internal.to_string());
        self
    }

    pub fn interface(mut self, internal: &str) -> Self {
        self.interfaces.push(internal.to_string());
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.fields.push(MemberDecl {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: None,
        });
        self
    }

    pub fn method(mut self, access: u16, name: &str, descriptor: &str, code: Option<&[u8]>) -> Self {
        self.methods.push(MemberDecl {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: code.map(<[u8]>::to_vec),
        });
        self
    }

    pub fn inner_class(mut self, inner: &str, outer: Option<&str>, name: Option<&str>, access: u16) -> Self {
        self.inner.push(InnerDecl {
            inner: inner.to_string(),
            outer: outer.map(str::to_string),
            name: name.map(str::to_string),
            access,
        });
        self
    }

    pub fn source_file(mut self, name: &str) -> Self {
        self.source_file = Some(name.to_string());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut pool = Pool::default();
        let mut body = Vec::new();

        let this = pool.class(&self.name);
        let sup = self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        body.extend_from_slice(&self.access.to_be_bytes());
        body.extend_from_slice(&this.to_be_bytes());
        body.extend_from_slice(&sup.to_be_bytes());
        body.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for iface in &self.interfaces {
            body.extend_from_slice(&pool.class(iface).to_be_bytes());
        }

        for members in [&self.fields, &self.methods] {
            body.extend_from_slice(&(members.len() as u16).to_be_bytes());
            for m in members {
                body.extend_from_slice(&m.access.to_be_bytes());
                body.extend_from_slice(&pool.utf8(&m.name).to_be_bytes());
                body.extend_from_slice(&pool.utf8(&m.descriptor).to_be_bytes());
                match &m.code {
                    Some(code) => {
                        body.extend_from_slice(&1u16.to_be_bytes());
                        body.extend_from_slice(&pool.utf8("Code").to_be_bytes());
                        let len = 2 + 2 + 4 + code.len() + 2 + 2;
                        body.extend_from_slice(&(len as u32).to_be_bytes());
                        body.extend_from_slice(&4u16.to_be_bytes());
                        body.extend_from_slice(&4u16.to_be_bytes());
                        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
                        body.extend_from_slice(code);
                        body.extend_from_slice(&0u16.to_be_bytes());
                        body.extend_from_slice(&0u16.to_be_bytes());
                    }
                    None => body.extend_from_slice(&0u16.to_be_bytes()),
                }
            }
        }

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        if !self.inner.is_empty() {
            let mut attr = Vec::new();
            attr.extend_from_slice(&(self.inner.len() as u16).to_be_bytes());
            for entry in &self.inner {
                attr.extend_from_slice(&pool.class(&entry.inner).to_be_bytes());
                let outer = entry.outer.as_deref().map(|o| pool.class(o)).unwrap_or(0);
                attr.extend_from_slice(&outer.to_be_bytes());
                let name = entry.name.as_deref().map(|n| pool.utf8(n)).unwrap_or(0);
                attr.extend_from_slice(&name.to_be_bytes());
                attr.extend_from_slice(&entry.access.to_be_bytes());
            }
            attributes.push((pool.utf8("InnerClasses"), attr));
        }
        if let Some(source) = &self.source_file {
            let idx = pool.utf8(source);
            attributes.push((pool.utf8("SourceFile"), idx.to_be_bytes().to_vec()));
        }
        body.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for (name, attr) in attributes {
            body.extend_from_slice(&name.to_be_bytes());
            body.extend_from_slice(&(attr.len() as u32).to_be_bytes());
            body.extend_from_slice(&attr);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&61u16.to_be_bytes());
        out.extend_from_slice(&(pool.count + 1).to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}

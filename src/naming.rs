//! Member renaming across a working set of classes.
//!
//! The pass has to see every class of the set before any of them is
//! analysed: a subclass only picks up the new name of an overridden method
//! if its supertype was part of the same pass (or of an earlier one).

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::classfile::{ClassFile, access};
use crate::types::{TypeName, is_java_identifier, parameter_part};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamingRules {
    pub duplicate_members: bool,
    pub enum_members: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ClassRenames {
    fields: BTreeMap<String, String>,
    methods: BTreeMap<String, String>,
}

/// Renames assigned so far in this session, keyed by declaring type.
#[derive(Debug, Default)]
pub struct NamingState {
    classes: HashMap<TypeName, ClassRenames>,
}

fn field_key(name: &str, descriptor: &str) -> String {
    format!("{name}:{descriptor}")
}

fn method_key(name: &str, descriptor: &str) -> String {
    format!("{name}{descriptor}")
}

impl NamingState {
    pub fn field_name(&self, ty: &TypeName, name: &str, descriptor: &str) -> Option<&str> {
        self.classes
            .get(ty)?
            .fields
            .get(&field_key(name, descriptor))
            .map(String::as_str)
    }

    pub fn method_name(&self, ty: &TypeName, name: &str, descriptor: &str) -> Option<&str> {
        self.classes
            .get(ty)?
            .methods
            .get(&method_key(name, descriptor))
            .map(String::as_str)
    }

    pub fn renamed_members(&self) -> usize {
        self.classes
            .values()
            .map(|c| c.fields.len() + c.methods.len())
            .sum()
    }

    /// Assigns names for every class in `set`.
    ///
    /// Supertypes are handled before subtypes so overrides inherit the new
    /// name. The outcome for a class depends only on the set (and on renames
    /// recorded for supertypes outside it), so running twice is harmless.
    pub fn resolve(&mut self, set: &[&ClassFile], rules: NamingRules) {
        let by_type: BTreeMap<&TypeName, &ClassFile> = set.iter().map(|&cf| (&cf.this_class, cf)).collect();

        let mut order = Vec::with_capacity(by_type.len());
        let mut visited = HashSet::new();
        for &ty in by_type.keys() {
            visit_supertypes_first(ty, &by_type, &mut visited, &mut order);
        }

        for ty in order {
            let cf = by_type[ty];
            let renames = self.assign(cf, &by_type, rules);
            if renames.fields.is_empty() && renames.methods.is_empty() {
                self.classes.remove(ty);
            } else {
                debug!(
                    class = %ty,
                    fields = renames.fields.len(),
                    methods = renames.methods.len(),
                    "assigned member renames"
                );
                self.classes.insert(ty.clone(), renames);
            }
        }
    }

    fn assign(&self, cf: &ClassFile, by_type: &BTreeMap<&TypeName, &ClassFile>, rules: NamingRules) -> ClassRenames {
        let mut renames = ClassRenames::default();

        let mut method_names: HashSet<String> = cf.methods.iter().map(|m| m.name.clone()).collect();
        let mut seen_signatures: HashSet<(String, String)> = HashSet::new();
        for method in cf.methods.iter().filter(|m| !m.name.starts_with('<')) {
            let key = method_key(&method.name, &method.descriptor);
            if let Some(inherited) = self.inherited_method_name(cf, &method.name, &method.descriptor, by_type) {
                method_names.insert(inherited.clone());
                renames.methods.insert(key, inherited);
                continue;
            }
            let signature = (method.name.clone(), parameter_part(&method.descriptor).to_string());
            if !seen_signatures.insert(signature) && rules.duplicate_members {
                let fresh = fresh_name(&method.name, &method_names);
                method_names.insert(fresh.clone());
                renames.methods.insert(key, fresh);
            }
        }

        let mut field_names: HashSet<String> = cf.fields.iter().map(|f| f.name.clone()).collect();
        if rules.enum_members && cf.has_flag(access::ENUM) {
            let constants = cf.fields.iter().filter(|f| f.has_flag(access::ENUM));
            let mut seen = HashSet::new();
            for (ordinal, field) in constants.enumerate() {
                if is_java_identifier(&field.name) && seen.insert(field.name.as_str()) {
                    continue;
                }
                let mut fresh = format!("CONSTANT_{ordinal}");
                let mut n = 1;
                while field_names.contains(&fresh) {
                    fresh = format!("CONSTANT_{ordinal}_{n}");
                    n += 1;
                }
                field_names.insert(fresh.clone());
                renames
                    .fields
                    .insert(field_key(&field.name, &field.descriptor), fresh);
            }
        }

        if rules.duplicate_members {
            let mut seen: HashSet<&str> = HashSet::new();
            for field in &cf.fields {
                let key = field_key(&field.name, &field.descriptor);
                if renames.fields.contains_key(&key) {
                    continue;
                }
                if !seen.insert(field.name.as_str()) {
                    let fresh = fresh_name(&field.name, &field_names);
                    field_names.insert(fresh.clone());
                    renames.fields.insert(key, fresh);
                }
            }
        }

        renames
    }

    fn inherited_method_name(
        &self,
        cf: &ClassFile,
        name: &str,
        descriptor: &str,
        by_type: &BTreeMap<&TypeName, &ClassFile>,
    ) -> Option<String> {
        let mut pending: Vec<&TypeName> = supertypes(cf).collect();
        let mut visited = HashSet::new();
        while let Some(ty) = pending.pop() {
            if !visited.insert(ty) {
                continue;
            }
            if let Some(found) = self.method_name(ty, name, descriptor) {
                return Some(found.to_string());
            }
            if let Some(&parent) = by_type.get(ty) {
                pending.extend(supertypes(parent));
            }
        }
        None
    }
}

fn supertypes(cf: &ClassFile) -> impl Iterator<Item = &TypeName> {
    cf.super_class.iter().chain(cf.interfaces.iter())
}

fn visit_supertypes_first<'a>(
    ty: &'a TypeName,
    by_type: &BTreeMap<&'a TypeName, &'a ClassFile>,
    visited: &mut HashSet<&'a TypeName>,
    order: &mut Vec<&'a TypeName>,
) {
    if !visited.insert(ty) {
        return;
    }
    let Some(&cf) = by_type.get(ty) else {
        return;
    };
    for parent in supertypes(cf) {
        if by_type.contains_key(parent) {
            visit_supertypes_first(parent, by_type, visited, order);
        }
    }
    order.push(ty);
}

fn fresh_name(base: &str, taken: &HashSet<String>) -> String {
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::ClassBuilder;

    fn parse(bytes: Vec<u8>) -> ClassFile {
        ClassFile::parse(&bytes).unwrap()
    }

    const ALL: NamingRules = NamingRules {
        duplicate_members: true,
        enum_members: true,
    };

    #[test]
    fn renames_duplicate_fields_and_return_type_overloads() {
        let cf = parse(
            ClassBuilder::new("a/Obf")
                .field(0, "a", "I")
                .field(0, "a", "Ljava/lang/String;")
                .field(0, "a_1", "J")
                .method(0, "f", "()I", None)
                .method(0, "f", "()Ljava/lang/String;", None)
                .method(0, "f", "(I)I", None)
                .build(),
        );
        let mut state = NamingState::default();
        state.resolve(&[&cf], ALL);

        let ty = TypeName::new("a.Obf");
        assert_eq!(state.field_name(&ty, "a", "I"), None);
        assert_eq!(state.field_name(&ty, "a", "Ljava/lang/String;"), Some("a_2"));
        assert_eq!(state.method_name(&ty, "f", "()I"), None);
        assert_eq!(state.method_name(&ty, "f", "()Ljava/lang/String;"), Some("f_1"));
        assert_eq!(state.method_name(&ty, "f", "(I)I"), None);
    }

    #[test]
    fn overrides_inherit_renames_only_when_the_supertype_is_visible() {
        let base = parse(
            ClassBuilder::new("a/Base")
                .method(0, "m", "()I", None)
                .method(0, "m", "()J", None)
                .build(),
        );
        let sub = parse(
            ClassBuilder::new("a/Sub")
                .super_class("a/Base")
                .method(0, "m", "()J", None)
                .build(),
        );
        let sub_ty = TypeName::new("a.Sub");

        let mut partial = NamingState::default();
        partial.resolve(&[&sub], ALL);
        assert_eq!(partial.method_name(&sub_ty, "m", "()J"), None);

        let mut full = NamingState::default();
        // Subclass listed first: ordering inside the set must not matter.
        full.resolve(&[&sub, &base], ALL);
        assert_eq!(full.method_name(&sub_ty, "m", "()J"), Some("m_1"));
    }

    #[test]
    fn enum_constants_with_illegal_names_are_renamed() {
        let cf = parse(
            ClassBuilder::new("a/Color")
                .access(access::PUBLIC | access::FINAL | access::ENUM)
                .super_class("java/lang/Enum")
                .field(access::ENUM | access::STATIC, "RED", "La/Color;")
                .field(access::ENUM | access::STATIC, "if", "La/Color;")
                .field(access::ENUM | access::STATIC, "GREEN", "La/Color;")
                .build(),
        );
        let mut state = NamingState::default();
        state.resolve(
            &[&cf],
            NamingRules {
                duplicate_members: false,
                enum_members: true,
            },
        );
        let ty = TypeName::new("a.Color");
        assert_eq!(state.field_name(&ty, "RED", "La/Color;"), None);
        assert_eq!(state.field_name(&ty, "if", "La/Color;"), Some("CONSTANT_1"));
        assert_eq!(state.field_name(&ty, "GREEN", "La/Color;"), None);
    }

    #[test]
    fn resolving_twice_gives_the_same_assignments() {
        let cf = parse(
            ClassBuilder::new("a/Obf")
                .method(0, "f", "()I", None)
                .method(0, "f", "()J", None)
                .build(),
        );
        let mut state = NamingState::default();
        state.resolve(&[&cf], ALL);
        let first = state.classes.clone();
        state.resolve(&[&cf], ALL);
        assert_eq!(state.classes, first);
        assert_eq!(state.renamed_members(), 1);
    }
}

//! Type usage collection: which types a class mentions, and how each one is
//! spelled in the printed output.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::analysis::ClassModel;
use crate::types::{JavaType, TypeName};

const JAVA_LANG: &str = "java.lang";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeUsage {
    imports: BTreeSet<TypeName>,
    spelled: HashMap<TypeName, String>,
}

impl TypeUsage {
    pub fn collect(model: &ClassModel) -> Self {
        let mut used = BTreeSet::new();
        gather(model, &mut used);

        let this_top = model.ty.outermost();
        let this_package = model.ty.package();

        // Simple names of every outermost type in play; a name claimed by two
        // different types cannot be imported for either.
        let mut by_simple: BTreeMap<&str, BTreeSet<TypeName>> = BTreeMap::new();
        let tops: Vec<(TypeName, TypeName)> = used.iter().map(|t| (t.clone(), t.outermost())).collect();
        for (_, top) in &tops {
            by_simple.entry(top.simple_name()).or_default().insert(top.clone());
        }
        by_simple
            .entry(this_top.simple_name())
            .or_default()
            .insert(this_top.clone());

        let mut imports = BTreeSet::new();
        let mut spelled = HashMap::new();
        for (ty, top) in &tops {
            let clashes = by_simple.get(top.simple_name()).is_some_and(|s| s.len() > 1);
            let short = ty.simple_name().replace('$', ".");
            let spelling = if *top == this_top {
                short
            } else if clashes {
                ty.java_name()
            } else if top.package().is_none()
                || top.package() == this_package
                || top.package() == Some(JAVA_LANG)
            {
                // Default-package types cannot be imported.
                short
            } else {
                imports.insert(top.clone());
                short
            };
            spelled.insert(ty.clone(), spelling);
        }

        Self {
            imports,
            spelled,
        }
    }

    pub fn imports(&self) -> impl Iterator<Item = &TypeName> {
        self.imports.iter()
    }

    /// How `ty` is written in source; types never collected print in full.
    pub fn spell(&self, ty: &TypeName) -> String {
        self.spelled.get(ty).cloned().unwrap_or_else(|| ty.java_name())
    }

    pub fn spell_type(&self, ty: &JavaType) -> String {
        match ty {
            JavaType::Primitive(p) => p.keyword().to_string(),
            JavaType::Object(name) => self.spell(name),
            JavaType::Array(component) => format!("{}[]", self.spell_type(component)),
        }
    }
}

fn gather(model: &ClassModel, used: &mut BTreeSet<TypeName>) {
    let mut add = |ty: &JavaType| {
        if let Some(name) = ty.referenced_type() {
            used.insert(name.clone());
        }
    };
    model.super_class.iter().for_each(&mut add);
    model.interfaces.iter().for_each(&mut add);
    model.fields.iter().for_each(|f| add(&f.ty));
    for method in &model.methods {
        method.return_type.iter().for_each(&mut add);
        method.params.iter().for_each(&mut add);
    }
    for inner in &model.inner {
        used.insert(inner.ty.clone());
        gather(inner, used);
    }
    used.insert(model.ty.clone());
}

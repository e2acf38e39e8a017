use tracing::debug;

use crate::analysis::{ClassModel, analyse_class};
use crate::cache::{ClassCache, UnitId, UnitState};
use crate::config::Options;
use crate::error::{AnalysisError, LoadError};
use crate::naming::NamingState;

/// State for one invocation: options, the class cache and assigned names.
///
/// Nothing here outlives the run that created it.
#[derive(Debug)]
pub struct AnalysisSession {
    options: Options,
    cache: ClassCache,
    naming: NamingState,
}

impl AnalysisSession {
    pub fn new(options: Options) -> Result<Self, LoadError> {
        let mut cache = ClassCache::new();
        for path in &options.extra_classpath {
            cache.add_classpath(path)?;
        }
        Ok(Self {
            options,
            cache,
            naming: NamingState::default(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn cache(&self) -> &ClassCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ClassCache {
        &mut self.cache
    }

    /// Runs the naming pass over `ids` with the configured rules. Must run
    /// before any unit of the set is analysed.
    pub fn resolve_names(&mut self, ids: &[UnitId]) {
        let set: Vec<_> = ids.iter().map(|&id| &self.cache.unit(id).class_file).collect();
        self.naming.resolve(&set, self.options.naming_rules());
        debug!(classes = set.len(), renamed = self.naming.renamed_members(), "naming pass done");
    }

    /// Builds the model of `id`, nested units first.
    pub fn analyse(&mut self, id: UnitId) -> Result<(), AnalysisError> {
        let model = self.build_model(id)?;
        let unit = self.cache.unit_mut(id);
        unit.model = Some(model);
        unit.state = UnitState::Analysed;
        Ok(())
    }

    pub fn model(&self, id: UnitId) -> Result<&ClassModel, AnalysisError> {
        let unit = self.cache.unit(id);
        if unit.is_released() {
            return Err(AnalysisError::Released);
        }
        unit.model.as_ref().ok_or(AnalysisError::NotAnalysed)
    }

    pub fn mark_dumped(&mut self, id: UnitId) {
        self.cache.unit_mut(id).state = UnitState::Dumped;
    }

    fn build_model(&self, id: UnitId) -> Result<ClassModel, AnalysisError> {
        let unit = self.cache.unit(id);
        if unit.is_released() {
            return Err(AnalysisError::Released);
        }
        let inner = unit
            .inner_units
            .iter()
            .map(|&nested| self.build_model(nested))
            .collect::<Result<Vec<_>, _>>()?;
        analyse_class(&unit.class_file, &self.naming, inner)
    }
}

//! Component fan-out: routes named components to their own outlets.
//!
//! Steady-state only. All inlets are merged into the last outlet first; each
//! split key then moves its components entirely (split = 1) from that merged
//! stream into its own outlet. The last outlet keeps everything not claimed.

use std::collections::HashSet;
use std::sync::Arc;

use sf_core::ComponentRegistry;

use crate::error::{UnitError, UnitResult};
use crate::material::MaterialFlow;
use crate::traits::SteadyUnit;

/// One outlet's worth of components: a single id or a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitKey(Vec<String>);

impl SplitKey {
    pub fn single(id: impl Into<String>) -> Self {
        Self(vec![id.into()])
    }

    pub fn group<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for SplitKey {
    fn from(id: &str) -> Self {
        Self::single(id)
    }
}

impl<const N: usize> From<[&str; N]> for SplitKey {
    fn from(ids: [&str; N]) -> Self {
        Self::group(ids)
    }
}

impl From<Vec<String>> for SplitKey {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

/// Fan-out of components into `keys.len() + 1` outlets.
#[derive(Debug, Clone)]
pub struct ComponentSplitter {
    name: String,
    registry: Arc<ComponentRegistry>,
    keys: Vec<SplitKey>,
    /// Registry indices of each key's components.
    key_indices: Vec<Vec<usize>>,
}

impl ComponentSplitter {
    /// # Errors
    /// `Configuration` if `keys` is empty, names an unknown component, or
    /// lists a component more than once.
    pub fn new(
        name: impl Into<String>,
        registry: Arc<ComponentRegistry>,
        keys: Vec<SplitKey>,
    ) -> UnitResult<Self> {
        if keys.is_empty() {
            return Err(UnitError::config("split keys cannot be empty"));
        }
        let key_indices = resolve_keys(&registry, &keys)?;
        Ok(Self {
            name: name.into(),
            registry,
            keys,
            key_indices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn split_keys(&self) -> &[SplitKey] {
        &self.keys
    }

    /// Replace the split keys. The outlet count is fixed at construction, so
    /// the new keys must have the same length. On error nothing changes.
    pub fn set_split_keys(&mut self, keys: Vec<SplitKey>) -> UnitResult<()> {
        if keys.len() != self.keys.len() {
            return Err(UnitError::config(format!(
                "size of split keys cannot change after construction (was {}, got {})",
                self.keys.len(),
                keys.len()
            )));
        }
        let key_indices = resolve_keys(&self.registry, &keys)?;
        self.keys = keys;
        self.key_indices = key_indices;
        Ok(())
    }
}

fn resolve_keys(registry: &ComponentRegistry, keys: &[SplitKey]) -> UnitResult<Vec<Vec<usize>>> {
    let mut seen = HashSet::new();
    keys.iter()
        .map(|key| -> UnitResult<Vec<usize>> {
            if key.ids().is_empty() {
                return Err(UnitError::config("a split key must name at least one component"));
            }
            key.ids()
                .iter()
                .map(|id| {
                    let i = registry
                        .index_of(id)
                        .ok_or_else(|| UnitError::config(format!("unknown component '{id}' in split keys")))?;
                    if !seen.insert(i) {
                        return Err(UnitError::config(format!(
                            "component '{id}' appears more than once in split keys"
                        )));
                    }
                    Ok(i)
                })
                .collect()
        })
        .collect()
}

impl SteadyUnit for ComponentSplitter {
    fn n_outs(&self) -> usize {
        self.keys.len() + 1
    }

    fn run(&self, ins: &[MaterialFlow]) -> UnitResult<Vec<MaterialFlow>> {
        let mut rest = MaterialFlow::mix(ins)?;
        if rest.len() != self.registry.len() {
            return Err(UnitError::ShapeMismatch {
                expected: self.registry.len(),
                actual: rest.len(),
            });
        }

        let mut outs = Vec::with_capacity(self.n_outs());
        for indices in &self.key_indices {
            let mut out = MaterialFlow::zeros(rest.len());
            for &i in indices {
                out.set(i, rest.get(i));
                rest.set(i, 0.0);
            }
            outs.push(out);
        }
        outs.push(rest);
        Ok(outs)
    }
}

//! Ordered registry of tracked components.
//!
//! The registry fixes the layout of every state vector in a network:
//! entry `i` is the concentration of `ids()[i]` and the trailing entry is the
//! total volumetric flow. It is built once and shared read-only by all units.

use std::collections::HashMap;

use crate::error::{SfError, SfResult};

/// Reserved label of the flow entry in a labeled state.
pub const FLOW_LABEL: &str = "Q";

/// Immutable, ordered list of component identities plus the designated solvent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRegistry {
    ids: Vec<String>,
    lookup: HashMap<String, usize>,
    solvent: usize,
}

impl ComponentRegistry {
    /// Build a registry from ordered component ids.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the list is empty, contains duplicates or the
    /// reserved flow label, or if `solvent` is not one of the ids.
    pub fn new<I, S>(ids: I, solvent: &str) -> SfResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(SfError::InvalidArg {
                what: "component registry cannot be empty".to_string(),
            });
        }

        let mut lookup = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if id == FLOW_LABEL {
                return Err(SfError::InvalidArg {
                    what: format!("component id '{FLOW_LABEL}' is reserved for the flow entry"),
                });
            }
            if lookup.insert(id.clone(), i).is_some() {
                return Err(SfError::InvalidArg {
                    what: format!("duplicate component id '{id}'"),
                });
            }
        }

        let solvent = *lookup.get(solvent).ok_or_else(|| SfError::InvalidArg {
            what: format!("solvent '{solvent}' is not a registered component"),
        })?;

        Ok(Self {
            ids,
            lookup,
            solvent,
        })
    }

    /// Number of tracked components.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Component ids in state-vector order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    /// Like `index_of`, but unknown ids are an error.
    pub fn require_index(&self, id: &str) -> SfResult<usize> {
        self.index_of(id).ok_or_else(|| SfError::InvalidArg {
            what: format!("unknown component '{id}'"),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    pub fn solvent(&self) -> &str {
        &self.ids[self.solvent]
    }

    pub fn solvent_index(&self) -> usize {
        self.solvent
    }

    /// Length of a state vector: one entry per component plus flow.
    pub fn state_len(&self) -> usize {
        self.ids.len() + 1
    }

    /// Position of the flow entry in a state vector.
    pub fn flow_index(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_declaration_order() {
        let reg = ComponentRegistry::new(["S_S", "X_S", "H2O"], "H2O").unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.state_len(), 4);
        assert_eq!(reg.flow_index(), 3);
        assert_eq!(reg.index_of("X_S"), Some(1));
        assert_eq!(reg.solvent(), "H2O");
        assert_eq!(reg.solvent_index(), 2);
        assert!(reg.index_of("S_O").is_none());
    }

    #[test]
    fn rejects_bad_definitions() {
        assert!(ComponentRegistry::new(Vec::<String>::new(), "H2O").is_err());
        assert!(ComponentRegistry::new(["A", "A", "H2O"], "H2O").is_err());
        assert!(ComponentRegistry::new(["A", "B"], "H2O").is_err());
        assert!(ComponentRegistry::new(["A", "Q", "H2O"], "H2O").is_err());
    }

    #[test]
    fn require_index_reports_unknown_id() {
        let reg = ComponentRegistry::new(["A", "H2O"], "H2O").unwrap();
        let err = reg.require_index("B").unwrap_err();
        assert!(err.to_string().contains("unknown component 'B'"));
    }

    proptest::proptest! {
        #[test]
        fn index_of_inverts_declaration_order(
            ids in proptest::collection::hash_set("[A-Z]_[A-Za-z]{1,4}", 1..12)
        ) {
            let ids: Vec<String> = ids.into_iter().collect();
            let solvent = ids[ids.len() - 1].clone();
            let reg = ComponentRegistry::new(ids.clone(), &solvent).unwrap();
            for (i, id) in ids.iter().enumerate() {
                proptest::prop_assert_eq!(reg.index_of(id), Some(i));
            }
            proptest::prop_assert_eq!(reg.solvent_index(), ids.len() - 1);
            proptest::prop_assert_eq!(reg.flow_index(), ids.len());
        }
    }
}

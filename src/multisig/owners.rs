//! Owner registry
//!
//! The authoritative owner set and the confirmation threshold M. Changes are
//! only applied by the engine once a registry operation reaches quorum; the
//! `check_*` methods let a proposal be rejected before it is ever recorded.

use crate::core::Address;
use crate::multisig::config::{WalletConfig, MAX_OWNERS};
use crate::multisig::MultisigError;
use serde::{Deserialize, Serialize};

/// Owner set with its confirmation threshold
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerRegistry {
    owners: Vec<Address>,
    threshold: u32,
}

impl OwnerRegistry {
    /// Build a registry from a validated configuration
    pub fn from_config(config: &WalletConfig) -> Result<Self, MultisigError> {
        config.validate()?;
        Ok(Self {
            owners: config.owners.clone(),
            threshold: config.threshold,
        })
    }

    pub fn is_owner(&self, id: &Address) -> bool {
        self.owners.contains(id)
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Owner at `index` in registration order
    pub fn owner_at(&self, index: usize) -> Option<&Address> {
        self.owners.get(index)
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn check_add(&self, owner: &Address) -> Result<(), MultisigError> {
        if self.is_owner(owner) {
            return Err(MultisigError::OwnerExists(owner.clone()));
        }
        if self.owners.len() >= MAX_OWNERS {
            return Err(MultisigError::TooManyOwners(MAX_OWNERS));
        }
        Ok(())
    }

    pub fn check_remove(&self, owner: &Address) -> Result<(), MultisigError> {
        if !self.is_owner(owner) {
            return Err(MultisigError::OwnerNotFound(owner.clone()));
        }
        if self.owners.len() == 1 {
            return Err(MultisigError::LastOwner);
        }
        let remaining = self.owners.len() - 1;
        if (self.threshold as usize) > remaining {
            return Err(MultisigError::InvalidThreshold(format!(
                "removing {} would leave {} owners below threshold {}",
                owner, remaining, self.threshold
            )));
        }
        Ok(())
    }

    pub fn check_replace(&self, old: &Address, new: &Address) -> Result<(), MultisigError> {
        if !self.is_owner(old) {
            return Err(MultisigError::OwnerNotFound(old.clone()));
        }
        if self.is_owner(new) {
            return Err(MultisigError::OwnerExists(new.clone()));
        }
        Ok(())
    }

    pub fn check_threshold(&self, threshold: u32) -> Result<(), MultisigError> {
        if threshold == 0 {
            return Err(MultisigError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }
        if threshold as usize > self.owners.len() {
            return Err(MultisigError::InvalidThreshold(format!(
                "threshold {} exceeds owner count {}",
                threshold,
                self.owners.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn add(&mut self, owner: &Address) -> Result<(), MultisigError> {
        self.check_add(owner)?;
        self.owners.push(owner.clone());
        Ok(())
    }

    pub(crate) fn remove(&mut self, owner: &Address) -> Result<(), MultisigError> {
        self.check_remove(owner)?;
        self.owners.retain(|o| o != owner);
        Ok(())
    }

    /// Replace `old` in place, keeping its index
    pub(crate) fn replace(&mut self, old: &Address, new: &Address) -> Result<(), MultisigError> {
        self.check_replace(old, new)?;
        if let Some(slot) = self.owners.iter_mut().find(|o| *o == old) {
            *slot = new.clone();
        }
        Ok(())
    }

    pub(crate) fn set_threshold(&mut self, threshold: u32) -> Result<(), MultisigError> {
        self.check_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(threshold: u32) -> OwnerRegistry {
        let config = WalletConfig::new(
            vec!["1Alice".into(), "1Bob".into(), "1Carol".into()],
            threshold,
            0,
        )
        .unwrap();
        OwnerRegistry::from_config(&config).unwrap()
    }

    #[test]
    fn test_queries() {
        let registry = registry(2);
        assert!(registry.is_owner(&"1Bob".into()));
        assert!(!registry.is_owner(&"1Mallory".into()));
        assert_eq!(registry.owner_count(), 3);
        assert_eq!(registry.owner_at(2), Some(&Address::from("1Carol")));
        assert_eq!(registry.owner_at(3), None);
    }

    #[test]
    fn test_add_and_replace() {
        let mut registry = registry(2);

        registry.add(&"1Dave".into()).unwrap();
        assert_eq!(registry.owner_count(), 4);
        assert!(matches!(
            registry.add(&"1Dave".into()),
            Err(MultisigError::OwnerExists(_))
        ));

        registry.replace(&"1Bob".into(), &"1Eve".into()).unwrap();
        assert_eq!(registry.owner_at(1), Some(&Address::from("1Eve")));
        assert!(matches!(
            registry.replace(&"1Bob".into(), &"1Frank".into()),
            Err(MultisigError::OwnerNotFound(_))
        ));
        assert!(matches!(
            registry.replace(&"1Alice".into(), &"1Eve".into()),
            Err(MultisigError::OwnerExists(_))
        ));
    }

    #[test]
    fn test_remove_respects_threshold() {
        let mut registry = registry(3);
        assert!(matches!(
            registry.remove(&"1Alice".into()),
            Err(MultisigError::InvalidThreshold(_))
        ));

        registry.set_threshold(2).unwrap();
        registry.remove(&"1Alice".into()).unwrap();
        assert_eq!(registry.owner_count(), 2);
        assert!(registry.remove(&"1Alice".into()).is_err());
    }

    #[test]
    fn test_last_owner_cannot_be_removed() {
        let config = WalletConfig::new(vec!["1Solo".into()], 1, 0).unwrap();
        let mut registry = OwnerRegistry::from_config(&config).unwrap();
        assert!(matches!(
            registry.remove(&"1Solo".into()),
            Err(MultisigError::LastOwner)
        ));
    }

    #[test]
    fn test_threshold_bounds() {
        let mut registry = registry(2);
        assert!(registry.set_threshold(0).is_err());
        assert!(registry.set_threshold(4).is_err());
        registry.set_threshold(3).unwrap();
        assert_eq!(registry.threshold(), 3);
    }
}

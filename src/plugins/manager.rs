use std::collections::BTreeSet;
use std::str::FromStr;

use super::scanners::{
    AlternateScanner, AmdScanner, CaseKingScanner, CybertekScanner, DummyScanner, GrosBillScanner,
    HardwareFrScanner, LdlcScanner, MaterielNetScanner, NvidiaScanner, RueDuCommerceScanner,
    TopAchatScanner,
};
use super::traits::ScannerDescriptor;
use crate::config::ScraperConfig;
use crate::utils::error::AppError;

/// Which scanners a run should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Keys(BTreeSet<String>),
}

impl Selection {
    /// `"all"` or a comma-separated list of store keys.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let keys: BTreeSet<String> = text
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(AppError::Validation("No store selected".to_string()));
        }
        if keys.contains("all") {
            return Ok(Selection::All);
        }
        Ok(Selection::Keys(keys))
    }

    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Selection::Keys(keys.into_iter().map(|k| k.as_ref().to_lowercase()).collect())
    }
}

impl FromStr for Selection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selection::parse(s)
    }
}

/// Scanners available to this process, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ScannerRegistry {
    scanners: Vec<ScannerDescriptor>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in store.
    pub fn with_default_scanners(config: &ScraperConfig) -> Result<Self, AppError> {
        let mut registry = Self::new();
        registry.register(ScannerDescriptor::new(AlternateScanner::new(&config.alternate_locale)))?;
        registry.register(ScannerDescriptor::new(AmdScanner::new()))?;
        registry.register(ScannerDescriptor::new(CaseKingScanner::new()))?;
        registry.register(ScannerDescriptor::new(CybertekScanner::new()))?;
        registry.register(ScannerDescriptor::new(GrosBillScanner::new()))?;
        registry.register(ScannerDescriptor::new(HardwareFrScanner::new()))?;
        registry.register(ScannerDescriptor::new(LdlcScanner::new()))?;
        registry.register(ScannerDescriptor::new(MaterielNetScanner::new()))?;
        registry.register(ScannerDescriptor::new(NvidiaScanner::new()))?;
        registry.register(ScannerDescriptor::new(RueDuCommerceScanner::new()))?;
        registry.register(ScannerDescriptor::new(TopAchatScanner::new()))?;

        if config.include_dummy {
            registry.register(ScannerDescriptor::new(
                DummyScanner::default().with_delay(config.dummy_delay()),
            ))?;
        }

        tracing::debug!(scanners = registry.len(), "registered default scanners");
        Ok(registry)
    }

    /// Register a scanner. Keys are unique.
    pub fn register(&mut self, descriptor: ScannerDescriptor) -> Result<(), AppError> {
        if self.has_scanner(descriptor.key()) {
            return Err(AppError::DuplicateScanner {
                key: descriptor.key().to_string(),
            });
        }
        self.scanners.push(descriptor);
        Ok(())
    }

    /// Check if a scanner exists
    pub fn has_scanner(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.scanners.iter().any(|s| s.key() == key)
    }

    /// All registered keys, in registration order
    pub fn keys(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.key()).collect()
    }

    pub fn scanners(&self) -> &[ScannerDescriptor] {
        &self.scanners
    }

    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Resolve a selection to descriptors in registration order. Every
    /// requested key must be registered.
    pub fn select(&self, selection: &Selection) -> Result<Vec<ScannerDescriptor>, AppError> {
        match selection {
            Selection::All => Ok(self.scanners.clone()),
            Selection::Keys(keys) => {
                if let Some(unknown) = keys.iter().find(|k| !self.has_scanner(k)) {
                    return Err(AppError::UnknownScanner {
                        key: unknown.clone(),
                    });
                }
                Ok(self
                    .scanners
                    .iter()
                    .filter(|s| keys.contains(s.key()))
                    .cloned()
                    .collect())
            }
        }
    }
}

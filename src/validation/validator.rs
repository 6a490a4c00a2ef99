use crate::error::{CompositionError, Result};
use crate::stack::ConsoleStack;
use crate::validation::rules::{
    AppRootConsistencyRule, BranchUrlRule, CredentialChannelRule, LeastPrivilegeLoggingRule,
    NoInlineSecretsRule, PlatformOverridesRule, ValidationRule,
};
use tracing::debug;

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, stack: &ConsoleStack) -> Result<()> {
        for rule in &self.rules {
            if let Err(e) = rule.validate(stack) {
                return Err(CompositionError::Validation {
                    rule: rule.name(),
                    message: e.to_string(),
                });
            }
            debug!(rule = rule.name(), "Validation rule passed");
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(LeastPrivilegeLoggingRule),
                Box::new(CredentialChannelRule),
                Box::new(AppRootConsistencyRule),
                Box::new(NoInlineSecretsRule),
                Box::new(BranchUrlRule),
                Box::new(PlatformOverridesRule),
            ],
        }
    }
}

//! GitHub source binding

use crate::error::{CompositionError, Result};
use crate::resources::refs::SecretValueRef;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn github_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("static regex"))
}

/// Repository the platform pulls from, plus the credential it pulls with.
///
/// Only the shape of owner and repository is checked. A missing repository or
/// a bad token surfaces on the hosting platform at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceBinding {
    pub owner: String,
    pub repository: String,
    pub oauth_token: SecretValueRef,
}

impl SourceBinding {
    pub fn github(owner: &str, repository: &str, oauth_token: SecretValueRef) -> Result<Self> {
        check_name("source.owner", owner)?;
        check_name("source.repository", repository)?;
        if oauth_token.secret_id.is_empty() || oauth_token.json_field.is_empty() {
            return Err(CompositionError::MissingInput("source.oauth_token"));
        }
        Ok(Self {
            owner: owner.to_string(),
            repository: repository.to_string(),
            oauth_token,
        })
    }

    pub fn repository_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repository)
    }
}

fn check_name(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CompositionError::MissingInput(field));
    }
    if !github_name_pattern().is_match(value) {
        return Err(CompositionError::InvalidInput {
            field,
            reason: format!("'{}' is not a valid GitHub name", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SecretValueRef {
        SecretValueRef::new("github-token", "token")
    }

    #[test]
    fn test_binding_references_exact_pair() {
        let source = SourceBinding::github("acme", "app", token()).unwrap();
        assert_eq!(source.owner, "acme");
        assert_eq!(source.repository, "app");
        assert_eq!(source.repository_url(), "https://github.com/acme/app");
    }

    #[test]
    fn test_empty_owner_is_missing_input() {
        assert!(matches!(
            SourceBinding::github("", "app", token()),
            Err(CompositionError::MissingInput("source.owner"))
        ));
    }

    #[test]
    fn test_rejects_path_injection() {
        assert!(SourceBinding::github("acme", "app/../other", token()).is_err());
    }

    #[test]
    fn test_rejects_empty_token_field() {
        let result = SourceBinding::github("acme", "app", SecretValueRef::new("github-token", ""));
        assert!(result.is_err());
    }
}

//! References to credentials stored outside the configuration
//!
//! Only identifiers are held here. Values are fetched at build time by the
//! execution identity through the read grants recorded on each reference.

use crate::arn::{Arn, ArnError, Environment};
use crate::resources::policy::{PolicyDocument, PolicyStatement, Principal};
use serde::Serialize;

pub const SECRET_READ_ACTIONS: &[&str] = &["secretsmanager:GetSecretValue", "secretsmanager:DescribeSecret"];

pub const PARAMETER_READ_ACTIONS: &[&str] = &[
    "ssm:DescribeParameters",
    "ssm:GetParameters",
    "ssm:GetParameter",
    "ssm:GetParameterHistory",
];

/// A secret in the secret store, referenced by ARN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretRef {
    pub arn: Arn,
    pub resource_policy: PolicyDocument,
}

impl SecretRef {
    pub fn from_arn(value: &str) -> Result<Self, ArnError> {
        let arn = Arn::parse(value)?;
        if arn.service != "secretsmanager" || !arn.resource.starts_with("secret:") {
            return Err(ArnError::Malformed {
                value: value.to_string(),
                reason: "expected a secretsmanager secret ARN".to_string(),
            });
        }
        Ok(Self {
            arn,
            resource_policy: PolicyDocument::default(),
        })
    }

    /// Region the secret lives in, used by the fetch command.
    pub fn region(&self) -> &str {
        &self.arn.region
    }

    pub(crate) fn add_read_grant(&mut self, principal: &Arn) {
        self.resource_policy.statement.push(
            PolicyStatement::allow(SECRET_READ_ACTIONS, vec![self.arn.to_string()])
                .with_principal(Principal::Aws(principal.to_string())),
        );
    }
}

/// A named parameter in the parameter store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterRef {
    pub name: String,
    pub arn: Arn,
    pub resource_policy: PolicyDocument,
}

impl ParameterRef {
    /// Names may be given with or without the leading slash; the ARN never carries it twice.
    pub fn named(name: &str, env: &Environment) -> Result<Self, ArnError> {
        if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ArnError::Malformed {
                value: name.to_string(),
                reason: "parameter name must be non-empty and contain no whitespace".to_string(),
            });
        }
        let resource = format!("parameter/{}", name.trim_start_matches('/'));
        Ok(Self {
            name: name.to_string(),
            arn: env.arn("ssm", &resource),
            resource_policy: PolicyDocument::default(),
        })
    }

    pub fn region(&self) -> &str {
        &self.arn.region
    }

    pub(crate) fn add_read_grant(&mut self, principal: &Arn) {
        self.resource_policy.statement.push(
            PolicyStatement::allow(PARAMETER_READ_ACTIONS, vec![self.arn.to_string()])
                .with_principal(Principal::Aws(principal.to_string())),
        );
    }
}

/// A single JSON field of a secret, resolved by the deployment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretValueRef {
    pub secret_id: String,
    pub json_field: String,
}

impl SecretValueRef {
    pub fn new(secret_id: &str, json_field: &str) -> Self {
        Self {
            secret_id: secret_id.to_string(),
            json_field: json_field.to_string(),
        }
    }

    /// Dynamic reference placeholder; the plaintext never enters the template.
    pub fn dynamic_reference(&self) -> String {
        format!(
            "{{{{resolve:secretsmanager:{}:SecretString:{}}}}}",
            self.secret_id, self.json_field
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new("aws", "us-east-1", "123456789012").unwrap()
    }

    #[test]
    fn test_secret_from_arn() {
        let secret =
            SecretRef::from_arn("arn:aws:secretsmanager:eu-west-1:123456789012:secret:db-XyZ")
                .unwrap();
        assert_eq!(secret.region(), "eu-west-1");
        assert!(secret.resource_policy.statement.is_empty());
    }

    #[test]
    fn test_secret_rejects_other_services() {
        assert!(SecretRef::from_arn("arn:aws:ssm:us-east-1:123456789012:parameter/x").is_err());
    }

    #[test]
    fn test_parameter_arn_strips_leading_slash() {
        let param = ParameterRef::named("/console/anon-key", &env()).unwrap();
        assert_eq!(
            param.arn.to_string(),
            "arn:aws:ssm:us-east-1:123456789012:parameter/console/anon-key"
        );
        assert_eq!(param.name, "/console/anon-key");
    }

    #[test]
    fn test_parameter_rejects_blank_name() {
        assert!(ParameterRef::named("  ", &env()).is_err());
        assert!(ParameterRef::named("a b", &env()).is_err());
    }

    #[test]
    fn test_read_grant_goes_to_resource_policy() {
        let role = Arn::parse("arn:aws:iam::123456789012:role/service-role/Console").unwrap();
        let mut param = ParameterRef::named("anon", &env()).unwrap();
        param.add_read_grant(&role);
        let statement = &param.resource_policy.statement[0];
        assert_eq!(statement.principal, Some(Principal::Aws(role.to_string())));
        assert_eq!(statement.action.len(), PARAMETER_READ_ACTIONS.len());
        assert_eq!(statement.resource, vec![param.arn.to_string()]);
    }

    #[test]
    fn test_dynamic_reference() {
        let token = SecretValueRef::new("github-token", "token");
        assert_eq!(
            token.dynamic_reference(),
            "{{resolve:secretsmanager:github-token:SecretString:token}}"
        );
    }
}

//! Execution identity assumed by the hosting platform

use crate::arn::{Arn, Environment};
use crate::error::{CompositionError, Result};
use crate::naming::Scope;
use crate::resources::policy::{InlinePolicy, PolicyDocument, PolicyStatement, Principal};
use crate::resources::refs::{ParameterRef, SecretRef, PARAMETER_READ_ACTIONS, SECRET_READ_ACTIONS};
use serde::Serialize;
use tracing::{debug, info};

pub const PLATFORM_SERVICE_PRINCIPAL: &str = "amplify.amazonaws.com";
pub const ROLE_PATH: &str = "/service-role/";

#[derive(Debug, Clone)]
pub struct IdentityProps {
    pub description: String,
}

impl Default for IdentityProps {
    fn default() -> Self {
        Self {
            description: "Role assumed by the hosting platform to build and serve the web console"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrantTarget {
    Secret,
    Parameter,
}

/// Read access granted to this identity on an external credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadGrant {
    pub target: GrantTarget,
    /// Identifier as supplied by the caller (secret ARN or parameter name).
    pub identifier: String,
    pub resource: Arn,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExecutionIdentity {
    pub scope: Scope,
    pub role_name: String,
    pub description: String,
    pub path: String,
    pub arn: Arn,
    pub assume_role_policy: PolicyDocument,
    grants: Vec<ReadGrant>,
    inline_policies: Vec<InlinePolicy>,
}

impl ExecutionIdentity {
    pub fn new(scope: Scope, env: &Environment, props: IdentityProps) -> Self {
        let role_name = scope.unique_name();
        let arn = Arn {
            partition: env.partition.clone(),
            service: "iam".to_string(),
            region: String::new(),
            account: env.account.clone(),
            resource: format!("role{}{}", ROLE_PATH, role_name),
        };

        let trust = PolicyStatement::allow(&["sts:AssumeRole"], Vec::new())
            .with_principal(Principal::Service(PLATFORM_SERVICE_PRINCIPAL.to_string()));

        info!(role = %role_name, "Created execution identity");

        Self {
            scope,
            role_name,
            description: props.description,
            path: ROLE_PATH.to_string(),
            arn,
            assume_role_policy: PolicyDocument::new(vec![trust]),
            grants: Vec::new(),
            inline_policies: Vec::new(),
        }
    }

    /// Lets this identity read `secret`. The secret's resource policy is
    /// updated; the identity's inline policies are not.
    pub fn grant_read_secret(&mut self, secret: &mut SecretRef) {
        secret.add_read_grant(&self.arn);
        debug!(secret = %secret.arn, "Granted secret read");
        self.grants.push(ReadGrant {
            target: GrantTarget::Secret,
            identifier: secret.arn.to_string(),
            resource: secret.arn.clone(),
            actions: SECRET_READ_ACTIONS.iter().map(|a| a.to_string()).collect(),
        });
    }

    pub fn grant_read_parameter(&mut self, parameter: &mut ParameterRef) {
        parameter.add_read_grant(&self.arn);
        debug!(parameter = %parameter.name, "Granted parameter read");
        self.grants.push(ReadGrant {
            target: GrantTarget::Parameter,
            identifier: parameter.name.clone(),
            resource: parameter.arn.clone(),
            actions: PARAMETER_READ_ACTIONS.iter().map(|a| a.to_string()).collect(),
        });
    }

    pub fn attach_inline_policy(&mut self, policy: InlinePolicy) -> Result<()> {
        let reason = if policy.document.statement.is_empty() {
            Some("policy has no statements")
        } else if self.inline_policies.iter().any(|p| p.name == policy.name) {
            Some("a policy with this name is already attached")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(CompositionError::PolicyAttachment {
                policy: policy.name,
                role: self.role_name.clone(),
                reason: reason.to_string(),
            });
        }

        info!(policy = %policy.name, role = %self.role_name, "Attached inline policy");
        self.inline_policies.push(policy);
        Ok(())
    }

    pub fn read_grants(&self) -> &[ReadGrant] {
        &self.grants
    }

    pub fn inline_policies(&self) -> &[InlinePolicy] {
        &self.inline_policies
    }
}

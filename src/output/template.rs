//! Deployment template synthesized from a composed stack
//!
//! The document follows the CloudFormation layout: `Resources` keyed by
//! logical id, `Outputs` for downstream consumers, and a `Metadata` section
//! recording the read grants placed on credentials the stack does not own.
//!
//! The composed stack carries a preview application id. The platform
//! assigns the real one at deploy time, so every value derived from it is
//! emitted as a `Fn::GetAtt` or `Fn::Sub` on the application resource.

use crate::resources::identity::GrantTarget;
use crate::stack::ConsoleStack;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

pub const ROLE_TYPE: &str = "AWS::IAM::Role";
pub const POLICY_TYPE: &str = "AWS::IAM::Policy";
pub const APP_TYPE: &str = "AWS::Amplify::App";
pub const BRANCH_TYPE: &str = "AWS::Amplify::Branch";
pub const SECRET_POLICY_TYPE: &str = "AWS::SecretsManager::ResourcePolicy";
pub const PARAMETER_POLICY_TYPE: &str = "AWS::SSM::ResourcePolicy";

const APP_ID_ATTRIBUTE: &str = "AppId";
const DEFAULT_DOMAIN_ATTRIBUTE: &str = "DefaultDomain";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Metadata")]
    pub metadata: Value,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn synthesize(stack: &ConsoleStack) -> Self {
        let role_id = stack.identity.scope.logical_id();
        let app_id = stack.app.scope().logical_id();
        let binding = AppBinding {
            logical_id: &app_id,
            app_id: stack.app.app_id(),
            default_domain: stack.app.default_domain(),
        };
        let mut resources = BTreeMap::new();

        resources.insert(
            role_id.clone(),
            Resource {
                resource_type: ROLE_TYPE.to_string(),
                properties: json!({
                    "RoleName": stack.identity.role_name,
                    "Description": stack.identity.description,
                    "Path": stack.identity.path,
                    "AssumeRolePolicyDocument": stack.identity.assume_role_policy,
                }),
                depends_on: Vec::new(),
            },
        );

        for policy in stack.identity.inline_policies() {
            let mut properties = json!({
                "PolicyName": policy.name,
                "PolicyDocument": policy.document,
                "Roles": [{ "Ref": role_id }],
            });
            let mut depends_on = vec![role_id.clone()];
            if binding.bind(&mut properties) {
                depends_on.push(app_id.clone());
            }
            resources.insert(
                policy.scope.logical_id(),
                Resource {
                    resource_type: POLICY_TYPE.to_string(),
                    properties,
                    depends_on,
                },
            );
        }

        for (logical_id, resource_type, properties) in credential_policies(stack) {
            resources.insert(
                logical_id,
                Resource {
                    resource_type: resource_type.to_string(),
                    properties,
                    depends_on: vec![role_id.clone()],
                },
            );
        }

        resources.insert(
            app_id.clone(),
            Resource {
                resource_type: APP_TYPE.to_string(),
                properties: stack.app.properties(),
                depends_on: vec![role_id.clone()],
            },
        );

        let mut branch_properties = stack.branch.properties();
        binding.bind(&mut branch_properties);
        resources.insert(
            stack.branch.scope.logical_id(),
            Resource {
                resource_type: BRANCH_TYPE.to_string(),
                properties: branch_properties,
                depends_on: vec![app_id.clone()],
            },
        );

        let mut branch_url = Value::String(stack.branch.url.clone());
        binding.bind(&mut branch_url);
        let outputs = BTreeMap::from([
            (
                "AppId".to_string(),
                Output {
                    description: "Hosting application id".to_string(),
                    value: binding.attribute(APP_ID_ATTRIBUTE),
                },
            ),
            (
                "DefaultDomain".to_string(),
                Output {
                    description: "Platform-assigned default domain".to_string(),
                    value: binding.attribute(DEFAULT_DOMAIN_ATTRIBUTE),
                },
            ),
            (
                "BranchUrl".to_string(),
                Output {
                    description: "Public URL of the production branch".to_string(),
                    value: branch_url,
                },
            ),
        ]);

        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: format!("Web console hosting for {}", stack.source.repository_url()),
            metadata: json!({ "ResourceGrants": resource_grants(stack) }),
            resources,
            outputs,
        }
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize template to JSON")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize template to YAML")
    }
}

/// Rewrites the preview application id into references to the deployed application.
struct AppBinding<'a> {
    logical_id: &'a str,
    app_id: &'a str,
    default_domain: &'a str,
}

impl AppBinding<'_> {
    fn attribute(&self, name: &str) -> Value {
        json!({ "Fn::GetAtt": [self.logical_id, name] })
    }

    /// Returns true when anything in `value` was bound to the application.
    fn bind(&self, value: &mut Value) -> bool {
        match value {
            Value::String(text) => match self.bind_str(text) {
                Some(bound) => {
                    *value = bound;
                    true
                }
                None => false,
            },
            Value::Array(items) => items.iter_mut().fold(false, |bound, v| self.bind(v) | bound),
            Value::Object(map) => map.values_mut().fold(false, |bound, v| self.bind(v) | bound),
            _ => false,
        }
    }

    fn bind_str(&self, text: &str) -> Option<Value> {
        if text == self.app_id {
            return Some(self.attribute(APP_ID_ATTRIBUTE));
        }
        if text == self.default_domain {
            return Some(self.attribute(DEFAULT_DOMAIN_ATTRIBUTE));
        }
        if !text.contains(self.app_id) {
            return None;
        }

        let mut template = text.to_string();
        let mut variables = Map::new();
        // The domain embeds the id, so it is substituted first.
        for (preview, attribute) in [
            (self.default_domain, DEFAULT_DOMAIN_ATTRIBUTE),
            (self.app_id, APP_ID_ATTRIBUTE),
        ] {
            if template.contains(preview) {
                template = template.replace(preview, &format!("${{{}}}", attribute));
                variables.insert(attribute.to_string(), self.attribute(attribute));
            }
        }
        Some(json!({ "Fn::Sub": [template, variables] }))
    }
}

/// One resource-policy resource per external credential, carrying its read grants.
fn credential_policies(stack: &ConsoleStack) -> Vec<(String, &'static str, Value)> {
    let mut policies = Vec::new();

    if !stack.db_secret.resource_policy.statement.is_empty() {
        policies.push((
            stack.scope.child("DbSecretPolicy").logical_id(),
            SECRET_POLICY_TYPE,
            json!({
                "SecretId": stack.db_secret.arn.to_string(),
                "ResourcePolicy": stack.db_secret.resource_policy,
                "BlockPublicPolicy": true,
            }),
        ));
    }

    let parameters = [
        ("AnonKeyPolicy", &stack.anon_key),
        ("ServiceKeyPolicy", &stack.service_key),
    ];
    for (id, parameter) in parameters {
        if parameter.resource_policy.statement.is_empty() {
            continue;
        }
        policies.push((
            stack.scope.child(id).logical_id(),
            PARAMETER_POLICY_TYPE,
            json!({
                "ResourceArn": parameter.arn.to_string(),
                "Policy": parameter.resource_policy,
            }),
        ));
    }

    policies
}

fn resource_grants(stack: &ConsoleStack) -> Vec<Value> {
    let policies = [
        (
            GrantTarget::Secret,
            stack.db_secret.arn.to_string(),
            &stack.db_secret.resource_policy,
        ),
        (
            GrantTarget::Parameter,
            stack.anon_key.name.clone(),
            &stack.anon_key.resource_policy,
        ),
        (
            GrantTarget::Parameter,
            stack.service_key.name.clone(),
            &stack.service_key.resource_policy,
        ),
    ];

    stack
        .identity
        .read_grants()
        .iter()
        .map(|grant| {
            let policy = policies
                .iter()
                .find(|(target, id, _)| *target == grant.target && *id == grant.identifier)
                .map(|(_, _, policy)| json!(policy))
                .unwrap_or(Value::Null);
            json!({
                "Target": grant.target,
                "Identifier": grant.identifier,
                "Resource": grant.resource,
                "Actions": grant.actions,
                "ResourcePolicy": policy,
            })
        })
        .collect()
}

//! IAM policy documents and the application logging policy

use crate::arn::Environment;
use crate::naming::Scope;
use crate::resources::app::AppHandle;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const POLICY_VERSION: &str = "2012-10-17";

/// Log group prefix the hosting platform writes server-rendering logs under.
pub const PLATFORM_LOG_PREFIX: &str = "/aws/amplify";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    Service(String),
    #[serde(rename = "AWS")]
    Aws(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub resource: Vec<String>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<String>) -> Self {
        Self {
            effect: Effect::Allow,
            principal: None,
            action: actions.iter().map(|a| a.to_string()).collect(),
            resource: resources,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Inline policy attached to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinePolicy {
    #[serde(skip)]
    pub scope: Scope,
    pub name: String,
    pub document: PolicyDocument,
}

/// Permissions for the server-rendering runtime to ship logs for one application.
///
/// Stream and event writes are limited to the application's own log group.
/// Group creation is limited to that group under the platform prefix. Only
/// `DescribeLogGroups` spans the account, and it grants no write access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingPolicy {
    pub scope: Scope,
    pub log_group: String,
    pub statements: [PolicyStatement; 3],
}

impl LoggingPolicy {
    pub fn for_app(scope: Scope, app: &AppHandle, env: &Environment) -> Self {
        let log_group = format!("{}/{}", PLATFORM_LOG_PREFIX, app.app_id());
        let group_arn = env.arn("logs", &format!("log-group:{}", log_group));
        let stream_arn = env.arn("logs", &format!("log-group:{}:log-stream:*", log_group));
        let all_groups_arn = env.arn("logs", "log-group:*");

        debug!(log_group = %log_group, "Scoping logging policy");

        let statements = [
            PolicyStatement::allow(
                &["logs:CreateLogStream", "logs:PutLogEvents"],
                vec![stream_arn.to_string()],
            ),
            PolicyStatement::allow(&["logs:CreateLogGroup"], vec![group_arn.to_string()]),
            PolicyStatement::allow(&["logs:DescribeLogGroups"], vec![all_groups_arn.to_string()]),
        ];

        Self {
            scope,
            log_group,
            statements,
        }
    }

    pub fn name(&self) -> String {
        self.scope.unique_name()
    }

    pub fn into_inline(self) -> InlinePolicy {
        let name = self.name();
        InlinePolicy {
            scope: self.scope,
            name,
            document: PolicyDocument::new(self.statements.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_serializes_in_iam_shape() {
        let statement = PolicyStatement::allow(&["logs:CreateLogGroup"], vec!["*".to_string()]);
        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(json["Effect"], "Allow");
        assert_eq!(json["Action"][0], "logs:CreateLogGroup");
        assert_eq!(json["Resource"][0], "*");
        assert!(json.get("Principal").is_none());
    }

    #[test]
    fn test_service_principal_shape() {
        let statement = PolicyStatement::allow(&["sts:AssumeRole"], vec![])
            .with_principal(Principal::Service("amplify.amazonaws.com".to_string()));
        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(json["Principal"]["Service"], "amplify.amazonaws.com");
        assert!(json.get("Resource").is_none());
    }

    #[test]
    fn test_document_version() {
        let doc = PolicyDocument::default();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["Version"], POLICY_VERSION);
        assert!(json["Statement"].as_array().unwrap().is_empty());
    }
}

//! Hosting application
//!
//! Created in two steps. [`HostingApplication::create`] builds the primary
//! resource and returns an [`AppHandle`]; [`HostingApplication::apply_overrides`]
//! then patches properties the primary constructor does not expose. Both are
//! required for a correct result.

use crate::arn::Arn;
use crate::buildspec::{BashRenderer, BuildSpec, BuildSpecDocument};
use crate::error::{CompositionError, Result};
use crate::naming::Scope;
use crate::resources::source::SourceBinding;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Default domain suffix the platform assigns to every application.
pub const PLATFORM_DEFAULT_DOMAIN: &str = "amplifyapp.com";

pub const PLATFORM_OVERRIDE: &str = "Platform";
pub const CUSTOM_RULES_OVERRIDE: &str = "CustomRules";

/// Properties that may be patched after creation.
const OVERRIDABLE: &[&str] = &[PLATFORM_OVERRIDE, CUSTOM_RULES_OVERRIDE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputePlatform {
    WebCompute,
}

impl ComputePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputePlatform::WebCompute => "WEB_COMPUTE",
        }
    }
}

/// Redirect or rewrite rule evaluated by the platform's edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomRule {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl CustomRule {
    /// Rewrites every unmatched path to the index document with a 200.
    pub fn spa_fallback() -> Self {
        Self {
            source: "/<*>".to_string(),
            target: "/index.html".to_string(),
            status: "404-200".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyOverrides {
    entries: BTreeMap<String, Value>,
}

impl PropertyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: &str, value: Value) -> Self {
        self.entries.insert(path.to_string(), value);
        self
    }

    /// Overrides every console deployment carries: server-rendered compute
    /// and the catch-all rewrite for client-side routing.
    pub fn console_defaults() -> Self {
        Self::new()
            .set(PLATFORM_OVERRIDE, json!(ComputePlatform::WebCompute.as_str()))
            .set(CUSTOM_RULES_OVERRIDE, json!([CustomRule::spa_fallback()]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone)]
pub struct AppProps {
    pub source: SourceBinding,
    pub role_arn: Arn,
    pub build_spec: BuildSpec,
    pub environment_variables: BTreeMap<String, String>,
    pub description: Option<String>,
}

/// The created application. Children read its generated identifiers from here.
#[derive(Debug, Clone, Serialize)]
pub struct AppHandle {
    #[serde(skip)]
    scope: Scope,
    name: String,
    app_id: String,
    default_domain: String,
    role_arn: Arn,
    source: SourceBinding,
    build_spec: BuildSpecDocument,
    #[serde(skip)]
    build_spec_yaml: String,
    environment_variables: BTreeMap<String, String>,
    description: Option<String>,
    overrides: BTreeMap<String, Value>,
}

impl AppHandle {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// `<appId>.amplifyapp.com`
    pub fn default_domain(&self) -> &str {
        &self.default_domain
    }

    pub fn build_spec(&self) -> &BuildSpecDocument {
        &self.build_spec
    }

    pub fn environment_variables(&self) -> &BTreeMap<String, String> {
        &self.environment_variables
    }

    pub fn platform(&self) -> Option<&str> {
        self.overrides.get(PLATFORM_OVERRIDE).and_then(Value::as_str)
    }

    pub fn custom_rules(&self) -> Vec<CustomRule> {
        self.overrides
            .get(CUSTOM_RULES_OVERRIDE)
            .and_then(Value::as_array)
            .map(|rules| {
                rules
                    .iter()
                    .filter_map(|rule| {
                        Some(CustomRule {
                            source: rule.get("Source")?.as_str()?.to_string(),
                            target: rule.get("Target")?.as_str()?.to_string(),
                            status: rule.get("Status")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Adds or replaces an application-level environment variable.
    pub fn add_environment(&mut self, name: &str, value: &str) -> &mut Self {
        debug!(name, "Adding application environment variable");
        self.environment_variables
            .insert(name.to_string(), value.to_string());
        self
    }

    /// CloudFormation-shaped properties with overrides applied.
    pub fn properties(&self) -> Value {
        let env: Vec<Value> = self
            .environment_variables
            .iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value }))
            .collect();

        let mut properties = json!({
            "Name": self.name,
            "Repository": self.source.repository_url(),
            "OauthToken": self.source.oauth_token.dynamic_reference(),
            "IAMServiceRole": self.role_arn.to_string(),
            "BuildSpec": self.build_spec_yaml,
            "EnvironmentVariables": env,
        });
        if let Some(description) = &self.description {
            properties["Description"] = json!(description);
        }
        for (path, value) in &self.overrides {
            properties[path.as_str()] = value.clone();
        }
        properties
    }
}

pub struct HostingApplication;

impl HostingApplication {
    pub fn create(scope: Scope, props: AppProps) -> Result<AppHandle> {
        let build_spec = props.build_spec.render(&BashRenderer);
        let build_spec_yaml = build_spec
            .to_yaml()
            .map_err(|e| CompositionError::Serialization {
                what: "build spec",
                reason: e.to_string(),
            })?;
        let name = scope.unique_name();
        let app_id = scope.generated_app_id();
        let default_domain = format!("{}.{}", app_id, PLATFORM_DEFAULT_DOMAIN);

        if name.is_empty() {
            return Err(CompositionError::MissingInput("app.name"));
        }

        info!(name = %name, app_id = %app_id, "Created hosting application");

        Ok(AppHandle {
            scope,
            name,
            app_id,
            default_domain,
            role_arn: props.role_arn,
            source: props.source,
            build_spec,
            build_spec_yaml,
            environment_variables: props.environment_variables,
            description: props.description,
            overrides: BTreeMap::new(),
        })
    }

    pub fn apply_overrides(handle: &mut AppHandle, overrides: PropertyOverrides) -> Result<()> {
        for (path, value) in overrides.iter() {
            if !OVERRIDABLE.contains(&path.as_str()) {
                return Err(CompositionError::UnknownOverride(path.clone()));
            }
            debug!(path = %path, "Applying property override");
            handle.overrides.insert(path.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildspec::{
        EnvMatch, PackageManager, ParameterFetch, PipelineProps, SecretFetch, DEFAULT_ENV_FILE,
    };
    use crate::resources::refs::SecretValueRef;

    fn build_spec() -> BuildSpec {
        BuildSpec::for_monorepo_app(&PipelineProps {
            app_root: "apps/studio".to_string(),
            package_filter: "studio".to_string(),
            env_file: DEFAULT_ENV_FILE.to_string(),
            db_password: SecretFetch {
                var: "POSTGRES_PASSWORD".to_string(),
                secret_id: "arn:aws:secretsmanager:us-east-1:123456789012:secret:db-AbC"
                    .to_string(),
                json_field: "password".to_string(),
                region: "us-east-1".to_string(),
            },
            anon_key: ParameterFetch {
                var: "ANON".to_string(),
                name: "anon".to_string(),
                region: "us-east-1".to_string(),
            },
            service_key: ParameterFetch {
                var: "SERVICE".to_string(),
                name: "service".to_string(),
                region: "us-east-1".to_string(),
            },
            passthrough: vec![EnvMatch::Prefix("NEXT_PUBLIC_".to_string())],
            node_memory_mb: 4096,
            package_manager: PackageManager::Pnpm,
            package_manager_version: "8.6.0".to_string(),
        })
        .unwrap()
    }

    fn create() -> AppHandle {
        let props = AppProps {
            source: SourceBinding::github("acme", "app", SecretValueRef::new("gh", "token"))
                .unwrap(),
            role_arn: Arn::parse("arn:aws:iam::123456789012:role/service-role/WebRole").unwrap(),
            build_spec: build_spec(),
            environment_variables: BTreeMap::from([(
                "AMPLIFY_DIFF_DEPLOY".to_string(),
                "false".to_string(),
            )]),
            description: None,
        };
        HostingApplication::create(Scope::root("Web").child("App"), props).unwrap()
    }

    #[test]
    fn test_name_strips_slashes() {
        let app = create();
        assert_eq!(app.name(), "WebApp");
    }

    #[test]
    fn test_default_domain_derived_from_app_id() {
        let app = create();
        assert_eq!(
            app.default_domain(),
            format!("{}.amplifyapp.com", app.app_id())
        );
    }

    #[test]
    fn test_overrides_absent_until_applied() {
        let mut app = create();
        assert_eq!(app.platform(), None);
        assert!(app.custom_rules().is_empty());

        HostingApplication::apply_overrides(&mut app, PropertyOverrides::console_defaults())
            .unwrap();

        assert_eq!(app.platform(), Some("WEB_COMPUTE"));
        assert_eq!(app.custom_rules(), vec![CustomRule::spa_fallback()]);
    }

    #[test]
    fn test_unknown_override_rejected() {
        let mut app = create();
        let overrides = PropertyOverrides::new().set("BasicAuthConfig", json!({}));
        assert!(matches!(
            HostingApplication::apply_overrides(&mut app, overrides),
            Err(CompositionError::UnknownOverride(_))
        ));
    }

    #[test]
    fn test_properties_embed_token_reference_not_value() {
        let mut app = create();
        HostingApplication::apply_overrides(&mut app, PropertyOverrides::console_defaults())
            .unwrap();
        let props = app.properties();
        assert_eq!(
            props["OauthToken"],
            "{{resolve:secretsmanager:gh:SecretString:token}}"
        );
        assert_eq!(props["Platform"], "WEB_COMPUTE");
        assert_eq!(props["CustomRules"][0]["Status"], "404-200");
        assert_eq!(props["Repository"], "https://github.com/acme/app");
    }

    #[test]
    fn test_add_environment_replaces_value() {
        let mut app = create();
        app.add_environment("AMPLIFY_DIFF_DEPLOY", "true");
        assert_eq!(app.environment_variables()["AMPLIFY_DIFF_DEPLOY"], "true");
    }
}

//! Composition of the full console deployment
//!
//! [`ConsoleStack::compose`] builds every entity once, in dependency order:
//! source and identity, then the build spec and application, then the
//! production branch and the logging policy that need the application's
//! generated id. The finished graph is checked by [`crate::validation`]
//! before it is returned.

use crate::arn::Environment;
use crate::buildspec::{
    node_memory_option, BuildSpec, EnvMatch, ParameterFetch, PipelineProps, SecretFetch,
    DEFAULT_ENV_FILE, NODE_OPTIONS_VAR,
};
use crate::config::DeployConfig;
use crate::error::Result;
use crate::naming::Scope;
use crate::resources::{
    AppHandle, AppProps, BranchProps, ExecutionIdentity, HostingApplication, IdentityProps,
    LoggingPolicy, ParameterRef, ProductionBranch, PropertyOverrides, SecretRef, SecretValueRef,
    SourceBinding, MONOREPO_APP_ROOT_VAR,
};
use crate::validation::Validator;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const API_URL_PUBLIC_VAR: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const API_URL_INTERNAL_VAR: &str = "SUPABASE_URL";
pub const BUILD_SCOPE_VAR: &str = "TURBO_SCOPE";
pub const DIFF_DEPLOY_VAR: &str = "AMPLIFY_DIFF_DEPLOY";
pub const CUSTOM_IMAGE_VAR: &str = "_CUSTOM_IMAGE";
pub const DB_SECRET_ARN_VAR: &str = "SUPABASE_DB_SECRET_ARN";
pub const ANON_KEY_NAME_VAR: &str = "ANON_KEY_NAME";
pub const SERVICE_KEY_NAME_VAR: &str = "SERVICE_KEY_NAME";
pub const CREDENTIAL_REGION_VAR: &str = "SUPABASE_REGION";

/// Variables written to the build-local env file from the credential stores.
/// They must never appear in either platform variable store.
pub const DB_PASSWORD_FILE_VAR: &str = "POSTGRES_PASSWORD";
pub const ANON_KEY_FILE_VAR: &str = "SUPABASE_ANON_KEY";
pub const SERVICE_KEY_FILE_VAR: &str = "SUPABASE_SERVICE_KEY";
pub const FETCHED_FILE_VARS: [&str; 3] = [DB_PASSWORD_FILE_VAR, ANON_KEY_FILE_VAR, SERVICE_KEY_FILE_VAR];

const DB_PASSWORD_FIELD: &str = "password";
const PG_META_URL_VAR: &str = "STUDIO_PG_META_URL";

/// Values downstream compositions read off the stack.
///
/// `app_id` and everything derived from it are offline previews; the
/// synthesized template binds them to the deployed application instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutputs {
    pub app_name: String,
    pub app_id: String,
    pub default_domain: String,
    pub branch_name: String,
    pub branch_url: String,
    pub role_arn: String,
}

#[derive(Debug, Clone)]
pub struct ConsoleStack {
    pub scope: Scope,
    pub environment: Environment,
    pub source: SourceBinding,
    pub identity: ExecutionIdentity,
    pub db_secret: SecretRef,
    pub anon_key: ParameterRef,
    pub service_key: ParameterRef,
    pub build_spec: BuildSpec,
    pub app: AppHandle,
    pub branch: ProductionBranch,
    pub logging_policy: LoggingPolicy,
}

impl ConsoleStack {
    pub fn compose(config: &DeployConfig) -> Result<Self> {
        Self::compose_with(config, &Validator::default())
    }

    pub fn compose_with(config: &DeployConfig, validator: &Validator) -> Result<Self> {
        config.validate()?;

        let scope = Scope::root(&config.stack_name);
        let environment = Environment::new(&config.partition, &config.region, &config.account)?;
        let app_root = config.app_root().to_string();

        info!(stack = %scope, app_root = %app_root, "Composing console deployment");

        let source = SourceBinding::github(
            &config.source_owner,
            &config.source_repository,
            SecretValueRef::new(&config.source_token_secret, &config.source_token_field),
        )?;
        debug!(repository = %source.repository_url(), "Bound source");

        let mut db_secret = SecretRef::from_arn(&config.db_secret_arn)?;
        let mut anon_key = ParameterRef::named(&config.anon_key_parameter, &environment)?;
        let mut service_key = ParameterRef::named(&config.service_key_parameter, &environment)?;

        let mut identity =
            ExecutionIdentity::new(scope.child("Role"), &environment, IdentityProps::default());
        identity.grant_read_secret(&mut db_secret);
        identity.grant_read_parameter(&mut anon_key);
        identity.grant_read_parameter(&mut service_key);

        let build_spec = BuildSpec::for_monorepo_app(&PipelineProps {
            app_root: app_root.clone(),
            package_filter: config.package_filter.clone(),
            env_file: DEFAULT_ENV_FILE.to_string(),
            db_password: SecretFetch::from_ref(DB_PASSWORD_FILE_VAR, &db_secret, DB_PASSWORD_FIELD),
            anon_key: ParameterFetch::from_ref(ANON_KEY_FILE_VAR, &anon_key),
            service_key: ParameterFetch::from_ref(SERVICE_KEY_FILE_VAR, &service_key),
            passthrough: vec![
                EnvMatch::Exact(PG_META_URL_VAR.to_string()),
                EnvMatch::Prefix("SUPABASE_".to_string()),
                EnvMatch::Prefix("NEXT_PUBLIC_".to_string()),
            ],
            node_memory_mb: config.node_memory_mb,
            package_manager: config.package_manager,
            package_manager_version: config.package_manager_version.clone(),
        })?;

        let mut app = HostingApplication::create(
            scope.child("App"),
            AppProps {
                source: source.clone(),
                role_arn: identity.arn.clone(),
                build_spec: build_spec.clone(),
                environment_variables: app_environment(config, &db_secret, &anon_key, &service_key),
                description: Some(format!(
                    "Server-rendered console for {}/{}",
                    config.source_owner, config.source_repository
                )),
            },
        )?;
        HostingApplication::apply_overrides(&mut app, PropertyOverrides::console_defaults())?;
        app.add_environment(MONOREPO_APP_ROOT_VAR, &app_root);

        let branch = ProductionBranch::new(
            app.scope().child("Branch"),
            &app,
            BranchProps {
                branch_name: config.branch_name().to_string(),
                app_root,
            },
        )?;

        let logging_policy =
            LoggingPolicy::for_app(identity.scope.child("LoggingPolicy"), &app, &environment);
        identity.attach_inline_policy(logging_policy.clone().into_inline())?;

        let stack = Self {
            scope,
            environment,
            source,
            identity,
            db_secret,
            anon_key,
            service_key,
            build_spec,
            app,
            branch,
            logging_policy,
        };
        validator.validate(&stack)?;

        info!(
            app_id = %stack.app.app_id(),
            branch_url = %stack.branch.url,
            "Console deployment composed"
        );
        Ok(stack)
    }

    pub fn outputs(&self) -> StackOutputs {
        StackOutputs {
            app_name: self.app.name().to_string(),
            app_id: self.app.app_id().to_string(),
            default_domain: self.app.default_domain().to_string(),
            branch_name: self.branch.branch_name.clone(),
            branch_url: self.branch.url.clone(),
            role_arn: self.identity.arn.to_string(),
        }
    }
}

fn app_environment(
    config: &DeployConfig,
    db_secret: &SecretRef,
    anon_key: &ParameterRef,
    service_key: &ParameterRef,
) -> BTreeMap<String, String> {
    let entries = [
        (API_URL_PUBLIC_VAR, config.api_url.clone()),
        (API_URL_INTERNAL_VAR, config.api_url.clone()),
        (BUILD_SCOPE_VAR, config.package_filter.clone()),
        (NODE_OPTIONS_VAR, node_memory_option(config.node_memory_mb)),
        (DIFF_DEPLOY_VAR, "false".to_string()),
        (CUSTOM_IMAGE_VAR, config.build_image.clone()),
        (DB_SECRET_ARN_VAR, db_secret.arn.to_string()),
        (ANON_KEY_NAME_VAR, anon_key.name.clone()),
        (SERVICE_KEY_NAME_VAR, service_key.name.clone()),
        (CREDENTIAL_REGION_VAR, anon_key.region().to_string()),
        (MONOREPO_APP_ROOT_VAR, config.app_root().to_string()),
    ];
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

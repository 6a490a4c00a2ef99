use crate::buildspec::{BuildPhase, BuildStep};
use crate::resources::app::{ComputePlatform, CustomRule};
use crate::resources::branch::{branch_url, SITE_URL_VAR};
use crate::resources::policy::PLATFORM_LOG_PREFIX;
use crate::resources::MONOREPO_APP_ROOT_VAR;
use crate::stack::{ConsoleStack, FETCHED_FILE_VARS};
use anyhow::Result;

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, stack: &ConsoleStack) -> Result<()>;
}

pub struct LeastPrivilegeLoggingRule;

impl ValidationRule for LeastPrivilegeLoggingRule {
    fn name(&self) -> &'static str {
        "LeastPrivilegeLogging"
    }

    fn validate(&self, stack: &ConsoleStack) -> Result<()> {
        let log_group = format!("{}/{}", PLATFORM_LOG_PREFIX, stack.app.app_id());
        let policy = &stack.logging_policy;

        if policy.log_group != log_group {
            anyhow::bail!(
                "Log group '{}' is not the application's group '{}'",
                policy.log_group,
                log_group
            );
        }

        let env = &stack.environment;
        let allowed = [
            env.arn("logs", &format!("log-group:{}", log_group)).to_string(),
            env.arn("logs", &format!("log-group:{}:log-stream:*", log_group))
                .to_string(),
        ];
        for statement in &policy.statements[..2] {
            if statement.resource.is_empty() {
                anyhow::bail!("Write statement {:?} has no resource", statement.action);
            }
            for resource in &statement.resource {
                if !allowed.contains(resource) {
                    anyhow::bail!(
                        "Write statement {:?} reaches beyond '{}': {}",
                        statement.action,
                        log_group,
                        resource
                    );
                }
            }
        }

        let describe = &policy.statements[2];
        if describe.action != ["logs:DescribeLogGroups"] {
            anyhow::bail!(
                "Only logs:DescribeLogGroups may span all log groups, found {:?}",
                describe.action
            );
        }

        let attached = stack
            .identity
            .inline_policies()
            .iter()
            .any(|p| p.name == policy.name());
        if !attached {
            anyhow::bail!(
                "Logging policy '{}' is not attached to role '{}'",
                policy.name(),
                stack.identity.role_name
            );
        }
        Ok(())
    }
}

/// Every credential fetched during pre-build is one the identity may read, and the reverse.
pub struct CredentialChannelRule;

impl ValidationRule for CredentialChannelRule {
    fn name(&self) -> &'static str {
        "CredentialChannel"
    }

    fn validate(&self, stack: &ConsoleStack) -> Result<()> {
        let grants = stack.identity.read_grants();
        if grants.len() != 3 {
            anyhow::bail!("Expected 3 read grants, found {}", grants.len());
        }

        let pre_build: Vec<&String> = stack
            .app
            .build_spec()
            .applications
            .iter()
            .flat_map(|app| app.frontend.phases.pre_build.commands.iter())
            .collect();

        for grant in grants {
            if !pre_build.iter().any(|command| command.contains(&grant.identifier)) {
                anyhow::bail!(
                    "'{}' is readable by the role but never fetched during pre-build",
                    grant.identifier
                );
            }
        }

        let fetched = stack.build_spec.steps(BuildPhase::PreBuild).iter().filter_map(|step| {
            match step {
                BuildStep::FetchSecret { secret_id, .. } => Some(secret_id),
                BuildStep::FetchParameter { name, .. } => Some(name),
                _ => None,
            }
        });
        for identifier in fetched {
            if !grants.iter().any(|g| &g.identifier == identifier) {
                anyhow::bail!(
                    "'{}' is fetched during pre-build but the role has no read grant for it",
                    identifier
                );
            }
        }
        Ok(())
    }
}

/// The monorepo app root is stated in the build spec, the application and the branch.
pub struct AppRootConsistencyRule;

impl ValidationRule for AppRootConsistencyRule {
    fn name(&self) -> &'static str {
        "AppRootConsistency"
    }

    fn validate(&self, stack: &ConsoleStack) -> Result<()> {
        let expected = &stack.build_spec.app_root;

        let documents: Vec<&String> = stack
            .app
            .build_spec()
            .applications
            .iter()
            .map(|app| &app.app_root)
            .collect();
        if documents.iter().any(|root| *root != expected) {
            anyhow::bail!("Rendered build spec app roots {:?} differ from '{}'", documents, expected);
        }

        for (holder, env) in [
            ("application", stack.app.environment_variables()),
            ("branch", &stack.branch.environment_variables),
        ] {
            match env.get(MONOREPO_APP_ROOT_VAR) {
                Some(value) if value == expected => {}
                Some(value) => anyhow::bail!(
                    "{} sets {}='{}' but the build spec uses '{}'",
                    holder,
                    MONOREPO_APP_ROOT_VAR,
                    value,
                    expected
                ),
                None => anyhow::bail!("{} does not set {}", holder, MONOREPO_APP_ROOT_VAR),
            }
        }
        Ok(())
    }
}

/// Credentials stay in the build-local env file and out of both platform variable stores.
pub struct NoInlineSecretsRule;

impl ValidationRule for NoInlineSecretsRule {
    fn name(&self) -> &'static str {
        "NoInlineSecrets"
    }

    fn validate(&self, stack: &ConsoleStack) -> Result<()> {
        for (holder, env) in [
            ("application", stack.app.environment_variables()),
            ("branch", &stack.branch.environment_variables),
        ] {
            for name in FETCHED_FILE_VARS {
                if env.contains_key(name) {
                    anyhow::bail!("{} environment must not define fetched credential {}", holder, name);
                }
            }
        }

        let token = stack.app.properties()["OauthToken"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if !token.starts_with("{{resolve:secretsmanager:") {
            anyhow::bail!("OAuth token must be a dynamic secret reference");
        }
        Ok(())
    }
}

pub struct BranchUrlRule;

impl ValidationRule for BranchUrlRule {
    fn name(&self) -> &'static str {
        "BranchUrl"
    }

    fn validate(&self, stack: &ConsoleStack) -> Result<()> {
        let expected = branch_url(&stack.branch.branch_name, stack.app.default_domain());
        if stack.branch.url != expected {
            anyhow::bail!("Branch URL '{}' should be '{}'", stack.branch.url, expected);
        }
        match stack.branch.environment_variables.get(SITE_URL_VAR) {
            Some(value) if *value == expected => Ok(()),
            Some(value) => anyhow::bail!("{}='{}' should be '{}'", SITE_URL_VAR, value, expected),
            None => anyhow::bail!("Branch does not set {}", SITE_URL_VAR),
        }
    }
}

/// Overrides the primary constructor cannot express must have been applied.
pub struct PlatformOverridesRule;

impl ValidationRule for PlatformOverridesRule {
    fn name(&self) -> &'static str {
        "PlatformOverrides"
    }

    fn validate(&self, stack: &ConsoleStack) -> Result<()> {
        if stack.app.platform() != Some(ComputePlatform::WebCompute.as_str()) {
            anyhow::bail!(
                "Platform must be {}, found {:?}",
                ComputePlatform::WebCompute.as_str(),
                stack.app.platform()
            );
        }
        if !stack.app.custom_rules().contains(&CustomRule::spa_fallback()) {
            anyhow::bail!("Catch-all rewrite to /index.html is missing");
        }
        Ok(())
    }
}

//! CI pipeline generation.
//!
//! Pull requests validate and plan the stack mapped to their target branch;
//! pushes to a mapped branch apply its stack. Stacks whose mapping requires
//! approval are gated by the platform's manual approval mechanism.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::config::ProjectConfig;
use crate::environments::EnvironmentMap;
use crate::error::{IacError, IacResult};
use crate::provider::Provider;
use crate::pubsub::WEBHOOK_SECRET_ENV;

/// Supported CI platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiPlatform {
    GitHub,
    GitLab,
    Azure,
}

impl CiPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            CiPlatform::GitHub => "github",
            CiPlatform::GitLab => "gitlab",
            CiPlatform::Azure => "azure",
        }
    }

    /// Pipeline file, relative to the project root.
    pub fn file_path(&self) -> &'static str {
        match self {
            CiPlatform::GitHub => ".github/workflows/infrastructure.yml",
            CiPlatform::GitLab => ".gitlab-ci.yml",
            CiPlatform::Azure => "azure-pipelines.yml",
        }
    }
}

impl fmt::Display for CiPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CiPlatform {
    type Err = IacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" | "github-actions" => Ok(CiPlatform::GitHub),
            "gitlab" | "gitlab-ci" => Ok(CiPlatform::GitLab),
            "azure" | "azure-pipelines" => Ok(CiPlatform::Azure),
            other => Err(IacError::InvalidConfig(format!("unknown CI platform '{}'", other))),
        }
    }
}

/// A stack that some branch deploys to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeployTarget {
    stack: String,
    requires_approval: bool,
}

fn deploy_targets(project: &ProjectConfig) -> Vec<DeployTarget> {
    let mut targets: Vec<DeployTarget> = Vec::new();
    for mapping in &project.branches {
        match targets.iter_mut().find(|t| t.stack == mapping.stack) {
            Some(target) => target.requires_approval |= mapping.requires_approval,
            None => targets.push(DeployTarget {
                stack: mapping.stack.clone(),
                requires_approval: mapping.requires_approval,
            }),
        }
    }
    targets
}

/// Secrets every job needs: provider credentials and the webhook token.
fn secret_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Provider::all().iter().map(|p| p.credentials_env()).collect();
    names.push(WEBHOOK_SECRET_ENV);
    names
}

fn job_id(stack: &str, separator: char) -> String {
    stack
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { separator })
        .collect()
}

/// Translate a branch glob into an anchored, slash-delimited regex literal.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("/^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '/' => out.push_str("\\/"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push_str("$/");
    out
}

/// GitHub filters need `**` to cross `/`, which `glob::Pattern` does with `*`.
fn github_filter(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            while chars.peek() == Some(&'*') {
                chars.next();
            }
            out.push_str("**");
        } else {
            out.push(c);
        }
    }
    out
}

/// Generator for CI pipeline files.
pub struct CiGenerator;

impl CiGenerator {
    /// Render the pipeline and write it below `dir`.
    pub fn generate(platform: CiPlatform, project: &ProjectConfig, dir: impl AsRef<Path>) -> IacResult<PathBuf> {
        let content = Self::render(platform, project)?;
        let path = dir.as_ref().join(platform.file_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        info!("Generated {} pipeline at {:?}", platform, path);
        Ok(path)
    }

    /// Names of the CI secrets the generated jobs read.
    pub fn required_secrets() -> Vec<&'static str> {
        secret_names()
    }

    /// Render the pipeline for a platform.
    pub fn render(platform: CiPlatform, project: &ProjectConfig) -> IacResult<String> {
        // reject bad patterns before anything is written
        EnvironmentMap::new(&project.branches)?;
        if project.branches.is_empty() {
            return Err(IacError::InvalidConfig(
                "no [[branches]] mappings configured; nothing to deploy".to_string(),
            ));
        }

        Ok(match platform {
            CiPlatform::GitHub => Self::github(project),
            CiPlatform::GitLab => Self::gitlab(project),
            CiPlatform::Azure => Self::azure(project),
        })
    }

    fn github(project: &ProjectConfig) -> String {
        let branches = project
            .branches
            .iter()
            .map(|b| format!("'{}'", github_filter(&b.pattern)))
            .collect::<Vec<_>>()
            .join(", ");

        let env: String = secret_names()
            .iter()
            .map(|name| format!("  {name}: ${{{{ secrets.{name} }}}}\n"))
            .collect();

        let setup = format!(
            r#"      - uses: actions/checkout@v4
      - uses: hashicorp/setup-terraform@v3
        with:
          terraform_wrapper: false
      - name: Install stackform
        run: {install}
"#,
            install = project.ci.install_command
        );

        let mut out = format!(
            r#"# Generated by stackform for project '{name}'.
name: Infrastructure

on:
  pull_request:
    branches: [{branches}]
  push:
    branches: [{branches}]

env:
  TF_IN_AUTOMATION: "1"
{env}
jobs:
  plan:
    if: github.event_name == 'pull_request'
    runs-on: ubuntu-latest
    steps:
{setup}      - name: Resolve stack
        id: stack
        run: echo "name=$(stackform stack --branch '${{{{ github.base_ref }}}}')" >> "$GITHUB_OUTPUT"
      - name: Validate
        run: stackform validate --stack "${{{{ steps.stack.outputs.name }}}}"
      - name: Plan
        run: stackform plan --stack "${{{{ steps.stack.outputs.name }}}}"

  resolve:
    if: github.event_name == 'push'
    runs-on: ubuntu-latest
    outputs:
      stack: ${{{{ steps.stack.outputs.name }}}}
    steps:
{setup}      - name: Resolve stack
        id: stack
        run: echo "name=$(stackform stack --branch '${{{{ github.ref_name }}}}')" >> "$GITHUB_OUTPUT"
"#,
            name = project.name,
        );

        for target in deploy_targets(project) {
            let environment = if target.requires_approval {
                format!("    environment: {}\n", target.stack)
            } else {
                String::new()
            };
            out.push_str(&format!(
                r#"
  apply-{id}:
    needs: resolve
    if: needs.resolve.outputs.stack == '{stack}'
    runs-on: ubuntu-latest
{environment}    concurrency: stackform-{stack}
    steps:
{setup}      - name: Apply
        run: stackform apply --stack {stack} --confirm
"#,
                id = job_id(&target.stack, '-'),
                stack = target.stack,
            ));
        }

        out
    }

    fn gitlab(project: &ProjectConfig) -> String {
        let mut out = format!(
            r#"# Generated by stackform for project '{name}'.
# Provider credentials and {secret} are expected as masked CI/CD variables.
# The job image must provide terraform and the toolchain for the install command.
stages:
  - plan
  - apply

variables:
  TF_IN_AUTOMATION: "1"

.stackform:
  image: {image}
  before_script:
    - {install}

plan:
  extends: .stackform
  stage: plan
  rules:
    - if: $CI_PIPELINE_SOURCE == "merge_request_event"
  script:
    - STACK="$(stackform stack --branch "$CI_MERGE_REQUEST_TARGET_BRANCH_NAME")"
    - stackform validate --stack "$STACK"
    - stackform plan --stack "$STACK"
"#,
            name = project.name,
            secret = WEBHOOK_SECRET_ENV,
            image = project.ci.image,
            install = project.ci.install_command,
        );

        for target in deploy_targets(project) {
            let when = if target.requires_approval { "manual" } else { "on_success" };

            // first matching mapping decides, so other stacks' patterns
            // short-circuit to `never`
            let mut rules = String::from(
                "    - if: $CI_PIPELINE_SOURCE != \"push\"\n      when: never\n",
            );
            for mapping in &project.branches {
                let rule_when = if mapping.stack == target.stack { when } else { "never" };
                rules.push_str(&format!(
                    "    - if: $CI_COMMIT_BRANCH =~ {}\n      when: {}\n",
                    glob_to_regex(&mapping.pattern),
                    rule_when
                ));
            }
            rules.push_str("    - when: never\n");

            let allow_failure = if target.requires_approval {
                "  allow_failure: false\n"
            } else {
                ""
            };

            out.push_str(&format!(
                r#"
apply:{id}:
  extends: .stackform
  stage: apply
  resource_group: stackform-{stack}
  environment:
    name: {stack}
  rules:
{rules}{allow_failure}  script:
    - stackform apply --stack {stack} --confirm
"#,
                id = job_id(&target.stack, '-'),
                stack = target.stack,
            ));
        }

        out
    }

    fn azure(project: &ProjectConfig) -> String {
        let includes: String = project
            .branches
            .iter()
            .map(|b| format!("      - '{}'\n", b.pattern))
            .collect();

        let env = azure_env(14);

        let mut out = format!(
            r###"# Generated by stackform for project '{name}'.
trigger:
  branches:
    include:
{includes}
pr:
  branches:
    include:
{includes}
variables:
  TF_IN_AUTOMATION: "1"

stages:
  - stage: Plan
    condition: eq(variables['Build.Reason'], 'PullRequest')
    jobs:
      - job: plan
        pool:
          vmImage: ubuntu-latest
        steps:
          - checkout: self
          - script: {install}
            displayName: Install stackform
          - script: |
              STACK="$(stackform stack --branch "$(System.PullRequest.TargetBranch)")"
              stackform validate --stack "$STACK"
              stackform plan --stack "$STACK"
            displayName: Validate and plan
            env:
{env}
  - stage: Resolve
    condition: ne(variables['Build.Reason'], 'PullRequest')
    jobs:
      - job: resolve
        pool:
          vmImage: ubuntu-latest
        steps:
          - checkout: self
          - script: {install}
            displayName: Install stackform
          - script: echo "##vso[task.setvariable variable=name;isOutput=true]$(stackform stack --branch "$(Build.SourceBranch)")"
            name: stack
"###,
            name = project.name,
            install = project.ci.install_command,
        );

        for target in deploy_targets(project) {
            let stage = job_id(&target.stack, '_');
            let header = format!(
                r#"
  - stage: Apply_{stage}
    dependsOn: Resolve
    condition: eq(dependencies.Resolve.outputs['resolve.stack.name'], '{stack}')
    jobs:
"#,
                stack = target.stack,
            );
            out.push_str(&header);

            let steps = format!(
                r#"- checkout: self
- script: {install}
  displayName: Install stackform
- script: stackform apply --stack {stack} --confirm
  displayName: Apply
  env:
{env}"#,
                install = project.ci.install_command,
                stack = target.stack,
                env = azure_env(4),
            );

            if target.requires_approval {
                // approvals are configured on the deployment environment
                out.push_str(&format!(
                    r#"      - deployment: apply
        environment: {stack}
        pool:
          vmImage: ubuntu-latest
        strategy:
          runOnce:
            deploy:
              steps:
{steps}"#,
                    stack = target.stack,
                    steps = indent(&steps, 16),
                ));
            } else {
                out.push_str(&format!(
                    r#"      - job: apply
        pool:
          vmImage: ubuntu-latest
        steps:
{steps}"#,
                    steps = indent(&steps, 10),
                ));
            }
        }

        out
    }
}

/// Secret variables mapped into a step's environment.
fn azure_env(width: usize) -> String {
    let pad = " ".repeat(width);
    secret_names()
        .iter()
        .map(|name| format!("{pad}{name}: $({name})\n"))
        .collect()
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines().map(|line| format!("{}{}\n", pad, line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BranchMapping;
    use tempfile::tempdir;

    fn project() -> ProjectConfig {
        let mut project = ProjectConfig::new("clustera", "/repo");
        project.branches = vec![
            BranchMapping {
                pattern: "main".to_string(),
                stack: "production".to_string(),
                requires_approval: true,
            },
            BranchMapping {
                pattern: "release/*".to_string(),
                stack: "staging".to_string(),
                requires_approval: false,
            },
        ];
        project
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("github".parse::<CiPlatform>().unwrap(), CiPlatform::GitHub);
        assert_eq!("GitLab".parse::<CiPlatform>().unwrap(), CiPlatform::GitLab);
        assert!("jenkins".parse::<CiPlatform>().is_err());
    }

    #[test]
    fn test_github_gates_approval_stacks() {
        let yaml = CiGenerator::render(CiPlatform::GitHub, &project()).unwrap();

        assert!(yaml.contains("branches: ['main', 'release/**']"));
        assert!(yaml.contains("AIVEN_TOKEN: ${{ secrets.AIVEN_TOKEN }}"));
        assert!(yaml.contains("apply-production:"));
        assert!(yaml.contains("    environment: production\n"));
        assert!(yaml.contains("apply-staging:"));
        assert!(!yaml.contains("environment: staging"));
        assert!(yaml.contains("stackform plan --stack"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed["jobs"]["apply-production"]["steps"].is_sequence());
    }

    #[test]
    fn test_gitlab_rules() {
        let yaml = CiGenerator::render(CiPlatform::GitLab, &project()).unwrap();

        assert!(yaml.contains("$CI_COMMIT_BRANCH =~ /^main$/\n      when: manual"));
        assert!(yaml.contains("$CI_COMMIT_BRANCH =~ /^release\\/.*$/\n      when: on_success"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["apply:production"]["environment"]["name"], "production");
    }

    #[test]
    fn test_azure_deployment_environment() {
        let yaml = CiGenerator::render(CiPlatform::Azure, &project()).unwrap();

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let stages = parsed["stages"].as_sequence().unwrap();
        assert_eq!(stages.len(), 4);
        assert_eq!(stages[2]["stage"], "Apply_production");
        assert_eq!(stages[2]["jobs"][0]["environment"], "production");
        assert_eq!(stages[3]["jobs"][0]["job"], "apply");
        assert_eq!(
            stages[2]["jobs"][0]["strategy"]["runOnce"]["deploy"]["steps"][2]["env"]["AIVEN_TOKEN"],
            "$(AIVEN_TOKEN)"
        );
    }

    #[test]
    fn test_azure_document_parses() {
        let yaml = CiGenerator::render(CiPlatform::Azure, &project()).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        let includes = parsed["trigger"]["branches"]["include"].as_sequence().unwrap();
        assert_eq!(includes.len(), 2);
        assert_eq!(parsed["pr"]["branches"]["include"][1], "release/*");
        assert_eq!(parsed["variables"]["TF_IN_AUTOMATION"], "1");

        let stages = parsed["stages"].as_sequence().unwrap();
        assert_eq!(stages[0]["stage"], "Plan");
        let plan_steps = stages[0]["jobs"][0]["steps"].as_sequence().unwrap();
        assert_eq!(plan_steps.len(), 3);
        assert_eq!(plan_steps[2]["env"]["STACKFORM_GMAIL_WEBHOOK_SECRET"], "$(STACKFORM_GMAIL_WEBHOOK_SECRET)");

        assert_eq!(stages[1]["stage"], "Resolve");
        let resolve = &stages[1]["jobs"][0]["steps"][2];
        assert_eq!(resolve["name"], "stack");
        assert!(resolve["script"]
            .as_str()
            .unwrap()
            .starts_with("echo \"##vso[task.setvariable variable=name;isOutput=true]"));

        assert_eq!(stages[3]["stage"], "Apply_staging");
        assert_eq!(stages[3]["dependsOn"], "Resolve");
        assert_eq!(stages[3]["jobs"][0]["steps"][2]["script"], "stackform apply --stack staging --confirm");
    }

    #[test]
    fn test_github_filter() {
        assert_eq!(github_filter("main"), "main");
        assert_eq!(github_filter("*"), "**");
        assert_eq!(github_filter("release/*"), "release/**");
        assert_eq!(github_filter("feature/**"), "feature/**");
    }

    #[test]
    fn test_generate_writes_file() {
        let dir = tempdir().unwrap();
        let path = CiGenerator::generate(CiPlatform::GitHub, &project(), dir.path()).unwrap();
        assert_eq!(path, dir.path().join(".github/workflows/infrastructure.yml"));
        assert!(path.exists());
    }

    #[test]
    fn test_requires_mappings() {
        let project = ProjectConfig::new("clustera", "/repo");
        assert!(CiGenerator::render(CiPlatform::GitHub, &project).is_err());
    }

    #[test]
    fn test_glob_to_regex() {
        assert_eq!(glob_to_regex("main"), "/^main$/");
        assert_eq!(glob_to_regex("release/v?.*"), "/^release\\/v.\\..*$/");
    }
}

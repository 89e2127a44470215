//! Runner behaviour through the trait object, as the IaC layer uses it.

use std::sync::Arc;

use stackform_runner::{
    ContainerRunner, ContainerRuntime, LocalRunner, MockResponse, MockRunner, RunOptions, ToolInvocation, ToolRunner,
};
use tempfile::tempdir;

fn runners() -> Vec<Arc<dyn ToolRunner>> {
    vec![
        Arc::new(LocalRunner::new()),
        Arc::new(ContainerRunner::with_runtime(ContainerRuntime::Docker, "hashicorp/terraform", "1.6")),
        Arc::new(MockRunner::new()),
    ]
}

#[tokio::test]
async fn test_dry_run_is_honoured_by_every_runner() {
    let dir = tempdir().unwrap();
    let invocation = ToolInvocation::new("terraform")
        .args(["apply", "-auto-approve"])
        .workdir(dir.path());

    for runner in runners() {
        let result = runner
            .run(&invocation, &RunOptions::default().dry_run(true))
            .await
            .unwrap();
        assert!(result.dry_run, "runner {} executed in dry-run mode", runner.name());
        assert!(result.success());
    }
}

#[tokio::test]
async fn test_mock_runner_shared_between_owners() {
    let mock = MockRunner::new().add_response(MockResponse::success("Terraform v1.6.6"));
    let runner: Arc<dyn ToolRunner> = Arc::new(mock.clone());

    let result = runner
        .run(&ToolInvocation::new("terraform").arg("version"), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.stdout, "Terraform v1.6.6");
    assert_eq!(mock.subcommands(), vec!["version".to_string()]);
}

//! Docker Desktop install path driven through the orchestrator

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{Router, routing::get};
use meow_cli::config::Settings;
use meow_cli::install::{Downloader, InstallOptions, InstallPlan, InstallState, Orchestrator};
use meow_cli::{Context, MeowError, OutputOptions};
use tempfile::TempDir;

/// Serve `app` on an ephemeral port and return its base URL
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server failed");
    });
    format!("http://{addr}")
}

/// Mock download server counting hits on `/installer`
async fn counting_server() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/installer",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                vec![0u8; 16]
            }
        }),
    );
    (serve(app).await, hits)
}

fn quiet_ctx() -> Context {
    let output = OutputOptions {
        quiet: true,
        ..Default::default()
    };
    Context::new(Settings::default(), output).unwrap()
}

fn desktop_plan(url: String, path: PathBuf) -> InstallPlan {
    InstallPlan::DesktopInstaller {
        url,
        path,
        args: vec!["--quiet".to_string(), "--accept-license".to_string()],
    }
}

/// Write an executable installer stand-in that records its arguments in `marker`
#[cfg(unix)]
fn fake_installer(path: &Path, marker: &Path) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(
        path,
        format!("#!/bin/sh\necho \"$@\" > '{}'\n", marker.display()),
    )
    .unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn missing_installer_fails_before_anything_runs() {
    let base = serve(Router::new()).await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("installer.exe");
    let ctx = quiet_ctx();
    let mut orchestrator = Orchestrator::new(&ctx, Downloader::new().unwrap());

    let err = orchestrator
        .run(
            &desktop_plan(format!("{base}/installer.exe"), path.clone()),
            InstallOptions::default(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MeowError::Network { status: 404 }), "{err:?}");
    assert_eq!(
        orchestrator.history(),
        &[
            InstallState::NotInstalled,
            InstallState::Downloading,
            InstallState::Failed
        ]
    );
    // nothing to execute was ever placed
    assert!(!path.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn present_installer_is_run_without_downloading() {
    let (base, hits) = counting_server().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("installer");
    let marker = dir.path().join("ran-with");
    fake_installer(&path, &marker);
    let ctx = quiet_ctx();
    let mut orchestrator = Orchestrator::new(&ctx, Downloader::new().unwrap());

    let state = orchestrator
        .run(
            &desktop_plan(format!("{base}/installer"), path),
            InstallOptions::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(state, InstallState::Installed);
    assert_eq!(
        orchestrator.history(),
        &[
            InstallState::NotInstalled,
            InstallState::Downloading,
            InstallState::Installing,
            InstallState::Installed
        ]
    );
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    let args = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(args.trim(), "--quiet --accept-license");
}

#[cfg(unix)]
#[tokio::test]
async fn failing_installer_halts_at_failed() {
    let (base, _hits) = counting_server().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("installer");
    std::fs::write(&path, "#!/bin/sh\nexit 4\n").unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    let ctx = quiet_ctx();
    let mut orchestrator = Orchestrator::new(&ctx, Downloader::new().unwrap());

    let err = orchestrator
        .run(
            &desktop_plan(format!("{base}/installer"), path),
            InstallOptions::default(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MeowError::Process { .. }), "{err:?}");
    assert_eq!(
        orchestrator.history(),
        &[
            InstallState::NotInstalled,
            InstallState::Downloading,
            InstallState::Installing,
            InstallState::Failed
        ]
    );
}

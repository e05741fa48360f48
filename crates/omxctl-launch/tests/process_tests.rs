#![cfg(unix)]

use omxctl_core::{ControlError, Destination, LaunchRequest, OpenOptions, PlayerLauncher};
use omxctl_launch::OmxProcessLauncher;

fn request() -> LaunchRequest {
    LaunchRequest {
        path: "/media/clip.mp4".into(),
        options: OpenOptions::default(),
        destination: Destination::new(Some(1)),
    }
}

#[tokio::test]
async fn test_exit_code_is_reported() {
    let launcher = OmxProcessLauncher::with_program("true");
    let exit = launcher.launch(&request()).await.unwrap().await.unwrap();
    assert!(exit.success());

    let launcher = OmxProcessLauncher::with_program("false");
    let exit = launcher.launch(&request()).await.unwrap().await.unwrap();
    assert_eq!(exit.code, Some(1));
}

#[tokio::test]
async fn test_missing_program_fails_launch() {
    let launcher = OmxProcessLauncher::with_program("/nonexistent/omxplayer");
    let result = launcher.launch(&request()).await;
    assert!(matches!(result, Err(ControlError::Launch(_))));
}

#[test]
fn test_default_program() {
    assert_eq!(
        OmxProcessLauncher::new().program(),
        std::path::Path::new("omxplayer")
    );
}

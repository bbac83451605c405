mod common;

use std::time::Duration;

use common::{context, delayed_descriptor, failing_descriptor, panicking_descriptor};
use mfe_shell::host::{HostError, ModuleHost, Navigation};
use mfe_shell::registry::ModuleRegistry;
use mfe_shell::routing::{RouteMapping, RouteResolver, NO_ROUTE};
use mfe_shell::store::{ShellState, SHELL_SLICE};

fn host() -> ModuleHost {
    let mut registry = ModuleRegistry::new();
    registry
        .register(delayed_descriptor("home", Duration::from_millis(1)))
        .unwrap();
    registry
        .register(delayed_descriptor("admin", Duration::from_millis(80)))
        .unwrap();
    registry
        .register(delayed_descriptor("account", Duration::from_millis(5)))
        .unwrap();
    registry
        .register(failing_descriptor("broken", Duration::ZERO))
        .unwrap();
    registry
        .register(failing_descriptor("flaky", Duration::from_millis(80)))
        .unwrap();
    registry.register(panicking_descriptor("faulty")).unwrap();

    let routes = RouteResolver::new(vec![
        RouteMapping::new("/admin", "admin", false),
        RouteMapping::new("/account", "account", false),
        RouteMapping::new("/broken", "broken", false),
        RouteMapping::new("/flaky", "flaky", false),
        RouteMapping::new("/faulty", "faulty", false),
        RouteMapping::new("/", "home", true),
    ]);
    ModuleHost::new(registry, routes, context())
}

/// A slow load finishing after a newer navigation is dropped.
#[tokio::test]
async fn test_stale_load_is_discarded() {
    let host = host();

    let (slow, fast) = tokio::join!(host.navigate("/admin"), host.navigate("/account"));

    assert_eq!(
        slow.unwrap(),
        Navigation::Superseded {
            module: "admin".to_string()
        }
    );
    assert!(matches!(fast.unwrap(), Navigation::Mounted { ref module, .. } if module == "account"));
    assert_eq!(host.active_module(), "account");
    assert!(!host.mounted().contains("admin"));
}

#[tokio::test]
async fn test_shell_slice_follows_navigation() {
    let host = host();
    host.navigate("/").await.unwrap();
    host.navigate("/account/profile").await.unwrap();
    host.navigate("/account").await.unwrap();

    let shell: ShellState = host.context().store.select_as(SHELL_SLICE).unwrap();
    assert_eq!(shell.active_route.as_deref(), Some("/account"));
    assert_eq!(shell.active_module.as_deref(), Some("account"));
    assert_eq!(shell.mounted, vec!["home".to_string(), "account".to_string()]);
}

#[tokio::test]
async fn test_load_failure_is_reported() {
    let host = host();
    let err = host.navigate("/broken").await.unwrap_err();
    assert!(matches!(err, HostError::Load(_)));
    assert!(host.mounted().is_empty());
}

#[tokio::test]
async fn test_unknown_path_reports_not_found() {
    let host = host();
    host.navigate("/").await.unwrap();
    let nav = host.navigate("/missing").await.unwrap();

    assert!(matches!(nav, Navigation::NotFound { .. }));
    assert_eq!(host.active_module(), NO_ROUTE);
    assert!(host.mounted().contains("home"));
}

/// A slow load that fails after a newer navigation began is ignored, not reported.
#[tokio::test]
async fn test_stale_failed_load_is_discarded() {
    let host = host();

    let (slow, fast) = tokio::join!(host.navigate("/flaky"), host.navigate("/account"));

    assert_eq!(
        slow.unwrap(),
        Navigation::Superseded {
            module: "flaky".to_string()
        }
    );
    assert!(matches!(fast.unwrap(), Navigation::Mounted { .. }));
    assert_eq!(host.active_module(), "account");
}

/// A module panicking in `mount` is reported and the host keeps working.
#[tokio::test]
async fn test_mount_panic_is_isolated() {
    let host = host();
    host.navigate("/").await.unwrap();

    let err = host.navigate("/faulty").await.unwrap_err();
    assert!(matches!(err, HostError::Mount { ref module } if module == "faulty"));
    assert!(!host.mounted().contains("faulty"));
    assert_eq!(host.active_module(), "home");

    let nav = host.navigate("/account").await.unwrap();
    assert!(matches!(nav, Navigation::Mounted { first_activation: true, .. }));
}

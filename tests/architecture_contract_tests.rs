//! Architecture contract tests.

mod support;

use support::architecture::{lines_matching, lines_matching_outside, mod_rs_violations};

#[test]
fn domain_has_no_runtime_or_outer_layer_imports() {
    let hits = lines_matching(
        "src/domain",
        &[
            "crate::infrastructure",
            "crate::port",
            "crate::server",
            "tokio::",
            "parking_lot::",
        ],
    );

    assert!(
        hits.is_empty(),
        "found forbidden imports in domain layer: {hits:#?}"
    );
}

#[test]
fn ports_do_not_reach_into_pool_or_monitor() {
    let hits = lines_matching(
        "src/port",
        &[
            "crate::infrastructure::pool",
            "crate::infrastructure::monitor",
            "crate::infrastructure::subscription",
            "crate::server",
        ],
    );
    assert!(
        hits.is_empty(),
        "ports should only depend on domain types and config: {hits:#?}"
    );
}

#[test]
fn only_the_server_spawns_monitors() {
    let hits = lines_matching_outside(
        "src",
        &["MonitorHandle::spawn("],
        &["src/server.rs", "src/infrastructure/monitor.rs"],
    );
    assert!(
        hits.is_empty(),
        "monitor tasks must be owned by a Server: {hits:#?}"
    );
}

#[test]
fn cli_goes_through_the_server_facade() {
    let hits = lines_matching(
        "src/cli",
        &["ConnectionPool", "Broadcaster", "crate::infrastructure::pool"],
    );
    assert!(
        hits.is_empty(),
        "CLI handlers should use Server rather than its parts: {hits:#?}"
    );
}

#[test]
fn mod_rs_is_export_only() {
    for dir in ["src/domain", "src/port", "src/infrastructure"] {
        let violations = mod_rs_violations(dir);
        assert!(
            violations.is_empty(),
            "found non-export content in mod.rs files: {violations:#?}"
        );
    }
}

#[test]
fn library_locks_are_parking_lot() {
    let hits = lines_matching("src", &["std::sync::Mutex", "std::sync::RwLock"]);
    assert!(
        hits.is_empty(),
        "library code should use parking_lot locks: {hits:#?}"
    );
}

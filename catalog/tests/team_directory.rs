//! End-to-end tests of the team list through its Store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use loadstate_catalog::mocks::{Method, MockTransport};
use loadstate_catalog::teams::Team;
use loadstate_catalog::{TeamDirectory, TransportError};
use loadstate_runtime::StoreConfig;
use loadstate_testing::init_test_tracing;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn team(id: u64, name: &str, members: u32) -> Team {
    Team {
        member_count: members,
        email: format!("{}@example.com", name.to_lowercase()),
        ..Team::new(id, name)
    }
}

fn directory(mock: &MockTransport) -> TeamDirectory {
    init_test_tracing();
    TeamDirectory::new(Arc::new(mock.clone()), StoreConfig::default())
}

#[tokio::test]
async fn fetch_all_loads_team_a() {
    let mock = MockTransport::new().with_teams(vec![Team::new(1, "Team A")]);
    let teams = directory(&mock);

    let mut handle = teams.fetch_all().await.unwrap();
    assert!(teams.fetch_status().await.pending);

    handle.wait_with_timeout(WAIT).await.unwrap();

    assert_eq!(teams.filtered().await, vec![Team::new(1, "Team A")]);
    let status = teams.fetch_status().await;
    assert!(!status.pending);
    assert_eq!(status.error, None);
}

#[tokio::test]
async fn search_filters_without_reloading() {
    let mock = MockTransport::new().with_teams(vec![
        team(1, "Platform", 4),
        team(2, "Plugins", 7),
        team(3, "Support", 2),
    ]);
    let teams = directory(&mock);
    teams.fetch_all().await.unwrap().wait_with_timeout(WAIT).await.unwrap();

    teams.set_search_query("pl").await.unwrap();

    let names: Vec<String> = teams.filtered().await.into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Platform".to_string(), "Plugins".to_string()]);
    assert_eq!(teams.count().await, 3);
    assert_eq!(mock.calls().fetch_teams, 1);
}

#[tokio::test]
async fn refresh_replaces_teams_and_dedups_while_running() {
    let mock = MockTransport::new().with_teams(vec![team(1, "Platform", 4)]);
    let teams = directory(&mock);
    teams.fetch_all().await.unwrap().wait_with_timeout(WAIT).await.unwrap();

    let renamed = mock.clone().with_teams(vec![team(1, "Platform Team", 5), team(2, "Plugins", 7)]);
    let gate = renamed.gate(Method::FetchTeams);

    let mut first = teams.refresh().await.unwrap();
    let mut second = teams.refresh().await.unwrap();
    gate.open();
    first.wait_with_timeout(WAIT).await.unwrap();
    second.wait_with_timeout(WAIT).await.unwrap();

    let loaded = teams.filtered().await;
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].name, "Platform Team");
    assert_eq!(loaded[0].member_count, 5);
    assert_eq!(mock.calls().fetch_teams, 2);
}

#[tokio::test]
async fn failed_refresh_keeps_stale_teams() {
    let mock = MockTransport::new().with_teams(vec![team(1, "Platform", 4)]);
    let teams = directory(&mock);
    teams.fetch_all().await.unwrap().wait_with_timeout(WAIT).await.unwrap();

    let error = TransportError::Status { code: 502, message: "bad gateway".into() };
    mock.fail(Method::FetchTeams, error.clone());
    teams.refresh().await.unwrap().wait_with_timeout(WAIT).await.unwrap();

    assert_eq!(teams.count().await, 1);
    assert_eq!(teams.fetch_status().await.error, Some(error));
}

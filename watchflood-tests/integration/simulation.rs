//! Full simulation runs against the stub server

use std::sync::Arc;

use watchflood_core::{ApiProtocol, WatchfloodConfig};
use watchflood_sim::{SimContext, SimulationReport, Simulator};

use crate::common::{http_client, start_stub, test_config};

fn simulator(config: WatchfloodConfig, instances: usize, agents: usize) -> Simulator {
    let api = http_client(&config.api);
    let seed = config.simulation.seed.unwrap_or(42);
    let ctx = SimContext::new(Arc::new(api), config.simulation, seed);
    Simulator::new(ctx, instances, agents)
}

async fn run(protocol: ApiProtocol, ticks: u64) -> SimulationReport {
    let base_url = start_stub(3).await;
    let mut simulator = simulator(test_config(&base_url, protocol), 4, 3);
    simulator.run_for(ticks).await
}

#[tokio::test]
async fn test_v4_run_watches_videos() {
    let report = run(ApiProtocol::V4, 25).await;

    assert_eq!(report.metrics.ticks, 25);
    assert!(report.success(), "{:?}", report.metrics.invariant_violations);
    assert!(report.metrics.instances_created > 0);
    assert!(report.metrics.videos_started > 0);
    assert_eq!(report.metrics.instance_failures, 0);
    assert_eq!(report.metrics.agent_failures, 0);
    assert_eq!(report.metrics.churn_failures, 0);
}

#[tokio::test]
async fn test_v5_run_watches_videos() {
    let report = run(ApiProtocol::V5, 25).await;

    assert!(report.success(), "{:?}", report.metrics.invariant_violations);
    assert!(report.metrics.videos_started > 0);
    assert_eq!(report.metrics.instance_failures, 0);
    assert_eq!(report.metrics.churn_failures, 0);
}

#[tokio::test]
async fn test_population_shape_replays_with_same_seed() {
    let first = run(ApiProtocol::V4, 30).await;
    let second = run(ApiProtocol::V4, 30).await;

    assert_eq!(first.seed, second.seed);
    assert_eq!(first.final_instances, second.final_instances);
    assert_eq!(first.final_agents, second.final_agents);
    assert_eq!(
        first.metrics.instances_created,
        second.metrics.instances_created
    );
    assert_eq!(first.metrics.agents_added, second.metrics.agents_added);
}

#[tokio::test]
async fn test_unreachable_api_does_not_stop_run() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = test_config(&format!("http://{addr}"), ApiProtocol::V4);
    let mut simulator = simulator(config, 2, 2);
    let report = simulator.run_for(10).await;

    // Heartbeats are best effort, so instances still come up and then fail
    // every search
    assert_eq!(report.metrics.ticks, 10);
    assert!(report.metrics.instances_created > 0);
    assert!(report.metrics.instance_failures > 0);
    assert_eq!(report.metrics.videos_started, 0);
    assert!(report.success());
}

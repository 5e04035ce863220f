//! Acceptance tests for the engine/node two-phase exchange.
//!
//! The loopback transport plays the remote side: a "master" thread drives
//! the session the way the co-simulation network would, while the test
//! thread acts as the engine.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lockstep::{
    Coupling, CouplingConfig, ExchangeOutcome, LockstepError, LoopbackBus, LoopbackRemote,
    ProtocolPhase, SessionFault,
};

fn loopback_config(timeout_secs: i64) -> CouplingConfig {
    let mut config = CouplingConfig::new("plant_model");
    config.transport = "loopback".to_string();
    config.timeout_secs = timeout_secs;
    config
}

/// Spawn a master thread that waits for the session to connect, starts
/// the run, and then executes `script` against the remote.
fn spawn_master<F>(remote: Arc<LoopbackRemote>, script: F) -> JoinHandle<()>
where
    F: FnOnce(&LoopbackRemote) + Send + 'static,
{
    thread::spawn(move || {
        assert!(
            remote.wait_connected(Duration::from_secs(5)),
            "session never connected"
        );
        assert!(remote.begin_simulation());
        script(remote.as_ref());
    })
}

#[test]
fn test_scenario_full_step_round_trip() {
    // Scenario: one complete simulation step
    // Given: a started session and a master requesting an output update
    // When: the engine exchanges [1.0, 2.0] and the master hands back
    //       [3.5] at time 12.0
    // Then: the node observes exactly [1.0, 2.0] and the engine receives
    //       ([3.5], 12.0)

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |remote| {
        remote.request_output_update(12.0);
        assert!(
            remote.wait_published(1, Duration::from_secs(5)),
            "outputs were never published"
        );
        assert_eq!(remote.published(), vec![vec![1.0, 2.0]]);
        remote.deliver_inputs(&[3.5]).unwrap();
        remote.request_input_update(12.0);
    });

    let mut coupling = Coupling::start_session(loopback_config(5), Box::new(link)).unwrap();
    let outcome = coupling.exchange(&[1.0, 2.0]).unwrap();
    assert_eq!(
        outcome,
        ExchangeOutcome::Exchanged {
            inputs: vec![3.5],
            sim_time: 12.0
        }
    );
    assert_eq!(coupling.current_time(), 12.0);
    assert_eq!(coupling.phase(), ProtocolPhase::AwaitingY);

    master.join().unwrap();
    coupling.stop_session();
}

#[test]
fn test_scenario_consecutive_steps() {
    // Scenario: the rendezvous repeats cleanly
    // Given: a running session
    // When: the master drives two full steps
    // Then: each exchange sees its own snapshot, in order

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |remote| {
        for step in 1..=2u32 {
            let time = step as f64;
            remote.request_output_update(time);
            assert!(remote.wait_published(step as usize, Duration::from_secs(5)));
            remote.deliver_inputs(&[10.0 * time]).unwrap();
            remote.request_input_update(time);
        }
    });

    let mut coupling = Coupling::start_session(loopback_config(5), Box::new(link)).unwrap();
    for step in 1..=2u32 {
        let time = step as f64;
        let outcome = coupling.exchange(&[time, -time]).unwrap();
        assert_eq!(
            outcome,
            ExchangeOutcome::Exchanged {
                inputs: vec![10.0 * time],
                sim_time: time
            }
        );
    }

    master.join().unwrap();
    assert_eq!(
        remote.published(),
        vec![vec![1.0, -1.0], vec![2.0, -2.0]]
    );
    coupling.stop_session();
}

#[test]
fn test_scenario_remote_termination_instead_of_update() {
    // Scenario: cooperative termination at a rendezvous point
    // Given: a running session
    // When: the master ends the session instead of requesting outputs
    // Then: exchange reports a normal stop and publishes nothing

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |remote| {
        remote.end_session();
    });

    let mut coupling = Coupling::start_session(loopback_config(5), Box::new(link)).unwrap();
    let outcome = coupling.exchange(&[1.0, 2.0]).unwrap();
    assert_eq!(outcome, ExchangeOutcome::RemoteFinished);
    assert!(remote.published().is_empty());
    assert_eq!(coupling.phase(), ProtocolPhase::Aborted);

    master.join().unwrap();
    coupling.stop_session();
}

#[test]
fn test_scenario_exchange_timeout_is_recoverable() {
    // Scenario: the remote side goes quiet
    // Given: a session with a one-second timeout and a silent master
    // When: the engine exchanges
    // Then: a Timeout error surfaces, the session stays usable, and
    //       stopping does not hang

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |_remote| {});

    let mut coupling = Coupling::start_session(loopback_config(1), Box::new(link)).unwrap();
    match coupling.exchange(&[1.0]) {
        Err(LockstepError::Timeout(_)) => {}
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert_eq!(coupling.phase(), ProtocolPhase::AwaitingY);

    master.join().unwrap();
    let begun = Instant::now();
    coupling.stop_session();
    assert!(begun.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_scenario_send_error_surfaces_as_communication_failure() {
    // Scenario: the transport fails while publishing
    // Given: a master that requests outputs after arming a publish failure
    // When: the engine exchanges
    // Then: the node quits, the exchange reports a communication error,
    //       and stop_session completes promptly

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |remote| {
        remote.inject_publish_failure();
        remote.request_output_update(1.0);
    });

    let mut coupling = Coupling::start_session(loopback_config(5), Box::new(link)).unwrap();
    match coupling.exchange(&[4.0, 5.0]) {
        Err(LockstepError::Communication(_)) => {}
        other => panic!("expected Communication, got {:?}", other),
    }
    assert_eq!(coupling.phase(), ProtocolPhase::Aborted);

    master.join().unwrap();
    let begun = Instant::now();
    coupling.stop_session();
    assert!(begun.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_scenario_reported_fault_aborts_the_session() {
    // Scenario: the bus reports a message parse failure
    // Given: a running session
    // When: the transport reports a fault instead of an update request
    // Then: the engine's next exchange sees a communication error

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |remote| {
        remote.report_fault(SessionFault::MessageParse, "garbled frame");
    });

    let mut coupling = Coupling::start_session(loopback_config(5), Box::new(link)).unwrap();
    match coupling.exchange(&[1.0]) {
        Err(LockstepError::Communication(_)) => {}
        other => panic!("expected Communication, got {:?}", other),
    }

    master.join().unwrap();
    coupling.stop_session();
}

#[test]
fn test_scenario_oversized_inputs_quit_the_session() {
    // Scenario: a peer floods the input port
    // Given: a running session
    // When: the master delivers more values than the exchange bound allows
    // Then: the delivery is rejected outright and the session quits rather
    //       than truncating

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |remote| {
        let oversized = vec![0.5; lockstep::MAX_EXCHANGE_VALUES + 1];
        match remote.deliver_inputs(&oversized) {
            Err(LockstepError::BufferOverflow { held, capacity }) => {
                assert_eq!(held, lockstep::MAX_EXCHANGE_VALUES + 1);
                assert_eq!(capacity, lockstep::MAX_EXCHANGE_VALUES);
            }
            other => panic!("expected BufferOverflow, got {:?}", other),
        }
    });

    let mut coupling = Coupling::start_session(loopback_config(5), Box::new(link)).unwrap();
    match coupling.exchange(&[1.0]) {
        Err(LockstepError::Communication(_)) => {}
        other => panic!("expected Communication, got {:?}", other),
    }

    master.join().unwrap();
    let begun = Instant::now();
    coupling.stop_session();
    assert!(begun.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_scenario_stop_mid_handshake_does_not_deadlock() {
    // Scenario: the engine shuts down while the node waits for an ack
    // Given: a master that requested outputs but an engine that never
    //        exchanges
    // When: the engine stops the session
    // Then: the node's pending wait is unblocked and the join completes

    let (link, remote) = LoopbackBus::new();
    let remote = Arc::new(remote);
    let master = spawn_master(Arc::clone(&remote), |remote| {
        remote.request_output_update(1.0);
    });

    let mut coupling = Coupling::start_session(loopback_config(5), Box::new(link)).unwrap();
    master.join().unwrap();
    // Give the session time to park in its acknowledgement wait.
    thread::sleep(Duration::from_millis(50));

    let begun = Instant::now();
    coupling.stop_session();
    assert!(begun.elapsed() < Duration::from_secs(5));
}

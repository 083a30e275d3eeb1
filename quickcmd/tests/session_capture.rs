//! End-to-end capture tests: real shells, real log files.
//!
//! Each test starts commands through a `Session`, waits for them to exit, and
//! checks the exact layout of the command log.

use std::time::{Duration, Instant};

use quickcmd::io::config::SessionConfig;
use quickcmd::io::log_sink::Console;
use quickcmd::io::signal::ProcessSignaller;
use quickcmd::session::Session;
use quickcmd::test_support::{CaptureConsole, TestWorkspace, wait_for_log};

#[test]
fn echo_hello_is_logged_between_header_and_footer() {
    let ws = TestWorkspace::new().expect("workspace");
    let (mut session, _, _) = ws.session(&SessionConfig::default());

    let pid = session.execute("echo hello").expect("execute");
    assert!(pid > 0);
    assert_eq!(session.tracked(), vec![pid]);
    assert_eq!(session.wait_idle(), 1);

    let log = ws.read_log().expect("log");
    assert_eq!(
        log,
        "Begin logging.\n\n\
         Output for 'echo hello':\n\n\
         hello\n\
         \nEnd of output of 'echo hello'.\n\n"
    );
    session.teardown();
}

#[test]
fn sequential_commands_do_not_interleave() {
    let ws = TestWorkspace::new().expect("workspace");
    let (mut session, _, _) = ws.session(&SessionConfig::default());

    session.execute("printf 'one\\ntwo\\n'").expect("first");
    session.wait_idle();
    session.execute("sh -c 'echo three 1>&2'").expect("second");
    session.wait_idle();

    let log = ws.read_log().expect("log");
    let first = "Output for 'printf 'one\\ntwo\\n'':\n\none\ntwo\n\nEnd of output of 'printf 'one\\ntwo\\n''.\n\n";
    let second = "Output for 'sh -c 'echo three 1>&2'':\n\nthree\n\nEnd of output of 'sh -c 'echo three 1>&2''.\n\n";
    assert!(log.contains(first), "log: {log}");
    assert!(log.contains(second), "log: {log}");
    assert!(log.find(first) < log.find(second));
}

#[test]
fn execute_returns_before_output_completes() {
    let ws = TestWorkspace::new().expect("workspace");
    let (mut session, _, _) = ws.session(&SessionConfig::default());

    session
        .execute("sleep 1; echo late-output")
        .expect("execute");
    let log_now = ws.read_log().expect("log");
    assert!(!log_now.contains("late-output\n"));

    let log = wait_for_log(
        &ws.log_path(),
        "End of output of 'sleep 1; echo late-output'.",
        Duration::from_secs(10),
    )
    .expect("footer appears");
    assert!(log.contains("late-output\n"));
    session.wait_idle();
    session.teardown();
}

#[cfg(unix)]
#[test]
fn kill_all_stops_every_process_of_a_compound_command() {
    let ws = TestWorkspace::new().expect("workspace");
    let capture = CaptureConsole::new();
    let console: Console = capture.console();
    let mut session = Session::bind(
        ws.path(),
        &SessionConfig::default(),
        console,
        ProcessSignaller,
    );

    let pid = session.execute("sleep 30; echo tail").expect("execute");
    assert_eq!(session.kill_all(), 1);
    assert!(session.tracked().is_empty());

    let started = Instant::now();
    assert_eq!(session.wait_idle(), 1);
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "the sleeper outlived the kill"
    );

    let log = ws.read_log().expect("log");
    assert!(log.contains(&format!("Killed process: {pid}\n\n")));
    assert!(!log.contains("\ntail\n"), "log: {log}");
    assert!(!log.contains("End of output of"), "log: {log}");
    session.teardown();
}

//! Demo acquisition: synthetic events when no real source is usable.

use rand::Rng;
use secubeat_types::{CommandEvent, EventKind};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const DEMO_USERS: &[&str] = &["admin", "deploy", "alice", "bob"];
const DEMO_IPS: &[&str] = &["192.168.1.50", "10.0.0.23", "172.16.4.8"];
const DEMO_COMMANDS: &[&str] = &[
    "ls -la /var/www",
    "ps aux",
    "systemctl status sshd",
    "tail -n 50 /var/log/syslog",
    "df -h",
    "uptime",
    "cat /etc/os-release",
    "netstat -tlnp",
];

/// Generate plausible synthetic events at randomized intervals until stop
/// is signalled. Never fails; this is the terminal fallback.
pub(crate) async fn run_demo(
    interval: (Duration, Duration),
    tx: &mpsc::Sender<CommandEvent>,
    stop: &mut watch::Receiver<bool>,
) {
    let (min, max) = interval;
    loop {
        // Sample outside the await so the rng handle is not held across it.
        let (delay, event) = {
            let mut rng = rand::thread_rng();
            let delay = if max > min {
                min + Duration::from_millis(
                    rng.gen_range(0..max.saturating_sub(min).as_millis().max(1) as u64),
                )
            } else {
                min
            };
            let event = CommandEvent::builder(EventKind::CommandExecution)
                .user(DEMO_USERS[rng.gen_range(0..DEMO_USERS.len())])
                .command(DEMO_COMMANDS[rng.gen_range(0..DEMO_COMMANDS.len())])
                .source_ip(DEMO_IPS[rng.gen_range(0..DEMO_IPS.len())])
                .session_id("demo")
                .pid(rng.gen_range(1000..32768))
                .synthetic(true)
                .build();
            (delay, event)
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop.changed() => return,
        }
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

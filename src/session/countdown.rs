//! Background ticker keeping a [`PermissionCountdown`] current.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{PermissionCountdown, SessionStore};

pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const SWITCHER_TICK: Duration = Duration::from_secs(5);

/// Owns the countdown tasks; dropping it stops them.
pub struct CountdownTicker {
    state: watch::Receiver<PermissionCountdown>,
    tasks: Vec<JoinHandle<()>>,
}

impl CountdownTicker {
    pub fn spawn(session: Arc<SessionStore>) -> Self {
        let (tx, state) = watch::channel(PermissionCountdown::default());
        let tx = Arc::new(tx);

        let refresh = {
            let tx = Arc::clone(&tx);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(COUNTDOWN_TICK);
                loop {
                    interval.tick().await;
                    let windows = session.windows();
                    tx.send_modify(|countdown| countdown.refresh(&windows, Utc::now()));
                }
            })
        };

        let switcher = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWITCHER_TICK);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                tx.send_modify(|countdown| countdown.switcher = !countdown.switcher);
            }
        });

        Self {
            state,
            tasks: vec![refresh, switcher],
        }
    }

    pub fn state(&self) -> watch::Receiver<PermissionCountdown> {
        self.state.clone()
    }

    pub fn current(&self) -> PermissionCountdown {
        self.state.borrow().clone()
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

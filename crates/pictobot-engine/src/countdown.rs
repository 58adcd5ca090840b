use std::future::Future;
use std::time::Duration;

use pictobot_contracts::generation::CountdownState;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// What the timer does once the remaining time reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPolicy {
    Stop,
    KeepTicking,
}

/// Timer settings. The display counts whole seconds, so `tick` is rounded
/// up to the next whole second (minimum one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    pub total: Duration,
    pub tick: Duration,
    pub zero_policy: ZeroPolicy,
}

impl CountdownConfig {
    pub fn tick_seconds(&self) -> u64 {
        let whole = self.tick.as_secs() + u64::from(self.tick.subsec_nanos() > 0);
        whole.max(1)
    }

    pub fn initial_state(&self) -> CountdownState {
        CountdownState::new(self.total.as_secs(), self.tick_seconds())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CountdownError {
    #[error("countdown already started")]
    AlreadyStarted,
}

pub type ZeroCallback = Box<dyn FnOnce(CountdownState) + Send>;

/// Repeating timer that drives one progress message.
///
/// One presenter per session; it cannot be restarted.
pub struct CountdownPresenter {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    started: bool,
}

impl CountdownPresenter {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            task: None,
            started: false,
        }
    }

    pub fn start<F, Fut>(
        &mut self,
        config: CountdownConfig,
        mut on_tick: F,
        on_zero: Option<ZeroCallback>,
    ) -> Result<(), CountdownError>
    where
        F: FnMut(CountdownState) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.started {
            return Err(CountdownError::AlreadyStarted);
        }
        self.started = true;

        let token = self.token.clone();
        let tick = Duration::from_secs(config.tick_seconds());
        let mut state = config.initial_state();
        let mut on_zero = on_zero;

        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                state.tick();
                // A stalled edit must not hold up cancel(); it is dropped.
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = on_tick(state) => {}
                }

                if state.is_elapsed() {
                    if let Some(callback) = on_zero.take() {
                        callback(state);
                    }
                    if config.zero_policy == ZeroPolicy::Stop {
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    /// Stops the timer and waits for the task to exit.
    ///
    /// An in-flight tick callback is dropped at its next await point. Once
    /// this returns no tick callback runs again. Returns `false` when the
    /// presenter was already cancelled or never started.
    pub async fn cancel(&mut self) -> bool {
        self.token.cancel();
        let Some(task) = self.task.take() else {
            return false;
        };
        if let Err(err) = task.await {
            warn!(%err, "countdown task ended abnormally");
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Default for CountdownPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CountdownPresenter {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

//! Delayed and conditional visibility of the option list and the cheat sheet.
//!
//! Each channel owns at most one live [`Timer`]. Re-arming drops the old handle (which
//! cancels it) before scheduling a new one, and every schedule bumps a generation
//! counter so a firing that was already queued when its timer was replaced is ignored.

use std::{sync::Arc, time::Duration};

use config::Policy;
use tracing::trace;

use crate::timer::Timer;

/// The two independently disclosed panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Option list under the active group.
    Options,
    /// Full cheat sheet overlay.
    Cheatsheet,
}

impl Channel {
    /// Timer name used in logs.
    fn name(self) -> &'static str {
        match self {
            Self::Options => "options",
            Self::Cheatsheet => "cheatsheet",
        }
    }
}

/// Callback invoked from the timer task when a channel's delay elapses.
pub type FireFn = Arc<dyn Fn(Channel, u64) + Send + Sync>;

/// State for one channel.
#[derive(Debug)]
struct Slot {
    /// Which channel this is.
    channel: Channel,
    /// Visibility policy.
    policy: Policy,
    /// Current visibility.
    visible: bool,
    /// Pending delay timer.
    timer: Option<Timer>,
    /// Generation of the most recently scheduled timer.
    generation: u64,
}

impl Slot {
    /// New slot at its idle visibility.
    fn new(channel: Channel, policy: Policy) -> Self {
        Self {
            channel,
            policy,
            visible: policy.idle_visible(),
            timer: None,
            generation: 0,
        }
    }

    /// Cancel any pending timer.
    fn cancel(&mut self) {
        if let Some(t) = self.timer.take() {
            t.cancel();
        }
    }

    /// React to an open or a keystroke.
    fn arm(&mut self, fire: &FireFn) {
        self.cancel();
        match self.policy {
            Policy::Never => self.visible = false,
            Policy::Always => self.visible = true,
            // Stays as the trigger key left it until the overlay closes.
            Policy::OnTrigger => {}
            Policy::AfterDelay(delay) => self.schedule(delay, fire),
        }
    }

    /// Hide and start a fresh delay.
    fn schedule(&mut self, delay: Duration, fire: &FireFn) {
        self.visible = false;
        self.generation += 1;
        let generation = self.generation;
        let channel = self.channel;
        let fire = fire.clone();
        self.timer = Some(Timer::start(channel.name(), delay, move || {
            fire(channel, generation)
        }));
    }

    /// Back to the idle default.
    fn reset(&mut self) {
        self.cancel();
        self.visible = self.policy.idle_visible();
    }

    /// Apply a firing. Returns true when visibility changed.
    fn fired(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.timer.is_none() {
            trace!(channel = self.channel.name(), generation, "stale firing ignored");
            return false;
        }
        self.timer = None;
        let changed = !self.visible;
        self.visible = true;
        changed
    }
}

/// Disclosure timers for both channels.
pub struct Disclosure {
    /// Option list channel.
    options: Slot,
    /// Cheat sheet channel.
    cheatsheet: Slot,
    /// Sink for timer firings; must route back onto the owner's context.
    fire: FireFn,
}

impl Disclosure {
    /// Create timers with the given policies. `fire` is called from the timer task.
    pub fn new(
        options: Policy,
        cheatsheet: Policy,
        fire: impl Fn(Channel, u64) + Send + Sync + 'static,
    ) -> Self {
        Self {
            options: Slot::new(Channel::Options, options),
            cheatsheet: Slot::new(Channel::Cheatsheet, cheatsheet),
            fire: Arc::new(fire),
        }
    }

    /// Borrow a slot mutably.
    fn slot_mut(&mut self, channel: Channel) -> &mut Slot {
        match channel {
            Channel::Options => &mut self.options,
            Channel::Cheatsheet => &mut self.cheatsheet,
        }
    }

    /// Borrow a slot.
    fn slot(&self, channel: Channel) -> &Slot {
        match channel {
            Channel::Options => &self.options,
            Channel::Cheatsheet => &self.cheatsheet,
        }
    }

    /// Replace both policies and return to idle visibility.
    pub fn set_policies(&mut self, options: Policy, cheatsheet: Policy) {
        self.options.policy = options;
        self.cheatsheet.policy = cheatsheet;
        self.reset();
    }

    /// Overlay opened or a transition happened: re-arm delay timers (cancel, then restart).
    pub fn on_transition(&mut self) {
        let fire = self.fire.clone();
        self.options.arm(&fire);
        self.cheatsheet.arm(&fire);
    }

    /// Overlay closed: cancel everything and restore idle visibility.
    pub fn reset(&mut self) {
        self.options.reset();
        self.cheatsheet.reset();
    }

    /// Show a channel now, canceling its pending timer.
    pub fn force(&mut self, channel: Channel) {
        let slot = self.slot_mut(channel);
        slot.cancel();
        slot.visible = true;
    }

    /// Flip an `on_trigger` channel. Returns false when the channel is not trigger-driven.
    pub fn trigger(&mut self, channel: Channel) -> bool {
        let slot = self.slot_mut(channel);
        if slot.policy != Policy::OnTrigger {
            return false;
        }
        slot.visible = !slot.visible;
        true
    }

    /// Apply a timer firing for `channel`. Returns true when visibility changed.
    pub fn fired(&mut self, channel: Channel, generation: u64) -> bool {
        self.slot_mut(channel).fired(generation)
    }

    /// Current visibility of a channel.
    pub fn visible(&self, channel: Channel) -> bool {
        self.slot(channel).visible
    }

    /// Current policy of a channel.
    pub fn policy(&self, channel: Channel) -> Policy {
        self.slot(channel).policy
    }

    /// True while a delay timer is pending on `channel`.
    pub fn is_armed(&self, channel: Channel) -> bool {
        self.slot(channel).timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use tokio::{sync::mpsc, time};

    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    fn disclosure(
        options: Policy,
        cheatsheet: Policy,
    ) -> (Disclosure, mpsc::UnboundedReceiver<(Channel, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let d = Disclosure::new(options, cheatsheet, move |c, g| {
            let _ignored = tx.send((c, g));
        });
        (d, rx)
    }

    /// Apply every firing already delivered.
    fn drain(d: &mut Disclosure, rx: &mut mpsc::UnboundedReceiver<(Channel, u64)>) {
        while let Ok((c, g)) = rx.try_recv() {
            d.fired(c, g);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn after_delay_shows_after_idle() {
        let (mut d, mut rx) = disclosure(Policy::AfterDelay(SEC), Policy::Never);
        d.on_transition();
        assert!(!d.visible(Channel::Options));
        time::sleep(Duration::from_millis(999)).await;
        drain(&mut d, &mut rx);
        assert!(!d.visible(Channel::Options));
        time::sleep(Duration::from_millis(2)).await;
        drain(&mut d, &mut rx);
        assert!(d.visible(Channel::Options));
        assert!(!d.is_armed(Channel::Options));
    }

    #[tokio::test(start_paused = true)]
    async fn keystroke_restarts_window() {
        let (mut d, mut rx) = disclosure(Policy::AfterDelay(SEC), Policy::Never);
        d.on_transition();
        time::sleep(Duration::from_millis(600)).await;
        d.on_transition();
        time::sleep(Duration::from_millis(600)).await;
        drain(&mut d, &mut rx);
        assert!(!d.visible(Channel::Options));
        time::sleep(Duration::from_millis(401)).await;
        drain(&mut d, &mut rx);
        assert!(d.visible(Channel::Options));
    }

    #[test]
    fn stale_generation_ignored() {
        let (mut d, _rx) = disclosure(Policy::AfterDelay(SEC), Policy::Never);
        // No timer was ever scheduled.
        assert!(!d.fired(Channel::Options, 0));
        assert!(!d.visible(Channel::Options));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_firing_from_replaced_timer_is_ignored() {
        let (mut d, mut rx) = disclosure(Policy::AfterDelay(SEC), Policy::Never);
        d.on_transition();
        time::sleep(Duration::from_millis(1001)).await;
        // The first timer fired; re-arm before the owner handles the firing.
        d.on_transition();
        drain(&mut d, &mut rx);
        assert!(!d.visible(Channel::Options));
        assert!(d.is_armed(Channel::Options));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_and_restores_idle() {
        let (mut d, mut rx) = disclosure(Policy::AfterDelay(SEC), Policy::Always);
        d.on_transition();
        assert!(d.visible(Channel::Cheatsheet));
        d.reset();
        assert!(!d.is_armed(Channel::Options));
        time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        assert!(!d.visible(Channel::Options));
        assert!(d.visible(Channel::Cheatsheet));
    }

    #[test]
    fn trigger_only_for_on_trigger() {
        let (mut d, _rx) = disclosure(Policy::Never, Policy::OnTrigger);
        assert!(!d.trigger(Channel::Options));
        assert!(d.trigger(Channel::Cheatsheet));
        assert!(d.visible(Channel::Cheatsheet));
        d.on_transition();
        assert!(d.visible(Channel::Cheatsheet));
        d.reset();
        assert!(!d.visible(Channel::Cheatsheet));
    }

    #[test]
    fn force_shows_never_channel() {
        let (mut d, _rx) = disclosure(Policy::Never, Policy::Never);
        d.force(Channel::Options);
        assert!(d.visible(Channel::Options));
        d.on_transition();
        assert!(!d.visible(Channel::Options));
    }
}

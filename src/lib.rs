pub mod bot;
pub mod commands;
pub mod config;
pub mod events;
pub mod listener;
pub mod notice;
pub mod notifier;
pub mod observer;
pub mod onboarding;
pub mod poller;
pub mod queries;
pub mod types;

#[cfg(test)]
mod testing;

pub use bot::P2PoolBot;
pub use config::Config;
pub use listener::NotificationListener;
pub use observer::ObserverClient;
pub use onboarding::run_onboarding_checks;

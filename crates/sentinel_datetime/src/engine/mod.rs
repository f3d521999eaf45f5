mod cache;
mod clock;
mod composer;
mod device;
mod module;
mod scheduler;
mod status;

pub use cache::Change;
pub use clock::Clock;
pub use clock::SystemClock;
pub use composer::ComposeError;
pub use composer::Composer;
pub use device::Device;
pub use module::DatetimeModule;
pub use module::DeviceModule;
pub use module::ModuleError;
#[cfg(test)]
pub(crate) use module::testing;
pub use scheduler::PollState;
pub use scheduler::Scheduler;
pub use status::StatusSnapshot;
pub use status::SunEvent;
pub use status::Weekday;

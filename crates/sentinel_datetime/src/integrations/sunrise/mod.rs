//! Client for the sunrise-sunset.org JSON API.

mod client;
mod response;

pub use client::HttpSunriseClient;
#[cfg(test)]
pub use client::MockSunriseClient;
pub use client::SunriseClient;
pub use client::SunriseError;
pub use response::SunInstant;
pub use response::SunTimes;
pub use response::SunriseResponse;

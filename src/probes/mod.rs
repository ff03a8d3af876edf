//! Point diagnostics that go straight through the retry executor:
//! ICMP reachability, TCP port checks, and bandwidth measurement.

pub mod ping;
pub mod speed;
pub mod tcp;

pub use ping::PingReport;
pub use speed::SpeedReport;
pub use tcp::TcpReport;

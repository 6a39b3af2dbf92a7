mod executions;
mod logs;
mod packets;
mod profiles;
mod scenarios;
mod summaries;

pub use executions::ExecutionRepository;
pub use logs::LogRepository;
pub use packets::PacketRepository;
pub use profiles::ProfileRepository;
pub use scenarios::ScenarioRepository;
pub use summaries::SummaryRepository;

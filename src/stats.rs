mod aggregate;
mod channels;
mod engine;
mod error;
mod histogram;
mod table;


pub use aggregate::{Aggregate, RequestId, StatsRecord, aggregate, summarize};
pub use channels::{ChannelInfo, ChannelInfoProvider};
pub use engine::StatisticsEngine;
pub use error::{Result, StatsError};
pub use histogram::{Histogram, histogram};
pub use table::{ResultRow, result_rows};

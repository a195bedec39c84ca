//! Price data acquisition and raw storage.

pub mod download;
pub mod local;
pub mod period;
pub mod provider;
pub mod retry;
pub mod stooq;
pub mod store;
pub mod yahoo;

pub use download::{DownloadSummary, FetchOutcome, Fetcher};
pub use local::LocalCsvProvider;
pub use period::LookbackPeriod;
pub use provider::{DataError, DataProvider, DataSource, FetchResult};
pub use retry::RetryPolicy;
pub use stooq::StooqProvider;
pub use store::{read_price_csv, write_atomic, write_price_csv, RawStore};
pub use yahoo::YahooProvider;

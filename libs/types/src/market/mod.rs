//! Market data model: bars, series, instruments and timeframes

pub mod bar;
pub mod instrument;
pub mod series;
pub mod timeframe;

pub use bar::{Bar, BarStatus};
pub use instrument::{AssetClass, Instrument};
pub use series::{Gap, Series};
pub use timeframe::Timeframe;

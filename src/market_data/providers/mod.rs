pub mod yahoo;

pub use yahoo::YahooChartSource;
